//! Shared application state.
//!
//! `LocationStore` is the single owner of the user's location as the rest of
//! the app sees it. `AppState` wires it together with the listing cache, the
//! session and the event bus.

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::LocationError;
use crate::events::{AppEvent, EventBus};
use crate::geo::Coordinates;
use crate::listings::{FilterOutcome, FilterSpec, ListingStore, DEFAULT_RADIUS_KM};
use crate::location::{
    LocationReading, LocationService, NominatimGeocoder, PositionProvider, ReverseGeocoder,
};
use crate::session::Session;
use crate::storage::{FileStore, KeyValueStore};

/// Location as shown to the user
#[derive(Debug, Clone, PartialEq)]
pub struct LocationState {
    pub coordinates: Option<Coordinates>,
    pub address: Option<String>,
    pub radius_km: f64,
    pub loading: bool,
    pub error: Option<String>,
}

impl LocationState {
    fn new(radius_km: f64) -> Self {
        Self {
            coordinates: None,
            address: None,
            radius_km,
            loading: false,
            error: None,
        }
    }

    pub fn has_location(&self) -> bool {
        self.coordinates.is_some()
    }
}

pub struct LocationStore {
    service: Arc<LocationService>,
    bus: EventBus,
    state: RwLock<LocationState>,
}

impl LocationStore {
    pub fn new(service: Arc<LocationService>, bus: EventBus, default_radius_km: f64) -> Self {
        Self {
            service,
            bus,
            state: RwLock::new(LocationState::new(default_radius_km)),
        }
    }

    pub fn service(&self) -> &Arc<LocationService> {
        &self.service
    }

    pub async fn snapshot(&self) -> LocationState {
        self.state.read().await.clone()
    }

    /// Load whatever is cached; never asks the host for a position
    pub async fn init(&self) {
        self.state.write().await.loading = true;
        let cached = self.service.cached_only().await;
        if cached.is_none() {
            debug!("No cached location");
        }
        self.apply(cached.as_ref()).await;
        self.state.write().await.loading = false;
    }

    /// Resolve a location, from cache unless `force_refresh`
    pub async fn update_location(&self, force_refresh: bool) -> Result<(), LocationError> {
        {
            let mut state = self.state.write().await;
            state.loading = true;
            state.error = None;
        }

        let result = self.service.get_with_cache(force_refresh).await;

        match result {
            Ok(reading) => {
                self.apply(Some(&reading)).await;
                self.state.write().await.loading = false;
                Ok(())
            }
            Err(e) => {
                let mut state = self.state.write().await;
                state.loading = false;
                state.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Returns false when the radius is unchanged
    pub async fn update_radius(&self, radius_km: f64) -> bool {
        {
            let mut state = self.state.write().await;
            if state.radius_km == radius_km {
                debug!(radius_km, "Radius unchanged");
                return false;
            }
            state.radius_km = radius_km;
        }
        self.bus.publish(AppEvent::RadiusChanged { radius_km });
        true
    }

    /// Re-read the cached reading into state
    pub async fn sync_from_cache(&self) -> bool {
        match self.service.cached_only().await {
            Some(reading) => self.apply(Some(&reading)).await,
            None => false,
        }
    }

    /// Write a reading into state unless nothing visible changed
    async fn apply(&self, reading: Option<&LocationReading>) -> bool {
        let coordinates = reading.map(LocationReading::coordinates);
        let address = reading.and_then(|r| r.display_address()).map(str::to_string);

        let mut state = self.state.write().await;
        if state.coordinates == coordinates && state.address == address {
            debug!("Location unchanged, skipping update");
            return false;
        }
        info!(?coordinates, address = address.as_deref().unwrap_or(""), "Location state changed");
        state.coordinates = coordinates;
        state.address = address;
        true
    }

    /// Keep state in step with `LocationUpdated` events until the bus closes
    pub fn spawn_sync(self: &Arc<Self>) -> JoinHandle<()> {
        let store = Arc::clone(self);
        let mut rx = self.bus.subscribe();

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(AppEvent::LocationUpdated(_)) => {
                        store.sync_from_cache().await;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Location listener lagged, resyncing");
                        store.sync_from_cache().await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

/// Everything the app shares, owned in one place
#[derive(Clone)]
pub struct AppState {
    pub bus: EventBus,
    pub location: Arc<LocationStore>,
    pub listings: Arc<ListingStore>,
    pub session: Arc<Session>,
}

impl AppState {
    /// Wire up the production stack: file storage, Nominatim, the REST backend
    pub fn from_config(config: &Config, provider: Arc<dyn PositionProvider>) -> anyhow::Result<Self> {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&config.state_path));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let bus = EventBus::new();

        let session = Arc::new(Session::new(store.clone(), clock.clone()));
        let api = Arc::new(ApiClient::new(&config.api_base_url)?.with_session(session.clone()));
        let geocoder: Arc<dyn ReverseGeocoder> =
            Arc::new(NominatimGeocoder::new(&config.geocoder_url, &config.geocoder_user_agent)?);

        let service = Arc::new(LocationService::with_settings(
            provider,
            geocoder,
            store,
            clock.clone(),
            bus.clone(),
            config.location_settings(),
        ));
        let location = Arc::new(LocationStore::new(service, bus.clone(), config.default_radius_km));
        let listings = Arc::new(ListingStore::with_ttl(api, clock, bus.clone(), config.listings_ttl));

        Ok(Self {
            bus,
            location,
            listings,
            session,
        })
    }

    /// Filter the cached listings with the current location and radius
    ///
    /// A radius set on `spec` wins over the shared one.
    pub async fn visible_listings(&self, spec: &FilterSpec) -> FilterOutcome {
        let location = self.location.snapshot().await;
        let mut spec = spec.clone();
        if spec.radius_km.is_none() {
            spec.radius_km = Some(location.radius_km);
        }
        self.listings.filtered(&spec, location.coordinates).await
    }
}

impl Default for LocationState {
    fn default() -> Self {
        Self::new(DEFAULT_RADIUS_KM)
    }
}
