use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::LocationError;
use crate::events::{AppEvent, EventBus};
use crate::location::traits::{PositionProvider, ReverseGeocoder};
use crate::location::types::{AddressInfo, LocationPhase, LocationReading, Position, PositionOptions};
use crate::storage::{self, KeyValueStore};

/// Storage key of the cached reading
pub const LOCATION_KEY: &str = "user_location";

#[derive(Debug, Clone, Copy)]
pub struct LocationSettings {
    /// How long a stored reading stays usable
    pub ttl: ChronoDuration,
    pub options: PositionOptions,
}

impl Default for LocationSettings {
    fn default() -> Self {
        Self {
            ttl: ChronoDuration::hours(1),
            options: PositionOptions::default(),
        }
    }
}

/// Resolves, caches and broadcasts the user's location
pub struct LocationService {
    provider: Arc<dyn PositionProvider>,
    geocoder: Arc<dyn ReverseGeocoder>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    bus: EventBus,
    settings: LocationSettings,
    phase: RwLock<LocationPhase>,
}

impl LocationService {
    pub fn new(
        provider: Arc<dyn PositionProvider>,
        geocoder: Arc<dyn ReverseGeocoder>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        bus: EventBus,
    ) -> Self {
        Self::with_settings(provider, geocoder, store, clock, bus, LocationSettings::default())
    }

    pub fn with_settings(
        provider: Arc<dyn PositionProvider>,
        geocoder: Arc<dyn ReverseGeocoder>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        bus: EventBus,
        settings: LocationSettings,
    ) -> Self {
        Self {
            provider,
            geocoder,
            store,
            clock,
            bus,
            settings,
            phase: RwLock::new(LocationPhase::Uninitialized),
        }
    }

    pub fn settings(&self) -> &LocationSettings {
        &self.settings
    }

    pub async fn phase(&self) -> LocationPhase {
        *self.phase.read().await
    }

    /// One-shot position request, bounded by the configured timeout
    pub async fn current_position(&self) -> Result<Position, LocationError> {
        let options = self.settings.options;
        match tokio::time::timeout(options.timeout, self.provider.current_position(&options)).await {
            Ok(result) => result,
            Err(_) => Err(LocationError::Timeout),
        }
    }

    /// Best-effort reverse geocoding; never fails
    pub async fn resolve_address(&self, latitude: f64, longitude: f64) -> AddressInfo {
        self.geocoder.resolve_address(latitude, longitude).await
    }

    /// Last stored reading if it hasn't expired. Never triggers a request.
    pub async fn cached_only(&self) -> Option<LocationReading> {
        let stored: Option<LocationReading> =
            match storage::get_json(self.store.as_ref(), LOCATION_KEY).await {
                Ok(stored) => stored,
                Err(e) => {
                    warn!(error = %e, "Failed to read cached location");
                    None
                }
            };

        let reading = stored?;
        if reading.is_fresh(self.clock.now(), self.settings.ttl) {
            Some(reading)
        } else {
            debug!(captured_at = %reading.captured_at, "Cached location expired");
            None
        }
    }

    /// Cached reading unless expired or `force_refresh`; otherwise resolve anew
    ///
    /// A fresh reading overwrites the cache and is broadcast as
    /// `AppEvent::LocationUpdated`. Geolocation failures are returned as-is
    /// and leave the existing cache untouched.
    pub async fn get_with_cache(&self, force_refresh: bool) -> Result<LocationReading, LocationError> {
        if !force_refresh {
            if let Some(cached) = self.cached_only().await {
                debug!("Using cached location");
                return Ok(cached);
            }
        }

        *self.phase.write().await = LocationPhase::Resolving;

        let position = match self.current_position().await {
            Ok(position) => position,
            Err(e) => {
                warn!(error = %e, "Geolocation failed");
                *self.phase.write().await = LocationPhase::Failed(e);
                return Err(e);
            }
        };

        let address = self.resolve_address(position.latitude, position.longitude).await;
        let reading = LocationReading::new(position, address, self.clock.now());

        if let Err(e) = storage::set_json(self.store.as_ref(), LOCATION_KEY, &reading).await {
            warn!(error = %e, "Failed to persist location");
        }

        *self.phase.write().await = LocationPhase::Resolved;
        info!(
            latitude = reading.latitude,
            longitude = reading.longitude,
            city = reading.city.as_deref().unwrap_or(""),
            "Location updated"
        );
        self.bus.publish(AppEvent::LocationUpdated(reading.clone()));

        Ok(reading)
    }

    pub async fn clear(&self) {
        if let Err(e) = self.store.remove(LOCATION_KEY).await {
            warn!(error = %e, "Failed to clear cached location");
        }
        *self.phase.write().await = LocationPhase::Uninitialized;
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::*;
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    struct Harness {
        service: LocationService,
        provider: Arc<ScriptedProvider>,
        clock: Arc<ManualClock>,
        store: Arc<MemoryStore>,
        bus: EventBus,
    }

    fn harness(answers: Vec<Result<Position, LocationError>>) -> Harness {
        let provider = Arc::new(ScriptedProvider::new(answers));
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 9, 1, 8, 0, 0).unwrap()));
        let store = Arc::new(MemoryStore::new());
        let bus = EventBus::new();
        let service = LocationService::new(
            provider.clone(),
            Arc::new(FixedGeocoder(london_address())),
            store.clone(),
            clock.clone(),
            bus.clone(),
        );
        Harness {
            service,
            provider,
            clock,
            store,
            bus,
        }
    }

    #[tokio::test]
    async fn test_fresh_resolution_is_cached_and_broadcast() {
        let h = harness(vec![Ok(position(51.52, -0.12))]);
        let mut rx = h.bus.subscribe();

        assert_eq!(h.service.phase().await, LocationPhase::Uninitialized);
        assert!(h.service.cached_only().await.is_none());

        let reading = h.service.get_with_cache(false).await.unwrap();

        assert_eq!(reading.city.as_deref(), Some("London"));
        assert_eq!(reading.accuracy, Some(25.0));
        assert_eq!(h.service.phase().await, LocationPhase::Resolved);
        assert_eq!(h.service.cached_only().await, Some(reading.clone()));
        assert_eq!(rx.recv().await.unwrap(), AppEvent::LocationUpdated(reading));
    }

    #[tokio::test]
    async fn test_cached_accessor_is_stable_within_window() {
        let h = harness(vec![Ok(position(51.52, -0.12))]);
        h.service.get_with_cache(false).await.unwrap();

        h.clock.advance(ChronoDuration::minutes(30));
        let first = h.service.cached_only().await;
        let second = h.service.cached_only().await;

        assert!(first.is_some());
        assert_eq!(first, second);

        let again = h.service.get_with_cache(false).await.unwrap();
        assert_eq!(Some(again), first);
        assert_eq!(h.provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_expired_cache_triggers_fresh_resolution() {
        let h = harness(vec![Ok(position(51.52, -0.12)), Ok(position(53.48, -2.24))]);
        h.service.get_with_cache(false).await.unwrap();

        h.clock.advance(ChronoDuration::hours(1) + ChronoDuration::seconds(1));

        assert!(h.service.cached_only().await.is_none());

        let reading = h.service.get_with_cache(false).await.unwrap();
        assert_eq!(reading.latitude, 53.48);
        assert_eq!(h.provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_stale_stored_reading_is_ignored() {
        let h = harness(vec![Ok(position(53.48, -2.24))]);
        let old = LocationReading::new(
            position(51.52, -0.12),
            AddressInfo::default(),
            h.clock.now() - ChronoDuration::hours(2),
        );
        storage::set_json(h.store.as_ref(), LOCATION_KEY, &old).await.unwrap();

        assert!(h.service.cached_only().await.is_none());

        let reading = h.service.get_with_cache(false).await.unwrap();
        assert_eq!(reading.latitude, 53.48);
        assert_eq!(h.provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_cache() {
        let h = harness(vec![Ok(position(51.52, -0.12)), Ok(position(51.60, -0.20))]);
        h.service.get_with_cache(false).await.unwrap();

        let reading = h.service.get_with_cache(true).await.unwrap();

        assert_eq!(reading.latitude, 51.60);
        assert_eq!(h.service.cached_only().await, Some(reading));
        assert_eq!(h.provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_failure_is_reported_and_keeps_cache() {
        let h = harness(vec![Ok(position(51.52, -0.12)), Err(LocationError::PermissionDenied)]);
        let cached = h.service.get_with_cache(false).await.unwrap();

        let err = h.service.get_with_cache(true).await.unwrap_err();

        assert_eq!(err, LocationError::PermissionDenied);
        assert_eq!(h.service.phase().await, LocationPhase::Failed(LocationError::PermissionDenied));
        assert_eq!(h.service.cached_only().await, Some(cached));
    }

    #[tokio::test]
    async fn test_failed_attempt_does_not_block_next() {
        let h = harness(vec![Err(LocationError::PositionUnavailable), Ok(position(51.52, -0.12))]);

        assert!(h.service.get_with_cache(false).await.is_err());
        assert!(h.service.get_with_cache(false).await.is_ok());
        assert_eq!(h.service.phase().await, LocationPhase::Resolved);
    }

    #[tokio::test]
    async fn test_hanging_provider_times_out() {
        let settings = LocationSettings {
            options: PositionOptions {
                timeout: Duration::from_millis(20),
                ..PositionOptions::default()
            },
            ..LocationSettings::default()
        };
        let service = LocationService::with_settings(
            Arc::new(HangingProvider),
            Arc::new(FixedGeocoder(AddressInfo::default())),
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::new(Utc::now())),
            EventBus::new(),
            settings,
        );

        assert_eq!(service.get_with_cache(false).await, Err(LocationError::Timeout));
    }

    #[tokio::test]
    async fn test_geocoding_miss_keeps_coordinates() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(position(10.0, 20.0))]));
        let service = LocationService::new(
            provider,
            Arc::new(FixedGeocoder(AddressInfo::default())),
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::new(Utc::now())),
            EventBus::new(),
        );

        let reading = service.get_with_cache(false).await.unwrap();

        assert_eq!(reading.coordinates().latitude, 10.0);
        assert_eq!(reading.display_address(), None);
    }

    #[tokio::test]
    async fn test_clear_resets() {
        let h = harness(vec![Ok(position(51.52, -0.12))]);
        h.service.get_with_cache(false).await.unwrap();

        h.service.clear().await;

        assert!(h.service.cached_only().await.is_none());
        assert_eq!(h.service.phase().await, LocationPhase::Uninitialized);
    }
}
