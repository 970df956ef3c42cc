use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::ApiError;
use crate::events::{AppEvent, EventBus, ListingChange};
use crate::geo::Coordinates;
use crate::listings::filter::{self, FilterOutcome, FilterSpec};
use crate::listings::source::ListingSource;
use crate::models::{CategoryFilter, Listing, ListingPatch, ListingView};

/// Result of a refresh call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A fetch replaced the cached set
    Fetched(usize),
    /// The cached set is still within the staleness window
    Fresh,
    /// The store was cleared while the fetch was in flight
    Discarded,
}

#[derive(Debug, Default)]
struct Inner {
    listings: Vec<Listing>,
    last_fetch: Option<DateTime<Utc>>,
    loading: bool,
    error: Option<String>,
    generation: u64,
}

/// In-memory cache of the full listing set
///
/// Fetched once and reused for `ttl`. Filtering never touches the network,
/// and local mutations only change the cache: callers issue the matching
/// write request themselves.
pub struct ListingStore {
    source: Arc<dyn ListingSource>,
    clock: Arc<dyn Clock>,
    bus: EventBus,
    ttl: ChronoDuration,
    inner: RwLock<Inner>,
}

impl ListingStore {
    pub fn new(source: Arc<dyn ListingSource>, clock: Arc<dyn Clock>, bus: EventBus) -> Self {
        Self::with_ttl(source, clock, bus, ChronoDuration::minutes(5))
    }

    pub fn with_ttl(
        source: Arc<dyn ListingSource>,
        clock: Arc<dyn Clock>,
        bus: EventBus,
        ttl: ChronoDuration,
    ) -> Self {
        Self {
            source,
            clock,
            bus,
            ttl,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Fetch unless the cached set is younger than the staleness window
    pub async fn refresh(&self) -> Result<RefreshOutcome, ApiError> {
        if !self.is_stale().await {
            debug!("Listings still fresh, skipping fetch");
            return Ok(RefreshOutcome::Fresh);
        }
        self.force_refresh().await
    }

    /// Fetch regardless of age
    ///
    /// On failure the previous set stays visible and the error is recorded.
    pub async fn force_refresh(&self) -> Result<RefreshOutcome, ApiError> {
        let started = self.clock.now();
        let generation = {
            let mut inner = self.inner.write().await;
            inner.loading = true;
            inner.error = None;
            inner.generation
        };

        let result = self.source.fetch_all().await;

        let mut inner = self.inner.write().await;
        inner.loading = false;

        if inner.generation != generation {
            debug!("Store cleared during fetch, discarding result");
            return Ok(RefreshOutcome::Discarded);
        }

        match result {
            Ok(listings) => {
                let count = listings.len();
                inner.listings = listings;
                inner.last_fetch = Some(started);
                drop(inner);

                info!(count, "Fetched listings");
                self.bus.publish(AppEvent::ListingsRefreshed { count });
                Ok(RefreshOutcome::Fetched(count))
            }
            Err(e) => {
                warn!(error = %e, kept = inner.listings.len(), "Failed to fetch listings");
                inner.error = Some(format!("Failed to fetch posts: {e}"));
                Err(e)
            }
        }
    }

    pub async fn is_stale(&self) -> bool {
        let inner = self.inner.read().await;
        match inner.last_fetch {
            Some(at) => self.clock.now().signed_duration_since(at) >= self.ttl,
            None => true,
        }
    }

    pub async fn listings(&self) -> Vec<Listing> {
        self.inner.read().await.listings.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.listings.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn get(&self, id: &str) -> Option<Listing> {
        self.inner
            .read()
            .await
            .listings
            .iter()
            .find(|listing| listing.id == id)
            .cloned()
    }

    pub async fn is_loading(&self) -> bool {
        self.inner.read().await.loading
    }

    pub async fn last_fetch(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.last_fetch
    }

    pub async fn error(&self) -> Option<String> {
        self.inner.read().await.error.clone()
    }

    /// Filtered view of the cached set
    pub async fn filtered(&self, spec: &FilterSpec, user: Option<Coordinates>) -> FilterOutcome {
        let inner = self.inner.read().await;
        filter::apply(&inner.listings, spec, user)
    }

    pub async fn by_category(&self, bucket: CategoryFilter) -> Vec<Listing> {
        filter::by_category(&self.inner.read().await.listings, bucket)
    }

    pub async fn by_city(&self, city: &str) -> Vec<ListingView> {
        filter::by_city(&self.inner.read().await.listings, city)
    }

    /// Put a new listing at the front of the cached set
    pub async fn add(&self, listing: Listing) {
        let id = listing.id.clone();
        self.inner.write().await.listings.insert(0, listing);
        self.bus.publish(AppEvent::ListingChanged {
            id,
            change: ListingChange::Added,
        });
    }

    /// Returns false if the id isn't cached
    pub async fn update(&self, id: &str, patch: &ListingPatch) -> bool {
        let now = self.clock.now();
        let found = {
            let mut inner = self.inner.write().await;
            match inner.listings.iter_mut().find(|listing| listing.id == id) {
                Some(listing) => {
                    listing.apply(patch, now);
                    true
                }
                None => false,
            }
        };

        if found {
            self.bus.publish(AppEvent::ListingChanged {
                id: id.to_string(),
                change: ListingChange::Updated,
            });
        }
        found
    }

    /// Returns false if the id isn't cached
    pub async fn remove(&self, id: &str) -> bool {
        let removed = {
            let mut inner = self.inner.write().await;
            let before = inner.listings.len();
            inner.listings.retain(|listing| listing.id != id);
            inner.listings.len() != before
        };

        if removed {
            self.bus.publish(AppEvent::ListingChanged {
                id: id.to_string(),
                change: ListingChange::Removed,
            });
        }
        removed
    }

    /// Drop the cached set; any fetch in flight is discarded when it lands
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.listings.clear();
        inner.last_fetch = None;
        inner.error = None;
        inner.generation += 1;
    }
}
