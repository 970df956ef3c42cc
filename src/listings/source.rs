use async_trait::async_trait;

use crate::error::ApiError;
use crate::models::Listing;

/// Where the full listing set comes from
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch every listing, unfiltered
    async fn fetch_all(&self) -> Result<Vec<Listing>, ApiError>;
}
