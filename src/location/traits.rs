use async_trait::async_trait;

use crate::error::LocationError;
use crate::location::types::{AddressInfo, Position, PositionOptions};

/// Host geolocation capability (one-shot, permission gated)
#[async_trait]
pub trait PositionProvider: Send + Sync {
    async fn current_position(&self, options: &PositionOptions) -> Result<Position, LocationError>;
}

/// Converts coordinates into place names
///
/// Never fails: any network or parse problem yields an empty `AddressInfo`.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn resolve_address(&self, latitude: f64, longitude: f64) -> AddressInfo;
}
