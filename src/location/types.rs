use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::LocationError;
use crate::geo::Coordinates;

/// Options passed to the host geolocation capability
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    /// Give up after this long
    pub timeout: Duration,
    /// A host-cached fix younger than this is acceptable
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::from_secs(5 * 60),
        }
    }
}

/// A raw fix from the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius in meters
    pub accuracy: Option<f64>,
}

impl Position {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// Best-effort place names for a coordinate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInfo {
    pub city: Option<String>,
    pub area: Option<String>,
    pub country: Option<String>,
}

impl AddressInfo {
    pub fn is_empty(&self) -> bool {
        self.city.is_none() && self.area.is_none() && self.country.is_none()
    }
}

/// A stored location reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationReading {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub captured_at: DateTime<Utc>,
}

impl LocationReading {
    pub fn new(position: Position, address: AddressInfo, captured_at: DateTime<Utc>) -> Self {
        Self {
            latitude: position.latitude,
            longitude: position.longitude,
            accuracy: position.accuracy,
            city: address.city,
            area: address.area,
            country: address.country,
            captured_at,
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    /// Most specific place name available: city, then area, then country
    pub fn display_address(&self) -> Option<&str> {
        self.city
            .as_deref()
            .or(self.area.as_deref())
            .or(self.country.as_deref())
    }

    /// A reading is fresh while its age is below `ttl`
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: ChronoDuration) -> bool {
        now.signed_duration_since(self.captured_at) < ttl
    }
}

/// Lifecycle of the location service
///
/// `Resolved` only goes back to `Resolving` on a forced refresh or expiry.
/// `Failed` ends one attempt but never blocks the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocationPhase {
    #[default]
    Uninitialized,
    Resolving,
    Resolved,
    Failed(LocationError),
}
