use async_trait::async_trait;
use tracing::debug;

use crate::error::LocationError;
use crate::location::traits::PositionProvider;
use crate::location::types::{Position, PositionOptions};

/// Position provider with a fixed answer
///
/// Used where the host has no live geolocation (CLI, servers): the position
/// comes from flags or config, and its absence reads as "unsupported".
#[derive(Debug, Clone, Default)]
pub struct StaticPositionProvider {
    outcome: Option<Result<Position, LocationError>>,
}

impl StaticPositionProvider {
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            outcome: Some(Ok(Position {
                latitude,
                longitude,
                accuracy: None,
            })),
        }
    }

    pub fn failing(error: LocationError) -> Self {
        Self {
            outcome: Some(Err(error)),
        }
    }

    /// No position source at all
    pub fn unsupported() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PositionProvider for StaticPositionProvider {
    async fn current_position(&self, options: &PositionOptions) -> Result<Position, LocationError> {
        debug!(?options, "Static position requested");
        match &self.outcome {
            Some(outcome) => *outcome,
            None => Err(LocationError::Unsupported),
        }
    }
}
