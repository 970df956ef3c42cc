use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a one-shot geolocation request
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationError {
    #[error("Location access denied by user")]
    PermissionDenied,

    #[error("Location information unavailable")]
    PositionUnavailable,

    #[error("Location request timeout")]
    Timeout,

    #[error("Geolocation is not supported by this host")]
    Unsupported,
}

impl LocationError {
    /// Map a host geolocation error code (1 = denied, 2 = unavailable, 3 = timeout)
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => Self::PermissionDenied,
            3 => Self::Timeout,
            _ => Self::PositionUnavailable,
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            Self::PermissionDenied => 1,
            Self::PositionUnavailable => 2,
            Self::Timeout => 3,
            Self::Unsupported => 0,
        }
    }
}

/// A single field-level validation error returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: Option<String>,
    pub message: String,
}

/// Failure of a backend call
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{message}")]
    HttpStatus {
        status: u16,
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            Self::Decode(_) => None,
        }
    }

    pub fn validation_errors(&self) -> &[FieldError] {
        match self {
            Self::HttpStatus { errors, .. } => errors,
            _ => &[],
        }
    }
}

/// Failure of the client-local key/value storage
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
