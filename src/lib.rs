//! Listings, location and filtering core of a university-community marketplace.
//!
//! The full listing set is fetched once and cached; the visible subset is
//! derived locally from a [`listings::FilterSpec`], the user's cached
//! location and the shared search radius.

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod geo;
pub mod listings;
pub mod location;
pub mod models;
pub mod session;
pub mod state;
pub mod storage;

pub use config::Config;
pub use error::{ApiError, LocationError};
pub use state::AppState;
