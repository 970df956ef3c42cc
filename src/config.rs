use anyhow::{Context, Result};
use chrono::Duration as ChronoDuration;
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::location::{LocationSettings, PositionOptions};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub geocoder_url: String,
    pub geocoder_user_agent: String,
    /// File holding the token, profile and last location
    pub state_path: PathBuf,
    pub default_radius_km: f64,
    pub location_ttl: ChronoDuration,
    pub listings_ttl: ChronoDuration,
    pub geolocation_timeout: Duration,
    pub position_max_age: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000".to_string(),
            geocoder_url: "https://nominatim.openstreetmap.org".to_string(),
            geocoder_user_agent: "campus-listings/0.1".to_string(),
            state_path: PathBuf::from(".campus-listings.json"),
            default_radius_km: 20.0,
            location_ttl: ChronoDuration::hours(1),
            listings_ttl: ChronoDuration::minutes(5),
            geolocation_timeout: Duration::from_secs(10),
            position_max_age: Duration::from_secs(5 * 60),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys take their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            api_base_url: lookup("API_BASE_URL").unwrap_or(defaults.api_base_url),
            geocoder_url: lookup("GEOCODER_URL").unwrap_or(defaults.geocoder_url),
            geocoder_user_agent: lookup("GEOCODER_USER_AGENT")
                .unwrap_or(defaults.geocoder_user_agent),
            state_path: lookup("STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.state_path),
            default_radius_km: parsed(&lookup, "DEFAULT_RADIUS_KM")?
                .unwrap_or(defaults.default_radius_km),
            location_ttl: parsed(&lookup, "LOCATION_TTL_SECS")?
                .map(ChronoDuration::seconds)
                .unwrap_or(defaults.location_ttl),
            listings_ttl: parsed(&lookup, "LISTINGS_TTL_SECS")?
                .map(ChronoDuration::seconds)
                .unwrap_or(defaults.listings_ttl),
            geolocation_timeout: parsed(&lookup, "GEOLOCATION_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.geolocation_timeout),
            position_max_age: parsed(&lookup, "POSITION_MAX_AGE_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.position_max_age),
        })
    }

    pub fn location_settings(&self) -> LocationSettings {
        LocationSettings {
            ttl: self.location_ttl,
            options: PositionOptions {
                enable_high_accuracy: true,
                timeout: self.geolocation_timeout,
                maximum_age: self.position_max_age,
            },
        }
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{key} must be a valid number"))
        })
        .transpose()
}
