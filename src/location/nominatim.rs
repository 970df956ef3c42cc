use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::location::traits::ReverseGeocoder;
use crate::location::types::AddressInfo;

/// Address fields tried, in order, when picking a city name
const CITY_FIELDS: [&str; 12] = [
    "city",
    "town",
    "village",
    "municipality",
    "borough",
    "district",
    "neighbourhood",
    "suburb",
    "hamlet",
    "county",
    "state_district",
    "state",
];

/// Nominatim reverse geocoding response
#[derive(Debug, Default, Deserialize)]
struct NominatimReverse {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    address: Option<Map<String, Value>>,
}

/// Reverse geocoder backed by OpenStreetMap Nominatim
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(base_url: impl Into<String>, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn fetch(&self, latitude: f64, longitude: f64) -> Result<String> {
        let url = format!("{}/reverse", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("format", "json".to_string()),
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("zoom", "10".to_string()),
                ("addressdetails", "1".to_string()),
            ])
            .send()
            .await
            .context("Reverse geocoding request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Reverse geocoding returned status: {}", response.status());
        }

        response
            .text()
            .await
            .context("Failed to read reverse geocoding response")
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn resolve_address(&self, latitude: f64, longitude: f64) -> AddressInfo {
        match self.fetch(latitude, longitude).await {
            Ok(body) => {
                let info = parse_reverse_response(&body);
                debug!(?info, latitude, longitude, "Reverse geocoded");
                info
            }
            Err(e) => {
                warn!(error = %e, latitude, longitude, "Reverse geocoding failed");
                AddressInfo::default()
            }
        }
    }
}

fn field<'a>(address: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    address
        .get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// First comma-separated part that isn't a bare number or a single character
fn first_place_token(display_name: &str) -> Option<&str> {
    display_name
        .split(',')
        .map(str::trim)
        .find(|part| part.chars().count() > 1 && !part.chars().all(|c| c.is_ascii_digit()))
}

fn address_info(body: &NominatimReverse) -> AddressInfo {
    let Some(address) = &body.address else {
        return AddressInfo::default();
    };

    let city = CITY_FIELDS
        .iter()
        .find_map(|name| field(address, name))
        .or_else(|| body.display_name.as_deref().and_then(first_place_token))
        .map(str::to_string);

    let area = field(address, "suburb")
        .or_else(|| field(address, "neighbourhood"))
        .map(str::to_string);

    AddressInfo {
        city,
        area,
        country: field(address, "country").map(str::to_string),
    }
}

/// Parse a raw Nominatim response body
fn parse_reverse_response(body: &str) -> AddressInfo {
    match serde_json::from_str::<NominatimReverse>(body) {
        Ok(parsed) => address_info(&parsed),
        Err(e) => {
            warn!(error = %e, "Unreadable reverse geocoding response");
            AddressInfo::default()
        }
    }
}
