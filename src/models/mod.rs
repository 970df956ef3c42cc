use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::geo::{round_km, Coordinates};

mod category;

pub use category::{Category, CategoryFilter};

/// How a price is quoted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PriceUnit {
    #[default]
    Fixed,
    Hourly,
    Negotiable,
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Price {
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(rename = "type", default)]
    pub unit: PriceUnit,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Price as stored by the backend, which keeps `currency` and `type`
/// defaults even when no amount was given
#[derive(Deserialize)]
struct StoredPrice {
    #[serde(default)]
    amount: Option<f64>,
    #[serde(default = "default_currency")]
    currency: String,
    #[serde(rename = "type", default)]
    unit: PriceUnit,
}

/// A price without an amount is no price at all
fn price_with_amount<'de, D>(deserializer: D) -> Result<Option<Price>, D::Error>
where
    D: Deserializer<'de>,
{
    let stored = Option::<StoredPrice>::deserialize(deserializer)?;
    Ok(stored.and_then(|p| {
        p.amount.map(|amount| Price {
            amount,
            currency: p.currency,
            unit: p.unit,
        })
    }))
}

/// Populated author, or the default when the account no longer exists
fn author_or_default<'de, D>(deserializer: D) -> Result<AuthorRef, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<AuthorRef>::deserialize(deserializer)?.unwrap_or_default())
}

/// Where a listing is
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ListingLocation {
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default)]
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AuthorRef {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    #[default]
    Active,
    Inactive,
    Expired,
    Completed,
    Flagged,
    Removed,
}

/// A user-submitted listing (post)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    #[serde(
        default,
        deserialize_with = "price_with_amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<Price>,
    pub location: ListingLocation,
    #[serde(default, deserialize_with = "author_or_default")]
    pub author: AuthorRef,
    #[serde(default)]
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    /// Route of the listing's detail page, if its category has one
    pub fn detail_path(&self) -> Option<String> {
        self.category
            .route_prefix()
            .map(|prefix| format!("/{}/{}", prefix, self.id))
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.location.coordinates
    }

    /// Apply a partial update in place, bumping `updated_at`
    pub fn apply(&mut self, patch: &ListingPatch, at: DateTime<Utc>) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(price) = &patch.price {
            self.price = price.clone();
        }
        if let Some(location) = &patch.location {
            self.location = location.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = at;
    }
}

/// Partial update of a listing; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListingPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// `Some(None)` clears the price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Option<Price>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ListingLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ListingStatus>,
}

/// A listing as shown to the user, with its distance when known
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListingView {
    #[serde(flatten)]
    pub listing: Listing,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl ListingView {
    pub fn new(listing: Listing) -> Self {
        Self {
            listing,
            distance_km: None,
        }
    }

    pub fn with_distance(listing: Listing, distance_km: f64) -> Self {
        Self {
            listing,
            distance_km: Some(distance_km),
        }
    }

    /// Distance rounded for display
    pub fn display_distance(&self) -> Option<f64> {
        self.distance_km.map(round_km)
    }
}

/// Signed-in user's profile, as returned by the auth endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl fmt::Display for PriceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PriceUnit::Fixed => "fixed",
            PriceUnit::Hourly => "hourly",
            PriceUnit::Negotiable => "negotiable",
            PriceUnit::Monthly => "monthly",
            PriceUnit::Yearly => "yearly",
        };
        f.write_str(s)
    }
}

impl FromStr for PriceUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Ok(PriceUnit::Fixed),
            "hourly" => Ok(PriceUnit::Hourly),
            "negotiable" => Ok(PriceUnit::Negotiable),
            "monthly" => Ok(PriceUnit::Monthly),
            "yearly" => Ok(PriceUnit::Yearly),
            other => Err(format!("unknown price unit: {other}")),
        }
    }
}
