//! Derives the visible listing subset from the cached set.
//!
//! Stages run in a fixed order: location, category, price, search. Every
//! stage is pure and synchronous; the same inputs always give the same output.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

use crate::geo::Coordinates;
use crate::models::{CategoryFilter, Listing, ListingView};

pub const DEFAULT_RADIUS_KM: f64 = 20.0;

/// What the user asked to see
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub category: Option<CategoryFilter>,
    /// Explicit city filter; overrides GPS filtering when set
    pub city: Option<String>,
    /// Falls back to `DEFAULT_RADIUS_KM`
    pub radius_km: Option<f64>,
    pub search: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
}

impl FilterSpec {
    pub fn radius(&self) -> f64 {
        self.radius_km.unwrap_or(DEFAULT_RADIUS_KM)
    }

    fn city_term(&self) -> Option<&str> {
        non_blank(self.city.as_deref())
    }

    fn search_term(&self) -> Option<&str> {
        non_blank(self.search.as_deref())
    }

    fn has_price_bounds(&self) -> bool {
        self.price_min.is_some() || self.price_max.is_some()
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// How the location stage picked its result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationMode {
    /// Within the radius of the user's position, nearest first
    Nearby,
    /// Substring match on the city name
    City,
    /// No location constraint applied
    Unfiltered,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub listings: Vec<ListingView>,
    pub mode: LocationMode,
}

/// Run all stages over `listings`
pub fn apply(listings: &[Listing], spec: &FilterSpec, user: Option<Coordinates>) -> FilterOutcome {
    let (located, mode) = filter_by_location(listings, spec, user);

    let listings: Vec<ListingView> = located
        .into_iter()
        .filter(|view| {
            spec.category
                .map_or(true, |bucket| bucket.matches(view.listing.category))
        })
        .filter(|view| price_in_bounds(&view.listing, spec.price_min, spec.price_max))
        .filter(|view| spec.search_term().map_or(true, |term| matches_search(&view.listing, term)))
        .collect();

    debug!(?mode, count = listings.len(), "Filtered listings");

    FilterOutcome { listings, mode }
}

/// Location stage
///
/// With a known position and no city filter, keep listings with coordinates
/// inside the radius, nearest first. If that leaves nothing, or there is no
/// position, or a city filter is set, fall back to city-name matching in fetch
/// order. With neither a position nor a city, return everything.
pub fn filter_by_location(
    listings: &[Listing],
    spec: &FilterSpec,
    user: Option<Coordinates>,
) -> (Vec<ListingView>, LocationMode) {
    let city = spec.city_term();

    if let (Some(origin), None) = (user, city) {
        let nearby = within_radius(listings, &origin, spec.radius());
        if !nearby.is_empty() {
            return (nearby, LocationMode::Nearby);
        }
        debug!(radius_km = spec.radius(), "Nothing within radius, falling back to city match");
    }

    match city {
        Some(city) => (by_city(listings, city), LocationMode::City),
        None => (
            listings.iter().cloned().map(ListingView::new).collect(),
            LocationMode::Unfiltered,
        ),
    }
}

/// Listings with coordinates within `radius_km` of `origin`, nearest first
pub fn within_radius(listings: &[Listing], origin: &Coordinates, radius_km: f64) -> Vec<ListingView> {
    let mut nearby: Vec<ListingView> = listings
        .iter()
        .filter_map(|listing| {
            let distance = origin.distance_to(&listing.coordinates()?);
            (distance <= radius_km).then(|| ListingView::with_distance(listing.clone(), distance))
        })
        .collect();

    // Stable, so equal distances keep fetch order
    nearby.sort_by(|a, b| {
        a.distance_km
            .partial_cmp(&b.distance_km)
            .unwrap_or(Ordering::Equal)
    });
    nearby
}

/// Case-insensitive substring match on the listing's city
pub fn by_city(listings: &[Listing], city: &str) -> Vec<ListingView> {
    let needle = city.to_lowercase();
    listings
        .iter()
        .filter(|listing| listing.location.city.to_lowercase().contains(&needle))
        .cloned()
        .map(ListingView::new)
        .collect()
}

pub fn by_category(listings: &[Listing], bucket: CategoryFilter) -> Vec<Listing> {
    listings
        .iter()
        .filter(|listing| bucket.matches(listing.category))
        .cloned()
        .collect()
}

/// Inclusive bounds; a listing without a price fails whenever a bound is set
pub fn price_in_bounds(listing: &Listing, min: Option<f64>, max: Option<f64>) -> bool {
    if min.is_none() && max.is_none() {
        return true;
    }
    let Some(price) = &listing.price else {
        return false;
    };
    min.map_or(true, |min| price.amount >= min) && max.map_or(true, |max| price.amount <= max)
}

/// Case-insensitive substring match on title or description
pub fn matches_search(listing: &Listing, term: &str) -> bool {
    let term = term.to_lowercase();
    listing.title.to_lowercase().contains(&term) || listing.description.to_lowercase().contains(&term)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{listing, priced};
    use crate::models::Category;

    const LONDON: (f64, f64) = (51.5, -0.1);
    const MANCHESTER: (f64, f64) = (53.5, -2.2);

    fn two_cities() -> Vec<Listing> {
        vec![
            listing("london", Category::Marketplace, "London", Some(LONDON)),
            listing("manchester", Category::Marketplace, "Manchester", Some(MANCHESTER)),
        ]
    }

    fn user_at(point: (f64, f64)) -> Option<Coordinates> {
        Some(Coordinates::new(point.0, point.1))
    }

    fn ids(outcome: &FilterOutcome) -> Vec<&str> {
        outcome.listings.iter().map(|v| v.listing.id.as_str()).collect()
    }

    #[test]
    fn test_small_radius_keeps_only_local() {
        let spec = FilterSpec {
            radius_km: Some(20.0),
            ..Default::default()
        };

        let outcome = apply(&two_cities(), &spec, user_at(LONDON));

        assert_eq!(ids(&outcome), vec!["london"]);
        assert_eq!(outcome.mode, LocationMode::Nearby);
        assert_eq!(outcome.listings[0].distance_km, Some(0.0));
    }

    #[test]
    fn test_large_radius_sorts_by_distance() {
        let mut listings = two_cities();
        listings.reverse();
        let spec = FilterSpec {
            radius_km: Some(500.0),
            ..Default::default()
        };

        let outcome = apply(&listings, &spec, user_at(LONDON));

        assert_eq!(ids(&outcome), vec!["london", "manchester"]);
        let far = outcome.listings[1].distance_km.unwrap();
        assert!(far > 250.0 && far < 275.0);
    }

    #[test]
    fn test_city_filter_without_gps_ignores_case() {
        let spec = FilterSpec {
            city: Some("manchester".to_string()),
            ..Default::default()
        };

        let outcome = apply(&two_cities(), &spec, None);

        assert_eq!(ids(&outcome), vec!["manchester"]);
        assert_eq!(outcome.mode, LocationMode::City);
        assert_eq!(outcome.listings[0].distance_km, None);
    }

    #[test]
    fn test_explicit_city_overrides_gps() {
        let spec = FilterSpec {
            city: Some("MANCH".to_string()),
            radius_km: Some(500.0),
            ..Default::default()
        };

        let outcome = apply(&two_cities(), &spec, user_at(LONDON));

        assert_eq!(ids(&outcome), vec!["manchester"]);
        assert_eq!(outcome.mode, LocationMode::City);
    }

    #[test]
    fn test_empty_radius_falls_back_to_city_match() {
        let listings = two_cities();
        let spec = FilterSpec {
            radius_km: Some(5.0),
            ..Default::default()
        };
        // Somewhere in the North Sea
        let outcome = apply(&listings, &spec, user_at((56.0, 3.0)));

        let expected: Vec<ListingView> = by_city(&listings, "");
        assert_eq!(outcome.listings, expected);
        assert_eq!(outcome.mode, LocationMode::Unfiltered);
        assert!(!outcome.listings.is_empty());
    }

    #[test]
    fn test_no_gps_and_no_city_returns_everything() {
        let outcome = apply(&two_cities(), &FilterSpec::default(), None);

        assert_eq!(ids(&outcome), vec!["london", "manchester"]);
        assert_eq!(outcome.mode, LocationMode::Unfiltered);
    }

    #[test]
    fn test_listings_without_coordinates_are_dropped_from_gps_filter() {
        let mut listings = two_cities();
        listings.push(listing("nowhere", Category::Jobs, "London", None));

        let outcome = apply(&listings, &FilterSpec::default(), user_at(LONDON));

        assert_eq!(ids(&outcome), vec!["london"]);
    }

    #[test]
    fn test_blank_city_counts_as_unset() {
        let spec = FilterSpec {
            city: Some("   ".to_string()),
            ..Default::default()
        };

        let outcome = apply(&two_cities(), &spec, user_at(LONDON));

        assert_eq!(outcome.mode, LocationMode::Nearby);
    }

    #[test]
    fn test_radius_bound_and_order_hold_for_a_grid() {
        let mut listings = Vec::new();
        for i in 0..12 {
            for j in 0..12 {
                let lat = 50.0 + i as f64 * 0.35;
                let lng = -4.0 + j as f64 * 0.4;
                listings.push(listing(&format!("{i}-{j}"), Category::Jobs, "Somewhere", Some((lat, lng))));
            }
        }
        let origin = Coordinates::new(52.0, -1.5);

        for radius in [10.0, 50.0, 120.0, 300.0] {
            let views = within_radius(&listings, &origin, radius);
            let inside = listings
                .iter()
                .filter(|l| origin.distance_to(&l.coordinates().unwrap()) <= radius)
                .count();

            assert_eq!(views.len(), inside, "radius {radius}");
            assert!(views.iter().all(|v| v.distance_km.unwrap() <= radius));
            assert!(views
                .windows(2)
                .all(|pair| pair[0].distance_km.unwrap() <= pair[1].distance_km.unwrap()));
        }
    }

    #[test]
    fn test_price_bounds_are_inclusive() {
        let listings = vec![
            priced(listing("cheap", Category::Marketplace, "Leeds", None), 50.0),
            priced(listing("mid", Category::Marketplace, "Leeds", None), 150.0),
            priced(listing("dear", Category::Marketplace, "Leeds", None), 300.0),
        ];
        let spec = FilterSpec {
            price_min: Some(100.0),
            price_max: Some(200.0),
            ..Default::default()
        };

        let outcome = apply(&listings, &spec, None);

        assert_eq!(ids(&outcome), vec!["mid"]);

        let edge = FilterSpec {
            price_min: Some(150.0),
            price_max: Some(150.0),
            ..Default::default()
        };
        assert_eq!(ids(&apply(&listings, &edge, None)), vec!["mid"]);
    }

    #[test]
    fn test_amountless_backend_price_counts_as_unpriced() {
        let stored: Listing = serde_json::from_value(serde_json::json!({
            "_id": "gift",
            "title": "Free lamp",
            "category": "buy-sell",
            "price": { "currency": "USD", "type": "fixed" },
            "location": { "city": "Leeds" },
            "createdAt": "2025-09-01T12:00:00Z",
            "updatedAt": "2025-09-01T12:00:00Z"
        }))
        .unwrap();
        let listings = vec![stored, priced(listing("lamp", Category::Marketplace, "Leeds", None), 5.0)];

        let spec = FilterSpec {
            price_max: Some(100.0),
            ..Default::default()
        };

        assert_eq!(ids(&apply(&listings, &spec, None)), vec!["lamp"]);
    }

    #[test]
    fn test_unpriced_listing_excluded_once_any_bound_set() {
        let listings = vec![
            listing("free", Category::Jobs, "Leeds", None),
            priced(listing("paid", Category::Jobs, "Leeds", None), 10.0),
        ];

        let min_only = FilterSpec {
            price_min: Some(0.0),
            ..Default::default()
        };
        assert_eq!(ids(&apply(&listings, &min_only, None)), vec!["paid"]);
        assert_eq!(apply(&listings, &FilterSpec::default(), None).listings.len(), 2);
    }

    #[test]
    fn test_category_bucket_applies_alias() {
        let listings = vec![
            listing("ride", Category::Rideshare, "York", None),
            listing("drop", Category::PickDrop, "York", None),
            listing("job", Category::Jobs, "York", None),
        ];
        let spec = FilterSpec {
            category: Some(CategoryFilter::PickDrop),
            ..Default::default()
        };

        assert_eq!(ids(&apply(&listings, &spec, None)), vec!["ride", "drop"]);
        assert_eq!(by_category(&listings, CategoryFilter::Jobs).len(), 1);
    }

    #[test]
    fn test_search_matches_title_or_description() {
        let mut desk = listing("desk", Category::Marketplace, "York", None);
        desk.title = "Standing Desk".to_string();
        let mut lamp = listing("lamp", Category::Marketplace, "York", None);
        lamp.description = "Goes great on a DESK".to_string();
        let bike = listing("bike", Category::Marketplace, "York", None);

        let spec = FilterSpec {
            search: Some("desk".to_string()),
            ..Default::default()
        };

        assert_eq!(ids(&apply(&[desk, lamp, bike], &spec, None)), vec!["desk", "lamp"]);
    }

    #[test]
    fn test_stages_combine_with_and() {
        let mut listings = two_cities();
        listings[0] = priced(listings[0].clone(), 120.0);
        listings[1] = priced(listings[1].clone(), 120.0);
        listings[1].title = "Sofa".to_string();
        let spec = FilterSpec {
            radius_km: Some(500.0),
            category: Some(CategoryFilter::Marketplace),
            price_max: Some(200.0),
            search: Some("sofa".to_string()),
            ..Default::default()
        };

        let outcome = apply(&listings, &spec, user_at(LONDON));

        assert_eq!(ids(&outcome), vec!["manchester"]);
        assert!(outcome.listings[0].distance_km.is_some());
    }

    #[test]
    fn test_filtering_is_deterministic() {
        let listings = two_cities();
        let spec = FilterSpec {
            radius_km: Some(500.0),
            ..Default::default()
        };

        assert_eq!(apply(&listings, &spec, user_at(LONDON)), apply(&listings, &spec, user_at(LONDON)));
    }
}
