use serde::{Deserialize, Serialize};

use crate::geo::Coordinates;
use crate::models::{Category, Listing, ListingLocation, Price, UserProfile};

/// Query parameters of `GET /api/posts`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostQuery {
    pub category: Option<Category>,
    pub city: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort: Option<String>,
    pub near: Option<Coordinates>,
    pub radius_km: Option<f64>,
}

impl PostQuery {
    /// Set parameters only, under the names the backend expects
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(category) = self.category {
            pairs.push(("category", category.wire_name().to_string()));
        }
        if let Some(city) = &self.city {
            pairs.push(("city", city.clone()));
        }
        if let Some(min) = self.price_min {
            pairs.push(("priceMin", min.to_string()));
        }
        if let Some(max) = self.price_max {
            pairs.push(("priceMax", max.to_string()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(sort) = &self.sort {
            pairs.push(("sort", sort.clone()));
        }
        if let Some(near) = self.near {
            pairs.push(("lat", near.latitude.to_string()));
            pairs.push(("lng", near.longitude.to_string()));
        }
        if let Some(radius) = self.radius_km {
            pairs.push(("radius", radius.to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_count: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostsResponse {
    #[serde(default)]
    pub posts: Vec<Listing>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostResponse {
    pub post: Option<Listing>,
}

/// Body of a create-listing request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingDraft {
    pub title: String,
    pub description: String,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    pub location: ListingLocation,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub email_or_phone: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserResponse {
    pub user: Option<UserProfile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_pairs_skip_unset() {
        let query = PostQuery {
            category: Some(Category::PickDrop),
            near: Some(Coordinates::new(51.5, -0.1)),
            radius_km: Some(20.0),
            ..Default::default()
        };

        assert_eq!(
            query.to_pairs(),
            vec![
                ("category", "pick-drop".to_string()),
                ("lat", "51.5".to_string()),
                ("lng", "-0.1".to_string()),
                ("radius", "20".to_string()),
            ]
        );
        assert!(PostQuery::default().to_pairs().is_empty());
    }

    #[test]
    fn test_query_sends_backend_category_names() {
        let query = PostQuery {
            category: Some(Category::Marketplace),
            ..Default::default()
        };
        assert_eq!(query.to_pairs(), vec![("category", "buy-sell".to_string())]);

        let query = PostQuery {
            category: Some(Category::Rideshare),
            ..Default::default()
        };
        assert_eq!(query.to_pairs(), vec![("category", "ridesharing".to_string())]);
    }

    #[test]
    fn test_draft_body_uses_backend_category_names() {
        let draft = ListingDraft {
            title: "Lift to Heathrow".to_string(),
            description: "Two seats".to_string(),
            category: Category::Rideshare,
            subcategory: None,
            price: None,
            location: ListingLocation {
                city: "Reading".to_string(),
                ..Default::default()
            },
        };

        let body = serde_json::to_value(&draft).unwrap();

        assert_eq!(body["category"], "ridesharing");
    }

    #[test]
    fn test_posts_response_survives_amountless_price_and_missing_author() {
        let body = r#"{"success":true,"posts":[
{"_id":"a1","price":{"currency":"USD","type":"fixed"},"title":"Free sofa","description":"Collect only","category":"buy-sell","location":{"city":"Leeds"},"author":null,"createdAt":"2025-09-01T12:00:00Z","updatedAt":"2025-09-01T12:00:00Z"},
{"_id":"a2","price":{"amount":40,"currency":"GBP","type":"fixed"},"title":"Desk","description":"","category":"buy-sell","location":{"city":"Leeds"},"author":{"_id":"u2","name":"Ade"},"createdAt":"2025-09-01T12:00:00Z","updatedAt":"2025-09-01T12:00:00Z"}
],"pagination":{"currentPage":1,"totalPages":1,"totalCount":2,"hasNextPage":false,"hasPrevPage":false}}"#;

        let parsed: PostsResponse = serde_json::from_str(body).unwrap();

        assert_eq!(parsed.posts.len(), 2);
        assert_eq!(parsed.posts[0].price, None);
        assert_eq!(parsed.posts[0].author.id, "");
        assert_eq!(parsed.posts[1].price.as_ref().map(|p| p.amount), Some(40.0));
        assert_eq!(parsed.posts[1].category, Category::Marketplace);
    }

    #[test]
    fn test_posts_response_tolerates_missing_fields() {
        let parsed: PostsResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(parsed.posts.is_empty());
        assert!(parsed.pagination.is_none());
    }
}
