pub mod client;
pub mod types;

pub use client::ApiClient;
pub use types::{
    AuthResponse, Credentials, ListingDraft, Pagination, PostQuery, PostsResponse, Registration,
};
