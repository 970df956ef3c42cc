use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::api::types::{
    AuthResponse, Credentials, ListingDraft, PostQuery, PostResponse, PostsResponse, Registration,
    UserResponse,
};
use crate::error::{ApiError, FieldError};
use crate::listings::ListingSource;
use crate::models::{Listing, ListingPatch, UserProfile};
use crate::session::Session;

/// Page size used when pulling the full listing set
const FETCH_ALL_PAGE_SIZE: u32 = 100;
const FETCH_ALL_MAX_PAGES: u32 = 50;

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
    errors: Option<Vec<Value>>,
}

/// REST client for the marketplace backend
///
/// Every call goes through `request`, which attaches the session's bearer
/// token when there is one and turns error responses into `ApiError`.
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Option<Arc<Session>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: None,
        })
    }

    pub fn with_session(mut self, session: Arc<Session>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&'static str, String)],
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Default,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(%method, %url, "API request");

        let mut builder = self
            .client
            .request(method, &url)
            .header(ACCEPT, "application/json");
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(session) = &self.session {
            if let Some(token) = session.token().await {
                builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
            }
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = error_from_body(status, &text);
            warn!(status = status.as_u16(), error = %err, %url, "API request failed");
            return Err(err);
        }

        decode_success(response).await
    }

    async fn get<T: DeserializeOwned + Default>(
        &self,
        endpoint: &str,
        query: &[(&'static str, String)],
    ) -> Result<T, ApiError> {
        self.request::<T, ()>(Method::GET, endpoint, query, None).await
    }

    pub async fn health_check(&self) -> Result<Value, ApiError> {
        self.get("/health", &[]).await
    }

    pub async fn get_posts(&self, query: &PostQuery) -> Result<PostsResponse, ApiError> {
        self.get("/api/posts", &query.to_pairs()).await
    }

    pub async fn get_post(&self, id: &str) -> Result<Listing, ApiError> {
        let response: PostResponse = self.get(&format!("/api/posts/{id}"), &[]).await?;
        response.post.ok_or_else(|| missing("post"))
    }

    pub async fn my_posts(&self) -> Result<PostsResponse, ApiError> {
        self.get("/api/posts/my-posts", &[]).await
    }

    pub async fn create_post(&self, draft: &ListingDraft) -> Result<Listing, ApiError> {
        let response: PostResponse = self
            .request(Method::POST, "/api/posts", &[], Some(draft))
            .await?;
        response.post.ok_or_else(|| missing("post"))
    }

    pub async fn update_post(&self, id: &str, patch: &ListingPatch) -> Result<Listing, ApiError> {
        let response: PostResponse = self
            .request(Method::PUT, &format!("/api/posts/{id}"), &[], Some(patch))
            .await?;
        response.post.ok_or_else(|| missing("post"))
    }

    pub async fn delete_post(&self, id: &str) -> Result<(), ApiError> {
        let _: Value = self
            .request::<Value, ()>(Method::DELETE, &format!("/api/posts/{id}"), &[], None)
            .await?;
        Ok(())
    }

    /// Sign in and persist the returned token and profile in the session
    pub async fn login(&self, email_or_phone: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let credentials = Credentials {
            email_or_phone: email_or_phone.to_string(),
            password: password.to_string(),
        };
        let response: AuthResponse = self
            .request(Method::POST, "/api/auth/login", &[], Some(&credentials))
            .await?;
        self.remember(&response).await;
        Ok(response)
    }

    pub async fn register(&self, registration: &Registration) -> Result<AuthResponse, ApiError> {
        let response: AuthResponse = self
            .request(Method::POST, "/api/auth/register", &[], Some(registration))
            .await?;
        self.remember(&response).await;
        Ok(response)
    }

    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        let response: UserResponse = self.get("/api/auth/me", &[]).await?;
        response.user.ok_or_else(|| missing("user"))
    }

    async fn remember(&self, response: &AuthResponse) {
        let (Some(session), Some(user)) = (&self.session, &response.user) else {
            return;
        };
        if response.token.is_empty() {
            return;
        }
        if let Err(e) = session.save(&response.token, user).await {
            warn!(error = %e, "Failed to persist session");
        }
    }
}

#[async_trait]
impl ListingSource for ApiClient {
    /// Walk every page of `GET /api/posts` without filters
    async fn fetch_all(&self) -> Result<Vec<Listing>, ApiError> {
        collect_pages(|page| {
            let query = PostQuery {
                page: Some(page),
                limit: Some(FETCH_ALL_PAGE_SIZE),
                ..Default::default()
            };
            async move { self.get_posts(&query).await }
        })
        .await
    }
}

/// Concatenate pages from 1 until `hasNextPage` is false or the page cap
///
/// A response without `pagination` is the last page.
async fn collect_pages<F, Fut>(mut fetch_page: F) -> Result<Vec<Listing>, ApiError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<PostsResponse, ApiError>>,
{
    let mut listings = Vec::new();
    let mut page = 1;

    loop {
        let response = fetch_page(page).await?;
        listings.extend(response.posts);

        let has_next = response
            .pagination
            .map_or(false, |pagination| pagination.has_next_page);
        if !has_next {
            break;
        }
        if page >= FETCH_ALL_MAX_PAGES {
            warn!(
                pages = page,
                count = listings.len(),
                "Page limit reached, listing set is truncated"
            );
            break;
        }
        page += 1;
    }

    debug!(count = listings.len(), pages = page, "Fetched all listings");
    Ok(listings)
}

fn missing(field: &str) -> ApiError {
    ApiError::Decode(serde::de::Error::custom(format!(
        "response is missing `{field}`"
    )))
}

/// 204 and non-JSON bodies decode to the empty value
async fn decode_success<T: DeserializeOwned + Default>(response: Response) -> Result<T, ApiError> {
    if response.status() == StatusCode::NO_CONTENT {
        return Ok(T::default());
    }

    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v.contains("application/json"));
    if !is_json {
        return Ok(T::default());
    }

    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Ok(T::default());
    }
    Ok(serde_json::from_slice(&bytes)?)
}

/// Build an `HttpStatus` error from a backend error body
///
/// The message comes from `message`, then `error`, then a generic status
/// line; each entry of `errors` is appended on its own line.
pub fn error_from_body(status: StatusCode, body: &str) -> ApiError {
    let generic = format!("HTTP error! status: {}", status.as_u16());

    let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) else {
        return ApiError::HttpStatus {
            status: status.as_u16(),
            message: generic,
            errors: Vec::new(),
        };
    };

    let errors: Vec<FieldError> = parsed
        .errors
        .unwrap_or_default()
        .iter()
        .map(field_error)
        .collect();

    let mut message = parsed.message.or(parsed.error).unwrap_or(generic);
    for e in &errors {
        message.push('\n');
        message.push_str(&e.message);
    }

    ApiError::HttpStatus {
        status: status.as_u16(),
        message,
        errors,
    }
}

fn field_error(value: &Value) -> FieldError {
    let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);

    FieldError {
        field: text("path").or_else(|| text("param")).or_else(|| text("field")),
        message: text("msg")
            .or_else(|| text("message"))
            .unwrap_or_else(|| value.to_string()),
    }
}
