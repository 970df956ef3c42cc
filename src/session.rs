//! Persisted sign-in state: bearer token and user profile.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::models::UserProfile;
use crate::storage::{self, KeyValueStore};

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user_info";

#[derive(Deserialize)]
struct Claims {
    exp: Option<i64>,
}

pub struct Session {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl Session {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn save(&self, token: &str, user: &UserProfile) -> storage::Result<()> {
        self.store.set(TOKEN_KEY, token.to_string()).await?;
        storage::set_json(self.store.as_ref(), USER_KEY, user).await?;
        info!(user = %user.id, "Signed in");
        Ok(())
    }

    pub async fn token(&self) -> Option<String> {
        match self.store.get(TOKEN_KEY).await {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read token");
                None
            }
        }
    }

    pub async fn user(&self) -> Option<UserProfile> {
        storage::get_json(self.store.as_ref(), USER_KEY)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to read user profile");
                None
            })
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token().await.is_some()
    }

    /// Missing, malformed or past-`exp` tokens all count as expired
    pub async fn is_token_expired(&self) -> bool {
        match self.token().await {
            Some(token) => match token_expiry(&token) {
                Some(exp) => exp < self.clock.now().timestamp(),
                None => true,
            },
            None => true,
        }
    }

    pub async fn logout(&self) -> storage::Result<()> {
        self.store.remove(TOKEN_KEY).await?;
        self.store.remove(USER_KEY).await?;
        info!("Signed out");
        Ok(())
    }

    /// Sign out if the stored token has expired. Returns true if it did.
    pub async fn check_expiry(&self) -> storage::Result<bool> {
        if self.is_authenticated().await && self.is_token_expired().await {
            self.logout().await?;
            return Ok(true);
        }
        Ok(false)
    }
}

/// `exp` claim of a JWT, without verifying the signature
pub fn token_expiry(token: &str) -> Option<i64> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice::<Claims>(&bytes).ok()?.exp
}
