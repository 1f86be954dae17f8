//! Bearer-credential cache for the secondary service.
//!
//! Tokens come from a client-credentials exchange and are valid for about
//! an hour; the cache serves them until five minutes before the reported
//! expiry, then re-exchanges. The cache is an owned, injectable object
//! guarded by a mutex so it stays correct on a multi-threaded runtime.

use std::time::{Duration, Instant};

use pixmirror_core::AppError;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::http::error_for_response;

/// Safety buffer subtracted from the server-reported token lifetime.
const EXPIRY_BUFFER_SECS: u64 = 300;

/// Client id and secret for the client-credentials grant.
#[derive(Debug, Clone)]
pub struct NyckelCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[allow(dead_code)]
    token_type: String,
    expires_in: u64,
}

#[derive(Debug)]
struct CachedToken {
    token: String,
    expires_at: Instant,
    client_id: String,
}

impl CachedToken {
    fn is_valid_for(&self, client_id: &str) -> bool {
        self.client_id == client_id && Instant::now() < self.expires_at
    }
}

/// Token cache: empty until first use, then either valid or expired.
///
/// The mutex is held across the exchange so concurrent callers cannot race
/// into duplicate token requests.
#[derive(Debug, Default)]
pub struct TokenCache {
    entry: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a valid bearer token, exchanging credentials when the cache
    /// is empty, expired, or owned by a different client id.
    pub(crate) async fn bearer_token(
        &self,
        client: &reqwest::Client,
        token_url: &str,
        credentials: Option<&NyckelCredentials>,
    ) -> Result<String, AppError> {
        let credentials = credentials.ok_or_else(|| {
            AppError::Configuration(
                "Nyckel credentials not found. Set NYCKEL_CLIENT_ID and NYCKEL_SECRET_KEY"
                    .to_string(),
            )
        })?;

        let mut entry = self.entry.lock().await;
        if let Some(cached) = entry.as_ref() {
            if cached.is_valid_for(&credentials.client_id) {
                tracing::debug!("Using cached Nyckel token");
                return Ok(cached.token.clone());
            }
        }

        tracing::debug!("Fetching new Nyckel token");
        let response = client
            .post(token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_for_response("Nyckel token endpoint", response).await);
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in.saturating_sub(EXPIRY_BUFFER_SECS));
        tracing::debug!(expires_in = token.expires_in, "Nyckel token cached");
        *entry = Some(CachedToken {
            token: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
            client_id: credentials.client_id.clone(),
        });
        Ok(token.access_token)
    }

    /// Drop any cached token (credential rotation, tests).
    pub async fn clear(&self) {
        *self.entry.lock().await = None;
        tracing::debug!("Nyckel token cache cleared");
    }
}
