//! Configuration module
//!
//! Environment-driven configuration for the upload pipeline: primary store
//! credentials, secondary service credentials and function id, and the
//! batch rate-limit settings.
//!
//! The secondary service's client id and secret are deliberately optional
//! here: their absence only becomes an error at token-exchange time, so the
//! primary-store half of the pipeline stays usable without them.

use std::env;
use std::time::Duration;

use crate::models::BatchConfig;
use crate::retry::{Backoff, RetryPolicy};

// Common constants
const MAX_CONCURRENT: usize = 4;
const INTER_TASK_DELAY_MS: u64 = 3000;
const MAX_RETRIES: u32 = 5;
const RETRY_BASE_DELAY_MS: u64 = 5000;

/// Application configuration (upload pipeline).
#[derive(Clone, Debug)]
pub struct Config {
    /// Primary store API key. May be empty; the client rejects uploads
    /// with an empty key before any network call.
    pub imgbb_api_key: String,
    /// Optional auto-expiration for uploaded assets, in seconds.
    pub imgbb_expiration_seconds: Option<u64>,
    pub nyckel_client_id: Option<String>,
    pub nyckel_client_secret: Option<String>,
    pub nyckel_function_id: Option<String>,
    pub max_concurrent: usize,
    pub inter_task_delay_ms: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let config = Config {
            imgbb_api_key: env::var("IMGBB_API_KEY").unwrap_or_default(),
            imgbb_expiration_seconds: env::var("IMGBB_EXPIRATION_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok()),
            nyckel_client_id: env::var("NYCKEL_CLIENT_ID").ok().filter(|s| !s.is_empty()),
            nyckel_client_secret: env::var("NYCKEL_SECRET_KEY").ok().filter(|s| !s.is_empty()),
            nyckel_function_id: env::var("NYCKEL_FUNCTION_ID").ok().filter(|s| !s.is_empty()),
            max_concurrent: env::var("UPLOAD_MAX_CONCURRENT")
                .unwrap_or_else(|_| MAX_CONCURRENT.to_string())
                .parse()
                .unwrap_or(MAX_CONCURRENT),
            inter_task_delay_ms: env::var("UPLOAD_INTER_TASK_DELAY_MS")
                .unwrap_or_else(|_| INTER_TASK_DELAY_MS.to_string())
                .parse()
                .unwrap_or(INTER_TASK_DELAY_MS),
            max_retries: env::var("UPLOAD_MAX_RETRIES")
                .unwrap_or_else(|_| MAX_RETRIES.to_string())
                .parse()
                .unwrap_or(MAX_RETRIES),
            retry_base_delay_ms: env::var("UPLOAD_RETRY_BASE_DELAY_MS")
                .unwrap_or_else(|_| RETRY_BASE_DELAY_MS.to_string())
                .parse()
                .unwrap_or(RETRY_BASE_DELAY_MS),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_concurrent == 0 {
            return Err(anyhow::anyhow!("UPLOAD_MAX_CONCURRENT must be at least 1"));
        }

        // Credentials come in pairs; one half alone is a misconfiguration.
        if self.nyckel_client_id.is_some() != self.nyckel_client_secret.is_some() {
            return Err(anyhow::anyhow!(
                "NYCKEL_CLIENT_ID and NYCKEL_SECRET_KEY must be set together"
            ));
        }

        Ok(())
    }

    /// Linear-backoff retry policy for the primary store.
    pub fn primary_retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.retry_base_delay_ms),
            Backoff::Linear,
        )
    }

    /// Exponential-backoff retry policy for the secondary service's rate
    /// limits.
    pub fn secondary_retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.retry_base_delay_ms),
            Backoff::Exponential,
        )
    }

    pub fn batch(&self) -> BatchConfig {
        BatchConfig {
            max_concurrent: self.max_concurrent,
            inter_task_delay: Duration::from_millis(self.inter_task_delay_ms),
            max_retries: self.max_retries,
            retry_base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }
}
