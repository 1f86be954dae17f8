//! Secondary image-index service client (Nyckel).
//!
//! Every call is authenticated with a bearer token from the credential
//! cache. Rate-limit responses are retried with exponential backoff;
//! authentication failures and unknown function ids are fatal.

mod token;

pub use token::{NyckelCredentials, TokenCache};

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use pixmirror_core::{AppError, RetryPolicy};
use serde::{Deserialize, Serialize};

use crate::http::error_for_response;

const NYCKEL_API_BASE: &str = "https://www.nyckel.com";
const SERVICE: &str = "Nyckel";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Input for one sample upload. Exactly one of `data` or `url` must be
/// supplied; the external id becomes the correlation key back to the
/// primary store's logical name.
#[derive(Debug, Clone, Default)]
pub struct SampleUpload {
    pub data: Option<Bytes>,
    pub url: Option<String>,
    pub external_id: Option<String>,
    /// Overrides the client's default function id.
    pub function_id: Option<String>,
}

/// A created sample as returned by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NyckelSample {
    pub id: String,
    pub data: String,
    #[serde(rename = "externalId", skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NyckelClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<NyckelCredentials>,
    function_id: Option<String>,
    token_cache: Arc<TokenCache>,
    retry: RetryPolicy,
}

impl NyckelClient {
    pub fn new(
        credentials: Option<NyckelCredentials>,
        function_id: Option<String>,
        token_cache: Arc<TokenCache>,
        retry: RetryPolicy,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            base_url: NYCKEL_API_BASE.to_string(),
            credentials,
            function_id,
            token_cache,
            retry,
        }
    }

    /// Overrides the base URL (for tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// The injectable token cache backing this client.
    pub fn token_cache(&self) -> &Arc<TokenCache> {
        &self.token_cache
    }

    fn token_url(&self) -> String {
        format!("{}/connect/token", self.base_url)
    }

    fn function_id_or_default<'a>(
        &'a self,
        explicit: Option<&'a str>,
    ) -> Result<&'a str, AppError> {
        explicit
            .or(self.function_id.as_deref())
            .ok_or_else(|| {
                AppError::Configuration(
                    "Nyckel function id is required. Set NYCKEL_FUNCTION_ID".to_string(),
                )
            })
    }

    /// Create one sample, retrying rate-limit responses with exponential
    /// backoff until the retry budget is spent.
    pub async fn upload_sample(&self, upload: &SampleUpload) -> Result<NyckelSample, AppError> {
        match (&upload.data, &upload.url) {
            (None, None) => {
                return Err(AppError::InvalidInput(
                    "Either image data or a URL reference must be provided".to_string(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(AppError::InvalidInput(
                    "Cannot provide both image data and a URL reference".to_string(),
                ))
            }
            _ => {}
        }

        let function_id = self.function_id_or_default(upload.function_id.as_deref())?;
        let url = format!("{}/v1/functions/{}/samples", self.base_url, function_id);

        let mut attempt = 0u32;
        loop {
            match self.try_upload_sample(&url, upload).await {
                Ok(sample) => return Ok(sample),
                Err(error @ AppError::RateLimited { .. }) => {
                    if attempt >= self.retry.max_retries {
                        tracing::error!(function_id, "Nyckel rate limit persisted past retry budget");
                        return Err(error);
                    }
                    let wait = self.retry.delay_for_attempt(attempt);
                    tracing::warn!(
                        function_id,
                        attempt = attempt + 1,
                        max_retries = self.retry.max_retries,
                        wait_ms = wait.as_millis() as u64,
                        "Nyckel rate limit hit, backing off"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn try_upload_sample(
        &self,
        url: &str,
        upload: &SampleUpload,
    ) -> Result<NyckelSample, AppError> {
        let token = self
            .token_cache
            .bearer_token(&self.client, &self.token_url(), self.credentials.as_ref())
            .await?;

        let request = self.client.post(url).bearer_auth(&token);
        let request = if let Some(data) = &upload.data {
            let file_name = upload
                .external_id
                .clone()
                .unwrap_or_else(|| "image".to_string());
            let mut form = reqwest::multipart::Form::new().part(
                "data",
                reqwest::multipart::Part::bytes(data.to_vec()).file_name(file_name),
            );
            if let Some(external_id) = &upload.external_id {
                form = form.text("externalId", external_id.clone());
            }
            request.multipart(form)
        } else {
            // URL references go as JSON instead of multipart.
            let mut body = serde_json::json!({ "data": upload.url.as_deref().unwrap_or_default() });
            if let Some(external_id) = &upload.external_id {
                body["externalId"] = serde_json::Value::String(external_id.clone());
            }
            request.json(&body)
        };

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(error_for_response(SERVICE, response).await);
        }
        response
            .json::<NyckelSample>()
            .await
            .map_err(AppError::from)
    }

    /// Remove a sample from the index. Not retried; deletes are issued once
    /// and classified like any other call.
    pub async fn delete_sample(
        &self,
        function_id: Option<&str>,
        sample_id: &str,
    ) -> Result<(), AppError> {
        if sample_id.is_empty() {
            return Err(AppError::InvalidInput("Sample id is required".to_string()));
        }
        let function_id = self.function_id_or_default(function_id)?;
        let token = self
            .token_cache
            .bearer_token(&self.client, &self.token_url(), self.credentials.as_ref())
            .await?;

        let url = format!(
            "{}/v1/functions/{}/samples/{}",
            self.base_url, function_id, sample_id
        );
        let response = self.client.delete(&url).bearer_auth(&token).send().await?;
        if !response.status().is_success() {
            return Err(error_for_response(SERVICE, response).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixmirror_core::Backoff;
    use serde_json::json;
    use std::time::Instant;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str, base_delay_ms: u64, max_retries: u32) -> NyckelClient {
        NyckelClient::new(
            Some(NyckelCredentials {
                client_id: "client-1".to_string(),
                client_secret: "secret-1".to_string(),
            }),
            Some("func123".to_string()),
            Arc::new(TokenCache::new()),
            RetryPolicy::new(
                max_retries,
                Duration::from_millis(base_delay_ms),
                Backoff::Exponential,
            ),
        )
        .with_base_url(base_url.to_string())
    }

    fn token_body(expires_in: u64) -> serde_json::Value {
        json!({
            "access_token": "test-token",
            "token_type": "Bearer",
            "expires_in": expires_in
        })
    }

    fn sample_body() -> serde_json::Value {
        json!({
            "id": "sample-42",
            "data": "https://i.ibb.co/abc/cover.jpg",
            "externalId": "cover"
        })
    }

    async fn mount_token(server: &MockServer, expect: u64, expires_in: u64) {
        Mock::given(method("POST"))
            .and(path("/connect/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body(expires_in)))
            .expect(expect)
            .mount(server)
            .await;
    }

    fn file_upload() -> SampleUpload {
        SampleUpload {
            data: Some(Bytes::from_static(b"fake-image")),
            external_id: Some("cover".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_rejects_missing_input() {
        let client = test_client("http://unused.invalid", 1, 5);
        let err = client.upload_sample(&SampleUpload::default()).await.unwrap_err();
        assert_eq!(err.error_type(), "InvalidInput");
    }

    #[tokio::test]
    async fn test_rejects_both_inputs() {
        let client = test_client("http://unused.invalid", 1, 5);
        let upload = SampleUpload {
            data: Some(Bytes::from_static(b"img")),
            url: Some("https://example.com/a.jpg".to_string()),
            ..Default::default()
        };
        let err = client.upload_sample(&upload).await.unwrap_err();
        assert_eq!(err.error_type(), "InvalidInput");
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_at_exchange_time() {
        let client = NyckelClient::new(
            None,
            Some("func123".to_string()),
            Arc::new(TokenCache::new()),
            RetryPolicy::new(5, Duration::from_millis(1), Backoff::Exponential),
        );
        let err = client.upload_sample(&file_upload()).await.unwrap_err();
        assert_eq!(err.error_type(), "Configuration");
    }

    #[tokio::test]
    async fn test_missing_function_id_is_configuration_error() {
        let client = NyckelClient::new(
            Some(NyckelCredentials {
                client_id: "client-1".to_string(),
                client_secret: "secret-1".to_string(),
            }),
            None,
            Arc::new(TokenCache::new()),
            RetryPolicy::new(5, Duration::from_millis(1), Backoff::Exponential),
        );
        let err = client.upload_sample(&file_upload()).await.unwrap_err();
        assert_eq!(err.error_type(), "Configuration");
    }

    #[tokio::test]
    async fn test_token_cached_across_uploads() {
        let server = MockServer::start().await;
        mount_token(&server, 1, 3600).await;
        Mock::given(method("POST"))
            .and(path("/v1/functions/func123/samples"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_body()))
            .expect(2)
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 1, 5);
        client.upload_sample(&file_upload()).await.unwrap();
        client.upload_sample(&file_upload()).await.unwrap();
        // expect(1) on the token mock verifies a single exchange.
    }

    #[tokio::test]
    async fn test_expired_token_triggers_single_new_exchange() {
        let server = MockServer::start().await;
        // expires_in equal to the safety buffer leaves a zero lifetime, so
        // the second upload must re-exchange.
        mount_token(&server, 2, 300).await;
        Mock::given(method("POST"))
            .and(path("/v1/functions/func123/samples"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_body()))
            .expect(2)
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 1, 5);
        client.upload_sample(&file_upload()).await.unwrap();
        client.upload_sample(&file_upload()).await.unwrap();
    }

    #[tokio::test]
    async fn test_clear_forces_new_exchange() {
        let server = MockServer::start().await;
        mount_token(&server, 2, 3600).await;
        Mock::given(method("POST"))
            .and(path("/v1/functions/func123/samples"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_body()))
            .expect(2)
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 1, 5);
        client.upload_sample(&file_upload()).await.unwrap();
        client.token_cache().clear().await;
        client.upload_sample(&file_upload()).await.unwrap();
    }

    #[tokio::test]
    async fn test_rate_limit_retried_with_exponential_backoff() {
        let server = MockServer::start().await;
        mount_token(&server, 1, 3600).await;
        Mock::given(method("POST"))
            .and(path("/v1/functions/func123/samples"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/functions/func123/samples"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_body()))
            .expect(1)
            .mount(&server)
            .await;

        let base_delay_ms = 20;
        let client = test_client(&server.uri(), base_delay_ms, 5);
        let started = Instant::now();
        let sample = client.upload_sample(&file_upload()).await.unwrap();
        assert_eq!(sample.id, "sample-42");
        assert_eq!(sample.external_id.as_deref(), Some("cover"));
        // Two backoffs: base, then 2x base.
        assert!(started.elapsed() >= Duration::from_millis(3 * base_delay_ms));
    }

    #[tokio::test]
    async fn test_rate_limit_surfaced_after_retry_budget() {
        let server = MockServer::start().await;
        mount_token(&server, 1, 3600).await;
        Mock::given(method("POST"))
            .and(path("/v1/functions/func123/samples"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 1, 2);
        let err = client.upload_sample(&file_upload()).await.unwrap_err();
        assert_eq!(err.error_type(), "RateLimited");
    }

    #[tokio::test]
    async fn test_authentication_failure_not_retried() {
        let server = MockServer::start().await;
        mount_token(&server, 1, 3600).await;
        Mock::given(method("POST"))
            .and(path("/v1/functions/func123/samples"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 1, 5);
        let err = client.upload_sample(&file_upload()).await.unwrap_err();
        assert_eq!(err.error_type(), "AuthenticationFailed");
    }

    #[tokio::test]
    async fn test_unknown_function_not_retried() {
        let server = MockServer::start().await;
        mount_token(&server, 1, 3600).await;
        Mock::given(method("POST"))
            .and(path("/v1/functions/func123/samples"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such function"))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 1, 5);
        let err = client.upload_sample(&file_upload()).await.unwrap_err();
        assert_eq!(err.error_type(), "NotFound");
    }

    #[tokio::test]
    async fn test_url_reference_sent_as_json() {
        let server = MockServer::start().await;
        mount_token(&server, 1, 3600).await;
        Mock::given(method("POST"))
            .and(path("/v1/functions/func123/samples"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 1, 5);
        let upload = SampleUpload {
            url: Some("https://i.ibb.co/abc/cover.jpg".to_string()),
            external_id: Some("cover".to_string()),
            ..Default::default()
        };
        client.upload_sample(&upload).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_sample_issues_authenticated_delete() {
        let server = MockServer::start().await;
        mount_token(&server, 1, 3600).await;
        Mock::given(method("DELETE"))
            .and(path("/v1/functions/func123/samples/sample-42"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 1, 5);
        client.delete_sample(None, "sample-42").await.unwrap();
    }
}
