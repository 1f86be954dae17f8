//! Primary image store client (ImgBB).
//!
//! Uploads one binary image per call and extracts the deletion token from
//! the returned delete URL. Transport and application failures are both
//! retried with linear backoff; the last error surfaces once the retry
//! budget is spent.

use bytes::Bytes;
use pixmirror_core::{AppError, RetryPolicy};
use serde::Deserialize;

use crate::http::error_for_response;

const IMGBB_API_BASE: &str = "https://api.imgbb.com";
const SERVICE: &str = "ImgBB";

/// Optional upload parameters forwarded to the store.
#[derive(Debug, Clone, Default)]
pub struct ImgbbUploadOptions {
    /// Logical name recorded with the asset.
    pub name: Option<String>,
    /// Auto-expiration in seconds.
    pub expiration_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImgbbUploadResponse {
    pub data: ImgbbImageData,
    pub success: bool,
    pub status: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImgbbImageData {
    pub url: String,
    pub delete_url: String,
    #[serde(default)]
    pub thumb: Option<ImgbbThumb>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImgbbThumb {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImgbbDeleteResponse {
    pub success: bool,
    pub status: u16,
    #[serde(default)]
    pub message: Option<String>,
}

/// Deletion token: the segment after the last `/` of the delete URL. This
/// is the only handle a later explicit delete can use.
pub fn extract_delete_hash(delete_url: &str) -> String {
    delete_url
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

#[derive(Debug, Clone)]
pub struct ImgbbClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl ImgbbClient {
    pub fn new(api_key: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: IMGBB_API_BASE.to_string(),
            api_key: api_key.into(),
            retry,
        }
    }

    /// Overrides the base URL (for tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Upload one image, retrying failures with linear backoff.
    pub async fn upload(
        &self,
        image: Bytes,
        options: &ImgbbUploadOptions,
    ) -> Result<ImgbbUploadResponse, AppError> {
        if self.api_key.is_empty() {
            return Err(AppError::Configuration(
                "ImgBB API key is required".to_string(),
            ));
        }

        let url = format!("{}/1/upload", self.base_url);
        let mut attempt = 0u32;
        loop {
            match self.try_upload(&url, image.clone(), options).await {
                Ok(response) => return Ok(response),
                Err(error) if attempt < self.retry.max_retries => {
                    let wait = self.retry.delay_for_attempt(attempt);
                    tracing::warn!(
                        error = %error,
                        attempt = attempt + 1,
                        max_retries = self.retry.max_retries,
                        wait_ms = wait.as_millis() as u64,
                        "ImgBB upload failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(error) => {
                    tracing::error!(error = %error, "ImgBB upload failed after retries");
                    return Err(error);
                }
            }
        }
    }

    async fn try_upload(
        &self,
        url: &str,
        image: Bytes,
        options: &ImgbbUploadOptions,
    ) -> Result<ImgbbUploadResponse, AppError> {
        let file_name = options.name.clone().unwrap_or_else(|| "image".to_string());
        let mut form = reqwest::multipart::Form::new()
            .text("key", self.api_key.clone())
            .part(
                "image",
                reqwest::multipart::Part::bytes(image.to_vec()).file_name(file_name),
            );
        if let Some(name) = &options.name {
            form = form.text("name", name.clone());
        }
        if let Some(expiration) = options.expiration_seconds {
            form = form.text("expiration", expiration.to_string());
        }

        let response = self.client.post(url).multipart(form).send().await?;
        if !response.status().is_success() {
            return Err(error_for_response(SERVICE, response).await);
        }
        response
            .json::<ImgbbUploadResponse>()
            .await
            .map_err(AppError::from)
    }

    /// Remove a previously uploaded asset by its delete hash.
    ///
    /// A rejected delete is reported as `success: false` rather than an
    /// error; only transport failures propagate.
    pub async fn delete(&self, delete_hash: &str) -> Result<ImgbbDeleteResponse, AppError> {
        if self.api_key.is_empty() {
            return Err(AppError::Configuration(
                "ImgBB API key is required".to_string(),
            ));
        }
        if delete_hash.is_empty() {
            return Err(AppError::InvalidInput("Delete hash is required".to_string()));
        }

        let url = format!(
            "{}/1/image/{}?key={}",
            self.base_url, delete_hash, self.api_key
        );
        let response = self.client.delete(&url).send().await?;
        let status = response.status();
        if status.is_success() {
            response
                .json::<ImgbbDeleteResponse>()
                .await
                .map_err(AppError::from)
        } else {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "ImgBB delete rejected");
            Ok(ImgbbDeleteResponse {
                success: false,
                status: status.as_u16(),
                message: if body.is_empty() { None } else { Some(body) },
            })
        }
    }
}
