//! Outcome classification for outbound calls.
//!
//! One response is classified as transport error, application error with
//! status code, or success with payload. Retries are a caller concern.

use pixmirror_core::AppError;

/// Consume a non-2xx response and map it into the error taxonomy.
pub(crate) async fn error_for_response(
    service: &'static str,
    response: reqwest::Response,
) -> AppError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    AppError::from_status(service, status, body)
}
