//! Error types module
//!
//! All pipeline errors are unified under the `AppError` enum: configuration
//! and validation failures are fatal and never retried; rate-limit and
//! transport failures are recoverable and drive the clients' backoff loops;
//! every other non-2xx response is surfaced with its status code and raw
//! payload for diagnostics.

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Rate limited by {service}, retry after backoff")]
    RateLimited { service: &'static str },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{service} API error (status {status}): {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Primary upload failed: {0}")]
    PrimaryUploadFailed(String),
}

impl AppError {
    /// Get the error type name for logging and diagnostics
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Configuration(_) => "Configuration",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::RateLimited { .. } => "RateLimited",
            AppError::AuthenticationFailed(_) => "AuthenticationFailed",
            AppError::NotFound(_) => "NotFound",
            AppError::Transport(_) => "Transport",
            AppError::Api { .. } => "Api",
            AppError::PrimaryUploadFailed(_) => "PrimaryUploadFailed",
        }
    }

    /// Whether a caller may retry the failed call
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::RateLimited { .. } | AppError::Transport(_) | AppError::Api { .. }
        )
    }

    /// Classify a non-2xx response status into the error taxonomy.
    ///
    /// 429 is recoverable; 401 and 404 are fatal; anything else carries the
    /// status and raw payload.
    pub fn from_status(service: &'static str, status: u16, body: String) -> Self {
        match status {
            429 => AppError::RateLimited { service },
            401 => AppError::AuthenticationFailed(format!(
                "{} rejected the supplied credentials: {}",
                service, body
            )),
            404 => AppError::NotFound(format!("{} target not found: {}", service, body)),
            _ => AppError::Api {
                service,
                status,
                body,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_classification() {
        let err = AppError::from_status("Nyckel", 429, "slow down".to_string());
        assert_eq!(err.error_type(), "RateLimited");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_auth_failure_is_fatal() {
        let err = AppError::from_status("Nyckel", 401, "bad credentials".to_string());
        assert_eq!(err.error_type(), "AuthenticationFailed");
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("bad credentials"));
    }

    #[test]
    fn test_not_found_is_fatal() {
        let err = AppError::from_status("Nyckel", 404, "unknown function".to_string());
        assert_eq!(err.error_type(), "NotFound");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_generic_api_error_carries_status_and_payload() {
        let err = AppError::from_status("ImgBB", 503, "maintenance".to_string());
        assert_eq!(err.error_type(), "Api");
        assert!(err.is_recoverable());
        let rendered = err.to_string();
        assert!(rendered.contains("503"));
        assert!(rendered.contains("maintenance"));
    }

    #[test]
    fn test_configuration_error_is_fatal() {
        let err = AppError::Configuration("ImgBB API key is required".to_string());
        assert_eq!(err.error_type(), "Configuration");
        assert!(!err.is_recoverable());
    }
}
