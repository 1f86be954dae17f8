//! Pixmirror Core Library
//!
//! This crate provides the domain models, error types, configuration, and
//! retry policies shared across all pixmirror components.

pub mod config;
pub mod error;
pub mod models;
pub mod retry;

// Re-export commonly used types
pub use config::Config;
pub use error::AppError;
pub use models::{
    BatchConfig, DeleteOutcome, DeleteResult, PrimaryOutcome, SecondaryOutcome, UploadResult,
    UploadTask,
};
pub use retry::{Backoff, RetryPolicy};
