//! Core domain models

pub mod batch;
pub mod upload;

pub use batch::BatchConfig;
pub use upload::{
    DeleteOutcome, DeleteResult, PrimaryOutcome, SecondaryOutcome, UploadResult, UploadTask,
};
