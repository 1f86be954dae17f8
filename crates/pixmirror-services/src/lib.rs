//! Pixmirror Services – clients for the primary image store (ImgBB) and the
//! secondary image-index service (Nyckel), plus the dual-service
//! orchestrator that chains them.
//!
//! The primary store is the authoritative location for an asset; the
//! secondary service enriches it with a function-scoped sample for image
//! search. The orchestrator encodes that asymmetry: primary failure aborts
//! a task, secondary failure degrades it to a partial success.

mod http;
pub mod imgbb;
pub mod nyckel;
pub mod orchestrator;

pub use imgbb::{
    extract_delete_hash, ImgbbClient, ImgbbDeleteResponse, ImgbbUploadOptions, ImgbbUploadResponse,
};
pub use nyckel::{NyckelClient, NyckelCredentials, NyckelSample, SampleUpload, TokenCache};
pub use orchestrator::DualUploader;
