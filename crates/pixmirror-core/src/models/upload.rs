//! Upload task and result records.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// One logical image queued for the dual-service pipeline.
///
/// Consumed exactly once by the batch queue.
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub data: Bytes,
    pub name: String,
}

impl UploadTask {
    pub fn new(data: impl Into<Bytes>, name: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            name: name.into(),
        }
    }
}

/// Outcome of the primary-store stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryOutcome {
    pub success: bool,
    pub image_url: String,
    /// Opaque token required to later remove the asset, derived from the
    /// last path segment of the store's delete URL.
    pub delete_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

/// Outcome of the secondary-index stage.
///
/// Defaults to `success: false` with no identifiers, which is what a
/// partial result carries when indexing failed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecondaryOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

/// Combined per-image result returned to batch callers. Never mutated
/// after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResult {
    pub image_name: String,
    pub primary: PrimaryOutcome,
    pub secondary: SecondaryOutcome,
}

/// Per-service outcome of a best-effort dual delete.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Combined result of removing one image from both services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResult {
    pub image_name: String,
    pub primary: DeleteOutcome,
    pub secondary: DeleteOutcome,
}
