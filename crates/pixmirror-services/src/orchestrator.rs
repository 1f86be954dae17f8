//! Dual-service upload orchestration.
//!
//! The primary store is the authoritative location for an asset; the
//! secondary index is an enrichment step. A primary failure aborts the
//! task before the secondary stage ever runs; a secondary failure degrades
//! the task to a partial success that still carries the real primary data.

use bytes::Bytes;
use pixmirror_core::models::{
    DeleteOutcome, DeleteResult, PrimaryOutcome, SecondaryOutcome, UploadResult,
};
use pixmirror_core::AppError;

use crate::imgbb::{extract_delete_hash, ImgbbClient, ImgbbUploadOptions};
use crate::nyckel::{NyckelClient, SampleUpload};

#[derive(Debug, Clone)]
pub struct DualUploader {
    imgbb: ImgbbClient,
    nyckel: NyckelClient,
    imgbb_expiration_seconds: Option<u64>,
}

impl DualUploader {
    pub fn new(imgbb: ImgbbClient, nyckel: NyckelClient) -> Self {
        Self {
            imgbb,
            nyckel,
            imgbb_expiration_seconds: None,
        }
    }

    /// Auto-expiration forwarded to the primary store on every upload.
    pub fn with_expiration(mut self, seconds: Option<u64>) -> Self {
        self.imgbb_expiration_seconds = seconds;
        self
    }

    /// Upload one image to the primary store, then index the same bytes in
    /// the secondary service under `image_name` as the external id.
    pub async fn upload(&self, image: Bytes, image_name: &str) -> Result<UploadResult, AppError> {
        tracing::info!(image_name, "Uploading image to primary store");
        let options = ImgbbUploadOptions {
            name: Some(image_name.to_string()),
            expiration_seconds: self.imgbb_expiration_seconds,
        };
        let response = self
            .imgbb
            .upload(image.clone(), &options)
            .await
            .map_err(|e| AppError::PrimaryUploadFailed(e.to_string()))?;
        if !response.success {
            return Err(AppError::PrimaryUploadFailed(format!(
                "primary store reported status {}",
                response.status
            )));
        }

        let delete_hash = extract_delete_hash(&response.data.delete_url);
        tracing::info!(image_name, %delete_hash, "Primary upload succeeded");
        let primary = PrimaryOutcome {
            success: true,
            image_url: response.data.url.clone(),
            delete_hash,
            thumbnail_url: response.data.thumb.as_ref().map(|t| t.url.clone()),
        };

        tracing::info!(image_name, "Indexing image in secondary service");
        let sample = SampleUpload {
            data: Some(image),
            external_id: Some(image_name.to_string()),
            ..Default::default()
        };
        let secondary = match self.nyckel.upload_sample(&sample).await {
            Ok(created) => SecondaryOutcome {
                success: true,
                sample_id: Some(created.id),
                external_id: created.external_id,
            },
            Err(error) => {
                tracing::warn!(
                    image_name,
                    error = %error,
                    "Secondary index upload failed, keeping primary result"
                );
                SecondaryOutcome::default()
            }
        };

        Ok(UploadResult {
            image_name: image_name.to_string(),
            primary,
            secondary,
        })
    }

    /// Best-effort removal from both services. Each side's outcome is
    /// recorded independently; neither side's failure propagates.
    pub async fn delete(
        &self,
        image_name: &str,
        delete_hash: &str,
        sample_id: Option<&str>,
    ) -> DeleteResult {
        tracing::info!(image_name, delete_hash, "Deleting image from primary store");
        let primary = match self.imgbb.delete(delete_hash).await {
            Ok(response) => DeleteOutcome {
                success: response.success,
                message: response.message,
            },
            Err(error) => {
                tracing::warn!(image_name, error = %error, "Primary delete failed");
                DeleteOutcome {
                    success: false,
                    message: Some(error.to_string()),
                }
            }
        };

        let secondary = match sample_id {
            Some(id) => {
                tracing::info!(image_name, sample_id = id, "Deleting sample from secondary service");
                match self.nyckel.delete_sample(None, id).await {
                    Ok(()) => DeleteOutcome {
                        success: true,
                        message: None,
                    },
                    Err(error) => {
                        tracing::warn!(image_name, error = %error, "Secondary delete failed");
                        DeleteOutcome {
                            success: false,
                            message: Some(error.to_string()),
                        }
                    }
                }
            }
            None => DeleteOutcome {
                success: false,
                message: Some("no sample id recorded for this image".to_string()),
            },
        };

        DeleteResult {
            image_name: image_name.to_string(),
            primary,
            secondary,
        }
    }
}
