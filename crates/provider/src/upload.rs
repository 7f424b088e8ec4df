//! Two-phase training image upload.
//!
//! Phase one asks the provider for a presigned upload target; phase two
//! posts the image bytes as a multipart form directly to that target (the
//! provider's object store, not its API, so no auth header). The presigned
//! form fields must precede the file part or the store rejects the upload.

use std::sync::Arc;

use crate::api::{ProviderApi, ProviderApiError};

/// File extensions the provider accepts for training images.
const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// Errors from the upload pipeline.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The filename has no extension or one the provider rejects.
    #[error("unsupported image extension for {0:?} (want png/jpg/jpeg/webp)")]
    UnsupportedExtension(String),

    /// Phase one (presign) failed.
    #[error(transparent)]
    Provider(#[from] ProviderApiError),

    /// Phase two (object store POST) failed at the transport level.
    #[error("upload transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The object store rejected the presigned form.
    #[error("object store rejected upload with status {status}")]
    Rejected { status: u16 },
}

/// Uploads training images into provider datasets.
pub struct DatasetUploader {
    api: Arc<ProviderApi>,
}

impl DatasetUploader {
    pub fn new(api: Arc<ProviderApi>) -> Self {
        Self { api }
    }

    /// Upload one image into `dataset_id`. Returns the provider image id.
    pub async fn upload_training_image(
        &self,
        dataset_id: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<String, UploadError> {
        let extension = file_extension(filename)
            .ok_or_else(|| UploadError::UnsupportedExtension(filename.to_string()))?;

        let presigned = self.api.init_dataset_upload(dataset_id, &extension).await?;
        tracing::debug!(
            dataset_id,
            image_id = %presigned.image_id,
            bytes = bytes.len(),
            "Obtained presigned upload target",
        );

        let mut form = reqwest::multipart::Form::new();
        for (key, value) in presigned.fields {
            form = form.text(key, value);
        }
        form = form.part(
            "file",
            reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string()),
        );

        // Presigned target: intentionally no bearer auth.
        let response = self.api.client.post(&presigned.url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Rejected {
                status: status.as_u16(),
            });
        }

        tracing::info!(dataset_id, image_id = %presigned.image_id, "Training image uploaded");
        Ok(presigned.image_id)
    }

    /// Register an already-hosted reference image by URL.
    pub async fn upload_reference_image(&self, image_url: &str) -> Result<String, UploadError> {
        Ok(self.api.upload_reference_image(image_url).await?)
    }
}

/// Lowercased, validated file extension of `filename`.
fn file_extension(filename: &str) -> Option<String> {
    let extension = filename.rsplit_once('.')?.1.to_ascii_lowercase();
    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Some(extension)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_lowercased_and_validated() {
        assert_eq!(file_extension("elara.PNG").as_deref(), Some("png"));
        assert_eq!(file_extension("ref.shot.jpeg").as_deref(), Some("jpeg"));
        assert_eq!(file_extension("photo.webp").as_deref(), Some("webp"));
    }

    #[test]
    fn unsupported_or_missing_extensions_are_rejected() {
        assert_eq!(file_extension("archive.gif"), None);
        assert_eq!(file_extension("noextension"), None);
        assert_eq!(file_extension("video.mp4"), None);
    }
}
