use async_trait::async_trait;
use thiserror::Error;

use super::buffer::{Attachment, AttachmentBuffer, AttachmentCandidate, ValidationError};

/// A picked file, ready to be handed to the upload collaborator.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadRequest {
    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Rejected(#[from] ValidationError),

    #[error("Upload failed: {message}")]
    Failed { message: String },
}

impl UploadError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Stores file bytes somewhere addressable and returns the stored URL.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, request: &UploadRequest) -> Result<String, UploadError>;
}

/// Validates `request` against the buffer's limits, uploads it, and admits
/// the stored URL into the buffer. The uploader is never called for a file
/// that fails validation, and a failed upload leaves the buffer untouched.
pub async fn stage_upload(
    buffer: &mut AttachmentBuffer,
    uploader: &dyn Uploader,
    request: UploadRequest,
) -> Result<Attachment, UploadError> {
    buffer
        .limits()
        .check(&request.content_type, request.size_bytes())?;

    let url = match uploader.upload(&request).await {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(name = %request.name, error = %e, "Attachment upload failed");
            return Err(e);
        }
    };

    let attachment = buffer.add(AttachmentCandidate {
        url,
        name: request.name,
        content_type: request.content_type,
        size_bytes: request.bytes.len() as u64,
    })?;

    tracing::debug!(url = %attachment.url, "Attachment staged");
    Ok(attachment)
}
