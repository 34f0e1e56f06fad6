//! Attachment bookkeeping for the message being composed.
//!
//! - `AttachmentBuffer` validates and holds attachments until the next submit
//! - `stage_upload` runs validation before handing a file to the upload collaborator

mod buffer;
mod upload;

pub use buffer::{Attachment, AttachmentBuffer, AttachmentCandidate, AttachmentLimits, ValidationError};
pub use upload::{UploadError, UploadRequest, Uploader, stage_upload};
