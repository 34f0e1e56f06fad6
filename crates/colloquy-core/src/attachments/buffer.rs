use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 5 * 1024 * 1024;

pub const DEFAULT_ALLOWED_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/png", "application/pdf"];

/// An attachment owned by the buffer until submit, then by its message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub url: String,
    pub name: String,
    pub content_type: String,
}

/// A file the user picked, described by the metadata validation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentCandidate {
    pub url: String,
    pub name: String,
    pub content_type: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentLimits {
    pub max_bytes: u64,
    pub allowed_content_types: Vec<String>,
}

impl Default for AttachmentLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
            allowed_content_types: DEFAULT_ALLOWED_CONTENT_TYPES
                .iter()
                .map(|t| (*t).to_string())
                .collect(),
        }
    }
}

impl AttachmentLimits {
    /// Size is checked before type; the first failing rule wins.
    pub fn check(&self, content_type: &str, size_bytes: u64) -> Result<(), ValidationError> {
        if size_bytes > self.max_bytes {
            return Err(ValidationError::TooLarge {
                size_bytes,
                limit: self.max_bytes,
            });
        }

        let allowed = self
            .allowed_content_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(content_type.trim()));
        if !allowed {
            return Err(ValidationError::UnsupportedType {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("File size should be less than {}MB", mebibytes(.limit))]
    TooLarge { size_bytes: u64, limit: u64 },

    #[error("File type should be {}", describe_types(.allowed))]
    UnsupportedType {
        content_type: String,
        allowed: Vec<String>,
    },
}

fn mebibytes(bytes: &u64) -> u64 {
    bytes / (1024 * 1024)
}

fn describe_types(types: &[String]) -> String {
    let labels: Vec<&str> = types
        .iter()
        .map(|t| match t.as_str() {
            "image/jpeg" => "JPEG",
            "image/png" => "PNG",
            "application/pdf" => "PDF",
            other => other,
        })
        .collect();

    match labels.as_slice() {
        [] => "nothing".to_string(),
        [only] => (*only).to_string(),
        [first, second] => format!("{first} or {second}"),
        [rest @ .., last] => format!("{}, or {}", rest.join(", "), last),
    }
}

/// Attachments selected for the next outgoing message.
#[derive(Debug, Clone, Default)]
pub struct AttachmentBuffer {
    limits: AttachmentLimits,
    pending: Vec<Attachment>,
}

impl AttachmentBuffer {
    pub fn new(limits: AttachmentLimits) -> Self {
        Self {
            limits,
            pending: Vec::new(),
        }
    }

    pub fn limits(&self) -> &AttachmentLimits {
        &self.limits
    }

    pub fn add(&mut self, candidate: AttachmentCandidate) -> Result<Attachment, ValidationError> {
        self.limits
            .check(&candidate.content_type, candidate.size_bytes)?;

        let attachment = Attachment {
            url: candidate.url,
            name: candidate.name,
            content_type: candidate.content_type,
        };

        if let Some(existing) = self.pending.iter_mut().find(|a| a.url == attachment.url) {
            *existing = attachment.clone();
        } else {
            self.pending.push(attachment.clone());
        }

        Ok(attachment)
    }

    pub fn remove(&mut self, url: &str) -> Option<Attachment> {
        let index = self.pending.iter().position(|a| a.url == url)?;
        Some(self.pending.remove(index))
    }

    /// Drains the buffer in selection order.
    pub fn flush(&mut self) -> Vec<Attachment> {
        std::mem::take(&mut self.pending)
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const MIB: u64 = 1024 * 1024;

    fn candidate(url: &str, content_type: &str, size_bytes: u64) -> AttachmentCandidate {
        AttachmentCandidate {
            url: url.to_string(),
            name: format!("{url}.bin"),
            content_type: content_type.to_string(),
            size_bytes,
        }
    }

    #[rstest]
    #[case::png_one_mib("image/png", MIB)]
    #[case::jpeg_at_limit("image/jpeg", 5 * MIB)]
    #[case::pdf_empty("application/pdf", 0)]
    #[case::upper_case_type("IMAGE/PNG", MIB)]
    fn accepts_allowed_files(#[case] content_type: &str, #[case] size: u64) {
        let mut buffer = AttachmentBuffer::default();
        let attachment = buffer.add(candidate("u1", content_type, size)).unwrap();
        assert_eq!(attachment.url, "u1");
        assert_eq!(buffer.len(), 1);
    }

    #[rstest]
    #[case::six_mib_png("image/png", 6 * MIB)]
    #[case::one_byte_over("application/pdf", 5 * MIB + 1)]
    fn rejects_oversized_files(#[case] content_type: &str, #[case] size: u64) {
        let mut buffer = AttachmentBuffer::default();
        let err = buffer.add(candidate("u1", content_type, size)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooLarge {
                size_bytes: size,
                limit: 5 * MIB
            }
        );
        assert!(buffer.is_empty());
    }

    #[test]
    fn rejects_disallowed_type() {
        let mut buffer = AttachmentBuffer::default();
        let err = buffer
            .add(candidate("u1", "text/plain", MIB))
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::UnsupportedType { ref content_type, .. } if content_type == "text/plain"
        ));
        assert!(buffer.is_empty());
    }

    #[test]
    fn size_rule_wins_over_type_rule() {
        let mut buffer = AttachmentBuffer::default();
        let err = buffer
            .add(candidate("u1", "text/plain", 6 * MIB))
            .unwrap_err();
        assert!(matches!(err, ValidationError::TooLarge { .. }));
    }

    #[test]
    fn error_messages_match_user_notices() {
        let limits = AttachmentLimits::default();
        assert_eq!(
            limits.check("image/png", 6 * MIB).unwrap_err().to_string(),
            "File size should be less than 5MB"
        );
        assert_eq!(
            limits.check("text/plain", 1).unwrap_err().to_string(),
            "File type should be JPEG, PNG, or PDF"
        );
    }

    #[test]
    fn flush_drains_in_selection_order() {
        let mut buffer = AttachmentBuffer::default();
        buffer.add(candidate("a", "image/png", 1)).unwrap();
        buffer.add(candidate("b", "image/jpeg", 1)).unwrap();
        buffer.add(candidate("c", "application/pdf", 1)).unwrap();

        let flushed: Vec<_> = buffer.flush().into_iter().map(|a| a.url).collect();
        assert_eq!(flushed, vec!["a", "b", "c"]);
        assert!(buffer.is_empty());
        assert!(buffer.flush().is_empty());
    }

    #[test]
    fn remove_by_url() {
        let mut buffer = AttachmentBuffer::default();
        buffer.add(candidate("a", "image/png", 1)).unwrap();
        buffer.add(candidate("b", "image/png", 1)).unwrap();

        assert_eq!(buffer.remove("a").map(|a| a.url), Some("a".to_string()));
        assert_eq!(buffer.remove("a"), None);
        assert_eq!(buffer.attachments().len(), 1);
    }

    #[test]
    fn re_adding_same_url_replaces_in_place() {
        let mut buffer = AttachmentBuffer::default();
        buffer.add(candidate("a", "image/png", 1)).unwrap();
        buffer.add(candidate("b", "image/png", 1)).unwrap();
        buffer.add(candidate("a", "application/pdf", 1)).unwrap();

        let urls: Vec<_> = buffer.attachments().iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls, vec!["a", "b"]);
        assert_eq!(buffer.attachments()[0].content_type, "application/pdf");
    }
}
