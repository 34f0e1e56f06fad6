use serde::{Deserialize, Serialize};

use crate::app::domain::types::SessionId;
use crate::config::HistorySettings;
use crate::session::Session;

/// Sidebar projection of a durable session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: SessionId,
    pub title: String,
}

impl HistoryEntry {
    pub fn new(id: SessionId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }

    /// Leading text of the first message, or the fallback title when there is
    /// none (no messages, or structured content).
    pub fn from_session(session: &Session, settings: &HistorySettings) -> Self {
        let title = session
            .messages
            .first()
            .and_then(|m| m.text())
            .map(|text| text.chars().take(settings.preview_chars).collect::<String>())
            .filter(|preview| !preview.is_empty())
            .unwrap_or_else(|| settings.fallback_title.clone());

        Self::new(session.id, title)
    }
}
