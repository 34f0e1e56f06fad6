//! Message types for the session log.
//!
//! This module contains the types the reducer appends and mutates:
//! - `Message` - one user or assistant turn's output, with attachments and tool invocations
//! - `MessageContent` - plain text or a structured node
//! - `ContentDelta` - how streamed content extends a message

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::app::domain::types::{MessageId, SessionId};
use crate::attachments::Attachment;
use crate::tools::ToolTracker;

/// Role in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MessageContent {
    Text(String),
    Structured(serde_json::Value),
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Text(String::new())
    }
}

impl MessageContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text),
            MessageContent::Structured(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            MessageContent::Text(text) => text.is_empty(),
            MessageContent::Structured(value) => value.is_null(),
        }
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentDelta {
    /// Extends the current text content.
    Append { text: String },
    /// Sets the content wholesale.
    Replace { content: MessageContent },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: MessageContent,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub tool_invocations: ToolTracker,
    pub session_id: SessionId,
}

impl Message {
    pub fn user(
        id: MessageId,
        session_id: SessionId,
        content: MessageContent,
        attachments: Vec<Attachment>,
    ) -> Self {
        Self {
            id,
            role: Role::User,
            content,
            attachments,
            tool_invocations: ToolTracker::new(),
            session_id,
        }
    }

    pub fn assistant(id: MessageId, session_id: SessionId) -> Self {
        Self {
            id,
            role: Role::Assistant,
            content: MessageContent::default(),
            attachments: Vec::new(),
            tool_invocations: ToolTracker::new(),
            session_id,
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// Plain text for copying; structured content has none.
    pub fn text(&self) -> Option<&str> {
        self.content.as_text()
    }
}
