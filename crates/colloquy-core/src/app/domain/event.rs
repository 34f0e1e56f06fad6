use serde::{Deserialize, Serialize};

use crate::app::domain::message::Message;
use crate::app::domain::types::{MessageId, ToolCallId, TurnId};

/// What subscribers of a session observe. Every mutation of the message log
/// is published as one of these, in the order it was applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Message appended to the log.
    MessageAdded { message: Message },

    /// Content or tool invocations of an existing message changed.
    MessageUpdated { message: Message },

    /// Log replaced by a persisted session's messages.
    Hydrated { message_count: usize },

    TurnStarted { turn_id: TurnId },

    TurnFinished {
        turn_id: TurnId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<MessageId>,
    },

    TurnCancelled {
        turn_id: TurnId,
        cancelled_tool_calls: Vec<ToolCallId>,
    },

    TurnFailed {
        turn_id: TurnId,
        reason: String,
        cancelled_tool_calls: Vec<ToolCallId>,
    },

    CanonicalUrlAnnounced { url: String },
}

impl SessionEvent {
    pub fn is_error(&self) -> bool {
        matches!(self, SessionEvent::TurnFailed { .. })
    }
}
