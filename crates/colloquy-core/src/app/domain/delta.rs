use serde::{Deserialize, Serialize};

use crate::app::domain::message::ContentDelta;
use crate::app::domain::types::ToolCallId;
use crate::tools::ToolKind;

/// One event of an assistant turn, in the order the assistant produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum TurnEvent {
    ContentDelta {
        delta: ContentDelta,
    },

    ToolCallRegistered {
        tool_call_id: ToolCallId,
        tool_name: ToolKind,
    },

    ToolCallResolved {
        tool_call_id: ToolCallId,
        result: serde_json::Value,
    },

    TurnFinished,
}

impl TurnEvent {
    pub fn text(text: impl Into<String>) -> Self {
        TurnEvent::ContentDelta {
            delta: ContentDelta::Append { text: text.into() },
        }
    }

    pub fn registered(tool_call_id: impl Into<String>, tool_name: impl Into<ToolKind>) -> Self {
        TurnEvent::ToolCallRegistered {
            tool_call_id: ToolCallId::from_string(tool_call_id),
            tool_name: tool_name.into(),
        }
    }

    pub fn resolved(tool_call_id: impl Into<String>, result: serde_json::Value) -> Self {
        TurnEvent::ToolCallResolved {
            tool_call_id: ToolCallId::from_string(tool_call_id),
            result,
        }
    }

    pub fn is_finish(&self) -> bool {
        matches!(self, TurnEvent::TurnFinished)
    }
}
