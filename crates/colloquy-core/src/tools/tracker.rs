use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app::domain::types::ToolCallId;

use super::kind::ToolKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ToolInvocationState {
    Pending,
    Result { result: serde_json::Value },
    Cancelled,
}

impl ToolInvocationState {
    pub fn is_pending(&self) -> bool {
        matches!(self, ToolInvocationState::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    pub tool_call_id: ToolCallId,
    pub tool_name: ToolKind,
    #[serde(flatten)]
    pub state: ToolInvocationState,
}

impl ToolInvocation {
    pub fn pending(tool_call_id: ToolCallId, tool_name: ToolKind) -> Self {
        Self {
            tool_call_id,
            tool_name,
            state: ToolInvocationState::Pending,
        }
    }

    pub fn result(&self) -> Option<&serde_json::Value> {
        match &self.state {
            ToolInvocationState::Result { result } => Some(result),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("Unknown tool invocation: {tool_call_id}")]
    UnknownInvocation { tool_call_id: ToolCallId },

    #[error("Tool invocation already resolved: {tool_call_id}")]
    AlreadyResolved { tool_call_id: ToolCallId },

    #[error("Tool invocation was cancelled: {tool_call_id}")]
    Cancelled { tool_call_id: ToolCallId },

    #[error("Tool invocation registered twice: {tool_call_id}")]
    DuplicateInvocation { tool_call_id: ToolCallId },
}

impl TrackerError {
    pub fn tool_call_id(&self) -> &ToolCallId {
        match self {
            TrackerError::UnknownInvocation { tool_call_id }
            | TrackerError::AlreadyResolved { tool_call_id }
            | TrackerError::Cancelled { tool_call_id }
            | TrackerError::DuplicateInvocation { tool_call_id } => tool_call_id,
        }
    }
}

/// Tool invocations of one message, in arrival order.
///
/// Each invocation moves out of `Pending` at most once and never back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolTracker {
    invocations: Vec<ToolInvocation>,
}

impl ToolTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_call(
        &mut self,
        tool_call_id: ToolCallId,
        tool_name: ToolKind,
    ) -> Result<&ToolInvocation, TrackerError> {
        if self.position(&tool_call_id).is_some() {
            return Err(TrackerError::DuplicateInvocation { tool_call_id });
        }

        let index = self.invocations.len();
        self.invocations
            .push(ToolInvocation::pending(tool_call_id, tool_name));
        Ok(&self.invocations[index])
    }

    pub fn resolve(
        &mut self,
        tool_call_id: &ToolCallId,
        result: serde_json::Value,
    ) -> Result<&ToolInvocation, TrackerError> {
        let Some(index) = self.position(tool_call_id) else {
            return Err(TrackerError::UnknownInvocation {
                tool_call_id: tool_call_id.clone(),
            });
        };

        let invocation = &mut self.invocations[index];
        match invocation.state {
            ToolInvocationState::Pending => {
                invocation.state = ToolInvocationState::Result { result };
                Ok(&*invocation)
            }
            ToolInvocationState::Result { .. } => Err(TrackerError::AlreadyResolved {
                tool_call_id: tool_call_id.clone(),
            }),
            ToolInvocationState::Cancelled => Err(TrackerError::Cancelled {
                tool_call_id: tool_call_id.clone(),
            }),
        }
    }

    /// Moves every pending invocation to `Cancelled`, returning their ids.
    pub fn cancel_pending(&mut self) -> Vec<ToolCallId> {
        self.invocations
            .iter_mut()
            .filter(|inv| inv.state.is_pending())
            .map(|inv| {
                inv.state = ToolInvocationState::Cancelled;
                inv.tool_call_id.clone()
            })
            .collect()
    }

    pub fn get(&self, tool_call_id: &ToolCallId) -> Option<&ToolInvocation> {
        self.invocations
            .iter()
            .find(|inv| &inv.tool_call_id == tool_call_id)
    }

    pub fn contains(&self, tool_call_id: &ToolCallId) -> bool {
        self.position(tool_call_id).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ToolInvocation> {
        self.invocations.iter()
    }

    pub fn as_slice(&self) -> &[ToolInvocation] {
        &self.invocations
    }

    pub fn len(&self) -> usize {
        self.invocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invocations.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.invocations
            .iter()
            .filter(|inv| inv.state.is_pending())
            .count()
    }

    fn position(&self, tool_call_id: &ToolCallId) -> Option<usize> {
        self.invocations
            .iter()
            .position(|inv| &inv.tool_call_id == tool_call_id)
    }
}

impl<'a> IntoIterator for &'a ToolTracker {
    type Item = &'a ToolInvocation;
    type IntoIter = std::slice::Iter<'a, ToolInvocation>;

    fn into_iter(self) -> Self::IntoIter {
        self.invocations.iter()
    }
}
