use super::kind::ToolKind;
use super::tracker::{ToolInvocation, ToolInvocationState};

/// What a renderer should show for one tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolDisplay<'a> {
    /// Pending call with a placeholder for its kind.
    Skeleton(&'a ToolKind),
    /// Pending call with nothing to show yet.
    Hidden,
    /// Resolved call of a known kind.
    Result {
        kind: &'a ToolKind,
        value: &'a serde_json::Value,
    },
    /// Resolved call that produces no visible artifact.
    Suppressed,
    /// Resolved call of an unknown kind, shown as pretty-printed JSON.
    Raw(String),
    Cancelled,
}

impl ToolInvocation {
    pub fn display(&self) -> ToolDisplay<'_> {
        match &self.state {
            ToolInvocationState::Pending if self.tool_name.has_skeleton() => {
                ToolDisplay::Skeleton(&self.tool_name)
            }
            ToolInvocationState::Pending => ToolDisplay::Hidden,
            ToolInvocationState::Cancelled => ToolDisplay::Cancelled,
            ToolInvocationState::Result { result } => match &self.tool_name {
                ToolKind::CreateReservation if is_error_payload(result) => ToolDisplay::Suppressed,
                ToolKind::Unknown(_) => ToolDisplay::Raw(
                    serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string()),
                ),
                kind => ToolDisplay::Result {
                    kind,
                    value: result,
                },
            },
        }
    }
}

fn is_error_payload(result: &serde_json::Value) -> bool {
    result
        .as_object()
        .is_some_and(|object| object.contains_key("error"))
}
