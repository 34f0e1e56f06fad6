use crate::app::domain::delta::TurnEvent;
use crate::app::domain::message::{Message, MessageContent};
use crate::app::domain::types::{MessageId, SessionId, TurnId};
use crate::attachments::Attachment;

#[derive(Debug, Clone)]
pub enum Action {
    UserInput {
        session_id: SessionId,
        message_id: MessageId,
        turn_id: TurnId,
        content: MessageContent,
        attachments: Vec<Attachment>,
    },

    StreamEvent {
        session_id: SessionId,
        turn_id: TurnId,
        event: TurnEvent,
    },

    /// Finish the current turn, or only `turn_id` when given.
    FinishTurn {
        session_id: SessionId,
        turn_id: Option<TurnId>,
    },

    /// The assistant backend could not produce (or complete) the turn.
    TurnFailed {
        session_id: SessionId,
        turn_id: TurnId,
        error: String,
    },

    Stop {
        session_id: SessionId,
    },

    /// Seed the log with a persisted session's messages.
    Hydrate {
        session_id: SessionId,
        messages: Vec<Message>,
    },
}

impl Action {
    pub fn session_id(&self) -> SessionId {
        match self {
            Action::UserInput { session_id, .. }
            | Action::StreamEvent { session_id, .. }
            | Action::FinishTurn { session_id, .. }
            | Action::TurnFailed { session_id, .. }
            | Action::Stop { session_id }
            | Action::Hydrate { session_id, .. } => *session_id,
        }
    }
}
