use crate::app::domain::message::Message;
use crate::app::domain::types::{SessionId, TurnId};

use super::event::SessionEvent;

#[derive(Debug, Clone)]
pub enum Effect {
    EmitEvent {
        session_id: SessionId,
        event: SessionEvent,
    },

    /// Ask the assistant collaborator to stream a response to `messages`.
    RequestAssistantTurn {
        session_id: SessionId,
        turn_id: TurnId,
        messages: Vec<Message>,
    },

    /// Stop consuming the stream of `turn_id`.
    CancelTurn {
        session_id: SessionId,
        turn_id: TurnId,
    },

    /// Rewrite the client-visible location to the session's canonical URL.
    /// Emitted at most once per session.
    AnnounceCanonicalUrl {
        session_id: SessionId,
    },

    ReconcileHistory {
        session_id: SessionId,
    },
}
