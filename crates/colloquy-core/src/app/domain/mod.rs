pub mod action;
pub mod delta;
pub mod effect;
pub mod event;
pub mod message;
pub mod reduce;
pub mod runtime;
pub mod state;
pub mod types;

#[cfg(test)]
mod tests;

pub use action::Action;
pub use delta::TurnEvent;
pub use effect::Effect;
pub use event::SessionEvent;
pub use message::{ContentDelta, Message, MessageContent, Role};
pub use reduce::{InvalidActionKind, ProtocolViolation, ReduceError, reduce};
pub use state::{DEFAULT_MAX_STEPS, SessionState, SessionStatus, TurnState};
pub use types::{MessageId, SessionId, ToolCallId, TurnId, UserKey};
