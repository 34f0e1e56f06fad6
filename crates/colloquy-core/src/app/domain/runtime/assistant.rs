use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::app::domain::delta::TurnEvent;
use crate::app::domain::message::Message;
use crate::app::domain::types::{SessionId, TurnId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssistantError {
    #[error("Assistant unavailable: {message}")]
    Unavailable { message: String },

    #[error("Assistant stream failed: {message}")]
    Stream { message: String },
}

impl AssistantError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub session_id: SessionId,
    pub turn_id: TurnId,
    /// The whole log, ending with the user message that started the turn.
    pub messages: Vec<Message>,
}

/// Events of one turn, in the order they must be applied.
pub type TurnStream = BoxStream<'static, Result<TurnEvent, AssistantError>>;

/// Produces assistant turns. Transport is up to the implementation; the
/// session runtime only relies on event order.
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    async fn start_turn(&self, request: TurnRequest) -> Result<TurnStream, AssistantError>;
}

#[cfg(any(test, feature = "test-utils"))]
pub use scripted::ScriptedAssistant;

#[cfg(any(test, feature = "test-utils"))]
mod scripted {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use futures::StreamExt;
    use futures::stream;

    use super::{AssistantBackend, AssistantError, TurnRequest, TurnStream};
    use crate::app::domain::delta::TurnEvent;

    struct ScriptedTurn {
        events: Vec<Result<TurnEvent, AssistantError>>,
        hang: bool,
        unavailable: Option<String>,
    }

    /// Plays back queued turns, one per request, and records the requests.
    #[derive(Default)]
    pub struct ScriptedAssistant {
        turns: Mutex<VecDeque<ScriptedTurn>>,
        requests: Mutex<Vec<TurnRequest>>,
    }

    impl ScriptedAssistant {
        pub fn new() -> Self {
            Self::default()
        }

        fn push(self, turn: ScriptedTurn) -> Self {
            if let Ok(mut turns) = self.turns.lock() {
                turns.push_back(turn);
            }
            self
        }

        /// A turn that emits `events` and then ends.
        pub fn turn(self, events: Vec<TurnEvent>) -> Self {
            self.push(ScriptedTurn {
                events: events.into_iter().map(Ok).collect(),
                hang: false,
                unavailable: None,
            })
        }

        /// A turn that emits `events` and then never produces another one.
        pub fn hanging_turn(self, events: Vec<TurnEvent>) -> Self {
            self.push(ScriptedTurn {
                events: events.into_iter().map(Ok).collect(),
                hang: true,
                unavailable: None,
            })
        }

        /// A turn whose stream breaks after `events`.
        pub fn failing_turn(self, events: Vec<TurnEvent>, message: &str) -> Self {
            let mut events: Vec<_> = events.into_iter().map(Ok).collect();
            events.push(Err(AssistantError::stream(message)));
            self.push(ScriptedTurn {
                events,
                hang: false,
                unavailable: None,
            })
        }

        /// A turn that cannot be started at all.
        pub fn unavailable(self, message: &str) -> Self {
            self.push(ScriptedTurn {
                events: Vec::new(),
                hang: false,
                unavailable: Some(message.to_string()),
            })
        }

        pub fn requests(&self) -> Vec<TurnRequest> {
            self.requests
                .lock()
                .map(|r| r.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl AssistantBackend for ScriptedAssistant {
        async fn start_turn(&self, request: TurnRequest) -> Result<TurnStream, AssistantError> {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(request);
            }

            let turn = self
                .turns
                .lock()
                .ok()
                .and_then(|mut turns| turns.pop_front())
                .ok_or_else(|| AssistantError::unavailable("no scripted turn left"))?;

            if let Some(message) = turn.unavailable {
                return Err(AssistantError::unavailable(message));
            }

            let events = stream::iter(turn.events);
            if turn.hang {
                Ok(events.chain(stream::pending()).boxed())
            } else {
                Ok(events.boxed())
            }
        }
    }
}
