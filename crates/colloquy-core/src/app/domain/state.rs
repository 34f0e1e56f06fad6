use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::Display;

use crate::app::domain::message::Message;
use crate::app::domain::types::{MessageId, SessionId, ToolCallId, TurnId};

pub const DEFAULT_MAX_STEPS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Idle,
    Streaming,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnState {
    pub turn_id: TurnId,
    pub user_message_id: MessageId,
    /// Created lazily by the first content delta or tool event of the turn.
    pub assistant_message_id: Option<MessageId>,
    pub steps: usize,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: SessionId,

    /// Append-only, in append order. This is the only ordering renderers may rely on.
    pub messages: Vec<Message>,

    pub status: SessionStatus,
    pub current_turn: Option<TurnState>,

    /// Every tool call id seen in this session, and the message it belongs to.
    pub tool_call_index: HashMap<ToolCallId, MessageId>,

    pub url_announced: bool,
    pub max_steps: usize,
}

impl SessionState {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            messages: Vec::new(),
            status: SessionStatus::Idle,
            current_turn: None,
            tool_call_index: HashMap::new(),
            url_announced: false,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn is_streaming(&self) -> bool {
        self.status == SessionStatus::Streaming
    }

    pub fn current_turn_id(&self) -> Option<TurnId> {
        self.current_turn.as_ref().map(|turn| turn.turn_id)
    }

    pub fn message(&self, message_id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == message_id)
    }

    pub fn message_mut(&mut self, message_id: &MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| &m.id == message_id)
    }

    /// The assistant message of the running turn, if one has been created.
    pub fn streaming_message(&self) -> Option<&Message> {
        let id = self.current_turn.as_ref()?.assistant_message_id.as_ref()?;
        self.message(id)
    }

    /// A message is frozen once its turn has ended; only the running turn's
    /// assistant message may still change.
    pub fn is_frozen(&self, message_id: &MessageId) -> bool {
        self.current_turn
            .as_ref()
            .and_then(|turn| turn.assistant_message_id.as_ref())
            .is_none_or(|streaming| streaming != message_id)
    }

    pub fn start_turn(&mut self, turn_id: TurnId, user_message_id: MessageId) {
        self.current_turn = Some(TurnState {
            turn_id,
            user_message_id,
            assistant_message_id: None,
            steps: 0,
        });
        self.status = SessionStatus::Streaming;
    }

    pub fn end_turn(&mut self) -> Option<TurnState> {
        self.status = SessionStatus::Idle;
        self.current_turn.take()
    }

    /// Replaces the log wholesale and rebuilds the tool call index.
    pub fn hydrate(&mut self, messages: Vec<Message>) {
        self.tool_call_index = messages
            .iter()
            .flat_map(|message| {
                message
                    .tool_invocations
                    .iter()
                    .map(|inv| (inv.tool_call_id.clone(), message.id.clone()))
            })
            .collect();
        self.url_announced = !messages.is_empty();
        self.messages = messages;
        self.status = SessionStatus::Idle;
        self.current_turn = None;
    }
}
