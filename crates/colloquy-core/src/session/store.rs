use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app::domain::message::Message;
use crate::app::domain::types::{SessionId, UserKey};
use crate::history::HistoryEntry;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionStoreError {
    #[error("Session not found: {session_id}")]
    NotFound { session_id: SessionId },

    #[error("Persistence error: {message}")]
    Persistence { message: String },

    #[error("In-memory store lock poisoned: {message}")]
    LockPoisoned { message: String },
}

impl SessionStoreError {
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    pub fn lock_poisoned(message: impl Into<String>) -> Self {
        Self::LockPoisoned {
            message: message.into(),
        }
    }
}

/// A durable chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub user_key: UserKey,
}

impl Session {
    pub fn new(id: SessionId, user_key: UserKey) -> Self {
        Self {
            id,
            messages: Vec::new(),
            created_at: Utc::now(),
            user_key,
        }
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Most recent first. Callers must not re-sort.
    async fn list_sessions(&self, user_key: &UserKey)
    -> Result<Vec<HistoryEntry>, SessionStoreError>;

    async fn delete_session(&self, session_id: SessionId) -> Result<(), SessionStoreError>;

    async fn get_session(&self, session_id: SessionId)
    -> Result<Option<Session>, SessionStoreError>;

    /// Creates or overwrites the session. A session is durable once this succeeds.
    async fn save_session(&self, session: &Session) -> Result<(), SessionStoreError>;
}
