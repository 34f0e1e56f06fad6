use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::store::{Session, SessionStore, SessionStoreError};
use crate::app::domain::types::{SessionId, UserKey};
use crate::config::HistorySettings;
use crate::history::HistoryEntry;

/// Process-local `SessionStore`, used by tests and by embedders without a backend.
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
    settings: HistorySettings,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::with_settings(HistorySettings::default())
    }

    pub fn with_settings(settings: HistorySettings) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            settings,
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn list_sessions(
        &self,
        user_key: &UserKey,
    ) -> Result<Vec<HistoryEntry>, SessionStoreError> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| SessionStoreError::lock_poisoned("sessions"))?;

        let mut owned: Vec<&Session> = sessions
            .values()
            .filter(|s| &s.user_key == user_key)
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(owned
            .into_iter()
            .map(|s| HistoryEntry::from_session(s, &self.settings))
            .collect())
    }

    async fn delete_session(&self, session_id: SessionId) -> Result<(), SessionStoreError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| SessionStoreError::lock_poisoned("sessions"))?;
        sessions
            .remove(&session_id)
            .map(|_| ())
            .ok_or(SessionStoreError::NotFound { session_id })
    }

    async fn get_session(
        &self,
        session_id: SessionId,
    ) -> Result<Option<Session>, SessionStoreError> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| SessionStoreError::lock_poisoned("sessions"))?;
        Ok(sessions.get(&session_id).cloned())
    }

    async fn save_session(&self, session: &Session) -> Result<(), SessionStoreError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| SessionStoreError::lock_poisoned("sessions"))?;

        // Keep the original creation time so listing order stays stable.
        let created_at = sessions
            .get(&session.id)
            .map_or(session.created_at, |existing| existing.created_at);
        let mut stored = session.clone();
        stored.created_at = created_at;
        sessions.insert(session.id, stored);
        Ok(())
    }
}
