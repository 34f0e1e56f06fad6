use std::collections::HashMap;
use std::sync::Arc;

use crate::app::domain::types::{SessionId, UserKey};
use crate::config::CoreConfig;
use crate::error::{Error, Result};
use crate::history::{DeleteTicket, HistoryHandle, spawn_history_store};
use crate::session::{SessionStore, SessionStoreError};

use super::assistant::AssistantBackend;
use super::location::LocationSink;
use super::session_actor::{SessionHandle, SessionRuntimeConfig, spawn_session_actor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    NewChat,
    Chat(SessionId),
}

impl Route {
    /// `/` is a new chat, `<prefix><uuid>` an existing one.
    pub fn parse(path: &str, url_prefix: &str) -> Option<Self> {
        if path.is_empty() || path == "/" {
            return Some(Route::NewChat);
        }

        path.strip_prefix(url_prefix)
            .and_then(SessionId::parse)
            .map(Route::Chat)
    }
}

/// Owns one actor per live session plus the shared history store, and maps
/// navigation onto them.
pub struct Orchestrator {
    config: CoreConfig,
    runtime: SessionRuntimeConfig,
    store: Arc<dyn SessionStore>,
    history: HistoryHandle,
    sessions: HashMap<SessionId, SessionHandle>,
}

impl Orchestrator {
    pub fn new(
        config: CoreConfig,
        backend: Arc<dyn AssistantBackend>,
        store: Arc<dyn SessionStore>,
        location: Arc<dyn LocationSink>,
        user_key: Option<UserKey>,
    ) -> Self {
        let history = spawn_history_store(store.clone(), user_key.clone());
        let runtime = SessionRuntimeConfig {
            settings: config.session.clone(),
            backend,
            location,
            history: Some(history.clone()),
            store: Some(store.clone()),
            user_key,
        };

        Self {
            config,
            runtime,
            store,
            history,
            sessions: HashMap::new(),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn history(&self) -> &HistoryHandle {
        &self.history
    }

    pub fn session(&self, session_id: SessionId) -> Option<&SessionHandle> {
        self.sessions.get(&session_id)
    }

    /// Opens the session a route points at. Every navigation also reloads
    /// the history, whether or not the session could be opened.
    pub async fn navigate(&mut self, route: Route) -> Result<SessionHandle> {
        self.history.refresh_in_background();

        match route {
            Route::NewChat => {
                let session_id = SessionId::new();
                tracing::debug!(session_id = %session_id, "Starting new chat");
                Ok(self.spawn(session_id, Vec::new()))
            }
            Route::Chat(session_id) => {
                if let Some(handle) = self.sessions.get(&session_id) {
                    return Ok(handle.clone());
                }

                let session = match self.store.get_session(session_id).await {
                    Ok(Some(session)) => session,
                    Ok(None) => {
                        tracing::warn!(session_id = %session_id, "Chat not found");
                        return Err(Error::Store(SessionStoreError::NotFound { session_id }));
                    }
                    Err(e) => {
                        tracing::error!(
                            target: "core.session_store",
                            session_id = %session_id,
                            error = %e,
                            "Failed to load chat"
                        );
                        return Err(e.into());
                    }
                };

                tracing::debug!(
                    session_id = %session_id,
                    message_count = session.messages.len(),
                    "Resuming chat"
                );
                Ok(self.spawn(session_id, session.messages))
            }
        }
    }

    /// Convenience for a path coming straight from the client.
    pub async fn navigate_to_path(&mut self, path: &str) -> Result<SessionHandle> {
        let route = Route::parse(path, &self.config.session.url_prefix).ok_or_else(|| {
            Error::Store(SessionStoreError::persistence(format!(
                "no chat at {path}"
            )))
        })?;
        self.navigate(route).await
    }

    /// Stops the actor of a session that is no longer on screen, once its
    /// pending saves have landed.
    pub async fn close(&mut self, session_id: SessionId) {
        if let Some(handle) = self.sessions.remove(&session_id) {
            handle.close().await;
        }
    }

    /// Deletes a chat. Its actor is closed first so no later save can bring
    /// the chat back, and the history hides it until the store answers.
    pub async fn delete(&mut self, session_id: SessionId) -> Result<DeleteTicket> {
        self.close(session_id).await;
        Ok(self.history.request_delete(session_id).await?)
    }

    pub fn shutdown(&mut self) {
        for (_, handle) in self.sessions.drain() {
            handle.shutdown();
        }
        self.history.shutdown();
    }

    fn spawn(&mut self, session_id: SessionId, messages: Vec<crate::app::Message>) -> SessionHandle {
        let handle = spawn_session_actor(session_id, messages, self.runtime.clone());
        self.sessions.insert(session_id, handle.clone());
        handle
    }
}
