use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};

use super::entry::HistoryEntry;
use super::view::HistoryView;
use crate::app::domain::types::{SessionId, UserKey};
use crate::error::{self, Notice};
use crate::session::{SessionStore, SessionStoreError};

const NOTICE_BROADCAST_CAPACITY: usize = 32;
const HISTORY_COMMAND_CAPACITY: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("Failed to delete chat {session_id}: {source}")]
    DeleteFailed {
        session_id: SessionId,
        #[source]
        source: SessionStoreError,
    },

    #[error("Delete already in progress for chat {session_id}")]
    DeleteInProgress { session_id: SessionId },

    #[error("Failed to load chat history: {0}")]
    ListFailed(#[source] SessionStoreError),

    #[error("History store shutting down")]
    ChannelClosed,
}

impl HistoryError {
    pub fn notice(&self) -> Notice {
        match self {
            HistoryError::DeleteFailed { .. } => Notice::error(error::CHAT_DELETE_FAILED),
            HistoryError::DeleteInProgress { .. } => Notice::loading(error::DELETING_CHAT),
            HistoryError::ListFailed(_) => Notice::error(error::HISTORY_LOAD_FAILED),
            HistoryError::ChannelClosed => Notice::error(self.to_string()),
        }
    }
}

/// What readers of the history see. Published after every change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistorySnapshot {
    pub entries: Vec<HistoryEntry>,
    pub pending_deletes: usize,
}

type Reply = oneshot::Sender<Result<(), HistoryError>>;

enum HistoryCmd {
    Refresh {
        reply: Option<Reply>,
    },
    RequestDelete {
        session_id: SessionId,
        ack: oneshot::Sender<Result<oneshot::Receiver<Result<(), HistoryError>>, HistoryError>>,
    },
    SetUserKey {
        user_key: Option<UserKey>,
        reply: Reply,
    },
    Shutdown,
}

enum Completion {
    Listing {
        generation: u64,
        result: Result<Vec<HistoryEntry>, SessionStoreError>,
        reply: Option<Reply>,
    },
    Delete {
        session_id: SessionId,
        result: Result<(), SessionStoreError>,
        reply: Reply,
    },
}

/// Outcome of an optimistic delete. The entry is already hidden when this
/// is handed out; `wait` resolves once the store has answered.
pub struct DeleteTicket {
    pub session_id: SessionId,
    outcome: oneshot::Receiver<Result<(), HistoryError>>,
}

impl DeleteTicket {
    pub async fn wait(self) -> Result<(), HistoryError> {
        self.outcome.await.map_err(|_| HistoryError::ChannelClosed)?
    }
}

#[derive(Clone)]
pub struct HistoryHandle {
    cmd_tx: mpsc::Sender<HistoryCmd>,
    snapshot_rx: watch::Receiver<HistorySnapshot>,
    notice_tx: broadcast::Sender<Notice>,
}

impl HistoryHandle {
    /// Current visible list, most recent first.
    pub fn list(&self) -> Vec<HistoryEntry> {
        self.snapshot_rx.borrow().entries.clone()
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<HistorySnapshot> {
        self.snapshot_rx.clone()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notice_tx.subscribe()
    }

    /// Reloads the listing and waits until it has been applied (or superseded).
    pub async fn refresh(&self) -> Result<(), HistoryError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(HistoryCmd::Refresh {
                reply: Some(reply_tx),
            })
            .await
            .map_err(|_| HistoryError::ChannelClosed)?;
        reply_rx.await.map_err(|_| HistoryError::ChannelClosed)?
    }

    /// Schedules a reload without waiting for it.
    pub fn refresh_in_background(&self) {
        if self
            .cmd_tx
            .try_send(HistoryCmd::Refresh { reply: None })
            .is_err()
        {
            tracing::debug!("History refresh dropped, command queue full or closed");
        }
    }

    pub async fn request_delete(&self, session_id: SessionId) -> Result<DeleteTicket, HistoryError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.cmd_tx
            .send(HistoryCmd::RequestDelete {
                session_id,
                ack: ack_tx,
            })
            .await
            .map_err(|_| HistoryError::ChannelClosed)?;
        let outcome = ack_rx.await.map_err(|_| HistoryError::ChannelClosed)??;
        Ok(DeleteTicket {
            session_id,
            outcome,
        })
    }

    /// Switches the signed-in user and reloads. `None` empties the list.
    pub async fn set_user_key(&self, user_key: Option<UserKey>) -> Result<(), HistoryError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(HistoryCmd::SetUserKey {
                user_key,
                reply: reply_tx,
            })
            .await
            .map_err(|_| HistoryError::ChannelClosed)?;
        reply_rx.await.map_err(|_| HistoryError::ChannelClosed)?
    }

    pub fn shutdown(&self) {
        let _ = self.cmd_tx.try_send(HistoryCmd::Shutdown);
    }
}

struct HistoryStore {
    store: Arc<dyn SessionStore>,
    user_key: Option<UserKey>,
    view: HistoryView,
    /// Bumped by every refresh; only the newest listing is applied.
    generation: u64,
    /// Deletes confirmed while listings were in flight, with the generation
    /// current at confirmation. A listing of that generation or older may
    /// still contain them.
    confirmed_deletes: HashMap<SessionId, u64>,
    snapshot_tx: watch::Sender<HistorySnapshot>,
    notice_tx: broadcast::Sender<Notice>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
}

impl HistoryStore {
    async fn run(mut self, mut cmd_rx: mpsc::Receiver<HistoryCmd>) {
        loop {
            tokio::select! {
                biased;

                Some(completion) = self.completion_rx.recv() => {
                    self.handle_completion(completion);
                }

                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(HistoryCmd::Refresh { reply }) => self.start_refresh(reply),
                        Some(HistoryCmd::RequestDelete { session_id, ack }) => {
                            let _ = ack.send(self.start_delete(session_id));
                        }
                        Some(HistoryCmd::SetUserKey { user_key, reply }) => {
                            self.user_key = user_key;
                            self.start_refresh(Some(reply));
                        }
                        Some(HistoryCmd::Shutdown) | None => break,
                    }
                }
            }
        }

        tracing::debug!("History store stopped");
    }

    fn start_refresh(&mut self, reply: Option<Reply>) {
        self.generation += 1;

        let Some(user_key) = self.user_key.clone() else {
            self.view.clear();
            self.publish();
            if let Some(reply) = reply {
                let _ = reply.send(Ok(()));
            }
            return;
        };

        let generation = self.generation;
        let store = self.store.clone();
        let completion_tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = store.list_sessions(&user_key).await;
            let _ = completion_tx.send(Completion::Listing {
                generation,
                result,
                reply,
            });
        });
    }

    fn start_delete(
        &mut self,
        session_id: SessionId,
    ) -> Result<oneshot::Receiver<Result<(), HistoryError>>, HistoryError> {
        if !self.view.hide(session_id) {
            return Err(HistoryError::DeleteInProgress { session_id });
        }
        self.publish();
        self.notify(Notice::loading(error::DELETING_CHAT));

        let (reply_tx, reply_rx) = oneshot::channel();
        let store = self.store.clone();
        let completion_tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = store.delete_session(session_id).await;
            let _ = completion_tx.send(Completion::Delete {
                session_id,
                result,
                reply: reply_tx,
            });
        });

        Ok(reply_rx)
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Listing {
                generation,
                result,
                reply,
            } => {
                let outcome = self.apply_listing(generation, result);
                if let Some(reply) = reply {
                    let _ = reply.send(outcome);
                }
            }
            Completion::Delete {
                session_id,
                result,
                reply,
            } => {
                let outcome = self.finish_delete(session_id, result);
                let _ = reply.send(outcome);
            }
        }
    }

    fn apply_listing(
        &mut self,
        generation: u64,
        result: Result<Vec<HistoryEntry>, SessionStoreError>,
    ) -> Result<(), HistoryError> {
        if generation != self.generation {
            tracing::debug!(
                generation,
                latest = self.generation,
                "Discarding superseded history listing"
            );
            return Ok(());
        }

        let listing = match result {
            Ok(listing) => listing,
            Err(e) => {
                tracing::error!(
                    target: "core.history",
                    error = %e,
                    "Failed to list sessions"
                );
                let err = HistoryError::ListFailed(e);
                self.notify(err.notice());
                return Err(err);
            }
        };

        let confirmed = &self.confirmed_deletes;
        let listing: Vec<HistoryEntry> = listing
            .into_iter()
            .filter(|entry| {
                confirmed
                    .get(&entry.id)
                    .is_none_or(|&confirmed_at| confirmed_at < generation)
            })
            .collect();
        self.confirmed_deletes
            .retain(|_, confirmed_at| *confirmed_at >= generation);

        self.view.replace_with(listing);
        self.publish();
        Ok(())
    }

    fn finish_delete(
        &mut self,
        session_id: SessionId,
        result: Result<(), SessionStoreError>,
    ) -> Result<(), HistoryError> {
        match result {
            Ok(()) => {
                self.view.confirm(session_id);
                self.confirmed_deletes.insert(session_id, self.generation);
                self.publish();
                self.notify(Notice::success(error::CHAT_DELETED));
                tracing::info!(session_id = %session_id, "Chat deleted");
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    target: "core.history",
                    session_id = %session_id,
                    error = %e,
                    "Failed to delete session, restoring history entry"
                );
                self.view.compensate(session_id);
                self.publish();
                let err = HistoryError::DeleteFailed {
                    session_id,
                    source: e,
                };
                self.notify(err.notice());
                Err(err)
            }
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(HistorySnapshot {
            entries: self.view.entries().to_vec(),
            pending_deletes: self.view.pending_deletes(),
        });
    }

    fn notify(&self, notice: Notice) {
        let _ = self.notice_tx.send(notice);
    }
}

/// Spawns the history actor. Nothing is listed until the first refresh.
pub fn spawn_history_store(
    store: Arc<dyn SessionStore>,
    user_key: Option<UserKey>,
) -> HistoryHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(HISTORY_COMMAND_CAPACITY);
    let (snapshot_tx, snapshot_rx) = watch::channel(HistorySnapshot::default());
    let (notice_tx, _) = broadcast::channel(NOTICE_BROADCAST_CAPACITY);
    let (completion_tx, completion_rx) = mpsc::unbounded_channel();

    let actor = HistoryStore {
        store,
        user_key,
        view: HistoryView::new(),
        generation: 0,
        confirmed_deletes: HashMap::new(),
        snapshot_tx,
        notice_tx: notice_tx.clone(),
        completion_tx,
        completion_rx,
    };

    tokio::spawn(actor.run(cmd_rx));

    HistoryHandle {
        cmd_tx,
        snapshot_rx,
        notice_tx,
    }
}
