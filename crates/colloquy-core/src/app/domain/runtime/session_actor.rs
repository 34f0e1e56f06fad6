use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::app::domain::action::Action;
use crate::app::domain::effect::Effect;
use crate::app::domain::event::SessionEvent;
use crate::app::domain::message::{Message, MessageContent};
use crate::app::domain::reduce::{InvalidActionKind, ProtocolViolation, ReduceError, reduce};
use crate::app::domain::state::SessionState;
use crate::app::domain::types::{MessageId, SessionId, TurnId, UserKey};
use crate::attachments::Attachment;
use crate::config::SessionSettings;
use crate::error::Notice;
use crate::history::HistoryHandle;
use crate::session::{Session, SessionStore};

use super::assistant::{AssistantBackend, TurnRequest};
use super::location::LocationSink;
use super::subscription::{SessionEventEnvelope, SessionEventSubscription, UnsubscribeSignal};

const INTERNAL_ACTION_CAPACITY: usize = 64;

pub(crate) enum SessionCmd {
    Dispatch {
        action: Box<Action>,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Subscribe {
        reply: oneshot::Sender<SessionEventSubscription>,
    },
    GetState {
        reply: oneshot::Sender<SessionState>,
    },
    Shutdown {
        reply: Option<oneshot::Sender<()>>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        kind: InvalidActionKind,
    },

    #[error("Turn {turn_id} aborted: {violation}")]
    TurnAborted {
        turn_id: TurnId,
        violation: ProtocolViolation,
    },

    #[error("Channel closed")]
    ChannelClosed,
}

impl SessionError {
    pub fn notice(&self) -> Notice {
        match self {
            SessionError::InvalidInput {
                kind: InvalidActionKind::Busy,
                ..
            } => Notice::error("Please wait for the model to finish its response!"),
            SessionError::InvalidInput { message, .. } => Notice::error(message.clone()),
            SessionError::TurnAborted { .. } => {
                Notice::error("The response could not be completed. Please try again.")
            }
            SessionError::ChannelClosed => Notice::error(self.to_string()),
        }
    }
}

impl From<ReduceError> for SessionError {
    fn from(err: ReduceError) -> Self {
        match err {
            ReduceError::InvalidAction { message, kind } => {
                SessionError::InvalidInput { message, kind }
            }
            ReduceError::Protocol {
                turn_id, violation, ..
            } => SessionError::TurnAborted { turn_id, violation },
        }
    }
}

/// Everything a session runtime needs besides its own state.
#[derive(Clone)]
pub struct SessionRuntimeConfig {
    pub settings: SessionSettings,
    pub backend: Arc<dyn AssistantBackend>,
    pub location: Arc<dyn LocationSink>,
    pub history: Option<HistoryHandle>,
    /// Where finished turns are persisted. Without a store or user key the
    /// session never becomes durable.
    pub store: Option<Arc<dyn SessionStore>>,
    pub user_key: Option<UserKey>,
}

#[derive(Clone)]
pub struct SessionHandle {
    session_id: SessionId,
    cmd_tx: mpsc::Sender<SessionCmd>,
}

impl SessionHandle {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub async fn dispatch(&self, action: Action) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCmd::Dispatch {
                action: Box::new(action),
                reply: reply_tx,
            })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        reply_rx.await.map_err(|_| SessionError::ChannelClosed)?
    }

    /// Appends a user message and starts an assistant turn for it.
    pub async fn submit(
        &self,
        content: impl Into<MessageContent>,
        attachments: Vec<Attachment>,
    ) -> Result<TurnId, SessionError> {
        let turn_id = TurnId::new();
        self.dispatch(Action::UserInput {
            session_id: self.session_id,
            message_id: MessageId::new(),
            turn_id,
            content: content.into(),
            attachments,
        })
        .await?;
        Ok(turn_id)
    }

    /// Cancels the running turn. A no-op when idle.
    pub async fn stop(&self) -> Result<(), SessionError> {
        self.dispatch(Action::Stop {
            session_id: self.session_id,
        })
        .await
    }

    pub async fn finish_turn(&self) -> Result<(), SessionError> {
        self.dispatch(Action::FinishTurn {
            session_id: self.session_id,
            turn_id: None,
        })
        .await
    }

    pub async fn subscribe(&self) -> Result<SessionEventSubscription, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCmd::Subscribe { reply: reply_tx })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        reply_rx.await.map_err(|_| SessionError::ChannelClosed)
    }

    pub async fn state(&self) -> Result<SessionState, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCmd::GetState { reply: reply_tx })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        reply_rx.await.map_err(|_| SessionError::ChannelClosed)
    }

    pub async fn messages(&self) -> Result<Vec<Message>, SessionError> {
        Ok(self.state().await?.messages)
    }

    pub fn shutdown(&self) {
        let _ = self.cmd_tx.try_send(SessionCmd::Shutdown { reply: None });
    }

    /// Stops the actor and waits until every queued save has reached the
    /// store. Nothing of this session is written after it returns.
    pub async fn close(&self) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(SessionCmd::Shutdown {
                reply: Some(reply_tx),
            })
            .await
            .is_err()
        {
            // Already stopped, and the actor flushes before it stops.
            return;
        }
        let _ = reply_rx.await;
    }
}

/// Saves snapshots of one session in the order they were taken.
struct Persister {
    tx: mpsc::UnboundedSender<Session>,
    task: JoinHandle<()>,
}

impl Persister {
    fn spawn(store: Arc<dyn SessionStore>, history: Option<HistoryHandle>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(persist_sessions(store, history, rx));
        Self { tx, task }
    }

    async fn flush(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            tracing::error!(
                target: "core.session_store",
                error = %e,
                "Session persistence task failed"
            );
        }
    }
}

async fn persist_sessions(
    store: Arc<dyn SessionStore>,
    history: Option<HistoryHandle>,
    mut rx: mpsc::UnboundedReceiver<Session>,
) {
    while let Some(session) = rx.recv().await {
        if let Err(e) = store.save_session(&session).await {
            tracing::error!(
                target: "core.session_store",
                session_id = %session.id,
                error = %e,
                "Failed to persist session"
            );
            continue;
        }

        if let Some(history) = &history {
            history.refresh_in_background();
        }
    }
}

struct SessionActor {
    session_id: SessionId,
    state: SessionState,
    runtime: SessionRuntimeConfig,
    active_turns: HashMap<TurnId, CancellationToken>,
    event_broadcast: broadcast::Sender<SessionEventEnvelope>,
    next_seq: u64,
    subscriber_count: usize,
    unsubscribe_rx: mpsc::UnboundedReceiver<UnsubscribeSignal>,
    unsubscribe_tx: mpsc::UnboundedSender<UnsubscribeSignal>,
    internal_action_tx: mpsc::Sender<Action>,
    internal_action_rx: mpsc::Receiver<Action>,
    /// Present when the session can become durable.
    persister: Option<Persister>,
}

impl SessionActor {
    fn new(session_id: SessionId, runtime: SessionRuntimeConfig) -> Self {
        let state = SessionState::new(session_id).with_max_steps(runtime.settings.max_steps);
        let (event_broadcast, _) = broadcast::channel(runtime.settings.event_capacity.max(1));
        let (unsubscribe_tx, unsubscribe_rx) = mpsc::unbounded_channel();
        let (internal_action_tx, internal_action_rx) = mpsc::channel(INTERNAL_ACTION_CAPACITY);
        let persister = match (&runtime.store, &runtime.user_key) {
            (Some(store), Some(_)) => Some(Persister::spawn(store.clone(), runtime.history.clone())),
            _ => None,
        };

        Self {
            session_id,
            state,
            runtime,
            active_turns: HashMap::new(),
            event_broadcast,
            next_seq: 0,
            subscriber_count: 0,
            unsubscribe_rx,
            unsubscribe_tx,
            internal_action_tx,
            internal_action_rx,
            persister,
        }
    }

    async fn run(mut self, mut cmd_rx: mpsc::Receiver<SessionCmd>, initial_messages: Vec<Message>) {
        if !initial_messages.is_empty() {
            let action = Action::Hydrate {
                session_id: self.session_id,
                messages: initial_messages,
            };
            if let Err(e) = self.handle_action(action).await {
                tracing::error!(
                    session_id = %self.session_id,
                    error = %e,
                    "Failed to seed session with persisted messages"
                );
            }
        }

        let mut shutdown_reply = None;

        loop {
            tokio::select! {
                biased;

                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(SessionCmd::Dispatch { action, reply }) => {
                            let result = self.handle_action(*action).await;
                            let _ = reply.send(result);
                        }
                        Some(SessionCmd::Subscribe { reply }) => {
                            let subscription = self.create_subscription();
                            let _ = reply.send(subscription);
                        }
                        Some(SessionCmd::GetState { reply }) => {
                            let _ = reply.send(self.state.clone());
                        }
                        Some(SessionCmd::Shutdown { reply }) => {
                            shutdown_reply = reply;
                            break;
                        }
                        None => break,
                    }
                }

                Some(action) = self.internal_action_rx.recv() => {
                    if let Err(e) = self.handle_action(action).await {
                        tracing::warn!(
                            session_id = %self.session_id,
                            error = %e,
                            "Failed to handle stream action"
                        );
                    }
                }

                Some(UnsubscribeSignal) = self.unsubscribe_rx.recv() => {
                    self.subscriber_count = self.subscriber_count.saturating_sub(1);
                    tracing::debug!(
                        session_id = %self.session_id,
                        subscriber_count = self.subscriber_count,
                        "Subscriber disconnected"
                    );
                }
            }
        }

        self.cancel_all_turns();
        if let Some(persister) = self.persister.take() {
            persister.flush().await;
        }
        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }

        tracing::debug!(session_id = %self.session_id, "Session actor stopped");
    }

    async fn handle_action(&mut self, action: Action) -> Result<(), SessionError> {
        let effects = match reduce(&mut self.state, action) {
            Ok(effects) => effects,
            Err(ReduceError::Protocol {
                turn_id,
                violation,
                cancelled_tool_calls,
            }) => {
                self.cancel_turn(turn_id);
                self.broadcast(SessionEvent::TurnFailed {
                    turn_id,
                    reason: violation.to_string(),
                    cancelled_tool_calls,
                });
                return Err(SessionError::TurnAborted { turn_id, violation });
            }
            Err(err) => return Err(err.into()),
        };

        for effect in effects {
            self.handle_effect(effect).await;
        }

        let current = self.state.current_turn_id();
        self.active_turns.retain(|turn_id, _| Some(*turn_id) == current);

        Ok(())
    }

    async fn handle_effect(&mut self, effect: Effect) {
        match effect {
            Effect::EmitEvent { event, .. } => self.broadcast(event),

            Effect::RequestAssistantTurn {
                session_id,
                turn_id,
                messages,
            } => {
                let cancel_token = self.active_turns.entry(turn_id).or_default().clone();
                let backend = self.runtime.backend.clone();
                let action_tx = self.internal_action_tx.clone();

                tokio::spawn(async move {
                    let request = TurnRequest {
                        session_id,
                        turn_id,
                        messages,
                    };
                    stream_turn(backend, request, cancel_token, action_tx).await;
                });
            }

            Effect::CancelTurn { turn_id, .. } => self.cancel_turn(turn_id),

            Effect::AnnounceCanonicalUrl { session_id } => {
                let url = self.runtime.settings.canonical_url(session_id);
                self.runtime.location.replace_location(&url);
                tracing::info!(session_id = %session_id, url = %url, "Canonical URL announced");
                self.broadcast(SessionEvent::CanonicalUrlAnnounced { url });
            }

            Effect::ReconcileHistory { session_id } => self.reconcile_history(session_id),
        }
    }

    /// Queues a snapshot for saving; the history reloads once it is stored.
    /// Without a store, the history reloads straight away.
    fn reconcile_history(&self, session_id: SessionId) {
        let (Some(persister), Some(user_key)) = (&self.persister, &self.runtime.user_key) else {
            if let Some(history) = &self.runtime.history {
                history.refresh_in_background();
            }
            return;
        };

        let session =
            Session::new(session_id, user_key.clone()).with_messages(self.state.messages.clone());
        if persister.tx.send(session).is_err() {
            tracing::error!(
                target: "core.session_store",
                session_id = %session_id,
                "Session persistence task has stopped"
            );
        }
    }

    fn broadcast(&mut self, event: SessionEvent) {
        let envelope = SessionEventEnvelope {
            seq: self.next_seq,
            event,
        };
        self.next_seq += 1;
        let _ = self.event_broadcast.send(envelope);
    }

    fn create_subscription(&mut self) -> SessionEventSubscription {
        self.subscriber_count += 1;
        tracing::debug!(
            session_id = %self.session_id,
            subscriber_count = self.subscriber_count,
            "New subscriber"
        );

        let rx = self.event_broadcast.subscribe();
        SessionEventSubscription::new(self.session_id, rx, self.unsubscribe_tx.clone())
    }

    fn cancel_turn(&mut self, turn_id: TurnId) {
        if let Some(token) = self.active_turns.remove(&turn_id) {
            token.cancel();
        }
    }

    fn cancel_all_turns(&mut self) {
        for (_, token) in self.active_turns.drain() {
            token.cancel();
        }
    }
}

/// Forwards one turn's events to the actor, tagged with the turn id, until
/// the turn finishes, fails or is cancelled.
async fn stream_turn(
    backend: Arc<dyn AssistantBackend>,
    request: TurnRequest,
    cancel_token: CancellationToken,
    action_tx: mpsc::Sender<Action>,
) {
    let session_id = request.session_id;
    let turn_id = request.turn_id;

    let opened = tokio::select! {
        () = cancel_token.cancelled() => return,
        opened = backend.start_turn(request) => opened,
    };

    let mut stream = match opened {
        Ok(stream) => stream,
        Err(e) => {
            tracing::error!(
                session_id = %session_id,
                turn_id = %turn_id,
                error = %e,
                "Failed to start assistant turn"
            );
            let _ = action_tx
                .send(Action::TurnFailed {
                    session_id,
                    turn_id,
                    error: format!("Backend: {e}"),
                })
                .await;
            return;
        }
    };

    loop {
        let next = tokio::select! {
            biased;
            () = cancel_token.cancelled() => {
                tracing::debug!(session_id = %session_id, turn_id = %turn_id, "Turn stream cancelled");
                return;
            }
            next = stream.next() => next,
        };

        let action = match next {
            Some(Ok(event)) => {
                let finished = event.is_finish();
                let action = Action::StreamEvent {
                    session_id,
                    turn_id,
                    event,
                };
                if action_tx.send(action).await.is_err() || finished {
                    return;
                }
                continue;
            }
            Some(Err(e)) => {
                tracing::warn!(
                    session_id = %session_id,
                    turn_id = %turn_id,
                    error = %e,
                    "Assistant stream failed"
                );
                Action::TurnFailed {
                    session_id,
                    turn_id,
                    error: format!("Backend: {e}"),
                }
            }
            // A stream that ends without a finish frame still completes the turn.
            None => Action::FinishTurn {
                session_id,
                turn_id: Some(turn_id),
            },
        };

        let _ = action_tx.send(action).await;
        return;
    }
}

/// Spawns the actor for one session, seeded with `initial_messages` when
/// resuming a persisted chat.
pub fn spawn_session_actor(
    session_id: SessionId,
    initial_messages: Vec<Message>,
    runtime: SessionRuntimeConfig,
) -> SessionHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(runtime.settings.command_capacity.max(1));

    let actor = SessionActor::new(session_id, runtime);
    tokio::spawn(actor.run(cmd_rx, initial_messages));

    SessionHandle { session_id, cmd_tx }
}
