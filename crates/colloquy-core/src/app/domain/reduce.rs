use thiserror::Error;

use crate::app::domain::action::Action;
use crate::app::domain::delta::TurnEvent;
use crate::app::domain::effect::Effect;
use crate::app::domain::event::SessionEvent;
use crate::app::domain::message::{ContentDelta, Message, MessageContent};
use crate::app::domain::state::SessionState;
use crate::app::domain::types::{MessageId, SessionId, ToolCallId, TurnId};
use crate::attachments::Attachment;
use crate::tools::{ToolKind, TrackerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidActionKind {
    Busy,
    EmptyMessage,
    WrongSession,
}

/// A malformed or out-of-order stream. Fatal to the current turn only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("tool call {tool_call_id} resolved before it was registered")]
    ResolveBeforeRegister { tool_call_id: ToolCallId },

    #[error("tool call {tool_call_id} registered twice in this session")]
    DuplicateToolCall { tool_call_id: ToolCallId },

    #[error("text delta appended to structured content")]
    AppendToStructured,

    #[error("turn exceeded the limit of {limit} tool calls")]
    StepLimitExceeded { limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReduceError {
    #[error("Invalid action: {message}")]
    InvalidAction {
        message: String,
        kind: InvalidActionKind,
    },

    /// The turn has already been aborted when this is returned: the session is
    /// IDLE again and the turn's pending invocations are cancelled.
    #[error("Protocol violation in turn {turn_id}: {violation}")]
    Protocol {
        turn_id: TurnId,
        violation: ProtocolViolation,
        cancelled_tool_calls: Vec<ToolCallId>,
    },
}

impl ReduceError {
    fn invalid(kind: InvalidActionKind, message: impl Into<String>) -> Self {
        Self::InvalidAction {
            message: message.into(),
            kind,
        }
    }
}

pub fn reduce(state: &mut SessionState, action: Action) -> Result<Vec<Effect>, ReduceError> {
    if action.session_id() != state.session_id {
        return Err(ReduceError::invalid(
            InvalidActionKind::WrongSession,
            format!(
                "action for session {} dispatched to session {}",
                action.session_id(),
                state.session_id
            ),
        ));
    }

    match action {
        Action::UserInput {
            session_id,
            message_id,
            turn_id,
            content,
            attachments,
        } => handle_user_input(state, session_id, message_id, turn_id, content, attachments),

        Action::StreamEvent {
            session_id,
            turn_id,
            event,
        } => handle_stream_event(state, session_id, turn_id, event),

        Action::FinishTurn {
            session_id,
            turn_id,
        } => Ok(handle_finish_turn(state, session_id, turn_id)),

        Action::TurnFailed {
            session_id,
            turn_id,
            error,
        } => Ok(handle_turn_failed(state, session_id, turn_id, error)),

        Action::Stop { session_id } => Ok(handle_stop(state, session_id)),

        Action::Hydrate {
            session_id,
            messages,
        } => handle_hydrate(state, session_id, messages),
    }
}

fn handle_user_input(
    state: &mut SessionState,
    session_id: SessionId,
    message_id: MessageId,
    turn_id: TurnId,
    content: MessageContent,
    attachments: Vec<Attachment>,
) -> Result<Vec<Effect>, ReduceError> {
    if state.is_streaming() {
        return Err(ReduceError::invalid(
            InvalidActionKind::Busy,
            "a turn is already streaming; stop it before sending another message",
        ));
    }
    if content.is_empty() && attachments.is_empty() {
        return Err(ReduceError::invalid(
            InvalidActionKind::EmptyMessage,
            "message has neither content nor attachments",
        ));
    }

    let message = Message::user(message_id.clone(), session_id, content, attachments);
    state.messages.push(message.clone());
    state.start_turn(turn_id, message_id);

    Ok(vec![
        Effect::EmitEvent {
            session_id,
            event: SessionEvent::MessageAdded { message },
        },
        Effect::EmitEvent {
            session_id,
            event: SessionEvent::TurnStarted { turn_id },
        },
        Effect::RequestAssistantTurn {
            session_id,
            turn_id,
            messages: state.messages.clone(),
        },
    ])
}

fn handle_stream_event(
    state: &mut SessionState,
    session_id: SessionId,
    turn_id: TurnId,
    event: TurnEvent,
) -> Result<Vec<Effect>, ReduceError> {
    if state.current_turn_id() != Some(turn_id) {
        tracing::debug!(
            session_id = %session_id,
            turn_id = %turn_id,
            "Dropping stream event for a turn that is no longer running"
        );
        return Ok(vec![]);
    }

    match event {
        TurnEvent::ContentDelta { delta } => handle_content_delta(state, session_id, turn_id, delta),
        TurnEvent::ToolCallRegistered {
            tool_call_id,
            tool_name,
        } => handle_tool_call_registered(state, session_id, turn_id, tool_call_id, tool_name),
        TurnEvent::ToolCallResolved {
            tool_call_id,
            result,
        } => handle_tool_call_resolved(state, session_id, turn_id, &tool_call_id, result),
        TurnEvent::TurnFinished => Ok(handle_finish_turn(state, session_id, Some(turn_id))),
    }
}

fn handle_content_delta(
    state: &mut SessionState,
    session_id: SessionId,
    turn_id: TurnId,
    delta: ContentDelta,
) -> Result<Vec<Effect>, ReduceError> {
    let (message_id, created) = ensure_assistant_message(state, session_id);

    let applied = match state.message_mut(&message_id) {
        Some(message) => match (delta, &mut message.content) {
            (ContentDelta::Append { text }, MessageContent::Text(existing)) => {
                existing.push_str(&text);
                true
            }
            (ContentDelta::Append { .. }, MessageContent::Structured(_)) => false,
            (ContentDelta::Replace { content }, current) => {
                *current = content;
                true
            }
        },
        None => return Ok(vec![]),
    };

    if !applied {
        return Err(abort_turn(
            state,
            turn_id,
            ProtocolViolation::AppendToStructured,
        ));
    }

    Ok(message_changed(state, session_id, &message_id, created))
}

fn handle_tool_call_registered(
    state: &mut SessionState,
    session_id: SessionId,
    turn_id: TurnId,
    tool_call_id: ToolCallId,
    tool_name: ToolKind,
) -> Result<Vec<Effect>, ReduceError> {
    if state.tool_call_index.contains_key(&tool_call_id) {
        return Err(abort_turn(
            state,
            turn_id,
            ProtocolViolation::DuplicateToolCall { tool_call_id },
        ));
    }

    let limit = state.max_steps;
    let steps = state.current_turn.as_ref().map_or(0, |turn| turn.steps);
    if steps >= limit {
        return Err(abort_turn(
            state,
            turn_id,
            ProtocolViolation::StepLimitExceeded { limit },
        ));
    }

    let (message_id, created) = ensure_assistant_message(state, session_id);
    let registered = match state.message_mut(&message_id) {
        Some(message) => message
            .tool_invocations
            .register_call(tool_call_id.clone(), tool_name)
            .map(|_| ()),
        None => return Ok(vec![]),
    };

    if let Err(e) = registered {
        return Err(abort_turn(
            state,
            turn_id,
            ProtocolViolation::DuplicateToolCall {
                tool_call_id: e.tool_call_id().clone(),
            },
        ));
    }

    state.tool_call_index.insert(tool_call_id, message_id.clone());
    if let Some(turn) = state.current_turn.as_mut() {
        turn.steps += 1;
    }

    Ok(message_changed(state, session_id, &message_id, created))
}

fn handle_tool_call_resolved(
    state: &mut SessionState,
    session_id: SessionId,
    turn_id: TurnId,
    tool_call_id: &ToolCallId,
    result: serde_json::Value,
) -> Result<Vec<Effect>, ReduceError> {
    let Some(owner) = state.tool_call_index.get(tool_call_id).cloned() else {
        return Err(abort_turn(
            state,
            turn_id,
            ProtocolViolation::ResolveBeforeRegister {
                tool_call_id: tool_call_id.clone(),
            },
        ));
    };

    if state.is_frozen(&owner) {
        tracing::warn!(
            session_id = %session_id,
            tool_call_id = %tool_call_id,
            message_id = %owner,
            "Dropping result for a tool call of a finished turn"
        );
        return Ok(vec![]);
    }

    let resolved = match state.message_mut(&owner) {
        Some(message) => message
            .tool_invocations
            .resolve(tool_call_id, result)
            .map(|_| ()),
        None => return Ok(vec![]),
    };

    match resolved {
        Ok(_) => Ok(message_changed(state, session_id, &owner, false)),
        Err(e @ (TrackerError::AlreadyResolved { .. } | TrackerError::Cancelled { .. })) => {
            tracing::warn!(
                session_id = %session_id,
                tool_call_id = %tool_call_id,
                error = %e,
                "Dropping duplicate tool result"
            );
            Ok(vec![])
        }
        Err(TrackerError::UnknownInvocation { .. } | TrackerError::DuplicateInvocation { .. }) => {
            Err(abort_turn(
                state,
                turn_id,
                ProtocolViolation::ResolveBeforeRegister {
                    tool_call_id: tool_call_id.clone(),
                },
            ))
        }
    }
}

fn handle_finish_turn(
    state: &mut SessionState,
    session_id: SessionId,
    target: Option<TurnId>,
) -> Vec<Effect> {
    let turn_id = match state.current_turn_id() {
        Some(current) if target.is_none_or(|t| t == current) => current,
        _ => {
            tracing::debug!(session_id = %session_id, "Ignoring finish for a turn that is not running");
            return vec![];
        }
    };

    let finished = state.end_turn();
    let message_id = finished.and_then(|turn| turn.assistant_message_id);

    let mut effects = vec![Effect::EmitEvent {
        session_id,
        event: SessionEvent::TurnFinished {
            turn_id,
            message_id,
        },
    }];

    if !state.url_announced {
        state.url_announced = true;
        effects.push(Effect::AnnounceCanonicalUrl { session_id });
    }

    effects.push(Effect::ReconcileHistory { session_id });
    effects
}

fn handle_turn_failed(
    state: &mut SessionState,
    session_id: SessionId,
    turn_id: TurnId,
    error: String,
) -> Vec<Effect> {
    if state.current_turn_id() != Some(turn_id) {
        tracing::debug!(
            session_id = %session_id,
            turn_id = %turn_id,
            "Ignoring failure of a turn that is no longer running"
        );
        return vec![];
    }

    let cancelled_tool_calls = end_turn_cancelling(state);

    vec![
        Effect::EmitEvent {
            session_id,
            event: SessionEvent::TurnFailed {
                turn_id,
                reason: error,
                cancelled_tool_calls,
            },
        },
        Effect::CancelTurn {
            session_id,
            turn_id,
        },
    ]
}

fn handle_stop(state: &mut SessionState, session_id: SessionId) -> Vec<Effect> {
    let Some(turn_id) = state.current_turn_id() else {
        return vec![];
    };

    let cancelled_tool_calls = end_turn_cancelling(state);

    vec![
        Effect::EmitEvent {
            session_id,
            event: SessionEvent::TurnCancelled {
                turn_id,
                cancelled_tool_calls,
            },
        },
        Effect::CancelTurn {
            session_id,
            turn_id,
        },
    ]
}

fn handle_hydrate(
    state: &mut SessionState,
    session_id: SessionId,
    messages: Vec<Message>,
) -> Result<Vec<Effect>, ReduceError> {
    if state.is_streaming() {
        return Err(ReduceError::invalid(
            InvalidActionKind::Busy,
            "cannot load messages while a turn is streaming",
        ));
    }

    state.hydrate(messages);

    Ok(vec![Effect::EmitEvent {
        session_id,
        event: SessionEvent::Hydrated {
            message_count: state.messages.len(),
        },
    }])
}

/// Returns the running turn's assistant message, creating it on first use.
fn ensure_assistant_message(state: &mut SessionState, session_id: SessionId) -> (MessageId, bool) {
    if let Some(id) = state
        .current_turn
        .as_ref()
        .and_then(|turn| turn.assistant_message_id.clone())
    {
        return (id, false);
    }

    let message = Message::assistant(MessageId::new(), session_id);
    let id = message.id.clone();
    state.messages.push(message);
    if let Some(turn) = state.current_turn.as_mut() {
        turn.assistant_message_id = Some(id.clone());
    }
    (id, true)
}

fn message_changed(
    state: &SessionState,
    session_id: SessionId,
    message_id: &MessageId,
    created: bool,
) -> Vec<Effect> {
    let Some(message) = state.message(message_id).cloned() else {
        return vec![];
    };

    let event = if created {
        SessionEvent::MessageAdded { message }
    } else {
        SessionEvent::MessageUpdated { message }
    };

    vec![Effect::EmitEvent { session_id, event }]
}

/// Ends the running turn and cancels whatever its assistant message still
/// has pending.
fn end_turn_cancelling(state: &mut SessionState) -> Vec<ToolCallId> {
    let Some(turn) = state.end_turn() else {
        return vec![];
    };

    turn.assistant_message_id
        .and_then(|id| state.message_mut(&id))
        .map(|message| message.tool_invocations.cancel_pending())
        .unwrap_or_default()
}

fn abort_turn(state: &mut SessionState, turn_id: TurnId, violation: ProtocolViolation) -> ReduceError {
    tracing::warn!(
        session_id = %state.session_id,
        turn_id = %turn_id,
        violation = %violation,
        "Aborting turn after protocol violation"
    );

    let cancelled_tool_calls = end_turn_cancelling(state);
    ReduceError::Protocol {
        turn_id,
        violation,
        cancelled_tool_calls,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::domain::state::SessionStatus;
    use crate::tools::ToolInvocationState;
    use serde_json::json;

    fn test_state() -> SessionState {
        SessionState::new(SessionId::new())
    }

    fn user_input(state: &mut SessionState, text: &str) -> TurnId {
        let turn_id = TurnId::new();
        let session_id = state.session_id;
        reduce(
            state,
            Action::UserInput {
                session_id,
                message_id: MessageId::new(),
                turn_id,
                content: MessageContent::from(text),
                attachments: vec![],
            },
        )
        .unwrap();
        turn_id
    }

    fn stream(
        state: &mut SessionState,
        turn_id: TurnId,
        event: TurnEvent,
    ) -> Result<Vec<Effect>, ReduceError> {
        let session_id = state.session_id;
        reduce(
            state,
            Action::StreamEvent {
                session_id,
                turn_id,
                event,
            },
        )
    }

    #[test]
    fn user_input_starts_turn_and_requests_assistant() {
        let mut state = test_state();
        let session_id = state.session_id;
        let turn_id = TurnId::new();

        let effects = reduce(
            &mut state,
            Action::UserInput {
                session_id,
                message_id: MessageId::from_string("m1"),
                turn_id,
                content: MessageContent::from("Hello"),
                attachments: vec![],
            },
        )
        .unwrap();

        assert_eq!(state.messages.len(), 1);
        assert!(state.messages[0].is_user());
        assert!(state.messages[0].tool_invocations.is_empty());
        assert_eq!(state.status, SessionStatus::Streaming);
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::RequestAssistantTurn { turn_id: t, messages, .. } if *t == turn_id && messages.len() == 1
        )));
    }

    #[test]
    fn user_input_while_streaming_is_rejected() {
        let mut state = test_state();
        user_input(&mut state, "first");
        let session_id = state.session_id;

        let err = reduce(
            &mut state,
            Action::UserInput {
                session_id,
                message_id: MessageId::new(),
                turn_id: TurnId::new(),
                content: MessageContent::from("second"),
                attachments: vec![],
            },
        )
        .unwrap_err();

        assert!(matches!(
            err,
            ReduceError::InvalidAction {
                kind: InvalidActionKind::Busy,
                ..
            }
        ));
        assert_eq!(state.messages.len(), 1);
    }

    #[test]
    fn empty_message_is_rejected_but_attachment_only_is_fine() {
        let mut state = test_state();
        let session_id = state.session_id;

        let err = reduce(
            &mut state,
            Action::UserInput {
                session_id,
                message_id: MessageId::new(),
                turn_id: TurnId::new(),
                content: MessageContent::from(""),
                attachments: vec![],
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ReduceError::InvalidAction {
                kind: InvalidActionKind::EmptyMessage,
                ..
            }
        ));

        reduce(
            &mut state,
            Action::UserInput {
                session_id,
                message_id: MessageId::new(),
                turn_id: TurnId::new(),
                content: MessageContent::from(""),
                attachments: vec![Attachment {
                    url: "https://files.example/a.png".to_string(),
                    name: "a.png".to_string(),
                    content_type: "image/png".to_string(),
                }],
            },
        )
        .unwrap();
        assert_eq!(state.messages[0].attachments.len(), 1);
    }

    #[test]
    fn deltas_create_then_extend_assistant_message() {
        let mut state = test_state();
        let turn_id = user_input(&mut state, "hi");

        let effects = stream(&mut state, turn_id, TurnEvent::text("Hel")).unwrap();
        assert!(matches!(
            effects.as_slice(),
            [Effect::EmitEvent {
                event: SessionEvent::MessageAdded { .. },
                ..
            }]
        ));

        let effects = stream(&mut state, turn_id, TurnEvent::text("lo")).unwrap();
        assert!(matches!(
            effects.as_slice(),
            [Effect::EmitEvent {
                event: SessionEvent::MessageUpdated { .. },
                ..
            }]
        ));

        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[1].text(), Some("Hello"));
    }

    #[test]
    fn replace_delta_sets_structured_content_and_append_then_violates() {
        let mut state = test_state();
        let turn_id = user_input(&mut state, "show me a card");

        stream(
            &mut state,
            turn_id,
            TurnEvent::ContentDelta {
                delta: ContentDelta::Replace {
                    content: MessageContent::Structured(json!({"card": "flight"})),
                },
            },
        )
        .unwrap();

        let err = stream(&mut state, turn_id, TurnEvent::text("more")).unwrap_err();
        assert!(matches!(
            err,
            ReduceError::Protocol {
                violation: ProtocolViolation::AppendToStructured,
                ..
            }
        ));
        assert_eq!(state.status, SessionStatus::Idle);
    }

    #[test]
    fn resolve_before_register_aborts_turn() {
        let mut state = test_state();
        let turn_id = user_input(&mut state, "weather?");
        stream(&mut state, turn_id, TurnEvent::registered("t1", "getWeather")).unwrap();

        let err = stream(&mut state, turn_id, TurnEvent::resolved("t2", json!({}))).unwrap_err();

        let ReduceError::Protocol {
            violation,
            cancelled_tool_calls,
            ..
        } = err
        else {
            unreachable!("expected protocol violation")
        };
        assert_eq!(
            violation,
            ProtocolViolation::ResolveBeforeRegister {
                tool_call_id: ToolCallId::from_string("t2")
            }
        );
        assert_eq!(cancelled_tool_calls, vec![ToolCallId::from_string("t1")]);
        assert_eq!(state.status, SessionStatus::Idle);
        assert!(state.current_turn.is_none());

        // Session stays usable for a new turn.
        user_input(&mut state, "try again");
        assert!(state.is_streaming());
    }

    #[test]
    fn duplicate_resolve_is_dropped_and_turn_continues() {
        let mut state = test_state();
        let turn_id = user_input(&mut state, "weather?");
        stream(&mut state, turn_id, TurnEvent::registered("t1", "getWeather")).unwrap();
        stream(&mut state, turn_id, TurnEvent::resolved("t1", json!({"temp": 18}))).unwrap();

        let effects = stream(&mut state, turn_id, TurnEvent::resolved("t1", json!({"temp": 99})))
            .unwrap();

        assert!(effects.is_empty());
        assert!(state.is_streaming());
        let invocation = state.messages[1]
            .tool_invocations
            .get(&ToolCallId::from_string("t1"))
            .unwrap();
        assert_eq!(invocation.result(), Some(&json!({"temp": 18})));
    }

    #[test]
    fn duplicate_registration_across_turns_is_a_violation() {
        let mut state = test_state();
        let first = user_input(&mut state, "one");
        stream(&mut state, first, TurnEvent::registered("t1", "getWeather")).unwrap();
        stream(&mut state, first, TurnEvent::resolved("t1", json!({}))).unwrap();
        stream(&mut state, first, TurnEvent::TurnFinished).unwrap();

        let second = user_input(&mut state, "two");
        let err = stream(&mut state, second, TurnEvent::registered("t1", "getWeather")).unwrap_err();
        assert!(matches!(
            err,
            ReduceError::Protocol {
                violation: ProtocolViolation::DuplicateToolCall { .. },
                ..
            }
        ));
    }

    #[test]
    fn step_limit_aborts_turn() {
        let mut state = test_state().with_max_steps(2);
        let turn_id = user_input(&mut state, "book everything");
        stream(&mut state, turn_id, TurnEvent::registered("t1", "searchFlights")).unwrap();
        stream(&mut state, turn_id, TurnEvent::registered("t2", "selectSeats")).unwrap();

        let err = stream(&mut state, turn_id, TurnEvent::registered("t3", "createReservation"))
            .unwrap_err();

        assert!(matches!(
            err,
            ReduceError::Protocol {
                violation: ProtocolViolation::StepLimitExceeded { limit: 2 },
                ..
            }
        ));
        assert_eq!(state.messages[1].tool_invocations.len(), 2);
    }

    #[test]
    fn finish_announces_url_only_once_per_session() {
        let mut state = test_state();
        let session_id = state.session_id;

        let turn_id = user_input(&mut state, "first");
        stream(&mut state, turn_id, TurnEvent::text("answer")).unwrap();
        let effects = stream(&mut state, turn_id, TurnEvent::TurnFinished).unwrap();
        assert_eq!(
            effects
                .iter()
                .filter(|e| matches!(e, Effect::AnnounceCanonicalUrl { .. }))
                .count(),
            1
        );

        let duplicate = reduce(
            &mut state,
            Action::FinishTurn {
                session_id,
                turn_id: None,
            },
        )
        .unwrap();
        assert!(duplicate.is_empty());

        let turn_id = user_input(&mut state, "second");
        let effects = stream(&mut state, turn_id, TurnEvent::TurnFinished).unwrap();
        assert!(
            !effects
                .iter()
                .any(|e| matches!(e, Effect::AnnounceCanonicalUrl { .. }))
        );
        assert!(
            effects
                .iter()
                .any(|e| matches!(e, Effect::ReconcileHistory { .. }))
        );
    }

    #[test]
    fn finish_freezes_the_turns_assistant_message() {
        let mut state = test_state();
        let turn_id = user_input(&mut state, "weather?");
        stream(&mut state, turn_id, TurnEvent::registered("t1", "getWeather")).unwrap();
        stream(&mut state, turn_id, TurnEvent::TurnFinished).unwrap();

        let assistant_id = state.messages[1].id.clone();
        assert!(state.is_frozen(&assistant_id));

        let next = user_input(&mut state, "and tomorrow?");
        let effects = stream(&mut state, next, TurnEvent::resolved("t1", json!({"temp": 1}))).unwrap();
        assert!(effects.is_empty());
        assert!(state.messages[1].tool_invocations.as_slice()[0]
            .state
            .is_pending());
        assert!(state.is_streaming());
    }

    #[test]
    fn stop_cancels_pending_and_late_result_is_ignored() {
        let mut state = test_state();
        let session_id = state.session_id;
        let turn_id = user_input(&mut state, "flights?");
        stream(&mut state, turn_id, TurnEvent::registered("t1", "searchFlights")).unwrap();
        stream(&mut state, turn_id, TurnEvent::registered("t2", "getWeather")).unwrap();
        stream(&mut state, turn_id, TurnEvent::resolved("t2", json!({"temp": 5}))).unwrap();

        let effects = reduce(&mut state, Action::Stop { session_id }).unwrap();
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::CancelTurn { turn_id: t, .. } if *t == turn_id
        )));
        assert_eq!(state.status, SessionStatus::Idle);

        let late = stream(&mut state, turn_id, TurnEvent::resolved("t1", json!({}))).unwrap();
        assert!(late.is_empty());

        let invocations = state.messages[1].tool_invocations.as_slice();
        assert_eq!(invocations[0].state, ToolInvocationState::Cancelled);
        assert!(matches!(
            invocations[1].state,
            ToolInvocationState::Result { .. }
        ));

        // Idempotent while idle.
        assert!(reduce(&mut state, Action::Stop { session_id }).unwrap().is_empty());
    }

    #[test]
    fn backend_failure_ends_turn() {
        let mut state = test_state();
        let session_id = state.session_id;
        let turn_id = user_input(&mut state, "hello");

        let effects = reduce(
            &mut state,
            Action::TurnFailed {
                session_id,
                turn_id,
                error: "connection reset".to_string(),
            },
        )
        .unwrap();

        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::EmitEvent { event: SessionEvent::TurnFailed { reason, .. }, .. } if reason == "connection reset"
        )));
        assert!(!state.is_streaming());
        assert!(!state.url_announced);
    }

    #[test]
    fn wrong_session_is_rejected() {
        let mut state = test_state();
        let err = reduce(
            &mut state,
            Action::Stop {
                session_id: SessionId::new(),
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ReduceError::InvalidAction {
                kind: InvalidActionKind::WrongSession,
                ..
            }
        ));
    }

    #[test]
    fn hydrate_seeds_log_and_index() {
        let session_id = SessionId::new();
        let mut source = SessionState::new(session_id);
        let turn_id = user_input(&mut source, "weather?");
        stream(&mut source, turn_id, TurnEvent::registered("t1", "getWeather")).unwrap();
        stream(&mut source, turn_id, TurnEvent::TurnFinished).unwrap();

        let mut state = SessionState::new(session_id);
        reduce(
            &mut state,
            Action::Hydrate {
                session_id,
                messages: source.messages.clone(),
            },
        )
        .unwrap();

        assert_eq!(state.messages, source.messages);
        assert!(state.url_announced);
        assert!(
            state
                .tool_call_index
                .contains_key(&ToolCallId::from_string("t1"))
        );
    }
}
