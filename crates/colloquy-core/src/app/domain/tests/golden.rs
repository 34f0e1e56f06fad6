#[cfg(test)]
mod tests {
    use crate::app::domain::action::Action;
    use crate::app::domain::delta::TurnEvent;
    use crate::app::domain::effect::Effect;
    use crate::app::domain::event::SessionEvent;
    use crate::app::domain::message::MessageContent;
    use crate::app::domain::reduce::reduce;
    use crate::app::domain::state::{SessionState, SessionStatus};
    use crate::app::domain::types::{MessageId, SessionId, TurnId};
    use crate::tools::{ToolDisplay, ToolInvocationState};
    use serde_json::json;

    fn deterministic_session_id() -> SessionId {
        SessionId::from(uuid::Uuid::from_u128(
            0x12345678_1234_1234_1234_123456789abc,
        ))
    }

    fn deterministic_turn_id(n: u128) -> TurnId {
        TurnId::from(uuid::Uuid::from_u128(n))
    }

    #[derive(Debug, Clone, PartialEq)]
    enum EffectSnapshot {
        EmitEvent { event_type: &'static str },
        RequestAssistantTurn { message_count: usize },
        CancelTurn,
        AnnounceCanonicalUrl,
        ReconcileHistory,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct StateSnapshot {
        message_count: usize,
        status: SessionStatus,
        url_announced: bool,
        tool_states: Vec<&'static str>,
    }

    fn snapshot_effect(effect: &Effect) -> EffectSnapshot {
        match effect {
            Effect::EmitEvent { event, .. } => EffectSnapshot::EmitEvent {
                event_type: match event {
                    SessionEvent::MessageAdded { .. } => "MessageAdded",
                    SessionEvent::MessageUpdated { .. } => "MessageUpdated",
                    SessionEvent::Hydrated { .. } => "Hydrated",
                    SessionEvent::TurnStarted { .. } => "TurnStarted",
                    SessionEvent::TurnFinished { .. } => "TurnFinished",
                    SessionEvent::TurnCancelled { .. } => "TurnCancelled",
                    SessionEvent::TurnFailed { .. } => "TurnFailed",
                    SessionEvent::CanonicalUrlAnnounced { .. } => "CanonicalUrlAnnounced",
                },
            },
            Effect::RequestAssistantTurn { messages, .. } => EffectSnapshot::RequestAssistantTurn {
                message_count: messages.len(),
            },
            Effect::CancelTurn { .. } => EffectSnapshot::CancelTurn,
            Effect::AnnounceCanonicalUrl { .. } => EffectSnapshot::AnnounceCanonicalUrl,
            Effect::ReconcileHistory { .. } => EffectSnapshot::ReconcileHistory,
        }
    }

    fn snapshot_state(state: &SessionState) -> StateSnapshot {
        StateSnapshot {
            message_count: state.messages.len(),
            status: state.status,
            url_announced: state.url_announced,
            tool_states: state
                .messages
                .iter()
                .flat_map(|m| m.tool_invocations.iter())
                .map(|inv| match inv.state {
                    ToolInvocationState::Pending => "pending",
                    ToolInvocationState::Result { .. } => "result",
                    ToolInvocationState::Cancelled => "cancelled",
                })
                .collect(),
        }
    }

    fn step(state: &mut SessionState, action: Action) -> Vec<EffectSnapshot> {
        reduce(state, action)
            .unwrap()
            .iter()
            .map(snapshot_effect)
            .collect()
    }

    fn stream(session_id: SessionId, turn_id: TurnId, event: TurnEvent) -> Action {
        Action::StreamEvent {
            session_id,
            turn_id,
            event,
        }
    }

    #[test]
    fn golden_paris_weather_turn() {
        let session_id = deterministic_session_id();
        let turn_id = deterministic_turn_id(1);
        let mut state = SessionState::new(session_id);

        let effects = step(
            &mut state,
            Action::UserInput {
                session_id,
                message_id: MessageId::from_string("u1"),
                turn_id,
                content: MessageContent::from("What's the weather in Paris?"),
                attachments: vec![],
            },
        );
        assert_eq!(
            effects,
            vec![
                EffectSnapshot::EmitEvent {
                    event_type: "MessageAdded"
                },
                EffectSnapshot::EmitEvent {
                    event_type: "TurnStarted"
                },
                EffectSnapshot::RequestAssistantTurn { message_count: 1 },
            ]
        );

        let effects = step(
            &mut state,
            stream(session_id, turn_id, TurnEvent::registered("t1", "getWeather")),
        );
        assert_eq!(
            effects,
            vec![EffectSnapshot::EmitEvent {
                event_type: "MessageAdded"
            }]
        );
        assert_eq!(
            snapshot_state(&state),
            StateSnapshot {
                message_count: 2,
                status: SessionStatus::Streaming,
                url_announced: false,
                tool_states: vec!["pending"],
            }
        );
        let assistant = &state.messages[1];
        assert!(matches!(
            assistant.tool_invocations.as_slice()[0].display(),
            ToolDisplay::Skeleton(_)
        ));

        let effects = step(
            &mut state,
            stream(
                session_id,
                turn_id,
                TurnEvent::resolved("t1", json!({"temp": 18})),
            ),
        );
        assert_eq!(
            effects,
            vec![EffectSnapshot::EmitEvent {
                event_type: "MessageUpdated"
            }]
        );
        assert_eq!(
            state.messages[1].tool_invocations.as_slice()[0].result(),
            Some(&json!({"temp": 18}))
        );

        let effects = step(
            &mut state,
            stream(session_id, turn_id, TurnEvent::TurnFinished),
        );
        assert_eq!(
            effects,
            vec![
                EffectSnapshot::EmitEvent {
                    event_type: "TurnFinished"
                },
                EffectSnapshot::AnnounceCanonicalUrl,
                EffectSnapshot::ReconcileHistory,
            ]
        );
        assert_eq!(
            snapshot_state(&state),
            StateSnapshot {
                message_count: 2,
                status: SessionStatus::Idle,
                url_announced: true,
                tool_states: vec!["result"],
            }
        );

        // A replayed finish frame for the same turn is stale.
        let effects = step(
            &mut state,
            stream(session_id, turn_id, TurnEvent::TurnFinished),
        );
        assert!(effects.is_empty());

        let effects = step(
            &mut state,
            Action::FinishTurn {
                session_id,
                turn_id: None,
            },
        );
        assert!(!effects.contains(&EffectSnapshot::AnnounceCanonicalUrl));
    }

    #[test]
    fn golden_stop_mid_turn_then_new_turn() {
        let session_id = deterministic_session_id();
        let first = deterministic_turn_id(1);
        let second = deterministic_turn_id(2);
        let mut state = SessionState::new(session_id);

        step(
            &mut state,
            Action::UserInput {
                session_id,
                message_id: MessageId::from_string("u1"),
                turn_id: first,
                content: MessageContent::from("Find flights to Lisbon"),
                attachments: vec![],
            },
        );
        step(&mut state, stream(session_id, first, TurnEvent::text("Searching")));
        step(
            &mut state,
            stream(session_id, first, TurnEvent::registered("t1", "searchFlights")),
        );

        let effects = step(&mut state, Action::Stop { session_id });
        assert_eq!(
            effects,
            vec![
                EffectSnapshot::EmitEvent {
                    event_type: "TurnCancelled"
                },
                EffectSnapshot::CancelTurn,
            ]
        );

        let effects = step(
            &mut state,
            stream(session_id, first, TurnEvent::resolved("t1", json!([]))),
        );
        assert!(effects.is_empty());

        let effects = step(
            &mut state,
            Action::UserInput {
                session_id,
                message_id: MessageId::from_string("u2"),
                turn_id: second,
                content: MessageContent::from("Try Porto instead"),
                attachments: vec![],
            },
        );
        assert_eq!(
            effects.last(),
            Some(&EffectSnapshot::RequestAssistantTurn { message_count: 3 })
        );

        step(&mut state, stream(session_id, second, TurnEvent::text("Here you go")));
        let effects = step(&mut state, stream(session_id, second, TurnEvent::TurnFinished));

        // The cancelled turn never finished, so this is the first announcement.
        assert!(effects.contains(&EffectSnapshot::AnnounceCanonicalUrl));
        assert_eq!(
            snapshot_state(&state),
            StateSnapshot {
                message_count: 4,
                status: SessionStatus::Idle,
                url_announced: true,
                tool_states: vec!["cancelled"],
            }
        );
    }

    #[test]
    fn golden_empty_turn_creates_no_assistant_message() {
        let session_id = deterministic_session_id();
        let turn_id = deterministic_turn_id(7);
        let mut state = SessionState::new(session_id);

        step(
            &mut state,
            Action::UserInput {
                session_id,
                message_id: MessageId::from_string("u1"),
                turn_id,
                content: MessageContent::from("ping"),
                attachments: vec![],
            },
        );
        let effects = step(&mut state, stream(session_id, turn_id, TurnEvent::TurnFinished));

        assert_eq!(state.messages.len(), 1);
        assert!(effects.contains(&EffectSnapshot::AnnounceCanonicalUrl));
    }
}
