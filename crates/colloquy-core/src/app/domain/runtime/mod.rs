mod assistant;
mod location;
mod orchestrator;
mod session_actor;
mod subscription;

pub use assistant::{AssistantBackend, AssistantError, TurnRequest, TurnStream};
#[cfg(any(test, feature = "test-utils"))]
pub use assistant::ScriptedAssistant;
pub use location::LocationSink;
#[cfg(any(test, feature = "test-utils"))]
pub use location::RecordingLocation;
pub use orchestrator::{Orchestrator, Route};
pub use session_actor::{SessionError, SessionHandle, SessionRuntimeConfig, spawn_session_actor};
pub use subscription::{SessionEventEnvelope, SessionEventSubscription};
