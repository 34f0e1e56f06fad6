//! Tool invocation lifecycle.
//!
//! - `ToolKind` is the closed set of tools a renderer knows about
//! - `ToolTracker` holds one message's invocations and enforces PENDING -> RESULT | CANCELLED
//! - `ToolDisplay` projects an invocation onto what should be shown

mod display;
mod kind;
mod tracker;

pub use display::ToolDisplay;
pub use kind::ToolKind;
pub use tracker::{ToolInvocation, ToolInvocationState, ToolTracker, TrackerError};
