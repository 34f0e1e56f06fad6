//! Domain tests module.
//!
//! - Golden tests: step-by-step snapshots of the effects and state of major flows
//! - Property tests: proptest-driven invariants of the reducer

mod golden;
