//! Persistence collaborator.
//!
//! `SessionStore` is the seam to whatever holds chats durably; the history
//! store and session loading only ever talk to it through this trait.

mod memory;
mod store;

pub use memory::InMemorySessionStore;
pub use store::{Session, SessionStore, SessionStoreError};
