//! Sidebar history of past chats.
//!
//! - `HistoryView` is the pure list plus the optimistic-delete bookkeeping
//! - `HistoryStore` owns a view and is the only writer; everyone else holds a
//!   `HistoryHandle` and reads published snapshots

mod entry;
mod store;
mod view;

pub use entry::HistoryEntry;
pub use store::{DeleteTicket, HistoryError, HistoryHandle, HistorySnapshot, spawn_history_store};
pub use view::{Compensation, HistoryView};
