use std::collections::{HashMap, HashSet};

use super::entry::HistoryEntry;
use crate::app::domain::types::SessionId;

/// Undo record for one optimistic delete: the hidden entry and the id of the
/// entry that preceded it when it was hidden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compensation {
    pub entry: HistoryEntry,
    pub predecessor: Option<SessionId>,
}

/// The visible history list, and the ids hidden by in-flight deletes.
///
/// An id in `hidden` is never visible, whatever a listing says, until its
/// delete is confirmed or compensated.
#[derive(Debug, Clone, Default)]
pub struct HistoryView {
    entries: Vec<HistoryEntry>,
    hidden: HashSet<SessionId>,
    compensations: HashMap<SessionId, Compensation>,
}

impl HistoryView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.position(id).is_some()
    }

    pub fn is_hidden(&self, id: SessionId) -> bool {
        self.hidden.contains(&id)
    }

    pub fn pending_deletes(&self) -> usize {
        self.hidden.len()
    }

    pub fn compensation(&self, id: SessionId) -> Option<&Compensation> {
        self.compensations.get(&id)
    }

    /// Optimistically removes `id`. Returns false if a delete for it is
    /// already in flight.
    pub fn hide(&mut self, id: SessionId) -> bool {
        if !self.hidden.insert(id) {
            return false;
        }

        if let Some(index) = self.position(id) {
            let predecessor = index
                .checked_sub(1)
                .and_then(|i| self.entries.get(i))
                .map(|e| e.id);
            let entry = self.entries.remove(index);
            self.compensations
                .insert(id, Compensation { entry, predecessor });
        }

        true
    }

    /// The delete succeeded; drop its undo record.
    pub fn confirm(&mut self, id: SessionId) {
        self.hidden.remove(&id);
        self.compensations.remove(&id);
    }

    /// The delete failed; put the entry back after its predecessor, or at
    /// the head if the predecessor is gone. Returns whether the entry became
    /// visible again.
    pub fn compensate(&mut self, id: SessionId) -> bool {
        self.hidden.remove(&id);

        let Some(Compensation { entry, predecessor }) = self.compensations.remove(&id) else {
            return false;
        };

        if self.contains(id) {
            return false;
        }

        let index = predecessor
            .and_then(|p| self.position(p))
            .map_or(0, |i| i + 1);
        self.entries.insert(index, entry);
        true
    }

    /// Replaces the visible list with a server listing, keeping in-flight
    /// deletes hidden. Undo records of hidden entries are refreshed from the
    /// listing so a later compensation reinserts current data.
    pub fn replace_with(&mut self, listing: Vec<HistoryEntry>) {
        let mut previous_visible: Option<SessionId> = None;
        let mut entries = Vec::with_capacity(listing.len());

        for entry in listing {
            if self.hidden.contains(&entry.id) {
                self.compensations.insert(
                    entry.id,
                    Compensation {
                        entry,
                        predecessor: previous_visible,
                    },
                );
                continue;
            }

            if entries.iter().any(|e: &HistoryEntry| e.id == entry.id) {
                continue;
            }

            previous_visible = Some(entry.id);
            entries.push(entry);
        }

        self.entries = entries;
    }

    /// Empties the list, as for a signed-out user. In-flight deletes stay tracked.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn position(&self, id: SessionId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }
}
