//! Notification store and reconciliation rules
//!
//! Rules:
//! - `replace_all` swaps the whole feed for the server's ordering
//! - `prepend` inserts at the head; a record whose id is already present is
//!   replaced in place instead of duplicated
//! - `mark_read` / `remove` on an unknown id change nothing
//!
//! Every mutation that changes the feed publishes a new [`FeedSnapshot`].
//! Mutations that change nothing publish nothing.

use crate::snapshot::FeedSnapshot;
use bell_model::{NotificationId, NotificationRecord};
use std::collections::HashSet;
use tokio::sync::watch;

/// How to reverse an optimistic mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Undo {
    /// Mutation changed nothing
    Nothing,
    /// Mark the record unread again
    MarkRead {
        /// Record that was marked read
        id: NotificationId,
    },
    /// Mark these records unread again
    MarkAllRead {
        /// Records that were unread before
        ids: Vec<NotificationId>,
    },
    /// Put the record back where it was
    Remove {
        /// Former position
        index: usize,
        /// The removed record
        record: NotificationRecord,
    },
}

impl Undo {
    /// True when there is nothing to reverse
    #[inline]
    #[must_use]
    pub fn is_nothing(&self) -> bool {
        matches!(self, Self::Nothing)
    }
}

/// Result of a push-path insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrependOutcome {
    /// New record at the head
    Inserted,
    /// Id already present; entry at `index` overwritten
    Replaced {
        /// Position of the overwritten entry
        index: usize,
    },
}

/// The in-memory feed
#[derive(Debug)]
pub struct NotificationStore {
    records: Vec<NotificationRecord>,
    revision: u64,
    publisher: watch::Sender<FeedSnapshot>,
}

impl NotificationStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        let (publisher, _) = watch::channel(FeedSnapshot::default());
        Self {
            records: Vec::new(),
            revision: 0,
            publisher,
        }
    }

    /// Current snapshot
    #[must_use]
    pub fn snapshot(&self) -> FeedSnapshot {
        self.publisher.borrow().clone()
    }

    /// Observe snapshots
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.publisher.subscribe()
    }

    /// Unread count of the current feed
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.records.iter().filter(|r| !r.read).count()
    }

    /// Replace the whole feed
    ///
    /// Later duplicates of an id are dropped so the feed stays unique.
    /// Returns the number of dropped duplicates.
    pub fn replace_all(&mut self, records: impl IntoIterator<Item = NotificationRecord>) -> usize {
        let mut seen = HashSet::new();
        let mut dropped = 0;
        self.records = records
            .into_iter()
            .filter(|r| match r.id {
                Some(id) if !seen.insert(id) => {
                    dropped += 1;
                    false
                }
                _ => true,
            })
            .collect();

        if dropped > 0 {
            tracing::warn!(dropped, "bulk replace contained duplicate ids");
        }
        tracing::debug!(len = self.records.len(), "feed replaced");
        self.publish();
        dropped
    }

    /// Insert a pushed record at the head
    pub fn prepend(&mut self, record: NotificationRecord) -> PrependOutcome {
        let existing = record.id.and_then(|id| self.position(id));
        let outcome = match existing {
            Some(index) => {
                tracing::debug!(id = ?record.id, index, "push redelivered existing record");
                self.records[index] = record;
                PrependOutcome::Replaced { index }
            }
            None => {
                self.records.insert(0, record);
                PrependOutcome::Inserted
            }
        };
        self.publish();
        outcome
    }

    /// Mark one record read
    pub fn mark_read(&mut self, id: NotificationId) -> Undo {
        let Some(index) = self.position(id) else {
            tracing::debug!(%id, "mark_read on unknown id");
            return Undo::Nothing;
        };
        if self.records[index].read {
            return Undo::Nothing;
        }
        self.records[index].read = true;
        self.publish();
        Undo::MarkRead { id }
    }

    /// Mark every record read
    pub fn mark_all_read(&mut self) -> Undo {
        let ids: Vec<NotificationId> = self
            .records
            .iter()
            .filter(|r| !r.read)
            .filter_map(|r| r.id)
            .collect();
        let any_unread = self.records.iter().any(|r| !r.read);
        if !any_unread {
            return Undo::Nothing;
        }
        for record in &mut self.records {
            record.read = true;
        }
        self.publish();
        Undo::MarkAllRead { ids }
    }

    /// Remove one record
    pub fn remove(&mut self, id: NotificationId) -> Undo {
        let Some(index) = self.position(id) else {
            tracing::debug!(%id, "remove on unknown id");
            return Undo::Nothing;
        };
        let record = self.records.remove(index);
        self.publish();
        Undo::Remove { index, record }
    }

    /// Reverse an earlier mutation
    ///
    /// Returns true if the feed changed. A removed record that has since
    /// reappeared (e.g. redelivered by a push) is not inserted twice.
    pub fn revert(&mut self, undo: Undo) -> bool {
        let changed = match undo {
            Undo::Nothing => false,
            Undo::MarkRead { id } => self.set_unread(&[id]),
            Undo::MarkAllRead { ids } => self.set_unread(&ids),
            Undo::Remove { index, record } => {
                if record.id.is_some_and(|id| self.position(id).is_some()) {
                    false
                } else {
                    let index = index.min(self.records.len());
                    self.records.insert(index, record);
                    true
                }
            }
        };
        if changed {
            self.publish();
        }
        changed
    }

    /// Records, most recent first
    #[inline]
    #[must_use]
    pub fn records(&self) -> &[NotificationRecord] {
        &self.records
    }

    fn set_unread(&mut self, ids: &[NotificationId]) -> bool {
        let mut changed = false;
        for record in &mut self.records {
            if record.read && record.id.is_some_and(|id| ids.contains(&id)) {
                record.read = false;
                changed = true;
            }
        }
        changed
    }

    fn position(&self, id: NotificationId) -> Option<usize> {
        self.records.iter().position(|r| r.has_id(id))
    }

    fn publish(&mut self) {
        self.revision += 1;
        let snapshot = FeedSnapshot::new(&self.records, self.revision);
        self.publisher.send_replace(snapshot);
    }
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}
