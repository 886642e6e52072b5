//! Immutable feed snapshots

use bell_model::{NotificationId, NotificationRecord};
use std::sync::Arc;

/// Point-in-time view of the feed
///
/// Cloning is cheap (shared slice). A snapshot never changes after it has been
/// published; each mutation produces a new one with a higher revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSnapshot {
    records: Arc<[NotificationRecord]>,
    revision: u64,
}

impl FeedSnapshot {
    pub(crate) fn new(records: &[NotificationRecord], revision: u64) -> Self {
        Self {
            records: Arc::from(records),
            revision,
        }
    }

    /// Records, most recent first
    #[inline]
    #[must_use]
    pub fn records(&self) -> &[NotificationRecord] {
        &self.records
    }

    /// Monotonic publish counter
    #[inline]
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the feed is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Unread records, always derived from the records themselves
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.records.iter().filter(|r| !r.read).count()
    }

    /// Record with the given id
    #[must_use]
    pub fn get(&self, id: NotificationId) -> Option<&NotificationRecord> {
        self.records.iter().find(|r| r.has_id(id))
    }

    /// Ids in feed order; records without an id are skipped
    #[must_use]
    pub fn ids(&self) -> Vec<NotificationId> {
        self.records.iter().filter_map(|r| r.id).collect()
    }

    /// Iterate records in feed order
    pub fn iter(&self) -> std::slice::Iter<'_, NotificationRecord> {
        self.records.iter()
    }
}

impl Default for FeedSnapshot {
    fn default() -> Self {
        Self::new(&[], 0)
    }
}

impl<'a> IntoIterator for &'a FeedSnapshot {
    type Item = &'a NotificationRecord;
    type IntoIter = std::slice::Iter<'a, NotificationRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
