//! Feed events published on the controller's broadcast channel

use bell_model::NotificationId;
use std::fmt;

/// A user intent forwarded to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutation {
    /// Mark one record read
    MarkRead(NotificationId),
    /// Mark every record read
    MarkAllRead,
    /// Delete one record
    Delete(NotificationId),
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MarkRead(id) => write!(f, "mark_read({id})"),
            Self::MarkAllRead => f.write_str("mark_all_read"),
            Self::Delete(id) => write!(f, "delete({id})"),
        }
    }
}

/// Something the presentation layer may want to surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// Backend accepted a mutation
    MutationSucceeded {
        /// The mutation
        mutation: Mutation,
    },
    /// Backend refused a mutation; the local change stays
    MutationFailed {
        /// The mutation
        mutation: Mutation,
        /// Rendered backend error
        error: String,
    },
    /// Backend refused a mutation and the local change was undone
    MutationReverted {
        /// The mutation
        mutation: Mutation,
        /// Rendered backend error
        error: String,
    },
    /// A bulk fetch failed; the feed keeps its previous contents
    FetchFailed {
        /// Rendered backend error
        error: String,
    },
    /// A bulk fetch replaced the feed
    FeedReplaced {
        /// Records now in the feed
        count: usize,
    },
}

impl FeedEvent {
    /// Whether the operator should see an error indicator
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::MutationFailed { .. } | Self::MutationReverted { .. } | Self::FetchFailed { .. }
        )
    }
}
