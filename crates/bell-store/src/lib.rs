//! Bell Store - the authoritative in-memory notification feed
//!
//! The store is the only component allowed to mutate the feed:
//! - [`NotificationStore`] owns the ordered records and the reconciliation rules
//! - [`FeedSnapshot`] is the immutable view handed to readers
//! - [`StoreHandle`] runs the store on its own task so every writer (push
//!   channel, controller) is marshalled onto a single writer context
//! - [`FeedReader`] observes snapshots without any write access
//!
//! # Example
//!
//! ```rust
//! use bell_model::{NotificationKind, NotificationRecord};
//! use bell_store::NotificationStore;
//!
//! let mut store = NotificationStore::new();
//! store.prepend(NotificationRecord::new(1, NotificationKind::NewClient, "Acme"));
//! store.prepend(NotificationRecord::new(2, NotificationKind::MeetingReminder, "Kickoff"));
//!
//! assert_eq!(store.snapshot().len(), 2);
//! assert_eq!(store.snapshot().unread_count(), 2);
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod handle;
pub mod snapshot;
pub mod store;

pub use error::StoreError;
pub use handle::{FeedReader, StoreCommand, StoreHandle};
pub use snapshot::FeedSnapshot;
pub use store::{NotificationStore, PrependOutcome, Undo};
