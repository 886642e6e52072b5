//! Error types for the feed store

/// Store errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store task has stopped; the session is torn down
    #[error("feed store is closed")]
    Closed,
}
