//! Backend seam

use crate::error::BackendError;
use async_trait::async_trait;
use bell_model::{NotificationId, NotificationRecord};

/// The notification REST collaborator
///
/// All mutations are idempotent on the server, so callers may retry them.
#[async_trait]
pub trait NotificationBackend: Send + Sync + std::fmt::Debug {
    /// Most recent notifications, newest first
    ///
    /// # Errors
    /// Transport, status, envelope or decode failure
    async fn fetch_recent(&self) -> Result<Vec<NotificationRecord>, BackendError>;

    /// Mark one notification read
    ///
    /// # Errors
    /// Transport, status or envelope failure
    async fn mark_read(&self, id: NotificationId) -> Result<(), BackendError>;

    /// Mark every notification read
    ///
    /// # Errors
    /// Transport, status or envelope failure
    async fn mark_all_read(&self) -> Result<(), BackendError>;

    /// Delete one notification
    ///
    /// # Errors
    /// Transport, status or envelope failure
    async fn delete(&self, id: NotificationId) -> Result<(), BackendError>;
}
