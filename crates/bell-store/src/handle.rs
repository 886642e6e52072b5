//! Single-writer store task
//!
//! [`StoreHandle::spawn`] moves a [`NotificationStore`] onto its own tokio task.
//! Writers send [`StoreCommand`]s; the task applies them one at a time in
//! arrival order, so the store itself needs no locking. Readers hold a
//! [`FeedReader`] and only ever see published snapshots.

use crate::error::StoreError;
use crate::snapshot::FeedSnapshot;
use crate::store::{NotificationStore, PrependOutcome, Undo};
use bell_model::{NotificationId, NotificationRecord};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Command queue depth
const COMMAND_BUFFER: usize = 256;

/// Messages applied by the store task
#[derive(Debug)]
pub enum StoreCommand {
    /// Replace the whole feed
    ReplaceAll(Vec<NotificationRecord>),
    /// Insert a pushed record
    Prepend(NotificationRecord),
    /// Mark one record read
    MarkRead {
        /// Target record
        id: NotificationId,
        /// Reply with the undo token
        reply: Option<oneshot::Sender<Undo>>,
    },
    /// Mark all records read
    MarkAllRead {
        /// Reply with the undo token
        reply: Option<oneshot::Sender<Undo>>,
    },
    /// Remove one record
    Remove {
        /// Target record
        id: NotificationId,
        /// Reply with the undo token
        reply: Option<oneshot::Sender<Undo>>,
    },
    /// Reverse an earlier mutation
    Revert(Undo),
    /// Stop the task
    Shutdown,
}

/// Write access to a running store task
#[derive(Debug, Clone)]
pub struct StoreHandle {
    sender: mpsc::Sender<StoreCommand>,
    snapshots: watch::Receiver<FeedSnapshot>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl StoreHandle {
    /// Spawn the store task
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(store: NotificationStore) -> Self {
        let (sender, rx) = mpsc::channel(COMMAND_BUFFER);
        let snapshots = store.subscribe();
        let task = tokio::spawn(store_task(store, rx));
        Self {
            sender,
            snapshots,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }

    /// Read-only view for presentation
    #[must_use]
    pub fn reader(&self) -> FeedReader {
        FeedReader {
            snapshots: self.snapshots.clone(),
        }
    }

    /// Current snapshot
    #[must_use]
    pub fn snapshot(&self) -> FeedSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Replace the whole feed
    ///
    /// # Errors
    /// `StoreError::Closed` once the task has stopped
    pub async fn replace_all(&self, records: Vec<NotificationRecord>) -> Result<(), StoreError> {
        self.send(StoreCommand::ReplaceAll(records)).await
    }

    /// Insert a pushed record without waiting for it to be applied
    ///
    /// # Errors
    /// `StoreError::Closed` once the task has stopped
    pub async fn prepend(&self, record: NotificationRecord) -> Result<(), StoreError> {
        self.send(StoreCommand::Prepend(record)).await
    }

    /// Mark one record read, returning how to undo it
    ///
    /// # Errors
    /// `StoreError::Closed` once the task has stopped
    pub async fn mark_read(&self, id: NotificationId) -> Result<Undo, StoreError> {
        let (tx, rx) = oneshot::channel();
        self.send(StoreCommand::MarkRead {
            id,
            reply: Some(tx),
        })
        .await?;
        rx.await.map_err(|_| StoreError::Closed)
    }

    /// Mark all records read, returning how to undo it
    ///
    /// # Errors
    /// `StoreError::Closed` once the task has stopped
    pub async fn mark_all_read(&self) -> Result<Undo, StoreError> {
        let (tx, rx) = oneshot::channel();
        self.send(StoreCommand::MarkAllRead { reply: Some(tx) })
            .await?;
        rx.await.map_err(|_| StoreError::Closed)
    }

    /// Remove one record, returning how to undo it
    ///
    /// # Errors
    /// `StoreError::Closed` once the task has stopped
    pub async fn remove(&self, id: NotificationId) -> Result<Undo, StoreError> {
        let (tx, rx) = oneshot::channel();
        self.send(StoreCommand::Remove {
            id,
            reply: Some(tx),
        })
        .await?;
        rx.await.map_err(|_| StoreError::Closed)
    }

    /// Reverse an earlier mutation
    ///
    /// # Errors
    /// `StoreError::Closed` once the task has stopped
    pub async fn revert(&self, undo: Undo) -> Result<(), StoreError> {
        if undo.is_nothing() {
            return Ok(());
        }
        self.send(StoreCommand::Revert(undo)).await
    }

    /// True once the task has stopped accepting commands
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Stop the task and wait for it to finish
    ///
    /// Idempotent; later calls return immediately.
    pub async fn shutdown(&self) {
        let _ = self.sender.send(StoreCommand::Shutdown).await;
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!("store task ended abnormally: {}", e);
            }
        }
    }

    async fn send(&self, command: StoreCommand) -> Result<(), StoreError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| StoreError::Closed)
    }
}

/// Read-only feed observer
#[derive(Debug, Clone)]
pub struct FeedReader {
    snapshots: watch::Receiver<FeedSnapshot>,
}

impl FeedReader {
    /// Current snapshot
    #[must_use]
    pub fn current(&self) -> FeedSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Unread count of the current snapshot
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.snapshots.borrow().unread_count()
    }

    /// Wait for the next published snapshot
    ///
    /// # Errors
    /// `StoreError::Closed` when the store is gone
    pub async fn changed(&mut self) -> Result<FeedSnapshot, StoreError> {
        self.snapshots
            .changed()
            .await
            .map_err(|_| StoreError::Closed)?;
        Ok(self.snapshots.borrow_and_update().clone())
    }

    /// Wait until a snapshot satisfies `predicate`
    ///
    /// # Errors
    /// `StoreError::Closed` when the store is gone first
    pub async fn wait_for<F>(&mut self, mut predicate: F) -> Result<FeedSnapshot, StoreError>
    where
        F: FnMut(&FeedSnapshot) -> bool,
    {
        let snapshot = self
            .snapshots
            .wait_for(|s| predicate(s))
            .await
            .map_err(|_| StoreError::Closed)?;
        Ok(snapshot.clone())
    }
}

/// Store task (runs in separate tokio task)
async fn store_task(mut store: NotificationStore, mut rx: mpsc::Receiver<StoreCommand>) {
    while let Some(command) = rx.recv().await {
        match command {
            StoreCommand::ReplaceAll(records) => {
                store.replace_all(records);
            }
            StoreCommand::Prepend(record) => {
                let id = record.id;
                if let PrependOutcome::Replaced { index } = store.prepend(record) {
                    tracing::debug!(?id, index, "pushed record replaced existing entry");
                }
            }
            StoreCommand::MarkRead { id, reply } => {
                let undo = store.mark_read(id);
                if let Some(reply) = reply {
                    let _ = reply.send(undo);
                }
            }
            StoreCommand::MarkAllRead { reply } => {
                let undo = store.mark_all_read();
                if let Some(reply) = reply {
                    let _ = reply.send(undo);
                }
            }
            StoreCommand::Remove { id, reply } => {
                let undo = store.remove(id);
                if let Some(reply) = reply {
                    let _ = reply.send(undo);
                }
            }
            StoreCommand::Revert(undo) => {
                store.revert(undo);
            }
            StoreCommand::Shutdown => break,
        }
    }
    rx.close();
    tracing::debug!("store task stopped");
}
