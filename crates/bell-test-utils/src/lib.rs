//! Testing utilities for the Bell workspace
//!
//! Shared fixtures and in-memory fakes for the backend and the push channel.

#![allow(missing_docs)]

use async_trait::async_trait;
use bell_backend::{BackendError, NotificationBackend};
use bell_model::{NotificationId, NotificationKind, NotificationRecord};
use bell_transport::{PushConnector, PushStream, TransportError};
use chrono::{DateTime, TimeZone, Utc};
use futures::channel::mpsc::{unbounded, UnboundedSender};
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use url::Url;

/// 2025-01-31 10:00:00 UTC
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 31, 10, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Unread `NEW_CLIENT` record with a stable timestamp
pub fn record(id: u64) -> NotificationRecord {
    NotificationRecord::new(id, NotificationKind::NewClient, format!("Notification {id}"))
        .with_body(format!("Body of notification {id}"))
        .with_created_at(fixed_time())
}

pub fn unread(id: u64) -> NotificationRecord {
    record(id).with_read(false)
}

pub fn read(id: u64) -> NotificationRecord {
    record(id).with_read(true)
}

pub fn linked(id: u64, link: &str) -> NotificationRecord {
    record(id).with_link(link)
}

pub fn ids(records: &[NotificationRecord]) -> Vec<u64> {
    records
        .iter()
        .filter_map(|r| r.id.map(NotificationId::get))
        .collect()
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    FetchRecent,
    MarkRead(NotificationId),
    MarkAllRead,
    Delete(NotificationId),
}

/// In-memory backend that records every call
///
/// Mutations can be made to fail (a fixed number of times or always) and can
/// be held open until [`release`](RecordingBackend::release) is called.
#[derive(Debug)]
pub struct RecordingBackend {
    recent: Mutex<VecDeque<Result<Vec<NotificationRecord>, u16>>>,
    calls: Mutex<Vec<BackendCall>>,
    completed: Mutex<Vec<BackendCall>>,
    latency: Mutex<Duration>,
    failures_left: AtomicUsize,
    gate: watch::Sender<bool>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            recent: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
            latency: Mutex::new(Duration::ZERO),
            failures_left: AtomicUsize::new(0),
            gate,
        }
    }

    /// Backend whose every fetch returns `records`
    pub fn with_recent(records: Vec<NotificationRecord>) -> Self {
        let backend = Self::new();
        backend.queue_recent(records);
        backend
    }

    /// Queue a fetch result; the last queued one repeats
    pub fn queue_recent(&self, records: Vec<NotificationRecord>) {
        self.recent.lock().push_back(Ok(records));
    }

    /// Queue a failing fetch with the given HTTP status
    pub fn queue_fetch_failure(&self, status: u16) {
        self.recent.lock().push_back(Err(status));
    }

    /// Fail the next `n` mutations with a 503
    pub fn fail_mutations(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    /// Fail every mutation from now on
    pub fn fail_all_mutations(&self) {
        self.fail_mutations(usize::MAX);
    }

    /// Make every mutation take `latency` before it answers
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Block mutations until [`release`](Self::release)
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    /// Mutations that ran to the end and answered
    pub fn completed_calls(&self) -> Vec<BackendCall> {
        self.completed.lock().clone()
    }

    pub fn mutation_calls(&self) -> Vec<BackendCall> {
        self.calls()
            .into_iter()
            .filter(|c| *c != BackendCall::FetchRecent)
            .collect()
    }

    async fn mutation(&self, call: BackendCall) -> Result<(), BackendError> {
        self.calls.lock().push(call.clone());
        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.completed.lock().push(call);

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            Err(BackendError::status(503, "unavailable"))
        } else {
            Ok(())
        }
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationBackend for RecordingBackend {
    async fn fetch_recent(&self) -> Result<Vec<NotificationRecord>, BackendError> {
        self.calls.lock().push(BackendCall::FetchRecent);
        let mut recent = self.recent.lock();
        let next = if recent.len() > 1 {
            recent.pop_front()
        } else {
            recent.front().cloned()
        };
        match next {
            Some(Ok(records)) => Ok(records),
            Some(Err(status)) => Err(BackendError::status(status, "fetch failed")),
            None => Ok(Vec::new()),
        }
    }

    async fn mark_read(&self, id: NotificationId) -> Result<(), BackendError> {
        self.mutation(BackendCall::MarkRead(id)).await
    }

    async fn mark_all_read(&self) -> Result<(), BackendError> {
        self.mutation(BackendCall::MarkAllRead).await
    }

    async fn delete(&self, id: NotificationId) -> Result<(), BackendError> {
        self.mutation(BackendCall::Delete(id)).await
    }
}

// ---------------------------------------------------------------------------
// Push channel
// ---------------------------------------------------------------------------

type Session = UnboundedSender<Result<String, TransportError>>;

/// Push connector driven from the test
///
/// Each successful `open` starts a new session; [`push`](Self::push) delivers
/// into the latest one and [`drop_session`](Self::drop_session) closes it as
/// the server would.
#[derive(Debug, Default)]
pub struct ChannelConnector {
    session: Mutex<Option<Session>>,
    failures_left: AtomicUsize,
    opened: AtomicUsize,
    attempts: AtomicUsize,
}

impl ChannelConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Connector that refuses the first `n` attempts
    pub fn failing(n: usize) -> Arc<Self> {
        let connector = Self::default();
        connector.failures_left.store(n, Ordering::SeqCst);
        Arc::new(connector)
    }

    /// Deliver a record as the server would; false without a live session
    pub fn push(&self, record: &NotificationRecord) -> bool {
        match serde_json::to_string(record) {
            Ok(json) => self.push_raw(json),
            Err(_) => false,
        }
    }

    pub fn push_raw(&self, body: impl Into<String>) -> bool {
        self.session
            .lock()
            .as_ref()
            .is_some_and(|tx| tx.unbounded_send(Ok(body.into())).is_ok())
    }

    /// Close the live session from the server side
    pub fn drop_session(&self) {
        self.session.lock().take();
    }

    /// Number of sessions opened so far
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Number of open attempts, failed ones included
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushConnector for ChannelConnector {
    async fn open(&self, endpoint: &Url, _topic: &str) -> Result<PushStream, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let refused = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(TransportError::connect(endpoint, "connection refused"));
        }

        let (tx, rx) = unbounded();
        *self.session.lock() = Some(tx);
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(rx.boxed())
    }
}
