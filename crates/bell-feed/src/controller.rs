//! Feed controller
//!
//! Owns one session's store task, push channel and backend client.
//!
//! Lifecycle:
//! 1. `Idle`: nothing fetched, channel closed
//! 2. `activate()`: one bulk fetch, then `Syncing` and connect, whether or not
//!    the fetch succeeded
//! 3. `shutdown()`: channel closed, pending retries and reverts dropped,
//!    in-flight backend calls awaited, store task stopped
//!
//! Mutation intents apply the optimistic change through the store task, then
//! run the backend call on a tracked task without waiting for it.

use crate::config::BellConfig;
use crate::error::FeedError;
use crate::events::{FeedEvent, Mutation};
use crate::policy::MutationPolicy;
use bell_backend::{BackendError, HttpBackend, NotificationBackend, SessionToken};
use bell_model::NotificationId;
use bell_store::{FeedReader, FeedSnapshot, NotificationStore, StoreHandle, Undo};
use bell_transport::{PushConnector, StompConnector, TransportClient, TransportConfig, TransportState};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Event channel depth; slow subscribers see `Lagged`
const EVENT_BUFFER: usize = 64;

/// Controller phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Created, not yet activated
    Idle,
    /// Startup fetch done (or failed) and push channel running
    Syncing,
    /// Torn down
    ShutDown,
}

/// Behaviour knobs for the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerSettings {
    /// What failed mutations do
    pub mutation_policy: MutationPolicy,
    /// Re-fetch the feed after every reconnect
    pub refetch_on_reconnect: bool,
}

impl ControllerSettings {
    /// With mutation policy
    #[inline]
    #[must_use]
    pub fn with_mutation_policy(mut self, policy: MutationPolicy) -> Self {
        self.mutation_policy = policy;
        self
    }

    /// With refetch on reconnect
    #[inline]
    #[must_use]
    pub fn with_refetch_on_reconnect(mut self, enabled: bool) -> Self {
        self.refetch_on_reconnect = enabled;
        self
    }
}

/// Session orchestrator for the notification feed
#[derive(Debug)]
pub struct FeedController {
    settings: ControllerSettings,
    store: StoreHandle,
    transport: TransportClient,
    backend: Arc<dyn NotificationBackend>,
    events: broadcast::Sender<FeedEvent>,
    phase: Mutex<Phase>,
    started: AtomicBool,
    cancel: CancellationToken,
    tasks: TaskTracker,
}

impl FeedController {
    /// Create an idle controller with a fresh, empty store
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(
        settings: ControllerSettings,
        transport: TransportConfig,
        connector: Arc<dyn PushConnector>,
        backend: Arc<dyn NotificationBackend>,
    ) -> Self {
        let store = StoreHandle::spawn(NotificationStore::new());
        let transport = TransportClient::new(transport, connector, store.clone());
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            settings,
            store,
            transport,
            backend,
            events,
            phase: Mutex::new(Phase::Idle),
            started: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    /// Controller for `config` with the given collaborators
    ///
    /// # Errors
    /// `FeedError::Config` for an unusable push endpoint
    pub fn from_config(
        config: &BellConfig,
        connector: Arc<dyn PushConnector>,
        backend: Arc<dyn NotificationBackend>,
    ) -> Result<Self, FeedError> {
        Ok(Self::new(
            config.controller_settings(),
            config.transport_config()?,
            connector,
            backend,
        ))
    }

    /// Production controller: REST over `reqwest`, push over STOMP
    ///
    /// # Errors
    /// Invalid configuration or HTTP client construction failure
    pub fn connect_http(config: &BellConfig) -> Result<Self, FeedError> {
        let tokens = Arc::new(SessionToken::new(config.token.clone()));
        let backend = HttpBackend::new(&config.notifications_url()?, config.request_timeout(), tokens)?;
        let connector = StompConnector::new().with_token(config.token.clone());
        Self::from_config(config, Arc::new(connector), Arc::new(backend))
    }

    /// Run the startup fetch and open the push channel
    ///
    /// A failed fetch is logged and published as `FetchFailed`; the channel is
    /// opened anyway. Later calls are no-ops.
    ///
    /// # Errors
    /// `FeedError::ShutDown` after `shutdown()`, `FeedError::Store` if the
    /// store task is gone
    pub async fn activate(&self) -> Result<(), FeedError> {
        self.ensure_running()?;
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::debug!("feed controller already active");
            return Ok(());
        }

        match fetch_into(self.backend.as_ref(), &self.store, &self.events).await {
            Ok(count) => tracing::info!("startup fetch loaded {} notifications", count),
            Err(FeedError::Backend(e)) => {
                tracing::warn!(error = %e, "startup fetch failed; continuing with push only");
            }
            Err(e) => return Err(e),
        }

        {
            let mut phase = self.phase.lock();
            if *phase == Phase::ShutDown {
                return Err(FeedError::ShutDown);
            }
            *phase = Phase::Syncing;
        }

        self.transport.connect();
        if self.settings.refetch_on_reconnect {
            self.spawn_refetch_on_reconnect();
        }
        Ok(())
    }

    /// Re-fetch the whole feed now
    ///
    /// # Errors
    /// Backend failure (feed left as it was) or a stopped controller
    pub async fn refresh(&self) -> Result<usize, FeedError> {
        self.ensure_running()?;
        fetch_into(self.backend.as_ref(), &self.store, &self.events).await
    }

    /// Mark one record read locally, then tell the backend
    ///
    /// # Errors
    /// `FeedError::ShutDown` or `FeedError::Store` when the session is gone
    pub async fn request_mark_read(&self, id: NotificationId) -> Result<(), FeedError> {
        self.ensure_running()?;
        let undo = self.store.mark_read(id).await?;
        self.spawn_mutation(Mutation::MarkRead(id), undo);
        Ok(())
    }

    /// Mark every record read locally, then tell the backend
    ///
    /// # Errors
    /// `FeedError::ShutDown` or `FeedError::Store` when the session is gone
    pub async fn request_mark_all_read(&self) -> Result<(), FeedError> {
        self.ensure_running()?;
        let undo = self.store.mark_all_read().await?;
        self.spawn_mutation(Mutation::MarkAllRead, undo);
        Ok(())
    }

    /// Remove one record locally, then tell the backend
    ///
    /// # Errors
    /// `FeedError::ShutDown` or `FeedError::Store` when the session is gone
    pub async fn request_delete(&self, id: NotificationId) -> Result<(), FeedError> {
        self.ensure_running()?;
        let undo = self.store.remove(id).await?;
        self.spawn_mutation(Mutation::Delete(id), undo);
        Ok(())
    }

    /// Tear the session down
    ///
    /// Closes the push channel and cancels reconnects. Backend calls already
    /// in flight run to completion so the server sees every change shown
    /// locally; their retries, reverts and events are dropped. Then the store
    /// task stops. Idempotent.
    pub async fn shutdown(&self) {
        {
            let mut phase = self.phase.lock();
            if *phase == Phase::ShutDown {
                return;
            }
            *phase = Phase::ShutDown;
        }

        self.cancel.cancel();
        self.transport.disconnect().await;
        self.tasks.close();
        self.tasks.wait().await;
        self.store.shutdown().await;
        tracing::info!("feed controller shut down");
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> Phase {
        *self.phase.lock()
    }

    /// Read-only feed view
    #[must_use]
    pub fn reader(&self) -> FeedReader {
        self.store.reader()
    }

    /// Current feed snapshot
    #[must_use]
    pub fn snapshot(&self) -> FeedSnapshot {
        self.store.snapshot()
    }

    /// Push channel state
    #[must_use]
    pub fn transport_state(&self) -> TransportState {
        self.transport.state()
    }

    /// Observe push channel state
    #[must_use]
    pub fn subscribe_transport(&self) -> watch::Receiver<TransportState> {
        self.transport.subscribe_state()
    }

    /// Observe mutation and fetch outcomes
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<FeedEvent> {
        self.events.subscribe()
    }

    /// Get settings
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    fn ensure_running(&self) -> Result<(), FeedError> {
        if *self.phase.lock() == Phase::ShutDown {
            Err(FeedError::ShutDown)
        } else {
            Ok(())
        }
    }

    fn spawn_mutation(&self, mutation: Mutation, undo: Undo) {
        let backend = Arc::clone(&self.backend);
        let store = self.store.clone();
        let events = self.events.clone();
        let policy = self.settings.mutation_policy;
        let cancel = self.cancel.clone();

        self.tasks.spawn(async move {
            run_mutation(backend.as_ref(), &store, &events, &cancel, policy, mutation, undo).await;
        });
    }

    fn spawn_refetch_on_reconnect(&self) {
        let mut state = self.transport.subscribe_state();
        let backend = Arc::clone(&self.backend);
        let store = self.store.clone();
        let events = self.events.clone();
        let cancel = self.cancel.clone();

        self.tasks.spawn(async move {
            let mut last_session = 0;
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    changed = state.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }

                let current = *state.borrow_and_update();
                let TransportState::Connected { session } = current else {
                    continue;
                };
                if session <= last_session {
                    continue;
                }
                last_session = session;
                if session == 1 {
                    continue;
                }

                tracing::info!(session, "push channel reconnected; refetching feed");
                let refetch = fetch_into(backend.as_ref(), &store, &events);
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    result = refetch => match result {
                        Ok(_) => {}
                        Err(FeedError::Store(_)) => break,
                        Err(e) => tracing::warn!(error = %e, "refetch after reconnect failed"),
                    },
                }
            }
        });
    }
}

impl Drop for FeedController {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Bulk fetch and replace the feed
async fn fetch_into(
    backend: &dyn NotificationBackend,
    store: &StoreHandle,
    events: &broadcast::Sender<FeedEvent>,
) -> Result<usize, FeedError> {
    match backend.fetch_recent().await {
        Ok(records) => {
            let count = records.len();
            store.replace_all(records).await?;
            let _ = events.send(FeedEvent::FeedReplaced { count });
            Ok(count)
        }
        Err(e) => {
            let _ = events.send(FeedEvent::FetchFailed {
                error: e.to_string(),
            });
            Err(e.into())
        }
    }
}

async fn call(backend: &dyn NotificationBackend, mutation: Mutation) -> Result<(), BackendError> {
    match mutation {
        Mutation::MarkRead(id) => backend.mark_read(id).await,
        Mutation::MarkAllRead => backend.mark_all_read().await,
        Mutation::Delete(id) => backend.delete(id).await,
    }
}

async fn run_mutation(
    backend: &dyn NotificationBackend,
    store: &StoreHandle,
    events: &broadcast::Sender<FeedEvent>,
    cancel: &CancellationToken,
    policy: MutationPolicy,
    mutation: Mutation,
    undo: Undo,
) {
    let mut result = call(backend, mutation).await;
    let mut retry = 1;
    while let Err(e) = &result {
        if !e.is_retryable() {
            break;
        }
        let Some(delay) = policy.backoff_for(retry) else {
            break;
        };
        tracing::debug!(%mutation, retry, ?delay, "retrying backend call");
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
        result = call(backend, mutation).await;
        retry += 1;
    }

    if cancel.is_cancelled() {
        tracing::debug!(%mutation, ok = result.is_ok(), "session closed; outcome not applied");
        return;
    }

    match result {
        Ok(()) => {
            tracing::debug!(%mutation, "backend accepted mutation");
            let _ = events.send(FeedEvent::MutationSucceeded { mutation });
        }
        Err(e) if policy.reverts() => {
            tracing::warn!(%mutation, error = %e, "backend rejected mutation; reverting");
            if store.revert(undo).await.is_err() {
                tracing::debug!(%mutation, "store closed before revert");
            }
            let _ = events.send(FeedEvent::MutationReverted {
                mutation,
                error: e.to_string(),
            });
        }
        Err(e) => {
            tracing::warn!(%mutation, error = %e, "backend rejected mutation");
            let _ = events.send(FeedEvent::MutationFailed {
                mutation,
                error: e.to_string(),
            });
        }
    }
}
