//! Transport client: one supervised push connection per session
//!
//! The supervisor task loops forever:
//! 1. open a session through the [`PushConnector`]
//! 2. decode each message and send it to the store's writer task
//! 3. on loss, wait per [`ReconnectPolicy`] and go back to 1
//!
//! `disconnect()` cancels the loop wherever it is, including a pending sleep.

use crate::connector::{PushConnector, PushStream};
use crate::error::TransportError;
use crate::policy::ReconnectPolicy;
use bell_model::NotificationRecord;
use bell_store::StoreHandle;
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Topic the admin bell listens on
pub const DEFAULT_TOPIC: &str = "/topic/admin/notifications";

/// Push channel settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// WebSocket endpoint
    pub endpoint: Url,
    /// Subscribed topic
    pub topic: String,
    /// Delay between attempts
    pub reconnect: ReconnectPolicy,
}

impl TransportConfig {
    /// Config for `endpoint` with the default topic and policy
    #[must_use]
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            topic: DEFAULT_TOPIC.to_string(),
            reconnect: ReconnectPolicy::default(),
        }
    }

    /// With topic
    #[inline]
    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// With reconnect policy
    #[inline]
    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }
}

/// Observable connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    /// No supervisor running
    #[default]
    Disconnected,
    /// Opening a session; `attempt` counts since the last success
    Connecting {
        /// 1-based attempt number
        attempt: u32,
    },
    /// Subscribed and delivering
    Connected {
        /// Number of sessions established so far, this one included
        session: u64,
    },
    /// Sleeping before the next attempt
    WaitingToReconnect {
        /// Consecutive failures so far
        failures: u32,
        /// Sleep length
        delay: Duration,
    },
}

impl TransportState {
    /// True while a session is up
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

#[derive(Debug)]
struct Running {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owner of the push connection for one session
#[derive(Debug)]
pub struct TransportClient {
    config: TransportConfig,
    connector: Arc<dyn PushConnector>,
    store: StoreHandle,
    state: Arc<watch::Sender<TransportState>>,
    running: Mutex<Option<Running>>,
}

impl TransportClient {
    /// Create a disconnected client delivering into `store`
    #[must_use]
    pub fn new(config: TransportConfig, connector: Arc<dyn PushConnector>, store: StoreHandle) -> Self {
        let (state, _) = watch::channel(TransportState::Disconnected);
        Self {
            config,
            connector,
            store,
            state: Arc::new(state),
            running: Mutex::new(None),
        }
    }

    /// Start the supervisor; no-op while one is already running
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self) {
        let mut running = self.running.lock();
        if running.as_ref().is_some_and(|r| !r.task.is_finished()) {
            tracing::debug!("push channel already active");
            return;
        }

        let cancel = CancellationToken::new();
        let supervisor = Supervisor {
            config: self.config.clone(),
            connector: Arc::clone(&self.connector),
            store: self.store.clone(),
            state: Arc::clone(&self.state),
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(supervisor.run());
        *running = Some(Running { cancel, task });
    }

    /// Close the channel and cancel any pending reconnect
    ///
    /// Idempotent.
    pub async fn disconnect(&self) {
        let running = self.running.lock().take();
        if let Some(running) = running {
            running.cancel.cancel();
            if let Err(e) = running.task.await {
                tracing::error!("push supervisor ended abnormally: {}", e);
            }
            tracing::info!("push channel disconnected");
        }
        self.state.send_replace(TransportState::Disconnected);
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> TransportState {
        *self.state.borrow()
    }

    /// Observe state changes
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<TransportState> {
        self.state.subscribe()
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl Drop for TransportClient {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.cancel.cancel();
        }
    }
}

enum Pump {
    Cancelled,
    StoreClosed,
    Lost(TransportError),
}

struct Supervisor {
    config: TransportConfig,
    connector: Arc<dyn PushConnector>,
    store: StoreHandle,
    state: Arc<watch::Sender<TransportState>>,
    cancel: CancellationToken,
}

impl Supervisor {
    async fn run(self) {
        let endpoint = &self.config.endpoint;
        let topic = self.config.topic.as_str();
        let mut failures: u32 = 0;
        let mut sessions: u64 = 0;

        loop {
            self.state.send_replace(TransportState::Connecting {
                attempt: failures + 1,
            });

            let opened = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                opened = self.connector.open(endpoint, topic) => opened,
            };

            match opened {
                Ok(stream) => {
                    failures = 0;
                    sessions += 1;
                    tracing::info!(%endpoint, topic, session = sessions, "push channel connected");
                    self.state
                        .send_replace(TransportState::Connected { session: sessions });

                    match self.pump(stream).await {
                        Pump::Cancelled => break,
                        Pump::StoreClosed => {
                            tracing::debug!("feed store closed; stopping push channel");
                            break;
                        }
                        Pump::Lost(e) => tracing::warn!(error = %e, "push channel lost"),
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt = failures + 1, "push channel connect failed");
                }
            }

            failures = failures.saturating_add(1);
            let delay = self.config.reconnect.delay_for(failures);
            self.state
                .send_replace(TransportState::WaitingToReconnect { failures, delay });
            tracing::debug!(?delay, failures, "scheduling reconnect");

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }

        self.state.send_replace(TransportState::Disconnected);
        tracing::debug!("push supervisor stopped");
    }

    async fn pump(&self, mut stream: PushStream) -> Pump {
        loop {
            let next = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Pump::Cancelled,
                next = stream.next() => next,
            };

            let body = match next {
                None => return Pump::Lost(TransportError::Closed),
                Some(Err(e)) if e.is_connection_loss() => return Pump::Lost(e),
                Some(Err(e)) => {
                    tracing::error!(error = %e, "dropping undecodable push message");
                    continue;
                }
                Some(Ok(body)) => body,
            };

            match NotificationRecord::from_json(&body) {
                Ok(record) => {
                    tracing::debug!(id = ?record.id, kind = %record.kind, "push received");
                    if self.store.prepend(record).await.is_err() {
                        return Pump::StoreClosed;
                    }
                }
                Err(e) => {
                    let e = TransportError::from(e);
                    tracing::error!(error = %e, "dropping malformed push message");
                }
            }
        }
    }
}
