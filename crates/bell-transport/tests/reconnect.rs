//! Push channel supervision
//!
//! Drives [`TransportClient`] against a scripted connector on a paused clock:
//! retry spacing, delivery into the store, and teardown.

use async_trait::async_trait;
use bell_model::{DecodeError, NotificationId};
use bell_store::{NotificationStore, StoreHandle};
use bell_transport::{
    PushConnector, PushStream, ReconnectPolicy, TransportClient, TransportConfig, TransportError,
    TransportState,
};
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::StreamExt;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

type Feed = UnboundedSender<Result<String, TransportError>>;

#[derive(Debug)]
enum Step {
    Fail,
    Open(UnboundedReceiver<Result<String, TransportError>>),
}

/// Connector that plays back a fixed script, then fails forever
#[derive(Debug, Default)]
struct ScriptedConnector {
    steps: Mutex<VecDeque<Step>>,
    attempts: Mutex<Vec<Instant>>,
}

impl ScriptedConnector {
    fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            attempts: Mutex::new(Vec::new()),
        })
    }

    fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().clone()
    }
}

#[async_trait]
impl PushConnector for ScriptedConnector {
    async fn open(&self, _endpoint: &Url, _topic: &str) -> Result<PushStream, TransportError> {
        self.attempts.lock().push(Instant::now());
        let step = self.steps.lock().pop_front();
        match step {
            Some(Step::Open(rx)) => Ok(rx.boxed()),
            Some(Step::Fail) | None => Err(TransportError::connect("ws://test/ws", "refused")),
        }
    }
}

fn session() -> (Feed, Step) {
    let (tx, rx) = unbounded();
    (tx, Step::Open(rx))
}

fn config() -> TransportConfig {
    TransportConfig::new(Url::parse("ws://test/ws/websocket").unwrap())
}

fn payload(id: u64, title: &str) -> String {
    serde_json::json!({
        "idNotification": id,
        "type": "NEW_CLIENT",
        "title": title,
        "message": "Client registered",
        "isRead": false,
        "createdAt": "2024-05-01T10:00:00"
    })
    .to_string()
}

fn gaps(attempts: &[Instant]) -> Vec<Duration> {
    attempts.windows(2).map(|w| w[1] - w[0]).collect()
}

#[tokio::test(start_paused = true)]
async fn retries_are_spaced_by_the_policy_delay() {
    let (tx, open) = session();
    let connector = ScriptedConnector::new(vec![Step::Fail, Step::Fail, Step::Fail, open]);
    let store = StoreHandle::spawn(NotificationStore::new());
    let client = TransportClient::new(config(), connector.clone(), store.clone());
    let mut state = client.subscribe_state();

    client.connect();
    state.wait_for(TransportState::is_connected).await.unwrap();

    let attempts = connector.attempts();
    assert_eq!(attempts.len(), 4);
    for gap in gaps(&attempts) {
        assert!(gap >= Duration::from_secs(5), "gap {gap:?} shorter than 5s");
    }

    drop(tx);
    client.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn exponential_policy_doubles_until_capped() {
    let (_tx, open) = session();
    let connector = ScriptedConnector::new(vec![Step::Fail, Step::Fail, Step::Fail, Step::Fail, open]);
    let store = StoreHandle::spawn(NotificationStore::new());
    let policy = ReconnectPolicy::exponential(Duration::from_secs(1), Duration::from_secs(4));
    let client = TransportClient::new(config().with_reconnect(policy), connector.clone(), store);
    let mut state = client.subscribe_state();

    client.connect();
    state.wait_for(TransportState::is_connected).await.unwrap();

    let expected = [1, 2, 4, 4].map(Duration::from_secs);
    let observed = gaps(&connector.attempts());
    assert_eq!(observed.len(), expected.len());
    for (gap, want) in observed.iter().zip(expected) {
        assert!(*gap >= want, "gap {gap:?} shorter than {want:?}");
    }

    client.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn pushed_records_land_most_recent_first() {
    let (tx, open) = session();
    let connector = ScriptedConnector::new(vec![open]);
    let store = StoreHandle::spawn(NotificationStore::new());
    let mut reader = store.reader();
    let client = TransportClient::new(config(), connector, store);

    client.connect();
    for id in 1..=3 {
        tx.unbounded_send(Ok(payload(id, "Acme"))).unwrap();
    }

    let snapshot = reader.wait_for(|s| s.len() == 3).await.unwrap();
    assert_eq!(
        snapshot.ids(),
        vec![NotificationId(3), NotificationId(2), NotificationId(1)]
    );
    assert_eq!(snapshot.unread_count(), 3);

    client.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn malformed_message_is_dropped_and_channel_stays_up() {
    let (tx, open) = session();
    let connector = ScriptedConnector::new(vec![open]);
    let store = StoreHandle::spawn(NotificationStore::new());
    let mut reader = store.reader();
    let client = TransportClient::new(config(), connector.clone(), store);

    client.connect();
    tx.unbounded_send(Ok("{not json".to_string())).unwrap();
    tx.unbounded_send(Ok(String::new())).unwrap();
    tx.unbounded_send(Ok(payload(7, "Kickoff"))).unwrap();

    let snapshot = reader.wait_for(|s| !s.is_empty()).await.unwrap();
    assert_eq!(snapshot.ids(), vec![NotificationId(7)]);
    assert_eq!(client.state(), TransportState::Connected { session: 1 });
    assert_eq!(connector.attempts().len(), 1);

    client.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn server_close_triggers_reconnect() {
    let (first, open_first) = session();
    let (second, open_second) = session();
    let connector = ScriptedConnector::new(vec![open_first, open_second]);
    let store = StoreHandle::spawn(NotificationStore::new());
    let mut reader = store.reader();
    let client = TransportClient::new(config(), connector.clone(), store);
    let mut state = client.subscribe_state();

    client.connect();
    state
        .wait_for(|s| *s == TransportState::Connected { session: 1 })
        .await
        .unwrap();

    drop(first);
    state
        .wait_for(|s| *s == TransportState::Connected { session: 2 })
        .await
        .unwrap();

    let attempts = connector.attempts();
    assert_eq!(attempts.len(), 2);
    assert!(attempts[1] - attempts[0] >= Duration::from_secs(5));

    second.unbounded_send(Ok(payload(1, "after reconnect"))).unwrap();
    let snapshot = reader.wait_for(|s| s.len() == 1).await.unwrap();
    assert_eq!(snapshot.records()[0].title, "after reconnect");

    client.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn stream_error_counts_as_loss() {
    let (tx, open) = session();
    let connector = ScriptedConnector::new(vec![open]);
    let store = StoreHandle::spawn(NotificationStore::new());
    let client = TransportClient::new(config(), connector.clone(), store);
    let mut state = client.subscribe_state();

    client.connect();
    state.wait_for(TransportState::is_connected).await.unwrap();

    tx.unbounded_send(Err(TransportError::Server {
        message: "session expired".to_string(),
    }))
    .unwrap();

    let waiting = *state
        .wait_for(|s| matches!(s, TransportState::WaitingToReconnect { .. }))
        .await
        .unwrap();
    assert_eq!(
        waiting,
        TransportState::WaitingToReconnect {
            failures: 1,
            delay: Duration::from_secs(5),
        }
    );

    client.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn decode_error_from_stream_keeps_session() {
    let (tx, open) = session();
    let connector = ScriptedConnector::new(vec![open]);
    let store = StoreHandle::spawn(NotificationStore::new());
    let mut reader = store.reader();
    let client = TransportClient::new(config(), connector.clone(), store);

    client.connect();
    tx.unbounded_send(Err(TransportError::Decode(DecodeError::Empty)))
        .unwrap();
    tx.unbounded_send(Ok(payload(3, "still here"))).unwrap();

    let snapshot = reader.wait_for(|s| !s.is_empty()).await.unwrap();
    assert_eq!(snapshot.ids(), vec![NotificationId(3)]);
    assert_eq!(client.state(), TransportState::Connected { session: 1 });
    assert_eq!(connector.attempts().len(), 1);

    client.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn connect_is_idempotent() {
    let (_tx, open) = session();
    let connector = ScriptedConnector::new(vec![open]);
    let store = StoreHandle::spawn(NotificationStore::new());
    let client = TransportClient::new(config(), connector.clone(), store);
    let mut state = client.subscribe_state();

    client.connect();
    client.connect();
    state.wait_for(TransportState::is_connected).await.unwrap();
    client.connect();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(connector.attempts().len(), 1);
    assert_eq!(client.state(), TransportState::Connected { session: 1 });

    client.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn disconnect_cancels_pending_reconnect() {
    let connector = ScriptedConnector::new(Vec::new());
    let store = StoreHandle::spawn(NotificationStore::new());
    let client = TransportClient::new(config(), connector.clone(), store);
    let mut state = client.subscribe_state();

    client.connect();
    state
        .wait_for(|s| matches!(s, TransportState::WaitingToReconnect { .. }))
        .await
        .unwrap();

    client.disconnect().await;
    client.disconnect().await;
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(connector.attempts().len(), 1);
    assert_eq!(client.state(), TransportState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn reconnect_after_disconnect_starts_fresh() {
    let (_first, open_first) = session();
    let (_second, open_second) = session();
    let connector = ScriptedConnector::new(vec![open_first, open_second]);
    let store = StoreHandle::spawn(NotificationStore::new());
    let client = TransportClient::new(config(), connector.clone(), store);
    let mut state = client.subscribe_state();

    client.connect();
    state.wait_for(TransportState::is_connected).await.unwrap();
    client.disconnect().await;
    assert_eq!(client.state(), TransportState::Disconnected);

    client.connect();
    state.wait_for(TransportState::is_connected).await.unwrap();
    assert_eq!(connector.attempts().len(), 2);

    client.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn dropping_the_client_stops_retries() {
    let connector = ScriptedConnector::new(Vec::new());
    let store = StoreHandle::spawn(NotificationStore::new());
    let client = TransportClient::new(config(), connector.clone(), store);
    let mut state = client.subscribe_state();

    client.connect();
    state
        .wait_for(|s| matches!(s, TransportState::WaitingToReconnect { .. }))
        .await
        .unwrap();

    drop(client);
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(connector.attempts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn closed_store_stops_the_supervisor() {
    let (tx, open) = session();
    let connector = ScriptedConnector::new(vec![open]);
    let store = StoreHandle::spawn(NotificationStore::new());
    let client = TransportClient::new(config(), connector.clone(), store.clone());
    let mut state = client.subscribe_state();

    client.connect();
    state.wait_for(TransportState::is_connected).await.unwrap();

    store.shutdown().await;
    tx.unbounded_send(Ok(payload(1, "late"))).unwrap();

    state
        .wait_for(|s| *s == TransportState::Disconnected)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(connector.attempts().len(), 1);

    client.disconnect().await;
}
