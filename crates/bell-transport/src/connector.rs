//! Push connector seam

use crate::error::TransportError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use url::Url;

/// Message bodies of one subscribed session, in arrival order
///
/// The stream ends when the server closes the session. An `Err` item means the
/// session is lost; the supervisor drops the stream and reconnects.
pub type PushStream = BoxStream<'static, Result<String, TransportError>>;

/// Opens a subscribed push session
#[async_trait]
pub trait PushConnector: Send + Sync + std::fmt::Debug {
    /// Connect to `endpoint` and subscribe to `topic`
    ///
    /// # Errors
    /// Any failure before the subscription is in place
    async fn open(&self, endpoint: &Url, topic: &str) -> Result<PushStream, TransportError>;
}
