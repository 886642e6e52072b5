//! STOMP over WebSocket connector

use crate::connector::{PushConnector, PushStream};
use crate::error::TransportError;
use crate::frame::{StompCommand, StompFrame};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Socket plus frames already decoded from a batched message
struct Session {
    socket: Socket,
    pending: VecDeque<StompFrame>,
}

impl Session {
    fn new(socket: Socket) -> Self {
        Self {
            socket,
            pending: VecDeque::new(),
        }
    }

    async fn send(&mut self, frame: &StompFrame) -> Result<(), TransportError> {
        self.socket.send(Message::Text(frame.encode())).await?;
        Ok(())
    }

    /// Next non-heartbeat frame; `Ok(None)` when the socket closed
    async fn next_frame(&mut self) -> Result<Option<StompFrame>, TransportError> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(Some(frame));
            }
            let Some(message) = self.socket.next().await else {
                return Ok(None);
            };
            let text = match message? {
                Message::Text(text) => text,
                Message::Binary(bytes) => String::from_utf8(bytes)
                    .map_err(|e| TransportError::Protocol(format!("non-utf8 frame: {e}")))?,
                Message::Close(_) => return Ok(None),
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            };
            self.pending.extend(StompFrame::parse_all(&text)?);
        }
    }
}

const SUBSCRIPTION_ID: &str = "sub-0";
const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Production connector: one WebSocket, one STOMP session, one subscription
#[derive(Clone)]
pub struct StompConnector {
    token: Option<String>,
    handshake_timeout: Duration,
}

impl std::fmt::Debug for StompConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StompConnector")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("handshake_timeout", &self.handshake_timeout)
            .finish()
    }
}

impl StompConnector {
    /// Connector without credentials
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            token: None,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Send `Authorization: Bearer <token>` in the CONNECT frame
    #[inline]
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// With handshake timeout
    #[inline]
    #[must_use]
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    async fn handshake(&self, session: &mut Session, host: &str, topic: &str) -> Result<(), TransportError> {
        session
            .send(&StompFrame::connect(host, self.token.as_deref()))
            .await?;

        loop {
            let Some(frame) = session.next_frame().await? else {
                return Err(TransportError::Handshake("closed before CONNECTED".to_string()));
            };
            match frame.command {
                StompCommand::Connected => break,
                StompCommand::Error => return Err(server_error(&frame)),
                other => tracing::debug!(command = %other, "ignoring frame before CONNECTED"),
            }
        }

        session
            .send(&StompFrame::subscribe(SUBSCRIPTION_ID, topic))
            .await
    }
}

impl Default for StompConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PushConnector for StompConnector {
    async fn open(&self, endpoint: &Url, topic: &str) -> Result<PushStream, TransportError> {
        let (socket, _) = connect_async(endpoint.as_str())
            .await
            .map_err(|e| TransportError::connect(endpoint, e))?;
        let mut session = Session::new(socket);

        let host = endpoint.host_str().unwrap_or("localhost").to_string();
        tokio::time::timeout(self.handshake_timeout, self.handshake(&mut session, &host, topic))
            .await
            .map_err(|_| TransportError::Timeout {
                duration_secs: self.handshake_timeout.as_secs(),
            })??;

        tracing::debug!(%endpoint, topic, "stomp session established");

        let messages = futures::stream::unfold(Some(session), |session| async move {
            let mut session = session?;
            loop {
                match session.next_frame().await {
                    Ok(Some(frame)) => match frame.command {
                        StompCommand::Message => return Some((Ok(frame.body), Some(session))),
                        StompCommand::Error => return Some((Err(server_error(&frame)), None)),
                        other => tracing::debug!(command = %other, "ignoring frame"),
                    },
                    Ok(None) => return None,
                    Err(e) => return Some((Err(e), None)),
                }
            }
        });

        Ok(messages.boxed())
    }
}

fn server_error(frame: &StompFrame) -> TransportError {
    let message = frame
        .get("message")
        .map_or_else(|| frame.body.clone(), str::to_string);
    TransportError::Server { message }
}
