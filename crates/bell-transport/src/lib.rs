//! Bell Transport - the live push channel
//!
//! Keeps exactly one logical push connection per session:
//! - [`PushConnector`] opens a subscribed message stream; [`StompConnector`]
//!   does it over STOMP/WebSocket
//! - [`TransportClient`] supervises the connection, retries after loss per
//!   [`ReconnectPolicy`], decodes each message and hands it to the feed store's
//!   writer task
//!
//! # Example
//!
//! ```rust,ignore
//! use bell_store::{NotificationStore, StoreHandle};
//! use bell_transport::{StompConnector, TransportClient, TransportConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = StoreHandle::spawn(NotificationStore::new());
//! let config = TransportConfig::new("ws://localhost:8080/ws/websocket".parse()?);
//! let client = TransportClient::new(config, Arc::new(StompConnector::new()), store);
//!
//! client.connect();
//! // ...
//! client.disconnect().await;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod client;
pub mod connector;
pub mod error;
pub mod frame;
pub mod policy;
pub mod stomp;

pub use client::{TransportClient, TransportConfig, TransportState, DEFAULT_TOPIC};
pub use connector::{PushConnector, PushStream};
pub use error::TransportError;
pub use frame::{StompCommand, StompFrame};
pub use policy::ReconnectPolicy;
pub use stomp::StompConnector;
