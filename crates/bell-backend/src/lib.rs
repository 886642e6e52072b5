//! Bell Backend - REST collaborator for the notification feed
//!
//! - [`NotificationBackend`] is the seam the feed controller talks to: one bulk
//!   fetch and three idempotent mutations
//! - [`HttpBackend`] implements it over `reqwest`, unwrapping the
//!   `{success, message, data}` envelope
//! - [`TokenProvider`] supplies the bearer token and hears about `401`s
//!
//! # Example
//!
//! ```rust,ignore
//! use bell_backend::{HttpBackend, NotificationBackend, SessionToken};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let base = "http://localhost:8080/api/admin/notifications".parse()?;
//! let tokens = Arc::new(SessionToken::new(Some("secret".to_string())));
//! let backend = HttpBackend::new(&base, Duration::from_secs(10), tokens)?;
//!
//! let recent = backend.fetch_recent().await?;
//! println!("{} notifications", recent.len());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod auth;
pub mod backend;
pub mod error;
pub mod http;

pub use auth::{SessionToken, TokenProvider};
pub use backend::NotificationBackend;
pub use error::BackendError;
pub use http::HttpBackend;
