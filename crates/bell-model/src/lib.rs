//! Bell Model - notification feed data types
//!
//! Defines what travels between the backend, the push channel and the feed:
//! - [`NotificationRecord`] and its [`NotificationId`]
//! - The open-ended [`NotificationKind`] tag
//! - The `{success, message, data}` [`Envelope`] used by every REST response
//! - Relative-time rendering for display
//!
//! # Example
//!
//! ```rust
//! use bell_model::{NotificationKind, NotificationRecord};
//!
//! let json = r#"{"idNotification":7,"type":"NEW_CLIENT","title":"New client",
//!     "message":"Acme signed up","isRead":false,"createdAt":"2025-01-31T10:15:00"}"#;
//! let record = NotificationRecord::from_json(json).unwrap();
//!
//! assert_eq!(record.kind, NotificationKind::NewClient);
//! assert!(!record.read);
//! ```

#![warn(unreachable_pub)]

pub mod envelope;
pub mod error;
pub mod kind;
pub mod record;
pub mod time;

pub use envelope::Envelope;
pub use error::DecodeError;
pub use kind::{KindIcon, NotificationKind};
pub use record::{NotificationId, NotificationRecord};
pub use time::relative_time;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
