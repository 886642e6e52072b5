//! Bell Feed - session orchestration for the admin notification bell
//!
//! Wires the pieces together for one operator session:
//! - [`FeedController`] runs the startup fetch, keeps the push channel alive
//!   and turns user intents into optimistic store changes plus backend calls
//! - [`MutationPolicy`] decides what a failed backend call does to the feed
//! - [`BellPanel`] is the presentation adapter: badge, rows, click handling
//! - [`BellConfig`] loads settings from TOML and the environment
//!
//! # Example
//!
//! ```rust,ignore
//! use bell_feed::{BellConfig, FeedController};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BellConfig::load("bell.toml")?;
//! let controller = FeedController::connect_http(&config)?;
//! controller.activate().await?;
//!
//! println!("unread: {}", controller.snapshot().unread_count());
//! controller.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod panel;
pub mod policy;

pub use config::BellConfig;
pub use controller::{ControllerSettings, FeedController, Phase};
pub use error::{ConfigError, FeedError};
pub use events::{FeedEvent, Mutation};
pub use panel::{badge_text, BellPanel, BellView, ClickOutcome, ItemView, Navigator};
pub use policy::MutationPolicy;
