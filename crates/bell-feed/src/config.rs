//! Bell configuration
//!
//! Loaded from TOML, then overridden from the environment:
//! - `BELL_API_URL` replaces `api_url`
//! - `BELL_PUSH_URL` replaces `push_url`
//! - `BELL_TOKEN` replaces `token`
//!
//! When `push_url` is absent it is derived from `api_url`: `http` becomes
//! `ws`, `https` becomes `wss`, a trailing `/api` is dropped and
//! `/ws/websocket` is appended.

use crate::controller::ControllerSettings;
use crate::error::ConfigError;
use crate::policy::MutationPolicy;
use bell_transport::{ReconnectPolicy, TransportConfig, DEFAULT_TOPIC};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default REST root
pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

/// Default notifications prefix under the REST root
pub const DEFAULT_NOTIFICATIONS_PATH: &str = "/admin/notifications";

/// Environment variable overriding `api_url`
pub const ENV_API_URL: &str = "BELL_API_URL";
/// Environment variable overriding `push_url`
pub const ENV_PUSH_URL: &str = "BELL_PUSH_URL";
/// Environment variable overriding `token`
pub const ENV_TOKEN: &str = "BELL_TOKEN";

/// Session configuration
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BellConfig {
    /// REST root, e.g. `http://localhost:8080/api`
    pub api_url: String,
    /// Notifications prefix under `api_url`
    pub notifications_path: String,
    /// Push endpoint; derived from `api_url` when absent
    pub push_url: Option<String>,
    /// Push topic
    pub topic: String,
    /// Reconnect delay policy
    pub reconnect: ReconnectPolicy,
    /// What failed mutations do
    pub mutation_policy: MutationPolicy,
    /// Re-fetch the feed after every reconnect
    pub refetch_on_reconnect: bool,
    /// REST request timeout in seconds
    pub request_timeout_secs: u64,
    /// Bearer token
    #[serde(skip_serializing)]
    pub token: Option<String>,
}

impl BellConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With REST root
    #[inline]
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// With explicit push endpoint
    #[inline]
    #[must_use]
    pub fn with_push_url(mut self, push_url: impl Into<String>) -> Self {
        self.push_url = Some(push_url.into());
        self
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

    /// With bearer token
    #[inline]
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Load from a TOML file, apply environment overrides and validate
    ///
    /// # Errors
    /// I/O, parse or validation failure
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?.with_env_overrides();
        config.validate()?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse TOML; missing keys take their defaults
    ///
    /// # Errors
    /// `ConfigError::Parse` for malformed TOML
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `BELL_*` environment overrides
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup; empty values are ignored
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(api_url) = get(ENV_API_URL) {
            self.api_url = api_url;
        }
        if let Some(push_url) = get(ENV_PUSH_URL) {
            self.push_url = Some(push_url);
        }
        if let Some(token) = get(ENV_TOKEN) {
            self.token = Some(token);
        }
        self
    }

    /// Check that every value is usable
    ///
    /// # Errors
    /// `ConfigError::Invalid` naming the first bad field
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.notifications_url()?;
        self.push_endpoint()?;
        if self.topic.trim().is_empty() {
            return Err(ConfigError::invalid("topic", "must not be empty"));
        }
        if self.reconnect.min_delay().is_zero() {
            return Err(ConfigError::invalid("reconnect", "delay must be positive"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::invalid("request_timeout_secs", "must be positive"));
        }
        Ok(())
    }

    /// REST base for the notification endpoints
    ///
    /// # Errors
    /// `ConfigError::Invalid` when `api_url` is not an http(s) URL
    pub fn notifications_url(&self) -> Result<Url, ConfigError> {
        let api = Url::parse(&self.api_url).map_err(|e| ConfigError::invalid("api_url", e))?;
        if !matches!(api.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(
                "api_url",
                format!("unsupported scheme {}", api.scheme()),
            ));
        }
        let path = self.notifications_path.trim_matches('/');
        let joined = format!("{}/{}", self.api_url.trim_end_matches('/'), path);
        Url::parse(&joined).map_err(|e| ConfigError::invalid("notifications_path", e))
    }

    /// Push endpoint, explicit or derived
    ///
    /// # Errors
    /// `ConfigError::Invalid` when neither URL yields a ws(s) endpoint
    pub fn push_endpoint(&self) -> Result<Url, ConfigError> {
        match &self.push_url {
            Some(push) => {
                let url = Url::parse(push).map_err(|e| ConfigError::invalid("push_url", e))?;
                if matches!(url.scheme(), "ws" | "wss") {
                    Ok(url)
                } else {
                    Err(ConfigError::invalid(
                        "push_url",
                        format!("unsupported scheme {}", url.scheme()),
                    ))
                }
            }
            None => derive_push_url(&self.api_url),
        }
    }

    /// REST request timeout
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Transport settings
    ///
    /// # Errors
    /// `ConfigError::Invalid` for a bad push endpoint
    pub fn transport_config(&self) -> Result<TransportConfig, ConfigError> {
        Ok(TransportConfig::new(self.push_endpoint()?)
            .with_topic(self.topic.clone())
            .with_reconnect(self.reconnect))
    }

    /// Controller settings
    #[must_use]
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings::default()
            .with_mutation_policy(self.mutation_policy)
            .with_refetch_on_reconnect(self.refetch_on_reconnect)
    }
}

impl Default for BellConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            notifications_path: DEFAULT_NOTIFICATIONS_PATH.to_string(),
            push_url: None,
            topic: DEFAULT_TOPIC.to_string(),
            reconnect: ReconnectPolicy::default(),
            mutation_policy: MutationPolicy::default(),
            refetch_on_reconnect: false,
            request_timeout_secs: 30,
            token: None,
        }
    }
}

impl fmt::Debug for BellConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BellConfig")
            .field("api_url", &self.api_url)
            .field("notifications_path", &self.notifications_path)
            .field("push_url", &self.push_url)
            .field("topic", &self.topic)
            .field("reconnect", &self.reconnect)
            .field("mutation_policy", &self.mutation_policy)
            .field("refetch_on_reconnect", &self.refetch_on_reconnect)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Push endpoint for a REST root
///
/// # Errors
/// `ConfigError::Invalid` when `api_url` is not an http(s) or ws(s) URL
pub fn derive_push_url(api_url: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(api_url).map_err(|e| ConfigError::invalid("api_url", e))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ConfigError::invalid(
                "api_url",
                format!("cannot derive push endpoint from scheme {other}"),
            ))
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| ConfigError::invalid("api_url", "cannot switch to websocket scheme"))?;

    let base = url.path().trim_end_matches('/');
    let path = format!("{}/ws/websocket", base.strip_suffix("/api").unwrap_or(base));
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
