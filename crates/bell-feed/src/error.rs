//! Error types for the feed controller and its configuration

use bell_backend::BackendError;
use bell_store::StoreError;
use std::path::PathBuf;

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File we tried to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`BellConfig`](crate::BellConfig)
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is present but unusable
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

impl ConfigError {
    /// Create invalid-value error
    #[inline]
    pub fn invalid(field: &'static str, reason: impl ToString) -> Self {
        Self::Invalid {
            field,
            reason: reason.to_string(),
        }
    }
}

/// Feed controller errors
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// Bad configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backend call failed
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Store task is gone
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Controller was shut down
    #[error("feed controller is shut down")]
    ShutDown,
}

impl FeedError {
    /// Check if a retry could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend(e) if e.is_retryable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_display_names_field() {
        let err = ConfigError::invalid("topic", "must not be empty");
        assert_eq!(err.to_string(), "invalid topic: must not be empty");
    }

    #[test]
    fn only_transient_backend_errors_are_retryable() {
        assert!(FeedError::Backend(BackendError::status(502, "")).is_retryable());
        assert!(!FeedError::Backend(BackendError::Unauthorized).is_retryable());
        assert!(!FeedError::ShutDown.is_retryable());
        assert!(!FeedError::Store(StoreError::Closed).is_retryable());
    }
}
