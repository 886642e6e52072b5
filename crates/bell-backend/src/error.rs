//! Error types for backend calls

/// Backend call errors
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Transport-level failure (connect, timeout, body read)
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status other than 401
    #[error("unexpected status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// Session is no longer valid
    #[error("unauthorized")]
    Unauthorized,

    /// Envelope came back with `success = false`
    #[error("rejected by backend: {0}")]
    Rejected(String),

    /// Envelope succeeded but carried no payload where one was required
    #[error("response carried no data")]
    MissingData,

    /// Body was not the expected JSON
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl BackendError {
    /// Create status error
    #[inline]
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Check if a retry could succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Unauthorized | Self::Rejected(_) | Self::MissingData | Self::Decode(_) => false,
        }
    }

    /// Check if the session must be re-established
    #[inline]
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}
