//! Decode errors for inbound payloads

/// Failure to turn a wire payload into a model type
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Payload was not valid JSON for the expected shape
    #[error("malformed payload: {source}")]
    Json {
        /// Underlying serde error
        #[source]
        source: serde_json::Error,
    },

    /// Payload was empty
    #[error("empty payload")]
    Empty,
}

impl From<serde_json::Error> for DecodeError {
    fn from(source: serde_json::Error) -> Self {
        Self::Json { source }
    }
}
