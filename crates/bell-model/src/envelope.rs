//! REST response envelope
//!
//! Every backend response is wrapped as `{success, message, data}`.

use serde::{Deserialize, Serialize};

/// `{success, message, data}` wrapper around a REST payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Whether the backend accepted the call
    pub success: bool,
    /// Human readable status message
    #[serde(default)]
    pub message: String,
    /// Payload, absent for calls with nothing to return
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Successful envelope carrying `data`
    #[inline]
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: String::new(),
            data: Some(data),
        }
    }

    /// Rejected envelope with a message
    #[inline]
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    /// Unwrap into the payload, or the backend's message when rejected
    ///
    /// # Errors
    /// Returns the envelope message when `success` is false.
    pub fn into_result(self) -> Result<Option<T>, String> {
        if self.success {
            Ok(self.data)
        } else {
            Err(self.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_without_data() {
        let env: Envelope<String> =
            serde_json::from_str(r#"{"success":true,"message":"ok"}"#).unwrap();
        assert!(env.success);
        assert_eq!(env.data, None);
        assert_eq!(env.into_result(), Ok(None));
    }

    #[test]
    fn rejected_surfaces_message() {
        let env: Envelope<Vec<u32>> =
            serde_json::from_str(r#"{"success":false,"message":"not found","data":null}"#).unwrap();
        assert_eq!(env.into_result(), Err("not found".to_string()));
    }

    #[test]
    fn ok_carries_data() {
        assert_eq!(Envelope::ok(3).into_result(), Ok(Some(3)));
    }
}
