//! Bearer token supply

use parking_lot::RwLock;
use std::fmt;

/// Source of the session's bearer token
///
/// The HTTP client calls [`token`](TokenProvider::token) before every request
/// and [`on_unauthorized`](TokenProvider::on_unauthorized) when the backend
/// answers `401`.
pub trait TokenProvider: Send + Sync + fmt::Debug {
    /// Current token, if the session has one
    fn token(&self) -> Option<String>;

    /// Backend rejected the token; the session is over
    fn on_unauthorized(&self) {}
}

/// In-memory token for one operator session
///
/// A `401` clears the token so later requests go out unauthenticated and fail
/// fast until a new token is installed.
#[derive(Default)]
pub struct SessionToken {
    token: RwLock<Option<String>>,
}

impl SessionToken {
    /// Session holding `token`
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    /// Install a fresh token
    pub fn set(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    /// Whether a token is installed
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl TokenProvider for SessionToken {
    fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn on_unauthorized(&self) {
        if self.token.write().take().is_some() {
            tracing::warn!("backend rejected session token; session invalidated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_clears_token() {
        let session = SessionToken::new(Some("abc".to_string()));
        assert_eq!(session.token().as_deref(), Some("abc"));

        session.on_unauthorized();
        assert!(!session.is_authenticated());
        assert_eq!(session.token(), None);

        session.set("fresh");
        assert_eq!(session.token().as_deref(), Some("fresh"));
    }

    #[test]
    fn debug_hides_token() {
        let session = SessionToken::new(Some("secret".to_string()));
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret"));
    }
}
