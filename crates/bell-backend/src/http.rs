//! `reqwest` implementation of [`NotificationBackend`]
//!
//! Paths, relative to the notifications base URL:
//! - `GET    {base}/recent`
//! - `PUT    {base}/{id}/read`
//! - `PUT    {base}/read-all`
//! - `DELETE {base}/{id}`

use crate::auth::TokenProvider;
use crate::backend::NotificationBackend;
use crate::error::BackendError;
use async_trait::async_trait;
use bell_model::{Envelope, NotificationId, NotificationRecord};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// HTTP client for the notification endpoints
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base: String,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpBackend {
    /// Client rooted at `base` (e.g. `http://host/api/admin/notifications`)
    ///
    /// # Errors
    /// `BackendError::Http` if the underlying client cannot be built
    pub fn new(
        base: &Url,
        timeout: Duration,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base: base.as_str().trim_end_matches('/').to_string(),
            tokens,
        })
    }

    /// Get base URL
    #[inline]
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.client.request(method, format!("{}/{}", self.base, path));
        match self.tokens.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send and return the raw body of a successful response
    async fn execute(&self, request: RequestBuilder) -> Result<String, BackendError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            self.tokens.on_unauthorized();
            return Err(BackendError::Unauthorized);
        }

        let body = response.text().await?;
        if !status.is_success() {
            return Err(BackendError::status(status.as_u16(), body));
        }
        Ok(body)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Option<T>, BackendError> {
        let body = self.execute(request).await?;
        let envelope: Envelope<T> = serde_json::from_str(&body)?;
        envelope.into_result().map_err(BackendError::Rejected)
    }

    /// Mutation call; an empty success body counts as accepted
    async fn mutate(&self, request: RequestBuilder) -> Result<(), BackendError> {
        let body = self.execute(request).await?;
        if body.trim().is_empty() {
            return Ok(());
        }
        let envelope: Envelope<serde_json::Value> = serde_json::from_str(&body)?;
        envelope.into_result().map_err(BackendError::Rejected)?;
        Ok(())
    }
}

#[async_trait]
impl NotificationBackend for HttpBackend {
    async fn fetch_recent(&self) -> Result<Vec<NotificationRecord>, BackendError> {
        let records: Vec<NotificationRecord> = self
            .call(self.request(Method::GET, "recent"))
            .await?
            .ok_or(BackendError::MissingData)?;
        tracing::debug!(count = records.len(), "fetched recent notifications");
        Ok(records)
    }

    async fn mark_read(&self, id: NotificationId) -> Result<(), BackendError> {
        self.mutate(self.request(Method::PUT, &format!("{id}/read")))
            .await
    }

    async fn mark_all_read(&self) -> Result<(), BackendError> {
        self.mutate(self.request(Method::PUT, "read-all")).await
    }

    async fn delete(&self, id: NotificationId) -> Result<(), BackendError> {
        self.mutate(self.request(Method::DELETE, &id.to_string()))
            .await
    }
}
