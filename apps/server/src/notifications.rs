//! Server-side notification dispatcher.
//!
//! Every request is persisted first; push delivery to the configured webhook
//! is attempted afterwards. Callers treat the whole send as best-effort.

use std::sync::Arc;

use async_trait::async_trait;
use famquest_core::errors::{Error, Result};
use famquest_core::notifications::{
    NotificationDispatcherTrait, NotificationRepositoryTrait, NotificationRequest,
};

pub struct PushDispatcher {
    repository: Arc<dyn NotificationRepositoryTrait>,
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl PushDispatcher {
    pub fn new(repository: Arc<dyn NotificationRepositoryTrait>, endpoint: Option<String>) -> Self {
        Self {
            repository,
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl NotificationDispatcherTrait for PushDispatcher {
    async fn send(&self, request: NotificationRequest) -> Result<()> {
        self.repository.insert(&request).await?;

        if let Some(endpoint) = &self.endpoint {
            self.client
                .post(endpoint)
                .json(&request)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| Error::Unexpected(format!("Push delivery failed: {}", e)))?;
        }
        Ok(())
    }
}
