use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("notification service returned status {0}")]
    Rejected(u16),
}

/// Fire-and-forget "notify user X of event Y". Delivery is best-effort;
/// callers log failures and never propagate them.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, user_id: &str, kind: &str, data: Value) -> Result<(), NotifyError>;
}

/// Client for the marketplace notification service.
pub struct HttpNotifier {
    http: reqwest::Client,
    base_url: String,
}

impl HttpNotifier {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl NotificationSink for HttpNotifier {
    async fn notify(&self, user_id: &str, kind: &str, data: Value) -> Result<(), NotifyError> {
        let response = self
            .http
            .post(format!("{}/api/v1/notifications", self.base_url))
            .json(&json!({
                "userId": user_id,
                "type": kind,
                "data": data,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status().as_u16()));
        }

        Ok(())
    }
}

/// Sink used when no notification service is configured.
pub struct NullNotifier;

#[async_trait]
impl NotificationSink for NullNotifier {
    async fn notify(&self, _user_id: &str, _kind: &str, _data: Value) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Spawns the notification off the request path and logs failures.
pub fn dispatch(sink: Arc<dyn NotificationSink>, user_id: String, kind: &'static str, data: Value) {
    tokio::spawn(async move {
        if let Err(e) = sink.notify(&user_id, kind, data).await {
            tracing::warn!(error = %e, kind = kind, "Notification delivery failed");
        }
    });
}
