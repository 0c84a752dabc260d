use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::models::WebhookEvent;

/// WebhookNotifier
///
/// Outgoing alert delivery. The HTTP client is swapped for `MockWebhookNotifier`
/// in tests so handlers can be exercised without network access.
#[async_trait]
pub trait WebhookNotifier: Send + Sync {
    /// POSTs `event` as JSON to `url`. Any transport error or non-2xx answer
    /// is a failure, described by the returned string.
    async fn deliver(&self, url: &str, event: &WebhookEvent) -> Result<(), String>;
}

/// HttpWebhookNotifier
///
/// Delivers over HTTP with a shared `reqwest::Client`.
#[derive(Clone, Default)]
pub struct HttpWebhookNotifier {
    client: reqwest::Client,
}

impl HttpWebhookNotifier {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WebhookNotifier for HttpWebhookNotifier {
    async fn deliver(&self, url: &str, event: &WebhookEvent) -> Result<(), String> {
        let response = self
            .client
            .post(url)
            .json(event)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("target answered {}", response.status()));
        }
        tracing::info!(url, event_type = %event.event_type, "webhook delivered");
        Ok(())
    }
}

/// MockWebhookNotifier
///
/// Records deliveries instead of sending them.
#[derive(Clone, Default)]
pub struct MockWebhookNotifier {
    /// When true, every delivery fails.
    pub should_fail: bool,
    pub delivered: Arc<Mutex<Vec<(String, WebhookEvent)>>>,
}

impl MockWebhookNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true, ..Self::default() }
    }

    pub fn deliveries(&self) -> Vec<(String, WebhookEvent)> {
        self.delivered.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl WebhookNotifier for MockWebhookNotifier {
    async fn deliver(&self, url: &str, event: &WebhookEvent) -> Result<(), String> {
        if self.should_fail {
            return Err("Mock delivery error: simulation requested".to_string());
        }
        if let Ok(mut delivered) = self.delivered.lock() {
            delivered.push((url.to_string(), event.clone()));
        }
        Ok(())
    }
}

/// NotifierState
///
/// Shared handle to webhook delivery inside `AppState`.
pub type NotifierState = Arc<dyn WebhookNotifier>;
