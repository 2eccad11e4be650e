use crate::domain::ports::{SIGNATURE_HEADER, WebhookDelivery, WebhookTransport};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Logs deliveries instead of sending them. Used when the process runs
/// without an external webhook receiver wired in.
#[derive(Default, Clone)]
pub struct LoggingWebhookTransport;

impl LoggingWebhookTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WebhookTransport for LoggingWebhookTransport {
    async fn deliver(&self, delivery: WebhookDelivery) -> Result<()> {
        tracing::info!(
            url = %delivery.url,
            header = SIGNATURE_HEADER,
            signature = %delivery.signature,
            body = %delivery.body,
            "webhook delivery (logging transport)"
        );
        Ok(())
    }
}

/// Captures deliveries for assertions.
#[derive(Default, Clone)]
pub struct RecordingWebhookTransport {
    deliveries: Arc<RwLock<Vec<WebhookDelivery>>>,
}

impl RecordingWebhookTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn deliveries(&self) -> Vec<WebhookDelivery> {
        self.deliveries.read().await.clone()
    }
}

#[async_trait]
impl WebhookTransport for RecordingWebhookTransport {
    async fn deliver(&self, delivery: WebhookDelivery) -> Result<()> {
        let mut deliveries = self.deliveries.write().await;
        deliveries.push(delivery);
        Ok(())
    }
}
