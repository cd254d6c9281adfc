//! Delivery seam for notifications.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use super::NotificationChannel;

/// A delivery attempt that did not go through. The message becomes the
/// notification's failure reason.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct SendError(pub String);

/// Delivers messages over one channel.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    fn channel(&self) -> NotificationChannel;

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), SendError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Keeps every message it is asked to send. Useful for testing.
#[derive(Clone)]
pub struct RecordingSender {
    channel: NotificationChannel,
    sent: Arc<RwLock<Vec<SentMessage>>>,
    failure: Option<String>,
}

impl RecordingSender {
    pub fn new(channel: NotificationChannel) -> Self {
        Self {
            channel,
            sent: Arc::new(RwLock::new(Vec::new())),
            failure: None,
        }
    }

    /// A sender whose every delivery fails with `reason`.
    pub fn failing(channel: NotificationChannel, reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::new(channel)
        }
    }

    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl NotificationSender for RecordingSender {
    fn channel(&self) -> NotificationChannel {
        self.channel
    }

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), SendError> {
        if let Some(reason) = &self.failure {
            return Err(SendError(reason.clone()));
        }

        self.sent.write().await.push(SentMessage {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
