//! Notification sender that writes deliveries to the log.

use async_trait::async_trait;
use domain::notification::{NotificationChannel, NotificationSender, SendError};

/// Stands in for a real gateway: every message is logged and reported as
/// delivered.
#[derive(Debug, Clone, Copy)]
pub struct LogSender {
    channel: NotificationChannel,
}

impl LogSender {
    pub fn new(channel: NotificationChannel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl NotificationSender for LogSender {
    fn channel(&self) -> NotificationChannel {
        self.channel
    }

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), SendError> {
        tracing::info!(channel = %self.channel, recipient, subject, body, "notification delivered");
        Ok(())
    }
}
