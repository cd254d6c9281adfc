//! Notification aggregate implementation.

use aggregate_store::{Version, Versioned};
use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, Decision};

use super::{NotificationError, NotificationEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationChannel {
    Email,
    Sms,
    Push,
}

impl NotificationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationChannel::Email => "Email",
            NotificationChannel::Sms => "Sms",
            NotificationChannel::Push => "Push",
        }
    }
}

impl std::fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Delivery outcome. `Pending` moves once, to either final status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NotificationStatus {
    #[default]
    Pending,
    Sent,
    Failed,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "Pending",
            NotificationStatus::Sent => "Sent",
            NotificationStatus::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A message addressed to one user over one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    id: AggregateId,
    version: Version,
    user_id: AggregateId,
    channel: NotificationChannel,
    recipient: String,
    subject: String,
    body: String,
    status: NotificationStatus,
    failure_reason: Option<String>,
    sent_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Notification {
    /// Creates a pending notification at version 1.
    pub fn pending(
        id: AggregateId,
        user_id: AggregateId,
        channel: NotificationChannel,
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            version: Version::first(),
            user_id,
            channel,
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
            status: NotificationStatus::Pending,
            failure_reason: None,
            sent_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn user_id(&self) -> AggregateId {
        self.user_id
    }

    pub fn channel(&self) -> NotificationChannel {
        self.channel
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn status(&self) -> NotificationStatus {
        self.status
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        self.sent_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

// Command methods
impl Notification {
    pub fn mark_sent(
        &mut self,
        at: DateTime<Utc>,
    ) -> Result<Decision<NotificationEvent>, NotificationError> {
        self.ensure_pending()?;

        self.status = NotificationStatus::Sent;
        self.sent_at = Some(at);

        Ok(Decision::emit(NotificationEvent::NotificationSent {
            notification_id: self.id,
            user_id: self.user_id,
            channel: self.channel,
        }))
    }

    pub fn mark_failed(
        &mut self,
        reason: &str,
    ) -> Result<Decision<NotificationEvent>, NotificationError> {
        self.ensure_pending()?;

        self.status = NotificationStatus::Failed;
        self.failure_reason = Some(reason.to_string());

        Ok(Decision::emit(NotificationEvent::NotificationFailed {
            notification_id: self.id,
            user_id: self.user_id,
            channel: self.channel,
            reason: reason.to_string(),
        }))
    }

    fn ensure_pending(&self) -> Result<(), NotificationError> {
        if self.status != NotificationStatus::Pending {
            return Err(NotificationError::AlreadyFinal {
                status: self.status,
            });
        }
        Ok(())
    }
}

impl Versioned for Notification {
    fn aggregate_type() -> &'static str {
        "Notification"
    }

    fn id(&self) -> AggregateId {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }
}

impl Aggregate for Notification {
    type Event = NotificationEvent;
    type Error = NotificationError;

    fn advance(&mut self, at: DateTime<Utc>) {
        self.version = self.version.next();
        self.updated_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> Notification {
        Notification::pending(
            AggregateId::new(),
            AggregateId::new(),
            NotificationChannel::Email,
            "ada@example.com",
            "Hello",
            "Body",
        )
    }

    #[test]
    fn sent_stamps_time() {
        let mut notification = pending();
        let at = Utc::now();

        notification.mark_sent(at).unwrap();

        assert_eq!(notification.status(), NotificationStatus::Sent);
        assert_eq!(notification.sent_at(), Some(at));
        assert_eq!(notification.failure_reason(), None);
    }

    #[test]
    fn failed_keeps_reason() {
        let mut notification = pending();
        notification.mark_failed("mailbox full").unwrap();

        assert_eq!(notification.status(), NotificationStatus::Failed);
        assert_eq!(notification.failure_reason(), Some("mailbox full"));
        assert!(notification.sent_at().is_none());
    }

    #[test]
    fn final_status_cannot_move() {
        let mut notification = pending();
        notification.mark_failed("bounced").unwrap();
        let before = notification.clone();

        let result = notification.mark_sent(Utc::now());

        assert!(matches!(
            result,
            Err(NotificationError::AlreadyFinal {
                status: NotificationStatus::Failed
            })
        ));
        assert_eq!(notification, before);
    }
}
