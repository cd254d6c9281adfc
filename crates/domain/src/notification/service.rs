//! Notification service.

use std::collections::HashMap;
use std::sync::Arc;

use aggregate_store::AggregateStore;
use chrono::Utc;
use common::AggregateId;

use crate::command::CommandHandler;
use crate::dispatch::EventDispatcher;
use crate::error::DomainError;

use super::{Notification, NotificationChannel, NotificationError, NotificationSender};

/// Service that records and delivers notifications.
///
/// Each send creates a pending record first, then hands the message to the
/// sender registered for its channel and stores the outcome as the next
/// version. A delivery failure is recorded on the notification and returned
/// as `Ok`.
pub struct NotificationService<S> {
    handler: CommandHandler<S, Notification>,
    senders: HashMap<NotificationChannel, Arc<dyn NotificationSender>>,
}

impl<S: AggregateStore<Notification>> NotificationService<S> {
    pub fn new(store: S, dispatcher: Arc<dyn EventDispatcher>) -> Self {
        Self {
            handler: CommandHandler::new(store, dispatcher),
            senders: HashMap::new(),
        }
    }

    /// Registers `sender` for its channel, replacing any previous one.
    pub fn with_sender(mut self, sender: Arc<dyn NotificationSender>) -> Self {
        self.senders.insert(sender.channel(), sender);
        self
    }

    #[tracing::instrument(skip(self))]
    pub async fn send_welcome_email(
        &self,
        user_id: AggregateId,
        email: &str,
        first_name: &str,
    ) -> Result<Notification, DomainError> {
        let body = format!("Hi {first_name}, thanks for joining us!");
        self.deliver(
            user_id,
            NotificationChannel::Email,
            email,
            "Welcome to our store!",
            &body,
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn notify_order_confirmation(
        &self,
        user_id: AggregateId,
        email: &str,
        order_id: AggregateId,
    ) -> Result<Notification, DomainError> {
        let subject = format!("Your order {order_id} has been confirmed!");
        self.deliver(
            user_id,
            NotificationChannel::Email,
            email,
            &subject,
            "We have received your order and will process it shortly.",
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn notify_payment_failed(
        &self,
        user_id: AggregateId,
        email: &str,
        order_id: AggregateId,
        reason: &str,
    ) -> Result<Notification, DomainError> {
        let subject = format!("Payment failed for order {order_id}");
        let body = format!("Unfortunately, the payment for your order failed. Reason: {reason}");
        self.deliver(user_id, NotificationChannel::Email, email, &subject, &body)
            .await
    }

    pub async fn get_notification(&self, id: AggregateId) -> Result<Notification, DomainError> {
        self.handler.load(id).await
    }

    async fn deliver(
        &self,
        user_id: AggregateId,
        channel: NotificationChannel,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<Notification, DomainError> {
        let id = self.handler.next_id();
        let pending = Notification::pending(id, user_id, channel, recipient, subject, body);
        self.handler.create(pending, Vec::new()).await?;

        let sender = self
            .senders
            .get(&channel)
            .ok_or(NotificationError::NoSenderForChannel { channel })?;

        let outcome = sender.send(recipient, subject, body).await;
        let result = match outcome {
            Ok(()) => {
                metrics::counter!("notifications_sent_total", "channel" => channel.as_str())
                    .increment(1);
                self.handler
                    .execute(id, |n| n.mark_sent(Utc::now()))
                    .await?
            }
            Err(e) => {
                metrics::counter!("notifications_failed_total", "channel" => channel.as_str())
                    .increment(1);
                tracing::warn!(notification_id = %id, %channel, error = %e, "notification delivery failed");
                let reason = e.to_string();
                self.handler
                    .execute(id, |n| n.mark_failed(&reason))
                    .await?
            }
        };

        Ok(result.aggregate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::dispatch::RecordingDispatcher;
    use crate::notification::{NotificationStatus, RecordingSender};
    use aggregate_store::{InMemoryAggregateStore, Version, Versioned};

    type Service = NotificationService<InMemoryAggregateStore<Notification>>;

    fn service_with(sender: Option<RecordingSender>) -> (Service, RecordingDispatcher, InMemoryAggregateStore<Notification>) {
        let dispatcher = RecordingDispatcher::new();
        let store = InMemoryAggregateStore::new();
        let mut service = NotificationService::new(store.clone(), Arc::new(dispatcher.clone()));
        if let Some(sender) = sender {
            service = service.with_sender(Arc::new(sender));
        }
        (service, dispatcher, store)
    }

    #[tokio::test]
    async fn welcome_email_is_sent_and_recorded() {
        let sender = RecordingSender::new(NotificationChannel::Email);
        let (service, dispatcher, _) = service_with(Some(sender.clone()));
        let user_id = AggregateId::new();

        let notification = service
            .send_welcome_email(user_id, "ada@example.com", "Ada")
            .await
            .unwrap();

        assert_eq!(notification.status(), NotificationStatus::Sent);
        assert!(notification.sent_at().is_some());
        assert_eq!(notification.version(), Version::new(2));

        let sent = sender.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "ada@example.com");
        assert_eq!(sent[0].subject, "Welcome to our store!");
        assert_eq!(sent[0].body, "Hi Ada, thanks for joining us!");
        assert_eq!(dispatcher.event_types().await, vec!["NotificationSent"]);
    }

    #[tokio::test]
    async fn templates_mention_the_order() {
        let sender = RecordingSender::new(NotificationChannel::Email);
        let (service, _, _) = service_with(Some(sender.clone()));
        let order_id = AggregateId::new();

        service
            .notify_order_confirmation(AggregateId::new(), "a@b.c", order_id)
            .await
            .unwrap();
        service
            .notify_payment_failed(AggregateId::new(), "a@b.c", order_id, "insufficient funds")
            .await
            .unwrap();

        let sent = sender.sent().await;
        assert_eq!(sent[0].subject, format!("Your order {order_id} has been confirmed!"));
        assert_eq!(
            sent[0].body,
            "We have received your order and will process it shortly."
        );
        assert_eq!(sent[1].subject, format!("Payment failed for order {order_id}"));
        assert_eq!(
            sent[1].body,
            "Unfortunately, the payment for your order failed. Reason: insufficient funds"
        );
    }

    #[tokio::test]
    async fn delivery_failure_is_recorded_not_returned() {
        let sender = RecordingSender::failing(NotificationChannel::Email, "smtp timeout");
        let (service, dispatcher, _) = service_with(Some(sender));

        let notification = service
            .send_welcome_email(AggregateId::new(), "ada@example.com", "Ada")
            .await
            .unwrap();

        assert_eq!(notification.status(), NotificationStatus::Failed);
        assert_eq!(notification.failure_reason(), Some("smtp timeout"));
        assert_eq!(dispatcher.event_types().await, vec!["NotificationFailed"]);
    }

    #[tokio::test]
    async fn missing_sender_leaves_pending_record() {
        let (service, dispatcher, store) = service_with(None);

        let err = service
            .send_welcome_email(AggregateId::new(), "ada@example.com", "Ada")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::Notification(NotificationError::NoSenderForChannel {
                channel: NotificationChannel::Email
            })
        ));
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
        assert_eq!(store.len().await, 1);
        assert!(dispatcher.is_empty().await);
    }
}
