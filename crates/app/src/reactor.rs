//! In-process reactions to dispatched events.

use std::sync::Arc;

use domain::user::UserEvent;
use domain::{DomainError, DomainEvent, Event, Notification, NotificationService};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::services::NotificationStore;

/// Reacts to a single event. Returns the notification it produced, if any.
pub async fn react(
    notifications: &NotificationService<NotificationStore>,
    event: &Event,
) -> Result<Option<Notification>, DomainError> {
    match event {
        Event::User(UserEvent::UserRegistered {
            user_id,
            email,
            first_name,
        }) => {
            let sent = notifications
                .send_welcome_email(*user_id, email, first_name)
                .await?;
            Ok(Some(sent))
        }
        _ => Ok(None),
    }
}

/// Consumes events from a broadcast subscription until the channel closes.
///
/// Failures are logged and the loop keeps going; a lagging receiver skips
/// the events it missed.
pub fn spawn(
    mut events: broadcast::Receiver<Event>,
    notifications: Arc<NotificationService<NotificationStore>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Err(error) = react(&notifications, &event).await {
                        tracing::warn!(event_type = event.event_type(), %error, "reaction failed");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    metrics::counter!("reactor_events_skipped_total").increment(skipped);
                    tracing::warn!(skipped, "reactor lagged behind the event stream");
                }
                Err(RecvError::Closed) => break,
            }
        }
        tracing::debug!("reactor stopped");
    })
}
