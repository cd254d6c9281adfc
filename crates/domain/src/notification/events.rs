//! Notification domain events.

use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::NotificationChannel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum NotificationEvent {
    NotificationSent {
        notification_id: AggregateId,
        user_id: AggregateId,
        channel: NotificationChannel,
    },

    NotificationFailed {
        notification_id: AggregateId,
        user_id: AggregateId,
        channel: NotificationChannel,
        reason: String,
    },
}

impl DomainEvent for NotificationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            NotificationEvent::NotificationSent { .. } => "NotificationSent",
            NotificationEvent::NotificationFailed { .. } => "NotificationFailed",
        }
    }
}
