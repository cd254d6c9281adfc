//! User domain events.

use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::UserStatus;

/// Events that can occur on a user aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum UserEvent {
    UserRegistered {
        user_id: AggregateId,
        email: String,
        first_name: String,
    },

    UserProfileUpdated {
        user_id: AggregateId,
    },

    UserStatusChanged {
        user_id: AggregateId,
        old_status: UserStatus,
        new_status: UserStatus,
    },

    /// Follows the `UserStatusChanged` that entered `Deactivated`.
    UserDeactivated {
        user_id: AggregateId,
    },
}

impl DomainEvent for UserEvent {
    fn event_type(&self) -> &'static str {
        match self {
            UserEvent::UserRegistered { .. } => "UserRegistered",
            UserEvent::UserProfileUpdated { .. } => "UserProfileUpdated",
            UserEvent::UserStatusChanged { .. } => "UserStatusChanged",
            UserEvent::UserDeactivated { .. } => "UserDeactivated",
        }
    }
}
