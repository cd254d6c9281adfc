//! Outbound notifications recorded as versioned aggregates.

mod aggregate;
mod events;
mod sender;
mod service;

pub use aggregate::{Notification, NotificationChannel, NotificationStatus};
pub use events::NotificationEvent;
pub use sender::{NotificationSender, RecordingSender, SendError, SentMessage};
pub use service::NotificationService;

use thiserror::Error;

use crate::error::ErrorKind;

/// Errors that can occur during notification operations.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("No sender configured for channel {channel}")]
    NoSenderForChannel { channel: NotificationChannel },

    /// Sent and Failed are final.
    #[error("Notification already {status}")]
    AlreadyFinal { status: NotificationStatus },
}

impl NotificationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NotificationError::NoSenderForChannel { .. } => ErrorKind::Infrastructure,
            NotificationError::AlreadyFinal { .. } => ErrorKind::IllegalStateTransition,
        }
    }
}
