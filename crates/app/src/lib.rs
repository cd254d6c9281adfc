//! Application wiring for the store services.
//!
//! Loads configuration, installs logging and metrics, picks a storage
//! backend and builds every domain service around one event dispatcher. An
//! in-process reactor listens on the dispatcher's broadcast channel and
//! sends a welcome email for each registered user.

pub mod config;
pub mod error;
pub mod hasher;
pub mod reactor;
pub mod sender;
pub mod services;
pub mod telemetry;
pub mod walkthrough;

use std::sync::Arc;

use domain::notification::{NotificationChannel, NotificationSender};
use domain::{BroadcastDispatcher, EventDispatcher, FanOutDispatcher, TracingDispatcher};

pub use config::{Config, LogFormat};
pub use error::AppError;
pub use hasher::BcryptHasher;
pub use sender::LogSender;
pub use services::{Backend, Services};

/// The dispatcher the binary uses: every event is logged and broadcast to
/// in-process subscribers.
pub fn default_dispatcher(broadcast: &BroadcastDispatcher) -> Arc<dyn EventDispatcher> {
    Arc::new(
        FanOutDispatcher::new(vec![Arc::new(TracingDispatcher) as Arc<dyn EventDispatcher>])
            .with(Arc::new(broadcast.clone())),
    )
}

/// Log-backed senders for every channel.
pub fn default_senders() -> Vec<Arc<dyn NotificationSender>> {
    [
        NotificationChannel::Email,
        NotificationChannel::Sms,
        NotificationChannel::Push,
    ]
    .into_iter()
    .map(|channel| Arc::new(LogSender::new(channel)) as Arc<dyn NotificationSender>)
    .collect()
}
