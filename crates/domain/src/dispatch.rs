//! Event dispatch.
//!
//! Services hand events to an [`EventDispatcher`] only after the aggregate
//! write has succeeded. Dispatch is best-effort: [`publish`] logs and counts a
//! failed dispatch and carries on, so a persisted change is never rolled back
//! or reported as failed because a sink misbehaved.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{RwLock, broadcast};

use crate::aggregate::DomainEvent;
use crate::event::Event;

const DEFAULT_CAPACITY: usize = 1024;

/// Errors a dispatcher can report for a single event.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The sink refused the event.
    #[error("event rejected: {0}")]
    Rejected(String),

    /// The event could not be encoded for the sink.
    #[error("event serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Sink that receives events after a successful state change.
#[async_trait]
pub trait EventDispatcher: Send + Sync {
    async fn dispatch(&self, event: Event) -> Result<(), DispatchError>;
}

/// Dispatches events in order, swallowing failures.
///
/// Each failure is logged at `warn` and counted in
/// `domain_event_dispatch_failures_total`.
pub async fn publish<E>(dispatcher: &dyn EventDispatcher, events: impl IntoIterator<Item = E>)
where
    E: Into<Event>,
{
    for event in events {
        let event: Event = event.into();
        let event_type = event.event_type();

        match dispatcher.dispatch(event).await {
            Ok(()) => {
                metrics::counter!("domain_events_dispatched_total", "event_type" => event_type)
                    .increment(1);
            }
            Err(error) => {
                metrics::counter!("domain_event_dispatch_failures_total", "event_type" => event_type)
                    .increment(1);
                tracing::warn!(event_type, %error, "event dispatch failed");
            }
        }
    }
}

/// Keeps every dispatched event in memory.
///
/// A dispatcher built with [`RecordingDispatcher::failing`] rejects every
/// event instead, which is how callers exercise the best-effort path.
#[derive(Clone, Default)]
pub struct RecordingDispatcher {
    events: Arc<RwLock<Vec<Event>>>,
    fail: bool,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a dispatcher that rejects every event.
    pub fn failing() -> Self {
        Self {
            events: Arc::default(),
            fail: true,
        }
    }

    /// Returns all recorded events, oldest first.
    pub async fn events(&self) -> Vec<Event> {
        self.events.read().await.clone()
    }

    /// Returns the recorded event type names, oldest first.
    pub async fn event_types(&self) -> Vec<&'static str> {
        self.events
            .read()
            .await
            .iter()
            .map(|e| e.event_type())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.events.write().await.clear();
    }
}

#[async_trait]
impl EventDispatcher for RecordingDispatcher {
    async fn dispatch(&self, event: Event) -> Result<(), DispatchError> {
        if self.fail {
            return Err(DispatchError::Rejected(format!(
                "{} not accepted",
                event.event_type()
            )));
        }
        self.events.write().await.push(event);
        Ok(())
    }
}

/// Fans events out to in-process subscribers over a tokio broadcast channel.
#[derive(Clone)]
pub struct BroadcastDispatcher {
    sender: broadcast::Sender<Event>,
}

impl BroadcastDispatcher {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventDispatcher for BroadcastDispatcher {
    async fn dispatch(&self, event: Event) -> Result<(), DispatchError> {
        let event_type = event.event_type();
        match self.sender.send(event) {
            Ok(subscribers) => tracing::debug!(event_type, subscribers, "event broadcast"),
            // No receivers is not a failure, the event simply has no audience.
            Err(_) => tracing::debug!(event_type, "event broadcast (no subscribers)"),
        }
        Ok(())
    }
}

/// Writes every event to the log as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDispatcher;

#[async_trait]
impl EventDispatcher for TracingDispatcher {
    async fn dispatch(&self, event: Event) -> Result<(), DispatchError> {
        let payload = serde_json::to_string(&event)?;
        tracing::info!(
            domain = event.domain(),
            event_type = event.event_type(),
            %payload,
            "domain event"
        );
        Ok(())
    }
}

/// Forwards each event to every inner dispatcher.
///
/// All dispatchers are tried; the first error, if any, is returned.
#[derive(Clone, Default)]
pub struct FanOutDispatcher {
    targets: Vec<Arc<dyn EventDispatcher>>,
}

impl FanOutDispatcher {
    pub fn new(targets: Vec<Arc<dyn EventDispatcher>>) -> Self {
        Self { targets }
    }

    pub fn with(mut self, target: Arc<dyn EventDispatcher>) -> Self {
        self.targets.push(target);
        self
    }
}

#[async_trait]
impl EventDispatcher for FanOutDispatcher {
    async fn dispatch(&self, event: Event) -> Result<(), DispatchError> {
        let mut first_error = None;
        for target in &self.targets {
            if let Err(error) = target.dispatch(event.clone()).await {
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::ProductEvent;
    use common::AggregateId;

    fn archived() -> ProductEvent {
        ProductEvent::ProductArchived {
            product_id: AggregateId::new(),
        }
    }

    #[tokio::test]
    async fn publish_keeps_order() {
        let dispatcher = RecordingDispatcher::new();
        let id = AggregateId::new();

        publish(
            &dispatcher,
            [
                ProductEvent::ProductCreated {
                    product_id: id,
                    name: "Laptop".to_string(),
                },
                ProductEvent::ProductArchived { product_id: id },
            ],
        )
        .await;

        assert_eq!(
            dispatcher.event_types().await,
            vec!["ProductCreated", "ProductArchived"]
        );
    }

    #[tokio::test]
    async fn publish_swallows_failures() {
        let dispatcher = RecordingDispatcher::failing();
        publish(&dispatcher, [archived(), archived()]).await;
        assert!(dispatcher.is_empty().await);
    }

    #[tokio::test]
    async fn broadcast_reaches_subscribers() {
        let dispatcher = BroadcastDispatcher::new();
        let mut rx = dispatcher.subscribe();

        dispatcher.dispatch(archived().into()).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type(), "ProductArchived");
    }

    #[tokio::test]
    async fn broadcast_without_subscribers_is_ok() {
        let dispatcher = BroadcastDispatcher::new();
        assert_eq!(dispatcher.subscriber_count(), 0);
        assert!(dispatcher.dispatch(archived().into()).await.is_ok());
    }

    #[tokio::test]
    async fn fan_out_tries_every_target() {
        let recorder = RecordingDispatcher::new();
        let fan_out = FanOutDispatcher::default()
            .with(Arc::new(RecordingDispatcher::failing()))
            .with(Arc::new(recorder.clone()));

        let result = fan_out.dispatch(archived().into()).await;

        assert!(matches!(result, Err(DispatchError::Rejected(_))));
        assert_eq!(recorder.len().await, 1);
    }

    #[tokio::test]
    async fn tracing_dispatcher_accepts_events() {
        assert!(TracingDispatcher.dispatch(archived().into()).await.is_ok());
    }
}
