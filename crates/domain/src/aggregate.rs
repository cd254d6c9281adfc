//! Core aggregate and domain event traits.

use aggregate_store::Versioned;
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};

use crate::event::Event;

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone + std::fmt::Debug {
    /// Returns the event type name, used for logs and metrics labels.
    fn event_type(&self) -> &'static str;
}

/// A versioned aggregate owned by one domain service.
///
/// Command methods on an aggregate take `&mut self`, check every
/// precondition before touching any field, and return a [`Decision`]. An
/// `Err` therefore always leaves the aggregate exactly as it was loaded.
pub trait Aggregate: Versioned + Serialize + DeserializeOwned + std::fmt::Debug {
    /// The type of events this aggregate produces.
    type Event: DomainEvent + Into<Event>;

    /// The type of errors its command methods can produce.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Moves to the next version and stamps `updated_at`.
    ///
    /// Called once per successful command, right before the versioned write.
    fn advance(&mut self, at: DateTime<Utc>);
}

/// What a command decided to do with an aggregate.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision<E> {
    /// Nothing changed: no write, no events.
    Unchanged,

    /// The aggregate was mutated in memory. Persist it, then dispatch these
    /// events in order. The list may be empty.
    Apply(Vec<E>),
}

impl<E> Decision<E> {
    /// A change announced by a single event.
    pub fn emit(event: E) -> Self {
        Decision::Apply(vec![event])
    }

    /// A change that is persisted without announcing anything.
    pub fn silent() -> Self {
        Decision::Apply(Vec::new())
    }

    /// Returns the events to dispatch, empty for [`Decision::Unchanged`].
    pub fn events(&self) -> &[E] {
        match self {
            Decision::Unchanged => &[],
            Decision::Apply(events) => events,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, Decision::Unchanged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_change_still_applies() {
        let decision: Decision<u8> = Decision::silent();
        assert!(!decision.is_unchanged());
        assert!(decision.events().is_empty());
    }

    #[test]
    fn unchanged_has_no_events() {
        let decision: Decision<u8> = Decision::Unchanged;
        assert!(decision.is_unchanged());
        assert!(decision.events().is_empty());
    }

    #[test]
    fn emit_wraps_single_event() {
        assert_eq!(Decision::emit(7u8).events(), &[7]);
    }
}
