//! Command handling infrastructure.

use std::marker::PhantomData;
use std::sync::Arc;

use aggregate_store::AggregateStore;
use chrono::Utc;
use common::AggregateId;

use crate::aggregate::{Aggregate, Decision};
use crate::dispatch::{EventDispatcher, publish};
use crate::error::DomainError;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate as stored after the command.
    pub aggregate: A,

    /// The events that were dispatched, in order.
    pub events: Vec<A::Event>,

    /// False when the command decided nothing needed to change.
    pub changed: bool,
}

/// Runs commands against one aggregate type.
///
/// Every command follows the same discipline:
/// 1. Load the current snapshot from the store
/// 2. Let the command check its preconditions and mutate the copy
/// 3. Advance the version and write it back with the version precondition
/// 4. Dispatch the command's events, only after the write succeeded
///
/// A failed precondition or write returns before anything is dispatched.
pub struct CommandHandler<S, A> {
    store: S,
    dispatcher: Arc<dyn EventDispatcher>,
    _aggregate: PhantomData<fn() -> A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: AggregateStore<A>,
    A: Aggregate,
{
    pub fn new(store: S, dispatcher: Arc<dyn EventDispatcher>) -> Self {
        Self {
            store,
            dispatcher,
            _aggregate: PhantomData,
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn dispatcher(&self) -> &dyn EventDispatcher {
        self.dispatcher.as_ref()
    }

    /// Allocates a fresh identifier from the store.
    pub fn next_id(&self) -> AggregateId {
        self.store.next_id()
    }

    /// Loads an aggregate, failing with `NotFound` if it is absent or deleted.
    pub async fn load(&self, id: AggregateId) -> Result<A, DomainError> {
        Ok(self.store.find(id).await?)
    }

    /// Persists a brand-new aggregate, then dispatches its creation events.
    pub async fn create(
        &self,
        aggregate: A,
        events: Vec<A::Event>,
    ) -> Result<CommandResult<A>, DomainError> {
        self.store.create(aggregate.clone()).await?;
        tracing::debug!(
            aggregate_type = A::aggregate_type(),
            id = %aggregate.id(),
            "aggregate created"
        );

        publish(self.dispatcher(), events.clone()).await;

        Ok(CommandResult {
            aggregate,
            events,
            changed: true,
        })
    }

    /// Executes a command against the stored aggregate.
    ///
    /// The closure receives a mutable copy of the current snapshot. Returning
    /// an error or [`Decision::Unchanged`] skips the write entirely.
    pub async fn execute<F>(
        &self,
        id: AggregateId,
        command: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&mut A) -> Result<Decision<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let mut aggregate = self.load(id).await?;

        let events = match command(&mut aggregate)? {
            Decision::Unchanged => {
                return Ok(CommandResult {
                    aggregate,
                    events: Vec::new(),
                    changed: false,
                });
            }
            Decision::Apply(events) => events,
        };

        aggregate.advance(Utc::now());
        self.store.update(aggregate.clone()).await?;
        tracing::debug!(
            aggregate_type = A::aggregate_type(),
            %id,
            version = %aggregate.version(),
            "aggregate updated"
        );

        publish(self.dispatcher(), events.clone()).await;

        Ok(CommandResult {
            aggregate,
            events,
            changed: true,
        })
    }
}
