//! Identifier generators.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

use crate::AggregateId;

/// Source of fresh identifiers.
///
/// Implementations must never hand out the same identifier twice within a
/// deployment's lifetime.
pub trait IdGenerator: Send + Sync + std::fmt::Debug {
    /// Returns a fresh identifier.
    fn next_id(&self) -> AggregateId;
}

/// Random UUID v4 identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self) -> AggregateId {
        AggregateId::new()
    }
}

/// Deterministic identifiers built from a counter, for tests and fixtures.
///
/// The first identifier is `00000000-0000-0000-0000-000000000001`.
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    counter: AtomicU64,
}

impl SequentialIdGenerator {
    /// Creates a generator starting at 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a generator whose next identifier is `start`.
    pub fn starting_at(start: u64) -> Self {
        Self {
            counter: AtomicU64::new(start.saturating_sub(1)),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> AggregateId {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        AggregateId::from_uuid(Uuid::from_u128(u128::from(n)))
    }
}
