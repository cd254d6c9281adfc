//! Shared identifier types used across the store and domain crates.

mod generator;
mod types;

pub use generator::{IdGenerator, SequentialIdGenerator, UuidIdGenerator};
pub use types::AggregateId;
