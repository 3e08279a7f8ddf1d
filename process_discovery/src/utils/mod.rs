//! Helpers shared by the discovery algorithms

/// Sequential / parallel scheduling strategy
pub mod executor;
/// Append-only queue spilling to disk beyond a memory bound
pub mod spill_queue;

pub use executor::Executor;
pub use spill_queue::{SpillQueue, SpillQueueError};
