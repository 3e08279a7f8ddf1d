//! Event data: traces, event logs and the directly-follows relation

/// Directly-follows graph over an [`EventLog`]
pub mod directly_follows;
/// [`Trace`] and [`EventLog`] structs
pub mod event_log_struct;
/// Macros for the creation of [`Trace`]s and [`EventLog`]s
pub mod macros;

#[doc(inline)]
pub use directly_follows::DirectlyFollowsGraph;
#[doc(inline)]
pub use event_log_struct::{EventLog, EventLogError, Trace};
