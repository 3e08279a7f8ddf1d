#![warn(
    clippy::doc_markdown,
    missing_debug_implementations,
    rust_2018_idioms,
    missing_docs
)]
#![doc = include_str!("../README.md")]

///
/// Core data structures: event logs and process models ([`LabelledPetriNet`], [`DependencyGraph`])
///
pub mod core;

///
/// Process discovery algorithms (Alpha, Alpha+, Agrawal)
///
pub mod discovery;

/// Util module with smaller helper structs (executors, spilling queues)
pub mod utils;

#[doc(inline)]
pub use crate::core::event_data::{DirectlyFollowsGraph, EventLog, Trace};

#[doc(inline)]
pub use crate::core::process_models::petri_net::{
    AcceptingPetriNet, LabelledPetriNet, PetriNetMarking,
};

#[doc(inline)]
pub use crate::core::process_models::dependency_graph::DependencyGraph;

#[doc(inline)]
pub use discovery::alpha::{alpha_miner_discover_petri_net, alpha_plus_miner_discover_petri_net};

#[doc(inline)]
pub use discovery::agrawal::{agrawal_discover_dependency_graph, is_conformal};

#[doc(inline)]
pub use utils::{Executor, SpillQueue};
