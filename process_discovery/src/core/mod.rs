//! Core data structures: event data and process models

pub mod event_data;

pub mod process_models;

pub use event_data::{EventLog, Trace};
pub use process_models::dependency_graph::DependencyGraph;
pub use process_models::petri_net::{AcceptingPetriNet, LabelledPetriNet, PetriNetMarking};
