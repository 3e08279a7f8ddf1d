//! Dependency graphs over activities
pub(crate) mod dependency_graph_struct;
pub use dependency_graph_struct::*;
/// Strongly connected components (Tarjan)
pub mod scc;
