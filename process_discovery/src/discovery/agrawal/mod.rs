//! Agrawal dependency-graph miner
/// Algorithm variants and the miner itself
pub mod agrawal_miner;
/// Follows relation and conformality of dependency graphs
pub mod conformance;

pub use agrawal_miner::{
    agrawal_discover_dependency_graph, base_label, unroll_trace, AgrawalAlgorithm, AgrawalError,
    AgrawalMinerConfig, AgrawalMinerInstance,
};
pub use conformance::{is_conformal, FollowsRelation};
