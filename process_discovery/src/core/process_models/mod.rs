//! Process model representations produced by discovery

pub mod dependency_graph;
pub mod petri_net;
