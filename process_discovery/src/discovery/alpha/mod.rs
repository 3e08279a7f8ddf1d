//! Alpha and Alpha+ Process Discovery Algorithms
/// Alpha/Alpha+ miner pipeline
pub mod alpha_miner;
/// Footprint relations between activities
pub mod footprint;
/// Alpha pair closure and maximality filtering
pub mod pair_building;

pub use alpha_miner::{
    alpha_miner_discover_petri_net, alpha_plus_miner_discover_petri_net, AlphaError,
    AlphaMinerConfig, AlphaMinerInstance, AlphaMinerPlusInstance, LoopContext,
};
pub use footprint::{AlphaRelation, FootprintMatrix};
pub use pair_building::AlphaPair;
