//! Labelled Petri nets and their token game
pub(crate) mod marking;
pub(crate) mod petri_net_struct;
pub use marking::*;
pub use petri_net_struct::*;
