//! Process Discovery
//!
//! Process discovery algorithms typically learn process model representations
//! from input event data.
pub mod agrawal;
pub mod alpha;

#[cfg(test)]
mod tests;
