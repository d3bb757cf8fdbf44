//! # Runtime
//!
//! Process start-up wiring.

pub mod initialization;

pub use initialization::initialize;
