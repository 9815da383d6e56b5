//! Analysis modules.
//!
//! `stats` holds slice-level statistics; `aggregator` applies them per
//! generation and per run.

pub mod aggregator;
pub mod stats;

pub use aggregator::*;
