//! Console and summary reporting.

pub mod generator;

pub use generator::*;
