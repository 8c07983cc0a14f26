//! Rivulet Time - Windows and rates
//!
//! This crate implements:
//! - `TimeWindow`: a lazily pruned collection of timestamped samples
//! - Conversion between poll intervals and sample rates

pub mod rate;
pub mod window;

pub use rate::*;
pub use window::*;
