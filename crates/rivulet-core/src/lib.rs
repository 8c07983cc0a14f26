//! Rivulet Core - Fundamental types shared by every Rivulet crate
//!
//! This crate defines:
//! - Node identifiers
//! - Events, payloads and batches travelling between nodes
//! - The error taxonomy

pub mod id;
pub mod event;
pub mod error;

pub use id::*;
pub use event::*;
pub use error::*;

/// Dynamically typed value carried between nodes
pub use serde_json::Value;
