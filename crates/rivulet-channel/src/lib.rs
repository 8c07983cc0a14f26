//! Rivulet Channel - CSP-style buffered handoff between nodes
//!
//! This crate provides [`Channel`], the mailbox every node owns.

pub mod channel;

pub use channel::*;
