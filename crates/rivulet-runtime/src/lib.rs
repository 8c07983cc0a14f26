//! Rivulet Runtime - Dataflow nodes with independent poll loops
//!
//! Build a graph by linking nodes with [`Node::to`], then start it with
//! [`Node::run`] from inside a tokio runtime. Every node gets its own task:
//! it waits its interval, pulls one event from its channel (or synthesizes
//! one if it has no sources), runs its transformation and hands the result
//! to its sink's channel.
//!
//! ```rust,no_run
//! use rivulet_runtime::{Node, Transform};
//! use serde_json::json;
//!
//! # async fn demo() -> rivulet_runtime::RivuletResult<()> {
//! let head = Node::seq([
//!     Transform::constant(json!(1)),
//!     Transform::new(|v, _| Ok(json!(v.as_i64().unwrap_or(0) * 2))),
//!     Transform::new(|v, _| { println!("{v}"); Ok(v) }),
//! ])?;
//! head.run()?;
//! // ...
//! head.cancel();
//! # Ok(())
//! # }
//! ```
//!
//! [`ManagedNode`] adds batch semantics and throughput accounting on top.

pub mod config;
pub mod graph;
pub mod logging;
pub mod managed;
pub mod node;
pub mod transform;

pub use config::*;
pub use logging::*;
pub use managed::ManagedNode;
pub use node::{Node, NodeStats};
pub use transform::*;

pub use rivulet_core::{Batch, Event, Metadata, NodeId, Payload, RivuletError, RivuletResult, Value};
pub use rivulet_time::{interval_to_rate, rate_to_interval};
