//! Event definitions
//!
//! An event is the envelope a node hands to its sink's channel: the produced
//! payload plus when, where and how fast it was produced.

use std::time::{Duration, Instant};

use serde_json::Value;

use crate::NodeId;

/// A list of items plus the number of upstream samples it stands for.
///
/// `effective_size` is fixed where the batch originates (a source node) and
/// forwarded unchanged by every managed relay, so an aggregation that turns
/// 1000 samples into one item still accounts for 1000.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    pub items: Vec<Value>,
    pub effective_size: usize,
}

impl Batch {
    pub fn new(items: Vec<Value>, effective_size: usize) -> Self {
        Batch {
            items,
            effective_size,
        }
    }

    /// Coerce a value into a batch sized by its own item count
    pub fn lift(value: Value) -> Self {
        let items = into_items(value);
        let effective_size = items.len();
        Batch {
            items,
            effective_size,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Array(self.items)
    }
}

/// Coerce a value into a list: arrays are unwrapped, anything else becomes
/// a single-element list.
pub fn into_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        other => vec![other],
    }
}

/// What an event carries
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Payload {
    /// Synthesized by a node with no sources
    #[default]
    Empty,
    /// A bare value
    Value(Value),
    /// A batch tagged with its effective size
    Batch(Batch),
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }

    /// Flatten into a plain value (`Empty` becomes `null`, batches their items)
    pub fn into_value(self) -> Value {
        match self {
            Payload::Empty => Value::Null,
            Payload::Value(value) => value,
            Payload::Batch(batch) => batch.into_value(),
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Value(value)
    }
}

impl From<Batch> for Payload {
    fn from(batch: Batch) -> Self {
        Payload::Batch(batch)
    }
}

/// Production metadata handed to a transformation alongside the payload
#[derive(Clone, Copy, Debug)]
pub struct Metadata {
    /// Node that produced the value
    pub origin: NodeId,
    /// Time the producer spent processing
    pub elapsed: Duration,
    /// Poll interval of the producer at production time
    pub interval: Duration,
    /// When the producer started processing
    pub produced_at: Instant,
}

/// Event - one value in transit between two nodes
#[derive(Clone, Debug)]
pub struct Event {
    /// The transmitted payload
    pub payload: Payload,
    /// Producing node
    pub origin: NodeId,
    /// Processing time spent producing the payload
    pub elapsed: Duration,
    /// When production started
    pub started_at: Instant,
    /// Producer's poll interval at production time
    pub interval: Duration,
}

impl Event {
    /// Create a new event started now with zero elapsed time
    pub fn new(payload: impl Into<Payload>, origin: NodeId, interval: Duration) -> Self {
        Event {
            payload: payload.into(),
            origin,
            elapsed: Duration::ZERO,
            started_at: Instant::now(),
            interval,
        }
    }

    /// Empty event a source synthesizes for itself
    pub fn empty(origin: NodeId, interval: Duration) -> Self {
        Event::new(Payload::Empty, origin, interval)
    }

    /// Set processing time
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    /// Set production start time
    pub fn with_started_at(mut self, started_at: Instant) -> Self {
        self.started_at = started_at;
        self
    }

    pub fn metadata(&self) -> Metadata {
        Metadata {
            origin: self.origin,
            elapsed: self.elapsed,
            interval: self.interval,
            produced_at: self.started_at,
        }
    }
}
