//! Managed nodes - batching and throughput accounting
//!
//! A managed node moves batches instead of bare values and records, for
//! every processed batch, how many original upstream samples it stands for.
//! From that window it derives its current throughput and compares it with
//! the most restrictive target along its direct upstream.
//!
//! There is no controller here. `is_subceeding_throughput` and
//! `is_exceeding_throughput` are observations for an external controller,
//! which can act through [`Node::set_interval`] or [`ManagedNode::set_target`].

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::Mutex;

use rivulet_core::{into_items, Batch, Payload, RivuletError, RivuletResult, Value};
use rivulet_time::TimeWindow;

use crate::config::ManagedConfig;
use crate::node::chain;
use crate::transform::{Input, Lift, Transform};
use crate::Node;

pub(crate) struct ManagedState {
    /// Effective size of every batch processed in the last window
    window: Mutex<TimeWindow<usize>>,
    /// Samples per second, `INFINITY` when unlimited
    target: Mutex<f64>,
}

impl ManagedState {
    fn new(config: &ManagedConfig) -> Self {
        ManagedState {
            window: Mutex::new(TimeWindow::new(config.node.window())),
            target: Mutex::new(config.target.unwrap_or(f64::INFINITY)),
        }
    }
}

/// A node with batch semantics and throughput accounting
#[derive(Clone)]
pub struct ManagedNode {
    node: Node,
    state: Arc<ManagedState>,
}

impl ManagedNode {
    pub fn new(update: Transform, config: ManagedConfig) -> Self {
        let state = Arc::new(ManagedState::new(&config));
        ManagedNode {
            node: Node::build(update, config.node, Some(Arc::clone(&state))),
            state,
        }
    }

    pub fn with_update(update: Transform) -> Self {
        Self::new(update, ManagedConfig::default())
    }

    pub(crate) fn from_node(node: Node) -> Option<Self> {
        let state = node.inner.managed.clone()?;
        Some(ManagedNode { node, state })
    }

    /// Normalize into a managed node; existing plain nodes are rejected
    pub fn lift(x: impl Into<Lift>) -> RivuletResult<Self> {
        match x.into() {
            Lift::Node(node) => node.as_managed().ok_or(RivuletError::NotManaged(node.id())),
            Lift::Transform(update) => Ok(Self::with_update(update)),
            Lift::Value(value) => Ok(Self::with_update(Transform::constant(value))),
        }
    }

    /// Lift every item into a managed node and chain them; returns the head
    pub fn seq<I>(xs: I) -> RivuletResult<ManagedNode>
    where
        I: IntoIterator,
        I::Item: Into<Lift>,
    {
        let nodes = xs
            .into_iter()
            .map(|x| ManagedNode::lift(x).map(Node::from))
            .collect::<RivuletResult<Vec<_>>>()?;
        let head = chain(nodes)?;
        ManagedNode::from_node(head.clone()).ok_or(RivuletError::NotManaged(head.id()))
    }

    pub fn as_node(&self) -> &Node {
        &self.node
    }

    /// Samples processed within the last window duration
    pub fn throughput(&self) -> usize {
        self.state.window.lock().reduce(|acc, n| acc + n, 0)
    }

    /// This node's own target (`INFINITY` when unlimited)
    pub fn target(&self) -> f64 {
        *self.state.target.lock()
    }

    pub fn set_target(&self, target: Option<f64>) {
        *self.state.target.lock() = target.unwrap_or(f64::INFINITY);
    }

    /// The lowest of this node's target and every direct upstream managed
    /// node's target. Plain sources count as unlimited.
    pub fn target_throughput(&self) -> f64 {
        self.node
            .sources()
            .iter()
            .filter_map(Node::as_managed)
            .map(|source| source.target())
            .fold(self.target(), f64::min)
    }

    pub fn is_subceeding_throughput(&self) -> bool {
        (self.throughput() as f64) < self.target_throughput()
    }

    pub fn is_exceeding_throughput(&self) -> bool {
        (self.throughput() as f64) > self.target_throughput()
    }
}

impl Deref for ManagedNode {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.node
    }
}

impl PartialEq for ManagedNode {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl Eq for ManagedNode {}

impl fmt::Debug for ManagedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedNode")
            .field("id", &self.node.id())
            .field("sink", &self.node.sink().map(|s| s.id()))
            .field("target", &self.target())
            .finish()
    }
}

impl From<ManagedNode> for Node {
    fn from(managed: ManagedNode) -> Self {
        managed.node
    }
}

/// Managed variant of `Node::process`.
///
/// The effective size is taken from the incoming batch when there is one,
/// from the incoming list length for values lifted from a plain upstream,
/// and from the output length at a source. It is recorded in the window and
/// forwarded unchanged to a managed sink.
pub(crate) async fn process(
    node: &Node,
    state: &ManagedState,
    input: Input,
) -> RivuletResult<Payload> {
    let (payload, meta) = match input {
        Input::Event(event) => {
            let meta = event.metadata();
            (event.payload, Some(meta))
        }
        Input::Value(value) => (Payload::Value(value), None),
    };

    let (argument, carried) = match payload {
        Payload::Empty => (Value::Null, None),
        Payload::Value(value) => {
            let batch = Batch::lift(value);
            let size = batch.effective_size;
            (batch.into_value(), Some(size))
        }
        Payload::Batch(batch) => {
            let size = batch.effective_size;
            (batch.into_value(), Some(size))
        }
    };

    let output = node.invoke(argument, meta).await?;

    let to_managed = node.sink().is_some_and(|sink| sink.is_managed());
    let (payload, effective_size) = if to_managed {
        let items = into_items(output);
        let size = carried.unwrap_or(items.len());
        (Payload::Batch(Batch::new(items, size)), size)
    } else {
        let size = carried.unwrap_or_else(|| item_count(&output));
        (Payload::Value(output), size)
    };

    state.window.lock().add(effective_size);
    Ok(payload)
}

fn item_count(value: &Value) -> usize {
    match value {
        Value::Array(items) => items.len(),
        _ => 1,
    }
}
