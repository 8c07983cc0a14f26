//! User transformations
//!
//! A [`Transform`] is the `update` function of a node: it takes the incoming
//! value (plus production metadata when it came through a channel) and
//! produces the value sent downstream. Transformations may suspend.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use rivulet_core::{BoxError, Event, Metadata, Value};

use crate::{ManagedNode, Node};

/// Future returned by a transformation
pub type TransformFuture = Pin<Box<dyn Future<Output = Result<Value, BoxError>> + Send>>;

type TransformFn = dyn Fn(Value, Option<Metadata>) -> TransformFuture + Send + Sync;

/// Shared, cheaply cloneable node transformation
#[derive(Clone)]
pub struct Transform {
    f: Arc<TransformFn>,
}

impl Transform {
    /// Wrap a synchronous function
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Value, Option<Metadata>) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        let f: Arc<TransformFn> =
            Arc::new(move |value: Value, meta: Option<Metadata>| -> TransformFuture {
                Box::pin(std::future::ready(f(value, meta)))
            });
        Transform { f }
    }

    /// Wrap an asynchronous function
    pub fn new_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Value, Option<Metadata>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
    {
        let f: Arc<TransformFn> =
            Arc::new(move |value: Value, meta: Option<Metadata>| -> TransformFuture {
                Box::pin(f(value, meta))
            });
        Transform { f }
    }

    /// Ignore the input and always produce `value`
    pub fn constant(value: Value) -> Self {
        Transform::new(move |_, _| Ok(value.clone()))
    }

    /// Pass the input through unchanged
    pub fn identity() -> Self {
        Transform::new(|value, _| Ok(value))
    }

    pub fn call(&self, value: Value, meta: Option<Metadata>) -> TransformFuture {
        (self.f)(value, meta)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transform")
    }
}

/// Anything that can be normalized into a node
#[derive(Clone, Debug)]
pub enum Lift {
    /// An existing node, passed through unchanged
    Node(Node),
    /// A function, which becomes the node's transformation
    Transform(Transform),
    /// A value, which becomes a constant transformation
    Value(Value),
}

impl From<Node> for Lift {
    fn from(node: Node) -> Self {
        Lift::Node(node)
    }
}

impl From<&Node> for Lift {
    fn from(node: &Node) -> Self {
        Lift::Node(node.clone())
    }
}

impl From<ManagedNode> for Lift {
    fn from(node: ManagedNode) -> Self {
        Lift::Node(node.into())
    }
}

impl From<&ManagedNode> for Lift {
    fn from(node: &ManagedNode) -> Self {
        Lift::Node(node.as_node().clone())
    }
}

impl From<Transform> for Lift {
    fn from(transform: Transform) -> Self {
        Lift::Transform(transform)
    }
}

impl From<Value> for Lift {
    fn from(value: Value) -> Self {
        Lift::Value(value)
    }
}

/// Input to [`Node::process`]
#[derive(Clone, Debug)]
pub enum Input {
    /// A value that travelled through a channel, with its metadata
    Event(Event),
    /// A bare value, e.g. when invoking a node by hand
    Value(Value),
}

impl From<Event> for Input {
    fn from(event: Event) -> Self {
        Input::Event(event)
    }
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Input::Value(value)
    }
}
