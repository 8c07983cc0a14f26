//! Graph wiring and whole-graph lifecycle
//!
//! Links are unicast: a node has at most one sink but may have many
//! sources. `run` and `cancel` act on everything reachable from the node
//! they are called on, following both source and sink edges.
//!
//! Nodes do not own each other. Each connected graph is owned by a
//! `Component`, and every handle into the graph keeps its component alive.

use std::collections::HashSet;
use std::mem;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::{const_mutex, Mutex, RwLock};
use tracing::{debug, warn, Instrument};

use rivulet_core::{NodeId, RivuletError, RivuletResult};

use crate::node::NodeInner;
use crate::Node;

/// Serializes topology changes so cycle checks and merges see a stable graph
static TOPOLOGY: Mutex<()> = const_mutex(());

/// Owner of every node in one connected graph.
///
/// Components only grow. Linking two graphs moves the members of the
/// downstream one into the upstream one and leaves a forwarding entry
/// behind, so handles created before the merge still own the whole graph.
/// A node unlinked by a relink stays owned until the graph is dropped.
pub(crate) struct Component {
    state: RwLock<ComponentState>,
}

enum ComponentState {
    Members(Vec<Arc<NodeInner>>),
    Merged(Arc<Component>),
}

impl Component {
    pub(crate) fn new(first: Arc<NodeInner>) -> Arc<Self> {
        Arc::new(Component {
            state: RwLock::new(ComponentState::Members(vec![first])),
        })
    }

    /// The component that currently owns the members
    fn root(self: &Arc<Self>) -> Arc<Component> {
        let mut current = Arc::clone(self);
        loop {
            let next = match &*current.state.read() {
                ComponentState::Merged(next) => Some(Arc::clone(next)),
                ComponentState::Members(_) => None,
            };
            match next {
                Some(next) => current = next,
                None => return current,
            }
        }
    }

    /// Take over every member of `other`; both must be roots
    fn absorb(self: &Arc<Self>, other: &Arc<Component>) {
        if Arc::ptr_eq(self, other) {
            return;
        }
        let previous = mem::replace(
            &mut *other.state.write(),
            ComponentState::Merged(Arc::clone(self)),
        );
        if let ComponentState::Members(moved) = previous {
            if let ComponentState::Members(members) = &mut *self.state.write() {
                members.extend(moved);
            }
        }
    }

    fn len(self: &Arc<Self>) -> usize {
        let root = self.root();
        let state = root.state.read();
        match &*state {
            ComponentState::Members(members) => members.len(),
            ComponentState::Merged(_) => 0,
        }
    }
}

impl Node {
    /// Make `sink` this node's downstream and register this node as one of
    /// its sources.
    ///
    /// Re-linking replaces the previous sink. Links to self and links that
    /// would close a cycle are rejected.
    pub fn to(&self, sink: &Node) -> RivuletResult<()> {
        let _topology = TOPOLOGY.lock();
        if self == sink {
            return Err(RivuletError::SelfLink(self.id()));
        }
        if sink.reaches(self) {
            return Err(RivuletError::CycleDetected {
                from: self.id(),
                to: sink.id(),
            });
        }

        let previous = self
            .inner
            .sink
            .write()
            .replace(Arc::downgrade(&sink.inner));
        if let Some(previous) = previous.and_then(|w| w.upgrade()) {
            if !Arc::ptr_eq(&previous, &sink.inner) {
                warn!(node = %self.id(), old = %previous.id, new = %sink.id(), "sink replaced");
            }
            previous
                .sources
                .write()
                .retain(|w| !std::ptr::eq(w.as_ptr(), Arc::as_ptr(&self.inner)));
        }

        sink.inner.sources.write().push(Arc::downgrade(&self.inner));
        self.component.root().absorb(&sink.component.root());
        debug!(
            from = %self.id(),
            to = %sink.id(),
            nodes = self.component.len(),
            "nodes linked"
        );
        Ok(())
    }

    /// Whether `target` is this node or lies downstream of it
    fn reaches(&self, target: &Node) -> bool {
        let mut seen = HashSet::new();
        let mut current = Some(self.clone());
        while let Some(node) = current {
            if node == *target {
                return true;
            }
            if !seen.insert(node.id()) {
                return false;
            }
            current = node.sink();
        }
        false
    }

    /// Call `f` once for every node connected to this one (itself included)
    pub fn for_each(&self, mut f: impl FnMut(&Node)) {
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut stack = vec![self.clone()];
        while let Some(node) = stack.pop() {
            if !visited.insert(node.id()) {
                continue;
            }
            f(&node);
            stack.extend(node.sink());
            stack.extend(node.sources().into_iter().rev());
        }
    }

    /// Every node connected to this one, each exactly once
    pub fn connected(&self) -> Vec<Node> {
        let mut nodes = Vec::new();
        self.for_each(|node| nodes.push(node.clone()));
        nodes
    }

    /// Start the poll loop of every connected node that is not already running.
    ///
    /// Requires a tokio runtime.
    pub fn run(&self) -> RivuletResult<()> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| RivuletError::NoRuntime)?;

        let mut started = 0usize;
        self.for_each(|node| {
            node.inner.cancelled.store(false, Ordering::Release);
            let already = node
                .inner
                .running
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err();
            if already {
                return;
            }
            let span = tracing::debug_span!("node", id = %node.id());
            handle.spawn(node.clone().poll().instrument(span));
            started += 1;
        });

        debug!(root = %self.id(), started, "graph running");
        Ok(())
    }

    /// Stop every connected node after its in-flight step
    pub fn cancel(&self) {
        let mut count = 0usize;
        self.for_each(|node| {
            node.inner.cancelled.store(true, Ordering::Release);
            count += 1;
        });
        debug!(root = %self.id(), nodes = count, "graph cancelled");
    }
}
