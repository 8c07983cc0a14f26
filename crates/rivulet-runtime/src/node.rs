//! Rivulet Node - one vertex of the processing graph
//!
//! Each node owns an inbound [`Channel`], links to any number of upstream
//! nodes and at most one downstream node, and drives its own poll loop:
//!
//! 1. Wait `interval` (yield once when the interval is zero)
//! 2. Pull an event from the channel, or synthesize one if there are no sources
//! 3. Run the transformation and time it
//! 4. Put the timestamped result on the sink's channel, if there is a sink
//!
//! Nodes never call into each other while propagating; all traffic goes
//! through channels.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use rivulet_channel::Channel;
use rivulet_core::{Event, Metadata, NodeId, Payload, RivuletError, RivuletResult, Value};
use rivulet_time::TimeWindow;

use crate::config::{duration_to_ms, NodeConfig};
use crate::graph::Component;
use crate::managed::{self, ManagedNode, ManagedState};
use crate::transform::{Input, Lift, Transform};

/// Per-node step counters
#[derive(Clone, Debug, Default)]
pub struct NodeStats {
    /// Propagation steps that ran a transformation
    pub steps: u64,
    /// Steps whose transformation failed and produced nothing
    pub failures: u64,
    /// Processing time of the most recent step
    pub last_elapsed: Duration,
}

pub(crate) struct NodeInner {
    pub(crate) id: NodeId,
    update: Transform,
    interval_ms: AtomicU64,
    pub(crate) channel: Channel<Event>,
    pub(crate) sources: RwLock<Vec<Weak<NodeInner>>>,
    pub(crate) sink: RwLock<Option<Weak<NodeInner>>>,
    pub(crate) cancelled: AtomicBool,
    pub(crate) running: AtomicBool,
    /// Processing time of every step in the last window
    steps: Mutex<TimeWindow<Duration>>,
    stats: Mutex<NodeStats>,
    pub(crate) managed: Option<Arc<ManagedState>>,
}

/// Handle to a graph vertex.
///
/// Cloning is cheap and yields the same node; equality is identity.
///
/// Every node belongs to a component that owns all nodes linked to it,
/// and edges between nodes are weak. Any handle into a graph therefore keeps
/// the whole graph alive, whichever node it points at.
#[derive(Clone)]
pub struct Node {
    pub(crate) inner: Arc<NodeInner>,
    pub(crate) component: Arc<Component>,
}

impl Node {
    /// Create a node with a transformation and configuration
    pub fn new(update: Transform, config: NodeConfig) -> Self {
        Self::build(update, config, None)
    }

    /// Create a node with the default configuration
    pub fn with_update(update: Transform) -> Self {
        Self::new(update, NodeConfig::default())
    }

    pub(crate) fn build(
        update: Transform,
        config: NodeConfig,
        managed: Option<Arc<ManagedState>>,
    ) -> Self {
        let inner = Arc::new(NodeInner {
            id: NodeId::next(),
            update,
            interval_ms: AtomicU64::new(config.interval_ms),
            channel: Channel::new(),
            sources: RwLock::new(Vec::new()),
            sink: RwLock::new(None),
            cancelled: AtomicBool::new(false),
            running: AtomicBool::new(false),
            steps: Mutex::new(TimeWindow::new(config.window())),
            stats: Mutex::new(NodeStats::default()),
            managed,
        });
        Node {
            component: Component::new(Arc::clone(&inner)),
            inner,
        }
    }

    /// Handle to another node of this node's graph
    fn attach(&self, inner: Arc<NodeInner>) -> Node {
        Node {
            inner,
            component: Arc::clone(&self.component),
        }
    }

    /// Normalize a node, a transformation or a constant into a node
    pub fn lift(x: impl Into<Lift>) -> Self {
        match x.into() {
            Lift::Node(node) => node,
            Lift::Transform(update) => Node::with_update(update),
            Lift::Value(value) => Node::with_update(Transform::constant(value)),
        }
    }

    /// Lift every item and chain them in order; returns the head
    pub fn seq<I>(xs: I) -> RivuletResult<Node>
    where
        I: IntoIterator,
        I::Item: Into<Lift>,
    {
        chain(xs.into_iter().map(Node::lift).collect())
    }

    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Current poll interval
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.inner.interval_ms.load(Ordering::Relaxed))
    }

    /// Change the poll interval; takes effect on the next iteration
    pub fn set_interval(&self, interval: Duration) {
        self.inner
            .interval_ms
            .store(duration_to_ms(interval), Ordering::Relaxed);
    }

    /// Downstream node, if linked
    pub fn sink(&self) -> Option<Node> {
        let sink = self.inner.sink.read().as_ref().and_then(Weak::upgrade)?;
        Some(self.attach(sink))
    }

    /// Upstream nodes in link order
    pub fn sources(&self) -> Vec<Node> {
        self.inner
            .sources
            .read()
            .iter()
            .filter_map(Weak::upgrade)
            .map(|inner| self.attach(inner))
            .collect()
    }

    pub(crate) fn has_sources(&self) -> bool {
        self.inner
            .sources
            .read()
            .iter()
            .any(|source| source.strong_count() > 0)
    }

    /// Inbound mailbox
    pub fn channel(&self) -> &Channel<Event> {
        &self.inner.channel
    }

    pub fn is_managed(&self) -> bool {
        self.inner.managed.is_some()
    }

    /// View this node as a managed node
    pub fn as_managed(&self) -> Option<ManagedNode> {
        ManagedNode::from_node(self.clone())
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Whether this node's poll loop is currently scheduled
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> NodeStats {
        self.inner.stats.lock().clone()
    }

    /// Steps completed within the statistics window
    pub fn recent_steps(&self) -> usize {
        self.inner.steps.lock().len()
    }

    /// Mean processing time over the statistics window
    pub fn mean_elapsed(&self) -> Option<Duration> {
        let (count, total) = self
            .inner
            .steps
            .lock()
            .reduce(|(n, sum), d| (n + 1, sum + *d), (0u32, Duration::ZERO));
        (count > 0).then(|| total / count)
    }

    /// Invoke the transformation directly, without metadata
    pub async fn apply(&self, value: Value) -> RivuletResult<Value> {
        self.invoke(value, None).await
    }

    pub(crate) async fn invoke(
        &self,
        value: Value,
        meta: Option<Metadata>,
    ) -> RivuletResult<Value> {
        self.inner
            .update
            .call(value, meta)
            .await
            .map_err(|source| RivuletError::Transform {
                node: self.id(),
                source,
            })
    }

    /// Run the transformation on an event (with metadata) or a bare value
    pub async fn process(&self, input: impl Into<Input>) -> RivuletResult<Payload> {
        let input = input.into();
        match &self.inner.managed {
            Some(state) => managed::process(self, state, input).await,
            None => {
                let value = match input {
                    Input::Event(event) => {
                        let meta = event.metadata();
                        self.invoke(event.payload.into_value(), Some(meta)).await?
                    }
                    Input::Value(value) => self.invoke(value, None).await?,
                };
                Ok(Payload::Value(value))
            }
        }
    }

    /// One scheduling step
    pub(crate) async fn propagate(&self) -> RivuletResult<()> {
        let input = if self.has_sources() {
            self.inner.channel.get().await
        } else {
            Event::empty(self.id(), self.interval())
        };

        let started_at = Instant::now();
        let result = self.process(input).await;
        let elapsed = started_at.elapsed();
        self.record_step(elapsed, result.is_ok());
        let payload = result?;

        match self.sink() {
            Some(sink) => {
                let event = Event::new(payload, self.id(), self.interval())
                    .with_started_at(started_at)
                    .with_elapsed(elapsed);
                trace!(sink = %sink.id(), ?elapsed, "event propagated");
                sink.inner.channel.put(event);
            }
            None => trace!(?elapsed, "result consumed"),
        }
        Ok(())
    }

    fn record_step(&self, elapsed: Duration, ok: bool) {
        self.inner.steps.lock().add(elapsed);
        let mut stats = self.inner.stats.lock();
        stats.steps += 1;
        stats.last_elapsed = elapsed;
        if !ok {
            stats.failures += 1;
        }
    }

    /// Self-rescheduling loop; runs until the node is cancelled
    pub(crate) async fn poll(self) {
        debug!(interval = ?self.interval(), "poll loop started");
        loop {
            self.step_until_cancelled().await;
            self.inner.running.store(false, Ordering::Release);

            // A `run` between the last cancel check and the store above has
            // cleared the flag but could not claim the loop
            let resumed = !self.is_cancelled()
                && self
                    .inner
                    .running
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok();
            if !resumed {
                break;
            }
            debug!("poll loop resumed");
        }
        debug!("poll loop stopped");
    }

    async fn step_until_cancelled(&self) {
        loop {
            let interval = self.interval();
            if interval.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(interval).await;
            }
            if self.is_cancelled() {
                break;
            }

            if let Err(err) = self.propagate().await {
                // Failed steps are skipped; the schedule continues
                warn!(error = %err, "propagation step failed");
            }

            if self.is_cancelled() {
                break;
            }
        }
    }
}

/// Link consecutive nodes and return the first
pub(crate) fn chain(nodes: Vec<Node>) -> RivuletResult<Node> {
    for pair in nodes.windows(2) {
        pair[0].to(&pair[1])?;
    }
    nodes.into_iter().next().ok_or(RivuletError::EmptySequence)
}

impl Default for Node {
    fn default() -> Self {
        Self::with_update(Transform::identity())
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id())
            .field("managed", &self.is_managed())
            .field("sink", &self.sink().map(|s| s.id()))
            .field("interval", &self.interval())
            .finish()
    }
}
