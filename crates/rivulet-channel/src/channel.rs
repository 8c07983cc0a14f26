//! Buffered multicast channel
//!
//! `put` never blocks: the value goes straight to every consumer currently
//! suspended in `get`, or into the buffer when nobody is waiting. `get`
//! takes the oldest buffered value, or suspends until the next `put`.
//!
//! Delivery to waiters is a broadcast. If several `get`s are pending when a
//! single `put` happens, all of them resolve to that same value.

use std::collections::VecDeque;
use std::fmt;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::trace;

struct State<T> {
    /// Values nobody was waiting for, oldest first
    buffer: VecDeque<T>,
    /// Suspended consumers
    waiters: Vec<oneshot::Sender<T>>,
}

/// Unbounded buffered multicast channel.
///
/// INVARIANT: at least one of {buffer, waiters} is empty.
pub struct Channel<T> {
    state: Mutex<State<T>>,
}

impl<T> Channel<T> {
    pub fn new() -> Self {
        Channel {
            state: Mutex::new(State {
                buffer: VecDeque::new(),
                waiters: Vec::new(),
            }),
        }
    }

    /// Number of buffered values
    pub fn len(&self) -> usize {
        self.state.lock().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of consumers currently suspended in `get`
    pub fn waiting(&self) -> usize {
        let mut state = self.state.lock();
        state.waiters.retain(|w| !w.is_closed());
        state.waiters.len()
    }

    /// Take the oldest buffered value without suspending
    pub fn try_get(&self) -> Option<T> {
        self.state.lock().buffer.pop_front()
    }

    /// Take the oldest buffered value, or wait for the next `put`
    pub async fn get(&self) -> T {
        loop {
            let rx = {
                let mut state = self.state.lock();
                if let Some(value) = state.buffer.pop_front() {
                    return value;
                }
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                rx
            };

            // A waiter is only ever dropped unsent by `put` pruning closed
            // receivers, so an error here means re-register and keep waiting
            if let Ok(value) = rx.await {
                return value;
            }
        }
    }
}

impl<T: Clone> Channel<T> {
    /// Hand `value` to every waiting consumer, or buffer it
    pub fn put(&self, value: T) {
        let mut state = self.state.lock();

        let mut delivered = 0usize;
        for waiter in state.waiters.drain(..) {
            if waiter.send(value.clone()).is_ok() {
                delivered += 1;
            }
        }

        if delivered == 0 {
            // Nobody left to receive it (or nobody was waiting)
            state.buffer.push_back(value);
        } else {
            trace!(waiters = delivered, "value broadcast to waiting consumers");
        }
    }
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Channel")
            .field("buffered", &state.buffer.len())
            .field("waiters", &state.waiters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use proptest::prelude::*;

    #[tokio::test]
    async fn test_put_then_get() {
        let chan = Channel::new();
        chan.put(23948);
        assert_eq!(chan.get().await, 23948);
    }

    #[tokio::test]
    async fn test_buffer_is_fifo() {
        let chan = Channel::new();
        chan.put("9812");
        chan.put("1234");
        chan.put("awef");
        assert_eq!(chan.len(), 3);

        assert_eq!(chan.get().await, "9812");
        assert_eq!(chan.get().await, "1234");
        assert_eq!(chan.get().await, "awef");
        assert!(chan.is_empty());
    }

    #[tokio::test]
    async fn test_get_blocks_until_put() {
        let chan = Arc::new(Channel::new());
        let consumer = {
            let chan = Arc::clone(&chan);
            tokio::spawn(async move { chan.get().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!consumer.is_finished());
        assert_eq!(chan.waiting(), 1);

        chan.put(10);
        assert_eq!(consumer.await.unwrap(), 10);
        assert_eq!(chan.waiting(), 0);
        assert!(chan.is_empty());
    }

    #[tokio::test]
    async fn test_sequential_blocked_gets() {
        let chan = Arc::new(Channel::new());
        for value in ["oaiwefnvb23091038", "vmzb09309823i3", "mbvzpp2309813"] {
            let consumer = {
                let chan = Arc::clone(&chan);
                tokio::spawn(async move { chan.get().await })
            };
            tokio::time::sleep(Duration::from_millis(5)).await;
            assert!(!consumer.is_finished());

            chan.put(value.to_string());
            assert_eq!(consumer.await.unwrap(), value);
        }
    }

    #[tokio::test]
    async fn test_blocked_gets_share_one_put() {
        let chan = Arc::new(Channel::new());
        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let chan = Arc::clone(&chan);
                tokio::spawn(async move { chan.get().await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(chan.waiting(), 3);

        chan.put("oawiefaowinv9823");
        for consumer in consumers {
            assert_eq!(consumer.await.unwrap(), "oawiefaowinv9823");
        }
        // Broadcast values are not also buffered
        assert!(chan.is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_get_does_not_swallow_value() {
        let chan = Channel::new();
        let timed_out = tokio::time::timeout(Duration::from_millis(5), chan.get()).await;
        assert!(timed_out.is_err());

        chan.put(7);
        assert_eq!(chan.try_get(), Some(7));
    }

    proptest! {
        #[test]
        fn prop_buffered_values_keep_put_order(values in proptest::collection::vec(any::<u32>(), 0..100)) {
            let chan = Channel::new();
            for v in &values {
                chan.put(*v);
            }
            let drained: Vec<u32> = std::iter::from_fn(|| chan.try_get()).collect();
            prop_assert_eq!(drained, values);
        }
    }
}
