//! Sliding time window
//!
//! A list of samples that forgets entries once they outlive the window
//! duration. Pruning is lazy: it runs as the first step of every query.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// A timestamped sample
#[derive(Clone, Debug)]
struct Sample<T> {
    value: T,
    time: Instant,
}

/// Self-pruning collection of `(value, timestamp)` samples.
///
/// INVARIANT: after any operation evaluated at `t`, every retained sample
/// satisfies `t - sample.time < duration`.
#[derive(Clone, Debug)]
pub struct TimeWindow<T> {
    duration: Duration,
    samples: VecDeque<Sample<T>>,
}

impl<T> TimeWindow<T> {
    pub fn new(duration: Duration) -> Self {
        TimeWindow {
            duration,
            samples: VecDeque::new(),
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Record a sample stamped now
    pub fn add(&mut self, value: T) {
        self.add_at(value, Instant::now());
    }

    /// Record a sample stamped `time`, then prune relative to `time`
    pub fn add_at(&mut self, value: T, time: Instant) {
        self.samples.push_back(Sample { value, time });
        self.evict(time);
    }

    /// Replace every sample with `values`, all stamped now
    pub fn set(&mut self, values: impl IntoIterator<Item = T>) {
        self.set_at(values, Instant::now());
    }

    pub fn set_at(&mut self, values: impl IntoIterator<Item = T>, time: Instant) {
        self.samples = values
            .into_iter()
            .map(|value| Sample { value, time })
            .collect();
        self.evict(time);
    }

    /// Fold over the retained values at `time`, in insertion order
    pub fn reduce_at<A>(&mut self, f: impl FnMut(A, &T) -> A, init: A, time: Instant) -> A {
        self.evict(time);
        self.samples.iter().map(|s| &s.value).fold(init, f)
    }

    pub fn reduce<A>(&mut self, f: impl FnMut(A, &T) -> A, init: A) -> A {
        self.reduce_at(f, init, Instant::now())
    }

    /// Number of retained samples at `time`
    pub fn len_at(&mut self, time: Instant) -> usize {
        self.evict(time);
        self.samples.len()
    }

    pub fn len(&mut self) -> usize {
        self.len_at(Instant::now())
    }

    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    fn evict(&mut self, time: Instant) {
        let duration = self.duration;
        // Samples stamped after `time` have a zero age and stay
        self.samples
            .retain(|s| time.saturating_duration_since(s.time) < duration);
    }
}

impl<T: Clone> TimeWindow<T> {
    /// Retained values at `time`, in insertion order
    pub fn get_at(&mut self, time: Instant) -> Vec<T> {
        self.evict(time);
        self.samples.iter().map(|s| s.value.clone()).collect()
    }

    pub fn get(&mut self) -> Vec<T> {
        self.get_at(Instant::now())
    }
}

impl<T> Default for TimeWindow<T> {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn later(time: Instant, ms: u64) -> Instant {
        time + Duration::from_millis(ms)
    }

    #[test]
    fn test_window_stores_values() {
        let mut w = TimeWindow::new(Duration::from_millis(1000));
        w.add(1);
        w.add(2);
        w.add(3);
        assert_eq!(w.get(), vec![1, 2, 3]);
    }

    #[test]
    fn test_window_expires_values() {
        let mut w = TimeWindow::new(Duration::from_millis(1000));
        let now = Instant::now();
        w.add_at('a', now);
        w.add_at('b', later(now, 500));
        w.add_at('c', later(now, 1000));
        assert_eq!(w.get_at(later(now, 1000)), vec!['b', 'c']);
    }

    #[test]
    fn test_window_other_duration() {
        let mut w = TimeWindow::new(Duration::from_millis(2500));
        let now = Instant::now();
        for (i, v) in ['a', 'b', 'c', 'd', 'e', 'f', 'g'].into_iter().enumerate() {
            w.add_at(v, later(now, i as u64 * 500));
        }
        assert_eq!(
            w.get_at(later(now, 3000)),
            vec!['c', 'd', 'e', 'f', 'g']
        );
    }

    #[test]
    fn test_window_reduce() {
        let mut w = TimeWindow::new(Duration::from_millis(1000));
        let values = [vec![1, 2, 3], vec![5, 4, 3, 5], vec![20, 30, 40, 32, 1, 2, 3]];
        for v in values.iter().cloned() {
            w.add(v);
        }
        let total = w.reduce(|acc, v: &Vec<i32>| acc + v.len(), 0);
        assert_eq!(total, values.iter().map(Vec::len).sum::<usize>());
    }

    #[test]
    fn test_window_set_replaces_samples() {
        let mut w = TimeWindow::new(Duration::from_millis(100));
        let now = Instant::now();
        w.add_at(1, now);
        w.set_at([7, 8], later(now, 50));
        assert_eq!(w.get_at(later(now, 50)), vec![7, 8]);
        assert_eq!(w.len_at(later(now, 150)), 0);
    }

    #[test]
    fn test_window_boundary_is_exclusive() {
        let mut w = TimeWindow::new(Duration::from_millis(10));
        let now = Instant::now();
        w.add_at(1, now);
        assert_eq!(w.len_at(later(now, 9)), 1);
        assert_eq!(w.len_at(later(now, 10)), 0);
    }

    proptest! {
        #[test]
        fn prop_reduce_matches_manual_filter(
            offsets in proptest::collection::vec(0u64..2000, 0..50),
            query in 0u64..3000,
        ) {
            let duration = Duration::from_millis(700);
            let base = Instant::now();
            let mut w = TimeWindow::new(duration);
            let mut expected = Vec::new();
            for (i, off) in offsets.iter().enumerate() {
                w.samples.push_back(Sample { value: i, time: later(base, *off) });
                expected.push((i, *off));
            }

            let query_at = later(base, query);
            let manual: usize = expected
                .iter()
                .filter(|(_, off)| query.saturating_sub(*off) < 700)
                .map(|(i, _)| *i)
                .sum();
            prop_assert_eq!(w.reduce_at(|acc, v| acc + *v, 0, query_at), manual);
        }
    }
}
