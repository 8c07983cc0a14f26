//! Node configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Plain node configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Delay between propagation steps (0 = as fast as possible)
    pub interval_ms: u64,
    /// Duration of the statistics window
    pub window_ms: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            interval_ms: 0,
            window_ms: 1000,
        }
    }
}

impl NodeConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval_ms = duration_to_ms(interval);
        self
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window_ms = duration_to_ms(window);
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// Managed node configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagedConfig {
    #[serde(flatten)]
    pub node: NodeConfig,
    /// Upper bound in samples per second (`None` = unlimited)
    pub target: Option<f64>,
}

impl ManagedConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.node = self.node.with_interval(interval);
        self
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.node = self.node.with_window(window);
        self
    }

    pub fn with_target(mut self, target: f64) -> Self {
        self.target = Some(target);
        self
    }
}

pub(crate) fn duration_to_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
