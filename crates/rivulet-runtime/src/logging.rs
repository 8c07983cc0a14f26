//! Tracing subscriber setup for applications embedding Rivulet
//!
//! Library code only emits `tracing` events; nothing is printed until the
//! host installs a subscriber, for example with [`init_logging`].

use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rivulet_core::{RivuletError, RivuletResult};

/// Logging configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is unset
    pub default_directive: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            default_directive: "info,rivulet_runtime=debug".to_string(),
            json: false,
        }
    }
}

/// Install a global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LogConfig) -> RivuletResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_directive))
        .map_err(|e| RivuletError::Logging(e.to_string()))?;

    let json = config.json.then(|| tracing_subscriber::fmt::layer().json());
    let text = (!config.json).then(|| tracing_subscriber::fmt::layer());

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .try_init()
        .map_err(|e| RivuletError::Logging(e.to_string()))
}
