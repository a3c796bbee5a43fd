//! Per-root flow configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration applied to a root and every stage chained on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Record stage outputs so a finite chain can be replayed without re-reading its sources
    pub cache: bool,
    /// Delay before the first multi-source reconciliation pass of a push run
    pub first_reconcile_delay_ms: u64,
    /// Delay before every later reconciliation pass
    pub reconcile_delay_ms: u64,
    /// Maximum number of placeholders appended to close a partial window
    pub max_padding: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            cache: true,
            first_reconcile_delay_ms: 1000, // let initial bursts settle
            reconcile_delay_ms: 0,
            max_padding: 4096,
        }
    }
}

impl FlowConfig {
    /// Create a test configuration
    pub fn test() -> Self {
        Self {
            cache: true,
            first_reconcile_delay_ms: 10,
            reconcile_delay_ms: 0,
            max_padding: 64,
        }
    }

    /// Configuration with the replay cache switched off
    pub fn uncached() -> Self {
        Self {
            cache: false,
            ..Self::default()
        }
    }

    pub fn first_reconcile_delay(&self) -> Duration {
        Duration::from_millis(self.first_reconcile_delay_ms)
    }

    pub fn reconcile_delay(&self) -> Duration {
        Duration::from_millis(self.reconcile_delay_ms)
    }
}
