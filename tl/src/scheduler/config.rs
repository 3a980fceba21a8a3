//! Auto-clear configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Auto-clear configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoClearConfig {
    /// Whether completed items remove themselves at all
    pub enabled: bool,

    /// How long a completed item stays visible before removal
    #[serde(rename = "delay-ms")]
    pub delay_ms: u64,
}

/// Default auto-clear window in milliseconds
pub const DEFAULT_DELAY_MS: u64 = 500;

impl Default for AutoClearConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_ms: DEFAULT_DELAY_MS,
        }
    }
}

impl AutoClearConfig {
    /// Get the auto-clear window as a Duration
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Config with the given window, enabled; saturates at `u64::MAX` ms
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            enabled: true,
            delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Config that never schedules anything
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}
