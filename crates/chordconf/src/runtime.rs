//! Runtime policy - how callers drive the engine, not how the engine scores.

use serde::{Deserialize, Serialize};

/// Caller-level timing policy for a live note stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// Quiet period after the expected note count is reached before a
    /// chord is considered settled. Absorbs near-simultaneous key presses.
    #[serde(default = "ListenerConfig::default_debounce_ms")]
    pub debounce_ms: u64,

    /// How often the histogram is recalculated and the key re-guessed.
    #[serde(default = "ListenerConfig::default_refresh_ms")]
    pub refresh_ms: u64,
}

impl ListenerConfig {
    fn default_debounce_ms() -> u64 {
        300
    }

    fn default_refresh_ms() -> u64 {
        1000
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: Self::default_debounce_ms(),
            refresh_ms: Self::default_refresh_ms(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level or `EnvFilter` directive string.
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}
