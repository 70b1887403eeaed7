//! Layered configuration for chordwise.
//!
//! Every section has compiled-in defaults, so an empty or missing config
//! file is always valid.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/chordwise/config.toml` (system)
//! 2. `~/.config/chordwise/config.toml` (user)
//! 3. `./chordwise.toml` (local override, replaced by an explicit path)
//! 4. Environment variables (`CHORDWISE_*`, `RUST_LOG`)
//!
//! # Example Config
//!
//! ```toml
//! [histogram]
//! time_exponent = 0.4
//! duplicate_note_on = "restart"
//!
//! [key]
//! degree_weights = [4.0, 0.2, 2.0, -0.2, 2.5, -1.0, -0.3]
//!
//! [performance]
//! allow_additional_extensions = false
//!
//! [listener]
//! debounce_ms = 250
//!
//! [telemetry]
//! log_level = "debug"
//! ```

pub mod engine;
pub mod loader;
pub mod runtime;

pub use engine::{DuplicateNotePolicy, HistogramConfig, KeyConfig, PerformanceConfig};
pub use loader::{discover_config_files_with_override, ConfigSources};
pub use runtime::{ListenerConfig, TelemetryConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {field}: {message}")]
    Invalid { field: String, message: String },
}

/// Complete chordwise configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChordwiseConfig {
    #[serde(default)]
    pub histogram: HistogramConfig,

    #[serde(default)]
    pub key: KeyConfig,

    #[serde(default)]
    pub performance: PerformanceConfig,

    #[serde(default)]
    pub listener: ListenerConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl ChordwiseConfig {
    /// Load configuration from all standard sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration, letting `config_path` replace the local
    /// `./chordwise.toml` override. System and user files still load first.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and report where values came from.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let files = loader::discover_config_files_with_override(config_path);
        let (mut config, mut sources) = loader::load_files(&files)?;

        loader::apply_env_overrides(&mut config, &mut sources, |key| std::env::var(key).ok())?;
        config.validate()?;

        Ok((config, sources))
    }

    /// Check every tuning value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.histogram.validate()?;
        self.key.validate()?;
        Ok(())
    }

    /// Serialize config to a TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# chordwise configuration\n\n");

        let h = &self.histogram;
        output.push_str("[histogram]\n");
        output.push_str(&format!("min_time_delta_ms = {:?}\n", h.min_time_delta_ms));
        output.push_str(&format!("time_scale = {:?}\n", h.time_scale));
        output.push_str(&format!("time_exponent = {:?}\n", h.time_exponent));
        output.push_str(&format!("length_exponent = {:?}\n", h.length_exponent));
        output.push_str(&format!("min_length_ms = {:?}\n", h.min_length_ms));
        output.push_str(&format!("long_context_ms = {:?}\n", h.long_context_ms));
        output.push_str(&format!("decay_per_second = {:?}\n", h.decay_per_second));
        output.push_str(&format!("epsilon = {:?}\n", h.epsilon));
        output.push_str(&format!(
            "duplicate_note_on = \"{}\"\n",
            h.duplicate_note_on.as_str()
        ));

        let k = &self.key;
        output.push_str("\n[key]\n");
        let weights: Vec<String> = k.degree_weights.iter().map(|w| format!("{:?}", w)).collect();
        output.push_str(&format!("degree_weights = [{}]\n", weights.join(", ")));
        output.push_str(&format!("out_of_scale_weight = {:?}\n", k.out_of_scale_weight));
        if let Some(min) = k.min_score {
            output.push_str(&format!("min_score = {:?}\n", min));
        }
        let modes: Vec<String> = k.restricted_modes.iter().map(|m| format!("\"{}\"", m)).collect();
        output.push_str(&format!("restricted_modes = [{}]\n", modes.join(", ")));

        output.push_str("\n[performance]\n");
        output.push_str(&format!(
            "allow_additional_extensions = {}\n",
            self.performance.allow_additional_extensions
        ));
        output.push_str(&format!(
            "extension_threshold_semitones = {}\n",
            self.performance.extension_threshold_semitones
        ));

        output.push_str("\n[listener]\n");
        output.push_str(&format!("debounce_ms = {}\n", self.listener.debounce_ms));
        output.push_str(&format!("refresh_ms = {}\n", self.listener.refresh_ms));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!("log_level = \"{}\"\n", self.telemetry.log_level));

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = ChordwiseConfig::default();
        assert_eq!(config.histogram.long_context_ms, 45_000.0);
        assert_eq!(config.performance.extension_threshold_semitones, 12);
        assert_eq!(config.listener.debounce_ms, 300);
        assert_eq!(config.key.restricted_modes, vec!["locrian".to_string()]);
    }

    #[test]
    fn test_to_toml_round_trips() {
        let mut config = ChordwiseConfig::default();
        config.key.min_score = Some(0.5);
        config.histogram.duplicate_note_on = DuplicateNotePolicy::Restart;

        let rendered = config.to_toml();
        assert!(rendered.contains("[histogram]"));
        assert!(rendered.contains("[telemetry]"));

        let parsed: ChordwiseConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let parsed: ChordwiseConfig = toml::from_str("").unwrap();
        assert_eq!(parsed, ChordwiseConfig::default());
    }
}
