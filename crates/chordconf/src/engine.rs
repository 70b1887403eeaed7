//! Engine tuning - numeric knobs for the histogram, key scorer and evaluator.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// What the histogram does when a note-on arrives for a pitch class that
/// already has an open datum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateNotePolicy {
    /// Fail with a state-misuse error.
    #[default]
    Reject,
    /// Close the open datum at the new timestamp and open a fresh one.
    Restart,
}

impl DuplicateNotePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "reject" | "error" => Some(Self::Reject),
            "restart" | "reopen" => Some(Self::Restart),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reject => "reject",
            Self::Restart => "restart",
        }
    }
}

/// Weighting of the decaying note histogram.
///
/// `weight = length^length_exponent / (time_scale * dt)^time_exponent`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramConfig {
    /// Floor on the age of a note, avoids the singularity at dt = 0.
    #[serde(default = "HistogramConfig::default_min_time_delta_ms")]
    pub min_time_delta_ms: f64,

    #[serde(default = "HistogramConfig::default_time_scale")]
    pub time_scale: f64,

    #[serde(default = "HistogramConfig::default_time_exponent")]
    pub time_exponent: f64,

    /// Larger values give long-held notes more weight.
    #[serde(default = "HistogramConfig::default_length_exponent")]
    pub length_exponent: f64,

    /// Notes shorter than this count as this long.
    #[serde(default = "HistogramConfig::default_min_length_ms")]
    pub min_length_ms: f64,

    /// Closed notes older than this are frozen into the long context.
    #[serde(default = "HistogramConfig::default_long_context_ms")]
    pub long_context_ms: f64,

    /// Multiplicative decay applied to the long context per elapsed second.
    #[serde(default = "HistogramConfig::default_decay_per_second")]
    pub decay_per_second: f64,

    /// Long-context buckets below this are zeroed.
    #[serde(default = "HistogramConfig::default_epsilon")]
    pub epsilon: f64,

    #[serde(default)]
    pub duplicate_note_on: DuplicateNotePolicy,
}

impl HistogramConfig {
    fn default_min_time_delta_ms() -> f64 {
        500.0
    }

    fn default_time_scale() -> f64 {
        0.0003
    }

    fn default_time_exponent() -> f64 {
        0.3
    }

    fn default_length_exponent() -> f64 {
        0.6
    }

    fn default_min_length_ms() -> f64 {
        200.0
    }

    fn default_long_context_ms() -> f64 {
        45_000.0
    }

    fn default_decay_per_second() -> f64 {
        0.993
    }

    fn default_epsilon() -> f64 {
        0.0006
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("histogram.min_time_delta_ms", self.min_time_delta_ms)?;
        positive("histogram.time_scale", self.time_scale)?;
        non_negative("histogram.time_exponent", self.time_exponent)?;
        non_negative("histogram.length_exponent", self.length_exponent)?;
        positive("histogram.min_length_ms", self.min_length_ms)?;
        non_negative("histogram.long_context_ms", self.long_context_ms)?;
        non_negative("histogram.epsilon", self.epsilon)?;
        if !(self.decay_per_second > 0.0 && self.decay_per_second <= 1.0) {
            return Err(ConfigError::Invalid {
                field: "histogram.decay_per_second".into(),
                message: format!("must be in (0, 1], got {}", self.decay_per_second),
            });
        }
        Ok(())
    }
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            min_time_delta_ms: Self::default_min_time_delta_ms(),
            time_scale: Self::default_time_scale(),
            time_exponent: Self::default_time_exponent(),
            length_exponent: Self::default_length_exponent(),
            min_length_ms: Self::default_min_length_ms(),
            long_context_ms: Self::default_long_context_ms(),
            decay_per_second: Self::default_decay_per_second(),
            epsilon: Self::default_epsilon(),
            duplicate_note_on: DuplicateNotePolicy::default(),
        }
    }
}

/// Scoring template for key detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyConfig {
    /// Weight of each scale degree relative to a hypothesised tonic,
    /// expressed for the major (ionian) reference.
    #[serde(default = "KeyConfig::default_degree_weights")]
    pub degree_weights: [f64; 7],

    /// Multiplier applied to histogram energy outside the scale.
    #[serde(default = "KeyConfig::default_out_of_scale_weight")]
    pub out_of_scale_weight: f64,

    /// Raw scores below this are discarded before normalisation.
    #[serde(default)]
    pub min_score: Option<f64>,

    /// Modes skipped by chord-to-key lookups.
    #[serde(default = "KeyConfig::default_restricted_modes")]
    pub restricted_modes: Vec<String>,
}

impl KeyConfig {
    fn default_degree_weights() -> [f64; 7] {
        [4.0, 0.2, 2.0, -0.2, 2.5, -1.0, -0.3]
    }

    fn default_out_of_scale_weight() -> f64 {
        -4.0
    }

    fn default_restricted_modes() -> Vec<String> {
        vec!["locrian".to_string()]
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, w) in self.degree_weights.iter().enumerate() {
            finite(&format!("key.degree_weights[{}]", i), *w)?;
        }
        finite("key.out_of_scale_weight", self.out_of_scale_weight)?;
        if let Some(min) = self.min_score {
            finite("key.min_score", min)?;
        }
        Ok(())
    }
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            degree_weights: Self::default_degree_weights(),
            out_of_scale_weight: Self::default_out_of_scale_weight(),
            min_score: None,
            restricted_modes: Self::default_restricted_modes(),
        }
    }
}

/// Grading policy for the chord exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Tolerate stray notes far enough above the root as creative extensions.
    #[serde(default = "PerformanceConfig::default_allow_additional_extensions")]
    pub allow_additional_extensions: bool,

    /// Minimum distance above the performed root, in semitones, for a stray
    /// note to count as an extension.
    #[serde(default = "PerformanceConfig::default_extension_threshold_semitones")]
    pub extension_threshold_semitones: u8,
}

impl PerformanceConfig {
    fn default_allow_additional_extensions() -> bool {
        true
    }

    fn default_extension_threshold_semitones() -> u8 {
        12
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            allow_additional_extensions: Self::default_allow_additional_extensions(),
            extension_threshold_semitones: Self::default_extension_threshold_semitones(),
        }
    }
}

fn finite(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field: field.to_string(),
            message: format!("must be finite, got {}", value),
        })
    }
}

fn non_negative(field: &str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(ConfigError::Invalid {
            field: field.to_string(),
            message: format!("must not be negative, got {}", value),
        });
    }
    Ok(())
}

fn positive(field: &str, value: f64) -> Result<(), ConfigError> {
    non_negative(field, value)?;
    if value == 0.0 {
        return Err(ConfigError::Invalid {
            field: field.to_string(),
            message: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}
