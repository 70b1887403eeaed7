//! Decaying, time-weighted pitch-class histogram.
//!
//! Recent and long-held notes weigh the most. Closed notes older than the
//! long-context window are frozen into a decaying 12-bucket accumulator so
//! the per-tick cost stays bounded.

use chordconf::{DuplicateNotePolicy, HistogramConfig};
use tracing::{trace, warn};

use crate::note::{Note, OCTAVE_SIZE};
use crate::types::NoteHistogramBuckets;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
struct HistogramDatum {
    pitch_class: u8,
    start_ms: f64,
    end_ms: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct NoteHistogram {
    config: HistogramConfig,
    open: [bool; 12],
    short_context: Vec<HistogramDatum>,
    long_context: NoteHistogramBuckets,
    computed: NoteHistogramBuckets,
    magnitude: f64,
    maximum: f64,
    last_compute_ms: Option<f64>,
}

impl Default for NoteHistogram {
    fn default() -> Self {
        Self::new(HistogramConfig::default())
    }
}

impl NoteHistogram {
    pub fn new(config: HistogramConfig) -> Self {
        Self {
            config,
            open: [false; 12],
            short_context: Vec::new(),
            long_context: [0.0; 12],
            computed: [0.0; 12],
            magnitude: 0.0,
            maximum: 0.0,
            last_compute_ms: None,
        }
    }

    pub fn config(&self) -> &HistogramConfig {
        &self.config
    }

    /// Clears all state, keeping the configuration.
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    /// Opens a note. Only the pitch class matters, so octaveless notes are fine.
    pub fn note_on(&mut self, note: &Note, timestamp_ms: f64) -> Result<()> {
        let pitch_class = note.pitch_class();
        if self.open[pitch_class as usize] {
            match self.config.duplicate_note_on {
                DuplicateNotePolicy::Reject => {
                    return Err(Error::NoteAlreadyOpen { pitch_class });
                }
                DuplicateNotePolicy::Restart => {
                    warn!(pitch_class, timestamp_ms, "note already open, restarting it");
                    self.note_off(note, timestamp_ms)?;
                }
            }
        }

        self.open[pitch_class as usize] = true;
        self.short_context.push(HistogramDatum {
            pitch_class,
            start_ms: timestamp_ms,
            end_ms: None,
        });
        Ok(())
    }

    /// Closes the open note for this pitch class.
    pub fn note_off(&mut self, note: &Note, timestamp_ms: f64) -> Result<()> {
        let pitch_class = note.pitch_class();
        let found = self
            .short_context
            .iter()
            .rposition(|d| d.pitch_class == pitch_class && d.end_ms.is_none());

        match found {
            Some(index) if self.open[pitch_class as usize] => {
                self.short_context[index].end_ms = Some(timestamp_ms);
                self.open[pitch_class as usize] = false;
                Ok(())
            }
            _ => Err(Error::NoteNotOpen { pitch_class }),
        }
    }

    /// A note that is already over, e.g. from a file.
    pub fn note_instant(&mut self, note: &Note, timestamp_ms: f64, length_ms: f64) -> Result<()> {
        if !(length_ms >= 0.0) {
            return Err(Error::InvalidInput(format!(
                "note length must be non-negative, got {}",
                length_ms
            )));
        }
        self.short_context.push(HistogramDatum {
            pitch_class: note.pitch_class(),
            start_ms: timestamp_ms,
            end_ms: Some(timestamp_ms + length_ms),
        });
        Ok(())
    }

    pub fn is_open(&self, pitch_class: u8) -> bool {
        self.open[(pitch_class % OCTAVE_SIZE) as usize]
    }

    fn weight(&self, datum: &HistogramDatum, now_ms: f64) -> f64 {
        let c = &self.config;
        let dt = (now_ms - datum.start_ms).max(c.min_time_delta_ms);
        let length = datum
            .end_ms
            .map_or(dt, |end| end - datum.start_ms)
            .max(c.min_length_ms);
        length.powf(c.length_exponent) / (c.time_scale * dt).powf(c.time_exponent)
    }

    /// Recomputes the histogram as of `now_ms`.
    pub fn calculate(&mut self, now_ms: f64) -> &NoteHistogramBuckets {
        let mut computed = [0.0; 12];

        // Long context decays between calls, but not before the first.
        let decay = match self.last_compute_ms {
            Some(last) => self
                .config
                .decay_per_second
                .powf((now_ms - last) / 1000.0),
            None => 1.0,
        };
        for (long, out) in self.long_context.iter_mut().zip(computed.iter_mut()) {
            *long *= decay;
            if *long < self.config.epsilon {
                *long = 0.0;
            }
            *out += *long;
        }

        let long_context_ms = self.config.long_context_ms;
        let (aged, active): (Vec<HistogramDatum>, Vec<HistogramDatum>) =
            std::mem::take(&mut self.short_context)
                .into_iter()
                .partition(|d| matches!(d.end_ms, Some(end) if end + long_context_ms <= now_ms));

        // Notes leaving short context count this tick and are then frozen.
        for datum in &aged {
            let w = self.weight(datum, now_ms);
            self.long_context[datum.pitch_class as usize] += w;
            computed[datum.pitch_class as usize] += w;
        }
        for datum in &active {
            computed[datum.pitch_class as usize] += self.weight(datum, now_ms);
        }

        trace!(aged = aged.len(), active = active.len(), "histogram tick");

        self.short_context = active;
        self.magnitude = computed.iter().sum();
        self.maximum = computed.iter().copied().fold(0.0, f64::max);
        self.computed = computed;
        self.last_compute_ms = Some(now_ms);
        &self.computed
    }

    /// Snapshot from the last [`calculate`](Self::calculate).
    pub fn computed(&self) -> &NoteHistogramBuckets {
        &self.computed
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn maximum(&self) -> f64 {
        self.maximum
    }

    pub fn long_context(&self) -> &NoteHistogramBuckets {
        &self.long_context
    }

    pub fn short_context_len(&self) -> usize {
        self.short_context.len()
    }
}
