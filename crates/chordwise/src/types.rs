use serde::{Deserialize, Serialize};

use crate::note::Note;
use crate::{Error, Result};

/// One value per pitch class, index 0 = C.
pub type NoteHistogramBuckets = [f64; 12];

/// A timestamped note event from a keyboard or other source.
///
/// Serialized as `{"kind": "on", "note": "C4", "t": 0}`; instants also
/// carry `length` in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoteEvent {
    On { note: Note, t: f64 },
    Off { note: Note, t: f64 },
    Instant { note: Note, t: f64, length: f64 },
}

impl NoteEvent {
    pub fn note(&self) -> &Note {
        match self {
            NoteEvent::On { note, .. }
            | NoteEvent::Off { note, .. }
            | NoteEvent::Instant { note, .. } => note,
        }
    }

    /// Timestamp in milliseconds.
    pub fn t(&self) -> f64 {
        match self {
            NoteEvent::On { t, .. } | NoteEvent::Off { t, .. } | NoteEvent::Instant { t, .. } => {
                *t
            }
        }
    }
}

/// Parses JSON lines of note events. Blank lines and `#` comments are skipped.
pub fn parse_events(text: &str) -> Result<Vec<NoteEvent>> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line_no, line)| {
            serde_json::from_str(line)
                .map_err(|e| Error::InvalidInput(format!("event on line {}: {}", line_no, e)))
        })
        .collect()
}
