//! Live harmony inference for keyboard input.
//!
//! Given the notes someone is holding, name the chord. Given a decaying
//! histogram of what they have been playing, guess the key. Given a target
//! chord, grade their attempt and show the voicing they were reaching for.
//!
//! ```
//! use chordwise::{detect_chords, parse_notes};
//!
//! let notes = parse_notes(&["E4", "G4", "C5"]).unwrap();
//! let chords = detect_chords(&notes).unwrap();
//! assert_eq!(chords[0].to_string(), "C maj");
//! ```

pub mod analyzer;
pub mod chord;
pub mod chord_library;
pub mod detect;
pub mod histogram;
pub mod interval;
pub mod key;
pub mod listener;
pub mod note;
pub mod note_set;
pub mod performance;
pub mod spelling;
pub mod tracker;
pub mod triads;
pub mod types;

pub use analyzer::{HarmonyAnalyzer, HeuristicAnalyzer};
pub use chord::{all_chords, is_valid_chord, Chord};
pub use chord_library::{lookup_archetype, ChordArchetype, ARCHETYPES};
pub use detect::{detect_chord, detect_chords, score_chord};
pub use histogram::NoteHistogram;
pub use interval::name_interval;
pub use key::{
    detect_key, detect_key_with, keys_including_chord, out_of_key_ratio, roman_numeral, Key,
    KeyFilter, LikelyKey, Mode,
};
pub use listener::Listener;
pub use note::{note_below, parse_notes, Accidental, Letter, Note};
pub use note_set::NoteSet;
pub use performance::{evaluate, goal_notes, interpret_performance, is_correct, Evaluation, PerformedChord};
pub use spelling::{display_accidentals, untransform_accidentals, DisplayContext};
pub use tracker::KeyTracker;
pub use triads::{build_triad, TriadName};
pub use types::{parse_events, NoteEvent, NoteHistogramBuckets};

/// Errors from chord, key and performance operations.
///
/// An empty detection result is not an error; these are for malformed
/// input and out-of-order note events.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("chord not found: {0}")]
    ChordNotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("note-on for pitch class {pitch_class}, which is already sounding")]
    NoteAlreadyOpen { pitch_class: u8 },

    #[error("note-off for pitch class {pitch_class}, which is not sounding")]
    NoteNotOpen { pitch_class: u8 },
}

pub type Result<T> = std::result::Result<T, Error>;
