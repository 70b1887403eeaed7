//! Live session state: held notes, the running histogram and the key guess.

use std::sync::Arc;

use chordconf::{ChordwiseConfig, ListenerConfig};
use tracing::debug;

use crate::analyzer::{HarmonyAnalyzer, HeuristicAnalyzer};
use crate::chord::Chord;
use crate::histogram::NoteHistogram;
use crate::key::Key;
use crate::note::Note;
use crate::note_set::NoteSet;
use crate::performance::Evaluation;
use crate::tracker::KeyTracker;
use crate::types::NoteEvent;
use crate::{Error, Result};

/// Feeds note events to the histogram and the held-note set, and runs the
/// analyzer over them on demand.
///
/// The histogram tracks pitch classes, so octave doublings are counted here
/// and only the first note-on and last note-off of a pitch class reach it.
pub struct Listener {
    analyzer: Arc<dyn HarmonyAnalyzer>,
    config: ListenerConfig,
    histogram: NoteHistogram,
    held: NoteSet,
    held_per_pitch_class: [u32; 12],
    tracker: KeyTracker,
    last_refresh_ms: Option<f64>,
}

impl Listener {
    /// Create with the default heuristic analyzer.
    pub fn new(config: &ChordwiseConfig) -> Self {
        Self::with_analyzer(Arc::new(HeuristicAnalyzer::from_config(config)), config)
    }

    /// Create with a custom analyzer.
    pub fn with_analyzer(analyzer: Arc<dyn HarmonyAnalyzer>, config: &ChordwiseConfig) -> Self {
        Self {
            analyzer,
            config: config.listener.clone(),
            histogram: NoteHistogram::new(config.histogram.clone()),
            held: NoteSet::new(),
            held_per_pitch_class: [0; 12],
            tracker: KeyTracker::new(),
            last_refresh_ms: None,
        }
    }

    pub fn note_on(&mut self, note: &Note, timestamp_ms: f64) -> Result<()> {
        note.to_midi()?;
        let pc = note.pitch_class() as usize;

        if self.held.contains(note) {
            // Same key struck again without a release; the histogram policy decides.
            self.histogram.note_on(note, timestamp_ms)?;
        } else {
            if self.held_per_pitch_class[pc] == 0 {
                self.histogram.note_on(note, timestamp_ms)?;
            }
            self.held_per_pitch_class[pc] += 1;
        }
        self.held.include(note, timestamp_ms)
    }

    pub fn note_off(&mut self, note: &Note, timestamp_ms: f64) -> Result<()> {
        let pitch_class = note.pitch_class();
        if !self.held.exclude(note)? {
            return Err(Error::NoteNotOpen { pitch_class });
        }

        let count = &mut self.held_per_pitch_class[pitch_class as usize];
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.histogram.note_off(note, timestamp_ms)?;
        }
        Ok(())
    }

    pub fn apply(&mut self, event: &NoteEvent) -> Result<()> {
        match event {
            NoteEvent::On { note, t } => self.note_on(note, *t),
            NoteEvent::Off { note, t } => self.note_off(note, *t),
            NoteEvent::Instant { note, t, length } => {
                self.histogram.note_instant(note, *t, *length)
            }
        }
    }

    /// Recalculates the histogram and re-guesses the key.
    pub fn refresh(&mut self, now_ms: f64) -> Option<&Key> {
        let guesses = self.analyzer.detect_key(self.histogram.calculate(now_ms));
        self.last_refresh_ms = Some(now_ms);
        debug!(
            now_ms,
            magnitude = self.histogram.magnitude(),
            top = guesses.first().map(|g| g.name()),
            "refreshed key guesses"
        );
        self.tracker.set_guesses(guesses)
    }

    /// True once `refresh_ms` has passed since the last refresh.
    pub fn needs_refresh(&self, now_ms: f64) -> bool {
        match self.last_refresh_ms {
            Some(last) => now_ms - last >= self.config.refresh_ms as f64,
            None => true,
        }
    }

    /// Candidates for the held notes, best first.
    pub fn current_chords(&self) -> Result<Vec<Chord>> {
        self.analyzer.detect_chords(&self.held.sorted_notes())
    }

    /// Enough notes are down and none arrived in the last `debounce_ms`.
    pub fn is_settled(&self, now_ms: f64, expected_notes: usize) -> bool {
        if self.held.len() < expected_notes.max(1) {
            return false;
        }
        self.held
            .latest_timestamp()
            .map_or(false, |latest| now_ms - latest >= self.config.debounce_ms as f64)
    }

    /// Grades the held notes against `target`.
    pub fn evaluate(&self, target: &Chord) -> Result<Evaluation> {
        self.analyzer.evaluate(&self.held.sorted_notes(), target)
    }

    pub fn held_notes(&self) -> Vec<Note> {
        self.held.sorted_notes()
    }

    pub fn histogram(&self) -> &NoteHistogram {
        &self.histogram
    }

    pub fn tracker(&self) -> &KeyTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut KeyTracker {
        &mut self.tracker
    }

    /// Forgets everything except configuration and a locked key choice.
    pub fn reset(&mut self) {
        self.histogram.reset();
        self.held.reset();
        self.held_per_pitch_class = [0; 12];
        self.last_refresh_ms = None;
        if !self.tracker.is_locked() {
            self.tracker.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chordconf::DuplicateNotePolicy;
    use pretty_assertions::assert_eq;

    fn note(s: &str) -> Note {
        s.parse().unwrap()
    }

    fn on(listener: &mut Listener, names: &[&str], t: f64) {
        for name in names {
            listener.note_on(&note(name), t).unwrap();
        }
    }

    #[test]
    fn octave_doublings_do_not_trip_histogram() {
        let mut listener = Listener::new(&ChordwiseConfig::default());
        on(&mut listener, &["C3", "C4", "E4", "G4"], 0.0);
        assert!(listener.histogram().is_open(0));

        listener.note_off(&note("C3"), 100.0).unwrap();
        assert!(listener.histogram().is_open(0));
        listener.note_off(&note("C4"), 200.0).unwrap();
        assert!(!listener.histogram().is_open(0));
    }

    #[test]
    fn releasing_unheld_note_fails() {
        let mut listener = Listener::new(&ChordwiseConfig::default());
        assert!(matches!(
            listener.note_off(&note("D4"), 0.0),
            Err(Error::NoteNotOpen { pitch_class: 2 })
        ));
    }

    #[test]
    fn repeated_key_follows_histogram_policy() {
        let mut listener = Listener::new(&ChordwiseConfig::default());
        on(&mut listener, &["E4"], 0.0);
        assert!(listener.note_on(&note("E4"), 10.0).is_err());

        let mut config = ChordwiseConfig::default();
        config.histogram.duplicate_note_on = DuplicateNotePolicy::Restart;
        let mut listener = Listener::new(&config);
        on(&mut listener, &["E4"], 0.0);
        listener.note_on(&note("E4"), 10.0).unwrap();
        assert_eq!(listener.held_notes().len(), 1);
        listener.note_off(&note("E4"), 20.0).unwrap();
        assert!(!listener.histogram().is_open(4));
    }

    #[test]
    fn chords_from_held_notes() {
        let mut listener = Listener::new(&ChordwiseConfig::default());
        on(&mut listener, &["G3", "B3", "D4"], 0.0);
        let chords = listener.current_chords().unwrap();
        assert_eq!(chords[0].to_string(), "G maj");

        let result = listener.evaluate(&Chord::lookup("G maj").unwrap()).unwrap();
        assert!(result.correct);
    }

    #[test]
    fn settle_window() {
        let mut listener = Listener::new(&ChordwiseConfig::default());
        on(&mut listener, &["C4", "E4"], 0.0);
        assert!(!listener.is_settled(1000.0, 3));
        on(&mut listener, &["G4"], 1000.0);
        assert!(!listener.is_settled(1100.0, 3));
        assert!(listener.is_settled(1300.0, 3));
    }

    #[test]
    fn refresh_guesses_key() {
        let mut listener = Listener::new(&ChordwiseConfig::default());
        for (i, name) in ["C4", "E4", "G4", "C4", "F4", "A4", "G4", "B4", "D5", "C5"]
            .iter()
            .enumerate()
        {
            let t = i as f64 * 500.0;
            listener.apply(&NoteEvent::Instant {
                note: note(name),
                t,
                length: 400.0,
            })
            .unwrap();
        }
        assert!(listener.needs_refresh(0.0));
        let key = listener.refresh(5000.0).copied();
        assert_eq!(key.map(|k| k.to_string()), Some("C major".into()));
        assert!(!listener.needs_refresh(5500.0));
        assert!(listener.needs_refresh(6000.0));
    }

    #[test]
    fn reset_keeps_locked_key() {
        let mut listener = Listener::new(&ChordwiseConfig::default());
        listener.tracker_mut().choose("A minor".parse().unwrap());
        on(&mut listener, &["A3"], 0.0);
        listener.reset();
        assert!(listener.held_notes().is_empty());
        assert_eq!(
            listener.tracker().chosen().map(|k| k.to_string()),
            Some("A minor".into())
        );
    }
}
