use std::collections::BTreeMap;

use crate::note::Note;
use crate::Result;

/// The notes currently held down, keyed by MIDI number.
#[derive(Debug, Clone, Default)]
pub struct NoteSet {
    notes: BTreeMap<u8, (Note, f64)>,
}

impl NoteSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a note, or refreshes its timestamp if it is already held.
    pub fn include(&mut self, note: &Note, timestamp_ms: f64) -> Result<()> {
        let midi = note.to_midi()?;
        self.notes.insert(midi, (*note, timestamp_ms));
        Ok(())
    }

    /// Returns whether the note was held.
    pub fn exclude(&mut self, note: &Note) -> Result<bool> {
        let midi = note.to_midi()?;
        Ok(self.notes.remove(&midi).is_some())
    }

    pub fn contains(&self, note: &Note) -> bool {
        note.to_midi()
            .map(|midi| self.notes.contains_key(&midi))
            .unwrap_or(false)
    }

    /// Lowest first, spelled as they were played.
    pub fn sorted_notes(&self) -> Vec<Note> {
        self.notes.values().map(|(note, _)| *note).collect()
    }

    pub fn timestamp_of(&self, note: &Note) -> Option<f64> {
        let midi = note.to_midi().ok()?;
        self.notes.get(&midi).map(|(_, t)| *t)
    }

    /// When the most recent note arrived.
    pub fn latest_timestamp(&self) -> Option<f64> {
        self.notes.values().map(|(_, t)| *t).reduce(f64::max)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn reset(&mut self) {
        self.notes.clear();
    }
}
