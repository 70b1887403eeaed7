//! Rendering notes and chords for people: key-aware spelling and real
//! accidental glyphs.

use crate::chord::Chord;
use crate::key::Key;
use crate::note::Note;
use crate::Result;

/// How to present a note or chord.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayContext {
    /// Spell pitches the way this key does. Takes precedence over `scale`.
    pub key: Option<Key>,
    /// Spell pitches like the matching member of this scale.
    pub scale: Option<Vec<Note>>,
    pub show_octave: bool,
    /// Shortest chord suffix, no space after the root.
    pub compact: bool,
}

impl DisplayContext {
    pub fn in_key(key: Key) -> Self {
        Self {
            key: Some(key),
            ..Self::default()
        }
    }
}

/// `#` and `b` to `♯` and `♭`.
pub fn display_accidentals(text: &str) -> String {
    text.replace('#', "♯").replace('b', "♭")
}

/// `♯` and `♭` back to `#` and `b`.
pub fn untransform_accidentals(text: &str) -> String {
    text.replace('♯', "#").replace('♭', "b")
}

impl Note {
    /// Respells for the context. Notes outside the given key or scale keep
    /// their own spelling.
    pub fn for_display(&self, context: &DisplayContext) -> String {
        let spelled = match (&context.key, &context.scale) {
            (Some(key), _) => key.spell(self),
            (None, Some(scale)) => scale
                .iter()
                .find(|candidate| candidate.same_pitch_class(self))
                .map(|spelling| self.respelled_as(spelling))
                .unwrap_or(*self),
            (None, None) => *self,
        };
        let spelled = if context.show_octave {
            spelled
        } else {
            spelled.without_octave()
        };
        display_accidentals(&spelled.to_string())
    }
}

impl Chord {
    /// `C maj7/E`, or the shortest suffix with no space when compact.
    pub fn for_display(&self, context: &DisplayContext) -> String {
        // chord members never carry an octave
        let context = DisplayContext {
            show_octave: false,
            ..context.clone()
        };
        let root = self.root.for_display(&context);
        let (space, suffix) = if context.compact {
            ("", self.archetype().shortest_name())
        } else {
            (" ", self.primary_name())
        };
        let mut out = format!("{}{}{}", root, space, display_accidentals(suffix));
        if let Some(bass) = &self.bass {
            out.push('/');
            out.push_str(&bass.for_display(&context));
        }
        out
    }
}

/// Looks a chord name up and renders it.
pub fn chord_name_for_display(name: &str, context: &DisplayContext) -> Result<String> {
    let chord = Chord::lookup(name).or_else(|_| Chord::lookup(&untransform_accidentals(name)))?;
    Ok(chord.for_display(context))
}
