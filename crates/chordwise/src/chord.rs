//! Chord instances: a root, an archetype, an optional bass and leftover intervals.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::chord_library::{lookup_archetype, ChordArchetype, ARCHETYPES};
use crate::note::{Accidental, Letter, Note, OCTAVE_SIZE};
use crate::triads::{cumulative, Triad, TriadName};
use crate::{Error, Result};

/// Root names enumerated by [`all_chords`].
pub const CONSIDERED_NOTE_NAMES: [&str; 17] = [
    "Ab", "A", "A#", "Bb", "B", "C", "C#", "Db", "D", "D#", "Eb", "E", "F", "F#", "Gb", "G", "G#",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ChordRecord", into = "ChordRecord")]
pub struct Chord {
    archetype: &'static ChordArchetype,
    /// Octaveless root.
    pub root: Note,
    /// Octaveless bass, only when it differs from the root.
    pub bass: Option<Note>,
    /// Semitones above the root that the archetype does not explain.
    pub accidentals: Vec<i32>,
}

/// Serialized form, which round-trips through [`Chord::lookup`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChordRecord {
    root: Note,
    suffix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bass: Option<Note>,
    #[serde(default)]
    accidentals: Vec<i32>,
}

impl TryFrom<ChordRecord> for Chord {
    type Error = Error;

    fn try_from(record: ChordRecord) -> Result<Self> {
        let archetype = lookup_archetype(&record.suffix)?;
        Ok(Chord::new(archetype, record.root, record.bass, record.accidentals))
    }
}

impl From<Chord> for ChordRecord {
    fn from(chord: Chord) -> Self {
        ChordRecord {
            root: chord.root,
            suffix: chord.primary_name().to_string(),
            bass: chord.bass,
            accidentals: chord.accidentals,
        }
    }
}

impl Chord {
    pub fn new(
        archetype: &'static ChordArchetype,
        root: Note,
        bass: Option<Note>,
        accidentals: Vec<i32>,
    ) -> Self {
        let root = root.without_octave();
        let bass = bass
            .map(|b| b.without_octave())
            .filter(|b| !b.same_pitch_class(&root));
        Self {
            archetype,
            root,
            bass,
            accidentals,
        }
    }

    /// Parses `"C maj7"`, `"Cmaj7"`, `"C maj7/E"` or a bare root (`"C"`, major).
    pub fn lookup(name: &str) -> Result<Self> {
        let (root, suffix) = explode_chord(name)?;
        Self::from_root_and_suffix(root, &suffix)
    }

    pub fn from_root_and_suffix(root: Note, suffix: &str) -> Result<Self> {
        let (base_suffix, bass) = split_over_chord(suffix)?;
        let archetype = lookup_archetype(base_suffix).map_err(|_| {
            Error::ChordNotFound(format!(
                "could not find {:?} in chord library (from: {} {})",
                base_suffix.trim(),
                root,
                suffix
            ))
        })?;
        Ok(Self::new(archetype, root, bass, Vec::new()))
    }

    /// A copy with a different set of accidentals.
    pub fn with_accidentals(&self, accidentals: Vec<i32>) -> Self {
        Self::new(self.archetype, self.root, self.bass, accidentals)
    }

    pub fn archetype(&self) -> &'static ChordArchetype {
        self.archetype
    }

    pub fn names(&self) -> &'static [&'static str] {
        self.archetype.names
    }

    pub fn primary_name(&self) -> &'static str {
        self.archetype.primary_name()
    }

    pub fn triad_name(&self) -> TriadName {
        self.archetype.triad
    }

    pub fn base_triad(&self) -> Triad {
        self.archetype.base_triad()
    }

    pub fn extensions(&self) -> &'static [u8] {
        self.archetype.extensions
    }

    /// Semitone offsets of the root, base triad and extensions, plus the
    /// bass (negative, within the octave below) when asked for.
    pub fn basic_intervals(&self, include_bass: bool) -> Vec<i32> {
        let mut intervals: Vec<i32> = Vec::new();
        let mut push = |interval: i32| {
            if !intervals.contains(&interval) {
                intervals.push(interval);
            }
        };

        if include_bass {
            if let Some(bass) = &self.bass {
                let below = (self.root.pitch_class() as i32 - bass.pitch_class() as i32)
                    .rem_euclid(OCTAVE_SIZE as i32);
                push(-below);
            }
        }
        push(0);
        for offset in cumulative(self.base_triad()) {
            push(offset as i32);
        }
        for extension in self.extensions() {
            push(*extension as i32);
        }
        intervals
    }

    /// The chord's notes. With an octave, the root sits in that octave and
    /// every other note keeps its true distance from it.
    pub fn basic_notes(&self, octave: Option<i8>, include_bass: bool) -> Vec<Note> {
        let root = match octave {
            Some(octave) => self.root.with_octave(octave),
            None => self.root,
        };
        self.basic_intervals(include_bass)
            .into_iter()
            .map(|interval| {
                if interval == 0 {
                    root
                } else {
                    root.transpose(interval).simplified()
                }
            })
            .collect()
    }

    /// Does the base triad or an extension (or the bass, if asked) share a pitch class with `note`?
    pub fn contains_note(&self, note: &Note, include_bass: bool) -> bool {
        self.basic_notes(None, include_bass)
            .iter()
            .any(|n| n.same_pitch_class(note))
    }

    /// Root and canonical suffix, dropping bass and accidentals.
    pub fn basic_name(&self) -> String {
        format!("{} {}", self.root, self.primary_name())
    }

    pub fn root_and_suffix(&self) -> (Note, &'static str) {
        (self.root, self.primary_name())
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.root, self.primary_name())?;
        if let Some(bass) = &self.bass {
            write!(f, "/{}", bass)?;
        }
        Ok(())
    }
}

impl FromStr for Chord {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Chord::lookup(s)
    }
}

/// Splits a chord name into a root and a suffix.
fn explode_chord(name: &str) -> Result<(Note, String)> {
    let name = name.trim();
    let parts: Vec<&str> = name.split(' ').filter(|p| !p.is_empty()).collect();

    match parts.as_slice() {
        [root, suffix] => {
            let root = root
                .parse::<Note>()
                .ok()
                .filter(|n| !n.has_octave())
                .ok_or_else(|| Error::ChordNotFound(format!("chord does not start with a note: {}", name)))?;
            Ok((root, suffix.to_string()))
        }
        [_] => {
            // "Bb5" is either B with a flat fifth or a Bb power chord
            if name.get(1..3) == Some("b5") {
                return Err(Error::ChordNotFound(format!("ambiguous chord: {}", name)));
            }
            let (root, rest) = leading_note(name).ok_or_else(|| {
                Error::ChordNotFound(format!("chord does not start with a note: {}", name))
            })?;
            Ok((root, rest.trim().to_string()))
        }
        _ => Err(Error::ChordNotFound(format!("unknown chord format: {}", name))),
    }
}

/// Letter plus optional `#`/`b`, returning the rest of the text.
fn leading_note(text: &str) -> Option<(Note, &str)> {
    let first = text.chars().next()?;
    if !first.is_ascii_uppercase() {
        return None;
    }
    let letter = Letter::from_char(first)?;
    let rest = &text[first.len_utf8()..];
    let (accidental, rest) = match rest.chars().next() {
        Some('#') => (Accidental::Sharp, &rest[1..]),
        Some('b') => (Accidental::Flat, &rest[1..]),
        _ => (Accidental::Natural, rest),
    };
    Some((Note::new(letter, accidental, None), rest))
}

/// `maj7/E` becomes `("maj7", Some(E))`. A bass containing digits is part of
/// the suffix (`m6/9`), and a bare `/E` is a major chord over E.
fn split_over_chord(suffix: &str) -> Result<(&str, Option<Note>)> {
    let suffix = suffix.trim();
    match suffix.rsplit_once('/') {
        Some((base, bass)) if !bass.is_empty() && !bass.chars().any(|c| c.is_ascii_digit()) => {
            let bass = bass
                .parse::<Note>()
                .map_err(|_| Error::ChordNotFound(format!("bad bass note in {:?}", suffix)))?;
            Ok((base, Some(bass)))
        }
        _ => Ok((suffix, None)),
    }
}

pub fn is_valid_chord(name: &str) -> bool {
    Chord::lookup(name).is_ok()
}

/// Every considered root with every synonym of every archetype. No over chords.
pub fn all_chords() -> &'static [Chord] {
    static ALL: OnceLock<Vec<Chord>> = OnceLock::new();
    ALL.get_or_init(|| {
        let mut chords = Vec::new();
        for archetype in ARCHETYPES {
            for name in archetype.names {
                for root in CONSIDERED_NOTE_NAMES {
                    match root.parse::<Note>().and_then(|root| Chord::from_root_and_suffix(root, name)) {
                        Ok(chord) => chords.push(chord),
                        Err(e) => tracing::warn!(root, suffix = *name, error = %e, "skipping chord"),
                    }
                }
            }
        }
        chords
    })
}
