//! Notes, pitch classes and MIDI conversion.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Distinct pitch classes in an octave.
pub const OCTAVE_SIZE: u8 = 12;

/// Degrees in a diatonic scale, and so modes of a major scale.
pub const NUM_DEGREES: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    pub const ALL: [Letter; 7] = [
        Letter::C,
        Letter::D,
        Letter::E,
        Letter::F,
        Letter::G,
        Letter::A,
        Letter::B,
    ];

    /// Pitch class of the unaltered letter.
    pub const fn natural_pitch_class(self) -> u8 {
        match self {
            Letter::C => 0,
            Letter::D => 2,
            Letter::E => 4,
            Letter::F => 5,
            Letter::G => 7,
            Letter::A => 9,
            Letter::B => 11,
        }
    }

    pub fn next(self) -> Self {
        Self::ALL[(self as usize + 1) % Self::ALL.len()]
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            'E' => Some(Letter::E),
            'F' => Some(Letter::F),
            'G' => Some(Letter::G),
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Letter::C => 'C',
            Letter::D => 'D',
            Letter::E => 'E',
            Letter::F => 'F',
            Letter::G => 'G',
            Letter::A => 'A',
            Letter::B => 'B',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Accidental {
    Flat,
    #[default]
    Natural,
    Sharp,
}

impl Accidental {
    pub const fn offset(self) -> i8 {
        match self {
            Accidental::Flat => -1,
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
        }
    }

    pub fn ascii(self) -> &'static str {
        match self {
            Accidental::Flat => "b",
            Accidental::Natural => "",
            Accidental::Sharp => "#",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Accidental::Flat => "♭",
            Accidental::Natural => "",
            Accidental::Sharp => "♯",
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c {
            '#' | '♯' => Some(Accidental::Sharp),
            'b' | '♭' => Some(Accidental::Flat),
            _ => None,
        }
    }
}

const SHARP_SPELLING: [(Letter, Accidental); 12] = [
    (Letter::C, Accidental::Natural),
    (Letter::C, Accidental::Sharp),
    (Letter::D, Accidental::Natural),
    (Letter::D, Accidental::Sharp),
    (Letter::E, Accidental::Natural),
    (Letter::F, Accidental::Natural),
    (Letter::F, Accidental::Sharp),
    (Letter::G, Accidental::Natural),
    (Letter::G, Accidental::Sharp),
    (Letter::A, Accidental::Natural),
    (Letter::A, Accidental::Sharp),
    (Letter::B, Accidental::Natural),
];

const FLAT_SPELLING: [(Letter, Accidental); 12] = [
    (Letter::C, Accidental::Natural),
    (Letter::D, Accidental::Flat),
    (Letter::D, Accidental::Natural),
    (Letter::E, Accidental::Flat),
    (Letter::E, Accidental::Natural),
    (Letter::F, Accidental::Natural),
    (Letter::G, Accidental::Flat),
    (Letter::G, Accidental::Natural),
    (Letter::A, Accidental::Flat),
    (Letter::A, Accidental::Natural),
    (Letter::B, Accidental::Flat),
    (Letter::B, Accidental::Natural),
];

/// A spelled note with an optional octave, e.g. `C#4`, `Eb`, `B-1`.
///
/// Equality compares spelling. Use [`Note::same_pitch_class`] or
/// [`Note::pitch_class`] for enharmonic comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Note {
    pub letter: Letter,
    pub accidental: Accidental,
    pub octave: Option<i8>,
}

impl Note {
    pub const fn new(letter: Letter, accidental: Accidental, octave: Option<i8>) -> Self {
        Self {
            letter,
            accidental,
            octave,
        }
    }

    /// Octaveless note for a pitch class, spelled with sharps.
    pub fn from_pitch_class(pitch_class: u8) -> Self {
        Self::spelled(pitch_class as i32, false, None)
    }

    /// Octaveless note for a pitch class, spelled with flats.
    pub fn from_pitch_class_flat(pitch_class: u8) -> Self {
        Self::spelled(pitch_class as i32, true, None)
    }

    /// Spells a MIDI number with sharps (the enharmonic normal form).
    pub fn from_midi(midi: u8) -> Self {
        Self::from_midi_value(midi as i32, false)
    }

    pub fn from_midi_flat(midi: u8) -> Self {
        Self::from_midi_value(midi as i32, true)
    }

    fn from_midi_value(value: i32, flats: bool) -> Self {
        let octave = value.div_euclid(OCTAVE_SIZE as i32) - 1;
        Self::spelled(value, flats, Some(octave))
    }

    fn spelled(value: i32, flats: bool, octave: Option<i32>) -> Self {
        let pc = value.rem_euclid(OCTAVE_SIZE as i32) as usize;
        let (letter, accidental) = if flats {
            FLAT_SPELLING[pc]
        } else {
            SHARP_SPELLING[pc]
        };
        Self {
            letter,
            accidental,
            octave: octave.map(clamp_octave),
        }
    }

    /// Enharmonic identity in `0..12`, ignoring octave.
    pub fn pitch_class(&self) -> u8 {
        self.offset_in_octave().rem_euclid(OCTAVE_SIZE as i32) as u8
    }

    /// Semitones above the C of this note's written octave. `Cb` is -1, `B#` is 12.
    fn offset_in_octave(&self) -> i32 {
        self.letter.natural_pitch_class() as i32 + self.accidental.offset() as i32
    }

    /// Unchecked MIDI value, may fall outside `0..=127`.
    pub fn midi_value(&self) -> Option<i32> {
        self.octave
            .map(|octave| (octave as i32 + 1) * OCTAVE_SIZE as i32 + self.offset_in_octave())
    }

    pub fn to_midi(&self) -> Result<u8> {
        let value = self.midi_value().ok_or_else(|| {
            Error::InvalidInput(format!("note {} has no octave", self))
        })?;
        u8::try_from(value)
            .ok()
            .filter(|midi| *midi <= 127)
            .ok_or_else(|| Error::InvalidInput(format!("note {} is outside the MIDI range", self)))
    }

    pub fn has_octave(&self) -> bool {
        self.octave.is_some()
    }

    pub fn with_octave(&self, octave: i8) -> Self {
        Self {
            octave: Some(octave),
            ..*self
        }
    }

    pub fn without_octave(&self) -> Self {
        Self {
            octave: None,
            ..*self
        }
    }

    pub fn same_pitch_class(&self, other: &Note) -> bool {
        self.pitch_class() == other.pitch_class()
    }

    /// Sharp spelling of the same pitch, e.g. `Db4` becomes `C#4`.
    pub fn normalized(&self) -> Self {
        self.respell(false)
    }

    /// Removes spellings that cross a letter boundary (`Cb`, `Fb`, `E#`, `B#`).
    pub fn simplified(&self) -> Self {
        self.respell(self.accidental == Accidental::Flat)
    }

    fn respell(&self, flats: bool) -> Self {
        match self.midi_value() {
            Some(value) => Self::from_midi_value(value, flats),
            None => Self::spelled(self.pitch_class() as i32, flats, None),
        }
    }

    /// Moves the note by `semitones`, keeping the flat/sharp preference of its spelling.
    pub fn transpose(&self, semitones: i32) -> Self {
        let flats = self.accidental == Accidental::Flat;
        match self.midi_value() {
            Some(value) => Self::from_midi_value(value + semitones, flats),
            None => Self::spelled(self.pitch_class() as i32 + semitones, flats, None),
        }
    }

    /// Writes this pitch using `spelling`'s letter and accidental, keeping
    /// the sounding octave when there is one.
    pub fn respelled_as(&self, spelling: &Note) -> Self {
        let octave = self.midi_value().map(|value| {
            clamp_octave((value - spelling.offset_in_octave()).div_euclid(OCTAVE_SIZE as i32) - 1)
        });
        Self {
            letter: spelling.letter,
            accidental: spelling.accidental,
            octave,
        }
    }
}

fn clamp_octave(octave: i32) -> i8 {
    octave.clamp(i8::MIN as i32, i8::MAX as i32) as i8
}

/// The highest note with `note`'s pitch class that sounds strictly below `must_be_below`.
pub fn note_below(note: &Note, must_be_below: &Note) -> Result<Note> {
    let octave = must_be_below.octave.ok_or_else(|| {
        Error::InvalidInput(format!(
            "cannot place a note below octaveless {}",
            must_be_below
        ))
    })?;
    let limit = must_be_below.midi_value().unwrap_or_default();

    let candidate = note.with_octave(octave);
    if candidate.midi_value().unwrap_or_default() < limit {
        return Ok(candidate);
    }
    Ok(note.with_octave(octave.saturating_sub(1)))
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter.as_char(), self.accidental.ascii())?;
        if let Some(octave) = self.octave {
            write!(f, "{}", octave)?;
        }
        Ok(())
    }
}

impl FromStr for Note {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        let invalid = || Error::InvalidInput(format!("unrecognized note: {:?}", s));

        let mut chars = text.chars();
        let letter = chars.next().and_then(Letter::from_char).ok_or_else(invalid)?;
        let rest = chars.as_str();

        let (accidental, rest) = match rest.chars().next() {
            Some(c) => match Accidental::from_char(c) {
                Some(accidental) => (accidental, &rest[c.len_utf8()..]),
                None => (Accidental::Natural, rest),
            },
            None => (Accidental::Natural, rest),
        };

        let octave = if rest.is_empty() {
            None
        } else {
            Some(rest.parse::<i8>().map_err(|_| invalid())?)
        };

        Ok(Self {
            letter,
            accidental,
            octave,
        })
    }
}

impl TryFrom<String> for Note {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Note> for String {
    fn from(note: Note) -> Self {
        note.to_string()
    }
}

/// Parses a list of note names, failing on the first bad one.
pub fn parse_notes<S: AsRef<str>>(names: &[S]) -> Result<Vec<Note>> {
    names.iter().map(|name| name.as_ref().parse()).collect()
}
