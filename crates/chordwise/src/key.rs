//! Keys, modes and key detection from a pitch-class histogram.

use chordconf::KeyConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::chord::Chord;
use crate::note::{Accidental, Note, NUM_DEGREES, OCTAVE_SIZE};
use crate::triads::{build_triad, TriadName};
use crate::types::NoteHistogramBuckets;
use crate::{Error, Result};

/// Diatonic modes, in the order of the major-scale degree they start on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Major,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Minor,
    Locrian,
}

impl Mode {
    pub const ALL: [Mode; 7] = [
        Mode::Major,
        Mode::Dorian,
        Mode::Phrygian,
        Mode::Lydian,
        Mode::Mixolydian,
        Mode::Minor,
        Mode::Locrian,
    ];

    /// Degree of the parent major scale this mode starts on.
    pub fn degree(self) -> usize {
        self as usize
    }

    pub fn from_degree(degree: usize) -> Option<Self> {
        Self::ALL.get(degree).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Major => "major",
            Mode::Dorian => "dorian",
            Mode::Phrygian => "phrygian",
            Mode::Lydian => "lydian",
            Mode::Mixolydian => "mixolydian",
            Mode::Minor => "minor",
            Mode::Locrian => "locrian",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "major" | "ionian" | "maj" => Some(Mode::Major),
            "dorian" => Some(Mode::Dorian),
            "phrygian" => Some(Mode::Phrygian),
            "lydian" => Some(Mode::Lydian),
            "mixolydian" => Some(Mode::Mixolydian),
            "minor" | "aeolian" | "min" => Some(Mode::Minor),
            "locrian" => Some(Mode::Locrian),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semitone offsets of the major scale degrees.
const MAJOR_STEPS: [u8; NUM_DEGREES] = [0, 2, 4, 5, 7, 9, 11];

/// Major scale tonics around the circle of fifths. Gb rather than F#.
pub const MAJOR_KEY_TONICS: [&str; 12] =
    ["C", "G", "D", "A", "E", "B", "Gb", "Db", "Ab", "Eb", "Bb", "F"];

pub type Scale = [Note; NUM_DEGREES];

/// Spells a major scale letter by letter, then simplifies (Gb major gets B, not Cb).
fn spell_major_scale(tonic: Note) -> Scale {
    let tonic_pc = tonic.pitch_class();
    let mut letter = tonic.letter;
    let mut scale = [tonic; NUM_DEGREES];

    for (degree, step) in MAJOR_STEPS.iter().enumerate().skip(1) {
        letter = letter.next();
        let target = (tonic_pc + step) % OCTAVE_SIZE;
        let natural = letter.natural_pitch_class();
        let accidental = match (target + OCTAVE_SIZE - natural) % OCTAVE_SIZE {
            1 => Accidental::Sharp,
            11 => Accidental::Flat,
            _ => Accidental::Natural,
        };
        scale[degree] = Note::new(letter, accidental, None).simplified();
    }
    scale
}

/// The twelve major scales in circle-of-fifths order.
pub fn major_scales() -> &'static [Scale; 12] {
    static SCALES: OnceLock<[Scale; 12]> = OnceLock::new();
    SCALES.get_or_init(|| {
        let mut scales = [[Note::from_pitch_class(0); NUM_DEGREES]; 12];
        for (scale, tonic) in scales.iter_mut().zip(MAJOR_KEY_TONICS) {
            if let Ok(tonic) = tonic.parse::<Note>() {
                *scale = spell_major_scale(tonic);
            }
        }
        scales
    })
}

fn major_scale_for(tonic_pc: u8) -> &'static Scale {
    let scales = major_scales();
    scales
        .iter()
        .find(|scale| scale[0].pitch_class() == tonic_pc)
        .unwrap_or(&scales[0])
}

/// Enharmonic display table per parent major scale, indexed by tonic pitch
/// class then note pitch class. `None` means the note is outside the scale.
fn spelling_tables() -> &'static [[Option<Note>; 12]; 12] {
    static TABLES: OnceLock<[[Option<Note>; 12]; 12]> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut tables = [[None; 12]; 12];
        for scale in major_scales() {
            let table = &mut tables[scale[0].pitch_class() as usize];
            for note in scale {
                table[note.pitch_class() as usize] = Some(*note);
            }
        }
        tables
    })
}

/// A tonic and a mode, e.g. `F# dorian`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
    pub tonic: Note,
    pub mode: Mode,
}

impl Key {
    pub fn new(tonic: Note, mode: Mode) -> Self {
        Self {
            tonic: tonic.without_octave(),
            mode,
        }
    }

    /// Tonic pitch class of the major scale this key is a mode of.
    pub fn parent_pitch_class(&self) -> u8 {
        let offset = MAJOR_STEPS[self.mode.degree()];
        (self.tonic.pitch_class() + OCTAVE_SIZE - offset) % OCTAVE_SIZE
    }

    /// The seven scale notes starting at the tonic.
    pub fn scale(&self) -> Scale {
        let mut scale = *major_scale_for(self.parent_pitch_class());
        scale.rotate_left(self.mode.degree());
        scale
    }

    pub fn pitch_classes(&self) -> [u8; NUM_DEGREES] {
        self.scale().map(|note| note.pitch_class())
    }

    pub fn contains(&self, pitch_class: u8) -> bool {
        self.pitch_classes().contains(&(pitch_class % OCTAVE_SIZE))
    }

    /// In-key notes take the key's spelling; others pass through unchanged.
    pub fn spell(&self, note: &Note) -> Note {
        let table = &spelling_tables()[self.parent_pitch_class() as usize];
        match table[note.pitch_class() as usize] {
            Some(spelling) => note.respelled_as(&spelling),
            None => *note,
        }
    }

    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.tonic, self.mode)
    }
}

impl FromStr for Key {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let tonic = parts
            .next()
            .ok_or_else(|| Error::InvalidInput("empty key name".into()))?
            .parse::<Note>()?;
        let mode = match parts.next() {
            Some(mode) => Mode::parse(mode)
                .ok_or_else(|| Error::InvalidInput(format!("unknown mode: {}", mode)))?,
            None => Mode::Major,
        };
        if parts.next().is_some() {
            return Err(Error::InvalidInput(format!("unrecognized key: {}", s)));
        }
        Ok(Key::new(tonic, mode))
    }
}

/// A scored key candidate. Scores across one result set sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikelyKey {
    pub note: Note,
    pub mode: Mode,
    pub score: f64,
}

impl LikelyKey {
    pub fn key(&self) -> Key {
        Key::new(self.note, self.mode)
    }

    pub fn name(&self) -> String {
        format!("{} {}", self.note, self.mode)
    }

    /// Same tonic and mode, regardless of score.
    pub fn same_key(&self, other: &LikelyKey) -> bool {
        self.note == other.note && self.mode == other.mode
    }
}

/// Rank every mode of every major scale against a histogram, with default weights.
pub fn detect_key(histogram: &NoteHistogramBuckets) -> Vec<LikelyKey> {
    detect_key_with(histogram, &KeyConfig::default())
}

/// Rank every mode of every major scale against a histogram.
///
/// An all-zero histogram gives an empty list.
pub fn detect_key_with(histogram: &NoteHistogramBuckets, config: &KeyConfig) -> Vec<LikelyKey> {
    let mut result = Vec::new();

    for scale in major_scales() {
        let buckets = scale.map(|note| note.pitch_class() as usize);
        let frequencies = buckets.map(|bucket| histogram[bucket]);

        let outside: f64 = (0..OCTAVE_SIZE as usize)
            .filter(|i| !buckets.contains(i))
            .map(|i| histogram[i])
            .sum();
        let penalty = config.out_of_scale_weight * outside;

        for (degree, tonic) in scale.iter().enumerate() {
            // Reframe the weight template so `degree` is the tonic.
            let score: f64 = frequencies
                .iter()
                .enumerate()
                .map(|(i, freq)| {
                    freq * config.degree_weights[(i + NUM_DEGREES - degree) % NUM_DEGREES]
                })
                .sum::<f64>()
                + penalty;

            let above_floor = config.min_score.map_or(true, |min| score >= min);
            if score > 0.0 && above_floor {
                if let Some(mode) = Mode::from_degree(degree) {
                    result.push(LikelyKey {
                        note: *tonic,
                        mode,
                        score,
                    });
                }
            }
        }
    }

    let total: f64 = result.iter().map(|k| k.score).sum();
    if total <= 0.0 {
        return Vec::new();
    }
    for key in &mut result {
        key.score /= total;
    }
    result.sort_by(|a, b| b.score.total_cmp(&a.score));

    debug!(
        candidates = result.len(),
        top = result.first().map(|k| k.name()),
        "detected key"
    );
    result
}

/// Share of histogram energy that falls outside `key`.
pub fn out_of_key_ratio(histogram: &NoteHistogramBuckets, key: &Key) -> f64 {
    let total: f64 = histogram.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let outside: f64 = (0..OCTAVE_SIZE)
        .filter(|pc| !key.contains(*pc))
        .map(|pc| histogram[pc as usize])
        .sum();
    outside / total
}

/// Options for [`keys_including_chord`].
#[derive(Debug, Clone, PartialEq)]
pub struct KeyFilter {
    /// Notes allowed outside the scale.
    pub max_accidentals: usize,
    /// Only test the root and base triad, ignoring extensions.
    pub only_base_triad: bool,
    pub restricted_modes: Vec<Mode>,
}

impl Default for KeyFilter {
    fn default() -> Self {
        Self {
            max_accidentals: 0,
            only_base_triad: true,
            restricted_modes: vec![Mode::Locrian],
        }
    }
}

impl KeyFilter {
    pub fn from_config(config: &KeyConfig) -> Self {
        let restricted_modes = config
            .restricted_modes
            .iter()
            .filter_map(|name| {
                let mode = Mode::parse(name);
                if mode.is_none() {
                    warn!(mode = %name, "ignoring unknown restricted mode");
                }
                mode
            })
            .collect();
        Self {
            restricted_modes,
            ..Self::default()
        }
    }
}

/// Keys (modes of the twelve major scales) whose scale holds the chord.
///
/// With `only_base_triad`, only the root and triad are tested so extended
/// chords still find a home. Otherwise `notes` are tested, falling back to
/// the chord's basic notes when empty.
pub fn keys_including_chord(chord: &Chord, notes: &[Note], filter: &KeyFilter) -> Vec<Key> {
    let considered: Vec<Note> = if filter.only_base_triad {
        build_triad(&chord.root, chord.base_triad())
    } else if notes.is_empty() {
        chord.basic_notes(None, true)
    } else {
        notes.to_vec()
    };

    let mut keys = Vec::new();
    for scale in major_scales() {
        let pcs = scale.map(|note| note.pitch_class());
        let accidentals = considered
            .iter()
            .filter(|note| !pcs.contains(&note.pitch_class()))
            .count();
        if accidentals > filter.max_accidentals {
            continue;
        }
        for (degree, tonic) in scale.iter().enumerate() {
            if let Some(mode) = Mode::from_degree(degree) {
                if !filter.restricted_modes.contains(&mode) {
                    keys.push(Key::new(*tonic, mode));
                }
            }
        }
    }
    keys
}

const UPPER_NUMERALS: [&str; NUM_DEGREES] = ["Ⅰ", "Ⅱ", "Ⅲ", "Ⅳ", "Ⅴ", "Ⅵ", "Ⅶ"];
const LOWER_NUMERALS: [&str; NUM_DEGREES] = ["ⅰ", "ⅱ", "ⅲ", "ⅳ", "ⅴ", "ⅵ", "ⅶ"];

/// Roman numeral of `chord` relative to the major scale on the key's tonic.
///
/// Chromatic roots are written as a flattened degree. Minor and diminished
/// chords are lowercase.
pub fn roman_numeral(key: &Key, chord: &Chord) -> String {
    let interval = (chord.root.pitch_class() + OCTAVE_SIZE - key.tonic.pitch_class()) % OCTAVE_SIZE;
    let (accidental, degree) = match MAJOR_STEPS.iter().position(|step| *step == interval) {
        Some(degree) => ("", degree),
        None => (
            Accidental::Flat.symbol(),
            MAJOR_STEPS
                .iter()
                .position(|step| *step == interval + 1)
                .unwrap_or_default(),
        ),
    };

    let triad = chord.triad_name();
    let lowercase = matches!(triad, TriadName::Minor | TriadName::Diminished);
    let numeral = if lowercase {
        LOWER_NUMERALS[degree]
    } else {
        UPPER_NUMERALS[degree]
    };
    let symbol = match triad {
        TriadName::Diminished | TriadName::FlatFive => "°",
        TriadName::Augmented => "⁺",
        TriadName::Sus2 | TriadName::Sus4 => "ₛᵤₛ",
        _ => "",
    };

    format!("{}{}{}", accidental, numeral, symbol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(s: &str) -> Key {
        s.parse().unwrap()
    }

    fn spelled(scale: &Scale) -> Vec<String> {
        scale.iter().map(|n| n.to_string()).collect()
    }

    fn histogram(pcs: &[(usize, f64)]) -> NoteHistogramBuckets {
        let mut h = [0.0; 12];
        for (pc, v) in pcs {
            h[*pc] = *v;
        }
        h
    }

    #[test]
    fn major_scales_are_spelled_by_letter() {
        let scales = major_scales();
        assert_eq!(spelled(&scales[0]), vec!["C", "D", "E", "F", "G", "A", "B"]);
        assert_eq!(spelled(&scales[5]), vec!["B", "C#", "D#", "E", "F#", "G#", "A#"]);
        assert_eq!(spelled(&scales[6]), vec!["Gb", "Ab", "Bb", "B", "Db", "Eb", "F"]);
        assert_eq!(spelled(&scales[11]), vec!["F", "G", "A", "Bb", "C", "D", "E"]);
    }

    #[test]
    fn modal_scales_rotate_the_parent() {
        assert_eq!(
            spelled(&key("D dorian").scale()),
            vec!["D", "E", "F", "G", "A", "B", "C"]
        );
        assert_eq!(
            spelled(&key("F# minor").scale()),
            vec!["F#", "G#", "A", "B", "C#", "D", "E"]
        );
        assert!(key("A minor").contains(0));
        assert!(!key("A minor").contains(1));
    }

    #[test]
    fn key_parse_and_display() {
        assert_eq!(key("F# dorian").to_string(), "F# dorian");
        assert_eq!(key("Eb").mode, Mode::Major);
        assert_eq!(key("A aeolian").mode, Mode::Minor);
        assert!("C bebop".parse::<Key>().is_err());
        assert!("".parse::<Key>().is_err());
    }

    #[test]
    fn spelling_follows_key() {
        assert_eq!(key("F major").spell(&"A#4".parse().unwrap()).to_string(), "Bb4");
        assert_eq!(key("E major").spell(&"Ab".parse().unwrap()).to_string(), "G#");
        // out of key passes through
        assert_eq!(key("C major").spell(&"Eb3".parse().unwrap()).to_string(), "Eb3");
    }

    #[test]
    fn c_e_g_prefers_c_major() {
        let keys = detect_key(&histogram(&[(0, 1.0), (4, 1.0), (7, 1.0)]));
        let top = &keys[0];
        assert_eq!(top.name(), "C major");
        assert!(top.score > 0.0);

        // Lydian and mixolydian on C tie on raw score but come later in the circle.
        let position = |name: &str| keys.iter().position(|k| k.name() == name).unwrap();
        assert!(position("C lydian") > 0);
        assert!(position("C mixolydian") > 0);
        assert!(keys[0].score > keys[position("A minor")].score);
    }

    #[test]
    fn scores_are_normalized() {
        let keys = detect_key(&histogram(&[(2, 3.0), (6, 1.5), (9, 2.0), (1, 0.2)]));
        assert!(!keys.is_empty());
        let total: f64 = keys.iter().map(|k| k.score).sum();
        assert!((total - 1.0).abs() < 1e-9, "total {}", total);
        assert!(keys.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn empty_histogram_detects_nothing() {
        assert!(detect_key(&[0.0; 12]).is_empty());
    }

    #[test]
    fn min_score_filters_before_normalizing() {
        let config = KeyConfig {
            min_score: Some(8.0),
            ..KeyConfig::default()
        };
        let keys = detect_key_with(&histogram(&[(0, 1.0), (4, 1.0), (7, 1.0)]), &config);
        let names: Vec<String> = keys.iter().map(|k| k.name()).collect();
        assert_eq!(names, vec!["C major", "C lydian", "C mixolydian"]);
        assert!((keys[0].score - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_key_energy() {
        let h = histogram(&[(0, 3.0), (1, 1.0)]);
        assert_eq!(out_of_key_ratio(&h, &key("C major")), 0.25);
        assert_eq!(out_of_key_ratio(&[0.0; 12], &key("C major")), 0.0);
    }

    #[test]
    fn keys_for_a_chord() {
        let chord = Chord::lookup("C maj").unwrap();
        let keys = keys_including_chord(&chord, &[], &KeyFilter::default());
        let names: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        // C, G and F major scales hold C E G; locrian is skipped.
        assert_eq!(names.len(), 18);
        assert!(names.contains(&"C major".to_string()));
        assert!(names.contains(&"E phrygian".to_string()));
        assert!(names.contains(&"D dorian".to_string()));
        assert!(!names.iter().any(|n| n.ends_with("locrian")));
    }

    #[test]
    fn keys_for_an_extended_chord() {
        let chord = Chord::lookup("C 7").unwrap();
        let strict = KeyFilter {
            only_base_triad: false,
            ..KeyFilter::default()
        };
        let keys = keys_including_chord(&chord, &[], &strict);
        // Only F major holds C E G Bb.
        assert_eq!(keys.len(), 6);
        assert!(keys.contains(&key("C mixolydian")));
    }

    #[test]
    fn roman_numerals() {
        let c = key("C major");
        let numeral = |name: &str| roman_numeral(&c, &Chord::lookup(name).unwrap());
        assert_eq!(numeral("C maj"), "Ⅰ");
        assert_eq!(numeral("D m7"), "ⅱ");
        assert_eq!(numeral("G 7"), "Ⅴ");
        assert_eq!(numeral("B dim"), "ⅶ°");
        assert_eq!(numeral("Bb maj"), "♭Ⅶ");
        assert_eq!(numeral("Eb aug"), "♭Ⅲ⁺");
        assert_eq!(numeral("F sus4"), "Ⅳₛᵤₛ");
    }

    #[test]
    fn restricted_modes_from_config() {
        let config = KeyConfig {
            restricted_modes: vec!["locrian".into(), "phrygian".into(), "bogus".into()],
            ..KeyConfig::default()
        };
        let filter = KeyFilter::from_config(&config);
        assert_eq!(filter.restricted_modes, vec![Mode::Locrian, Mode::Phrygian]);
    }
}
