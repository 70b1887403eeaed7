//! Triad shapes: two stacked semitone gaps above a root, plus inversions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::note::{Note, OCTAVE_SIZE};

/// Semitone gaps between consecutive triad members, lowest first.
/// The power chord has a single gap.
pub type Triad = &'static [u8];

/// Every triad shape the chord library is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriadName {
    #[serde(rename = "5")]
    Power,
    #[serde(rename = "sus2")]
    Sus2,
    #[serde(rename = "sus4")]
    Sus4,
    #[serde(rename = "min")]
    Minor,
    #[serde(rename = "maj")]
    Major,
    /// Major third over a flattened fifth, e.g. `7b5`.
    #[serde(rename = "b5")]
    FlatFive,
    #[serde(rename = "dim")]
    Diminished,
    #[serde(rename = "aug")]
    Augmented,
}

const fn first_inversion(triad: [u8; 2]) -> [u8; 2] {
    [triad[1], OCTAVE_SIZE - (triad[0] + triad[1])]
}

const fn second_inversion(triad: [u8; 2]) -> [u8; 2] {
    [OCTAVE_SIZE - (triad[0] + triad[1]), triad[0]]
}

const POWER: [u8; 1] = [7];
const POWER_INVERTED: [u8; 1] = [5];
const SUS2: [u8; 2] = [2, 5];
const SUS4: [u8; 2] = [5, 2];
const MINOR: [u8; 2] = [3, 4];
const MAJOR: [u8; 2] = [4, 3];
const FLAT_FIVE: [u8; 2] = [4, 2];
const DIMINISHED: [u8; 2] = [3, 3];
const AUGMENTED: [u8; 2] = [4, 4];

const SUS2_1: [u8; 2] = first_inversion(SUS2);
const SUS2_2: [u8; 2] = second_inversion(SUS2);
const SUS4_1: [u8; 2] = first_inversion(SUS4);
const SUS4_2: [u8; 2] = second_inversion(SUS4);
const MINOR_1: [u8; 2] = first_inversion(MINOR);
const MINOR_2: [u8; 2] = second_inversion(MINOR);
const MAJOR_1: [u8; 2] = first_inversion(MAJOR);
const MAJOR_2: [u8; 2] = second_inversion(MAJOR);
const FLAT_FIVE_1: [u8; 2] = first_inversion(FLAT_FIVE);
const FLAT_FIVE_2: [u8; 2] = second_inversion(FLAT_FIVE);
const DIMINISHED_1: [u8; 2] = first_inversion(DIMINISHED);
const DIMINISHED_2: [u8; 2] = second_inversion(DIMINISHED);

static POWER_SHAPES: [Triad; 2] = [&POWER, &POWER_INVERTED];
static SUS2_SHAPES: [Triad; 3] = [&SUS2, &SUS2_1, &SUS2_2];
static SUS4_SHAPES: [Triad; 3] = [&SUS4, &SUS4_1, &SUS4_2];
static MINOR_SHAPES: [Triad; 3] = [&MINOR, &MINOR_1, &MINOR_2];
static MAJOR_SHAPES: [Triad; 3] = [&MAJOR, &MAJOR_1, &MAJOR_2];
static FLAT_FIVE_SHAPES: [Triad; 3] = [&FLAT_FIVE, &FLAT_FIVE_1, &FLAT_FIVE_2];
static DIMINISHED_SHAPES: [Triad; 3] = [&DIMINISHED, &DIMINISHED_1, &DIMINISHED_2];
// Symmetric, so every inversion is the same shape.
static AUGMENTED_SHAPES: [Triad; 1] = [&AUGMENTED];

impl TriadName {
    /// Library order. Detection walks triads in this order within each inversion.
    pub const ALL: [TriadName; 8] = [
        TriadName::Power,
        TriadName::Sus2,
        TriadName::Sus4,
        TriadName::Minor,
        TriadName::Major,
        TriadName::FlatFive,
        TriadName::Diminished,
        TriadName::Augmented,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TriadName::Power => "5",
            TriadName::Sus2 => "sus2",
            TriadName::Sus4 => "sus4",
            TriadName::Minor => "min",
            TriadName::Major => "maj",
            TriadName::FlatFive => "b5",
            TriadName::Diminished => "dim",
            TriadName::Augmented => "aug",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|name| name.as_str() == s)
    }

    /// Root position followed by the distinct inversions, `[root, inv1, inv2]`.
    pub fn inversions(self) -> &'static [Triad] {
        match self {
            TriadName::Power => &POWER_SHAPES,
            TriadName::Sus2 => &SUS2_SHAPES,
            TriadName::Sus4 => &SUS4_SHAPES,
            TriadName::Minor => &MINOR_SHAPES,
            TriadName::Major => &MAJOR_SHAPES,
            TriadName::FlatFive => &FLAT_FIVE_SHAPES,
            TriadName::Diminished => &DIMINISHED_SHAPES,
            TriadName::Augmented => &AUGMENTED_SHAPES,
        }
    }

    /// Root-position shape.
    pub fn base(self) -> Triad {
        self.inversions()[0]
    }

    /// Number of chord members the shape describes (2 for the power chord).
    pub fn size(self) -> usize {
        self.base().len() + 1
    }

    pub fn is_diminished(self) -> bool {
        matches!(self, TriadName::Diminished | TriadName::FlatFive)
    }
}

impl fmt::Display for TriadName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All shapes for a triad name, root position first.
pub fn triads_for(name: TriadName) -> &'static [Triad] {
    name.inversions()
}

/// Offsets of the upper triad members above the root, e.g. `[4, 3]` gives `[4, 7]`.
pub fn cumulative(triad: &[u8]) -> Vec<u8> {
    triad
        .iter()
        .scan(0u8, |total, gap| {
            *total += gap;
            Some(*total)
        })
        .collect()
}

/// Index into a lowest-first seed of the note that is the root, for a given inversion.
pub fn root_index(inversion: usize, triad_len: usize) -> usize {
    if triad_len == 2 {
        match inversion {
            0 => 0,
            1 => 2,
            _ => 1,
        }
    } else {
        inversion
    }
}

/// The notes of `triad` stacked on `root`, root first.
pub fn build_triad(root: &Note, triad: &[u8]) -> Vec<Note> {
    std::iter::once(*root)
        .chain(cumulative(triad).into_iter().map(|offset| root.transpose(offset as i32)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn inversion_formula() {
        let shapes = |name: TriadName| -> Vec<Vec<u8>> {
            triads_for(name).iter().map(|t| t.to_vec()).collect()
        };
        assert_eq!(shapes(TriadName::Major), vec![vec![4, 3], vec![3, 5], vec![5, 4]]);
        assert_eq!(shapes(TriadName::Minor), vec![vec![3, 4], vec![4, 5], vec![5, 3]]);
        assert_eq!(shapes(TriadName::Diminished)[1], vec![3, 6]);
    }

    #[test]
    fn degenerate_shapes_have_fewer_variants() {
        assert_eq!(triads_for(TriadName::Power).len(), 2);
        assert_eq!(triads_for(TriadName::Augmented).len(), 1);
        assert_eq!(TriadName::Power.size(), 2);
        assert_eq!(TriadName::Major.size(), 3);
    }

    #[test]
    fn every_inversion_spans_an_octave() {
        for name in TriadName::ALL {
            for triad in triads_for(name).iter().filter(|t| t.len() == 2) {
                let wrap = OCTAVE_SIZE - triad[0] - triad[1];
                assert!(wrap > 0, "{name} {triad:?}");
            }
        }
    }

    #[test]
    fn build_triad_matches_declared_gaps() {
        let root: Note = "C4".parse().unwrap();
        for name in TriadName::ALL {
            let notes = build_triad(&root, name.base());
            let midi: Vec<u8> = notes.iter().map(|n| n.to_midi().unwrap()).collect();
            let gaps: Vec<u8> = midi.windows(2).map(|w| w[1] - w[0]).collect();
            assert_eq!(gaps, name.base().to_vec(), "{name}");
        }
    }

    #[test]
    fn root_index_by_inversion() {
        assert_eq!(root_index(0, 2), 0);
        assert_eq!(root_index(1, 2), 2);
        assert_eq!(root_index(2, 2), 1);
        assert_eq!(root_index(1, 1), 1);
    }

    #[test]
    fn names_round_trip() {
        for name in TriadName::ALL {
            assert_eq!(TriadName::parse(name.as_str()), Some(name));
        }
        assert_eq!(TriadName::parse("maj7"), None);
    }
}
