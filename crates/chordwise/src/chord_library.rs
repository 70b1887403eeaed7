use std::collections::HashMap;
use std::sync::OnceLock;

use crate::triads::{Triad, TriadName};
use crate::{Error, Result};

/// A named chord type: a base triad plus extensions fixed by the name.
#[derive(Debug, PartialEq, Eq)]
pub struct ChordArchetype {
    /// Synonyms. The first is the canonical suffix.
    pub names: &'static [&'static str],
    pub triad: TriadName,
    /// Semitones above the root implied by the name, e.g. `7` implies 10.
    pub extensions: &'static [u8],
}

impl ChordArchetype {
    const fn new(
        names: &'static [&'static str],
        triad: TriadName,
        extensions: &'static [u8],
    ) -> Self {
        Self {
            names,
            triad,
            extensions,
        }
    }

    pub fn primary_name(&self) -> &'static str {
        self.names[0]
    }

    pub fn shortest_name(&self) -> &'static str {
        self.names
            .iter()
            .copied()
            .min_by_key(|name| name.chars().count())
            .unwrap_or_else(|| self.primary_name())
    }

    pub fn base_triad(&self) -> Triad {
        self.triad.base()
    }
}

/// Every chord type the engine can name, grouped by triad.
pub static ARCHETYPES: &[ChordArchetype] = &[
    ChordArchetype::new(&["aug", "+"], TriadName::Augmented, &[]),
    ChordArchetype::new(&["aug7", "+7"], TriadName::Augmented, &[10]),
    ChordArchetype::new(&["augmaj7", "+maj7"], TriadName::Augmented, &[11]),
    // Major
    ChordArchetype::new(&["maj", "major", ""], TriadName::Major, &[]),
    ChordArchetype::new(&["6"], TriadName::Major, &[9]),
    ChordArchetype::new(&["6add9", "69"], TriadName::Major, &[9, 14]),
    ChordArchetype::new(&["7", "majm7"], TriadName::Major, &[10]),
    ChordArchetype::new(&["7#9"], TriadName::Major, &[10, 15]),
    ChordArchetype::new(&["maj7", "M7"], TriadName::Major, &[11]),
    ChordArchetype::new(&["maj7#11", "#11"], TriadName::Major, &[11, 18]),
    ChordArchetype::new(&["maj9", "M9"], TriadName::Major, &[11, 14]),
    ChordArchetype::new(&["9"], TriadName::Major, &[10, 14]),
    ChordArchetype::new(&["add9"], TriadName::Major, &[14]),
    ChordArchetype::new(&["11"], TriadName::Major, &[10, 14, 17]),
    ChordArchetype::new(&["add11"], TriadName::Major, &[17]),
    ChordArchetype::new(&["maj11"], TriadName::Major, &[11, 14, 17]),
    ChordArchetype::new(&["maj13"], TriadName::Major, &[11, 14, 21]),
    // Major third over a flat fifth
    ChordArchetype::new(&["7b5"], TriadName::FlatFive, &[10]),
    ChordArchetype::new(&["maj7b5", "M7b5"], TriadName::FlatFive, &[11]),
    // Minor
    ChordArchetype::new(&["m", "min", "minor"], TriadName::Minor, &[]),
    ChordArchetype::new(&["m6", "mmaj6"], TriadName::Minor, &[9]),
    ChordArchetype::new(&["m6/9", "m69"], TriadName::Minor, &[9, 14]),
    ChordArchetype::new(&["m7", "min7"], TriadName::Minor, &[10]),
    ChordArchetype::new(&["mmaj7", "m(maj7)"], TriadName::Minor, &[11]),
    ChordArchetype::new(&["m9", "min9"], TriadName::Minor, &[10, 14]),
    ChordArchetype::new(&["m11"], TriadName::Minor, &[10, 14, 17]),
    // Diminished
    ChordArchetype::new(&["dim", "°", "m♭5"], TriadName::Diminished, &[]),
    ChordArchetype::new(&["dim7", "°7"], TriadName::Diminished, &[9]),
    ChordArchetype::new(&["m7b5", "ø7"], TriadName::Diminished, &[10]),
    ChordArchetype::new(&["dimM7", "°M7"], TriadName::Diminished, &[11]),
    // Power chord
    ChordArchetype::new(&["5"], TriadName::Power, &[]),
    // Suspended
    ChordArchetype::new(&["sus2"], TriadName::Sus2, &[]),
    ChordArchetype::new(&["7sus2"], TriadName::Sus2, &[10]),
    ChordArchetype::new(&["sus4", "sus"], TriadName::Sus4, &[]),
    ChordArchetype::new(&["7sus4"], TriadName::Sus4, &[10]),
    ChordArchetype::new(&["9sus4"], TriadName::Sus4, &[10, 14]),
];

pub(crate) struct ChordLibrary {
    by_name: HashMap<&'static str, &'static ChordArchetype>,
    by_triad: HashMap<TriadName, Vec<&'static ChordArchetype>>,
}

impl ChordLibrary {
    /// Indexes `archetypes`. Panics on a synonym claimed twice, since the
    /// table is static and a collision is a build-time mistake.
    pub(crate) fn build(archetypes: &'static [ChordArchetype]) -> Self {
        let mut by_name = HashMap::new();
        let mut by_triad: HashMap<TriadName, Vec<&'static ChordArchetype>> = HashMap::new();

        for archetype in archetypes {
            for name in archetype.names {
                if by_name.insert(*name, archetype).is_some() {
                    panic!("duplicate chord type name: {:?}", name);
                }
            }
            by_triad.entry(archetype.triad).or_default().push(archetype);
        }

        Self { by_name, by_triad }
    }
}

fn library() -> &'static ChordLibrary {
    static LIBRARY: OnceLock<ChordLibrary> = OnceLock::new();
    LIBRARY.get_or_init(|| ChordLibrary::build(ARCHETYPES))
}

/// Resolves a chord suffix such as `maj7` or `m7b5`.
pub fn lookup_archetype(suffix: &str) -> Result<&'static ChordArchetype> {
    library()
        .by_name
        .get(suffix.trim())
        .copied()
        .ok_or_else(|| Error::ChordNotFound(format!("unknown chord suffix: {:?}", suffix)))
}

/// Archetypes built on `triad`, in library order.
pub fn archetypes_for_triad(triad: TriadName) -> &'static [&'static ChordArchetype] {
    library()
        .by_triad
        .get(&triad)
        .map(Vec::as_slice)
        .unwrap_or_default()
}
