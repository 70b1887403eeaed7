//! Chord detection from a set of sounding notes.

use tracing::{debug, trace};

use crate::chord::Chord;
use crate::chord_library::archetypes_for_triad;
use crate::note::{Note, OCTAVE_SIZE};
use crate::triads::{cumulative, root_index, TriadName};
use crate::Result;

/// Higher is better. Accidentals near the root cost more than high ones.
pub fn score_chord(chord: &Chord) -> i32 {
    -chord.accidentals.iter().map(|offset| 100 - offset).sum::<i32>()
}

/// Figure out which chords a set of notes might be, best first.
///
/// Every note needs an octave. Fewer than two distinct notes, or notes
/// that fit no triad, give an empty list.
pub fn detect_chords(notes: &[Note]) -> Result<Vec<Chord>> {
    let mut midi = notes.iter().map(Note::to_midi).collect::<Result<Vec<u8>>>()?;
    midi.sort_unstable();
    midi.dedup();

    let mut candidates = Vec::new();

    // The lowest note is either part of the chord body or a detached bass.
    if let Some((&lowest, upper)) = midi.split_first() {
        candidates.extend(candidates_for(&midi, None));
        // A detached bass on the root's pitch class repeats the plain chord.
        for chord in candidates_for(upper, Some(lowest)) {
            if !candidates.contains(&chord) {
                candidates.push(chord);
            }
        }
    }

    // Stable, so ties keep enumeration order.
    candidates.sort_by_key(|chord| std::cmp::Reverse(score_chord(chord)));

    debug!(
        notes = midi.len(),
        candidates = candidates.len(),
        top = candidates.first().map(|c| c.to_string()),
        "detected chords"
    );
    Ok(candidates)
}

/// The best match, if any.
pub fn detect_chord(notes: &[Note]) -> Result<Option<Chord>> {
    Ok(detect_chords(notes)?.into_iter().next())
}

fn candidates_for(body: &[u8], bass: Option<u8>) -> Vec<Chord> {
    let mut results = Vec::new();

    // Need at least two notes to form a relationship.
    if body.len() < 2 {
        return results;
    }

    let seed = triad_seed(body);
    let core: Vec<u8> = seed[1..].iter().map(|pc| interval(seed[0], *pc)).collect();

    let max_inversions = TriadName::ALL
        .iter()
        .map(|name| name.inversions().len())
        .max()
        .unwrap_or_default();

    for inversion in 0..max_inversions {
        for name in TriadName::ALL {
            let Some(triad) = name.inversions().get(inversion) else {
                continue;
            };
            if cumulative(triad) != core {
                continue;
            }

            let root_pc = seed[root_index(inversion, triad.len())];
            let Some(&root_midi) = body.iter().find(|m| *m % OCTAVE_SIZE == root_pc) else {
                continue;
            };

            // Intervals the triad does not account for.
            let extra: Vec<i32> = body
                .iter()
                .filter(|m| !seed.contains(&(*m % OCTAVE_SIZE)))
                .map(|m| *m as i32 - root_midi as i32)
                .collect();

            for archetype in archetypes_for_triad(name) {
                let extensions = archetype.extensions;
                if !extensions.iter().all(|e| extra.contains(&(*e as i32))) {
                    continue;
                }
                let accidentals: Vec<i32> = extra
                    .iter()
                    .copied()
                    .filter(|x| !extensions.iter().any(|e| *e as i32 == *x))
                    .collect();

                let chord = Chord::new(
                    archetype,
                    Note::from_pitch_class(root_pc),
                    bass.map(Note::from_midi),
                    accidentals,
                );
                trace!(%chord, inversion, score = score_chord(&chord), "candidate");
                results.push(chord);
            }
        }
    }

    results
}

/// Pitch classes of the first three distinct notes, ordered upward from
/// the lowest sounding one.
fn triad_seed(body: &[u8]) -> Vec<u8> {
    let mut seed: Vec<u8> = Vec::with_capacity(3);
    for m in body {
        let pc = m % OCTAVE_SIZE;
        if !seed.contains(&pc) {
            seed.push(pc);
            if seed.len() == 3 {
                break;
            }
        }
    }
    let lowest = seed[0];
    seed.sort_by_key(|pc| interval(lowest, *pc));
    seed
}

fn interval(from: u8, to: u8) -> u8 {
    (to + OCTAVE_SIZE - from) % OCTAVE_SIZE
}
