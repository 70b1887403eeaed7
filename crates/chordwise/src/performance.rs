//! Grading a played voicing against a target chord.

use chordconf::PerformanceConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chord::Chord;
use crate::note::{note_below, Note, OCTAVE_SIZE};
use crate::{Error, Result};

/// Octaves searched when placing a missing note.
const GOAL_OCTAVES: std::ops::Range<i32> = 0..8;

/// How a set of played notes lines up with a target chord.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformedChord {
    /// The played root, or the lowest non-bass note when the root was missed.
    pub root: Note,
    /// A low note detached from the rest of the voicing.
    pub bass: Option<Note>,
    /// Parallel to the target's basic notes: what was played for each.
    pub basic_notes: Vec<Option<Note>>,
    /// Target notes nobody played, octaveless.
    pub missing: Vec<Note>,
    /// Played notes the target does not explain.
    pub accidentals: Vec<Note>,
}

/// Everything a caller shows after a chord attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub performed: PerformedChord,
    pub correct: bool,
    pub goal_notes: Vec<Note>,
}

/// Matches played notes to the target's root, triad and extensions.
///
/// Notes need octaves. They are sorted low to high before matching, and a
/// key struck twice counts once, so at least two distinct keys are needed.
pub fn interpret_performance(played: &[Note], target: &Chord) -> Result<PerformedChord> {
    let mut sorted: Vec<(u8, Note)> = played
        .iter()
        .map(|note| note.to_midi().map(|midi| (midi, *note)))
        .collect::<Result<_>>()?;
    sorted.sort_by_key(|(midi, _)| *midi);
    sorted.dedup_by_key(|(midi, _)| *midi);

    if sorted.len() < 2 {
        return Err(Error::InvalidInput(format!(
            "need at least two distinct notes to interpret a chord, got {}",
            sorted.len()
        )));
    }

    let targets = target.basic_notes(None, false);
    let triad_size = target.base_triad().len() + 1;

    let (first_midi, first) = sorted[0];
    let second_midi = sorted[1].0;
    let bass = if sorted.len() > targets.len()
        && (!targets
            .iter()
            .take(triad_size)
            .any(|t| t.same_pitch_class(&first))
            || second_midi - first_midi >= OCTAVE_SIZE)
    {
        Some(first)
    } else {
        None
    };

    let rest: Vec<Note> = sorted
        .iter()
        .skip(usize::from(bass.is_some()))
        .map(|(_, note)| *note)
        .collect();

    let mut claimed = vec![false; rest.len()];
    let mut basic_notes = Vec::with_capacity(targets.len());
    let mut missing = Vec::new();
    for wanted in &targets {
        let found = rest
            .iter()
            .enumerate()
            .position(|(i, note)| !claimed[i] && note.same_pitch_class(wanted));
        match found {
            Some(i) => {
                claimed[i] = true;
                basic_notes.push(Some(rest[i]));
            }
            None => {
                basic_notes.push(None);
                missing.push(*wanted);
            }
        }
    }

    let accidentals: Vec<Note> = rest
        .iter()
        .zip(&claimed)
        .filter(|(_, claimed)| !**claimed)
        .map(|(note, _)| *note)
        .collect();

    let root = basic_notes
        .first()
        .copied()
        .flatten()
        .or_else(|| rest.first().copied())
        .unwrap_or(first);

    Ok(PerformedChord {
        root,
        bass,
        basic_notes,
        missing,
        accidentals,
    })
}

/// Did the performance voice the target?
///
/// Root and bass must match, every basic note must be present, and no
/// unexplained notes may remain. Stray notes at least
/// `extension_threshold_semitones` above the root are forgiven when
/// `allow_additional_extensions` is set.
pub fn is_correct(performed: &PerformedChord, target: &Chord, config: &PerformanceConfig) -> bool {
    if !performed.root.same_pitch_class(&target.root) {
        return false;
    }
    if let Some(bass) = &performed.bass {
        let expected = target.bass.unwrap_or(target.root);
        if !bass.same_pitch_class(&expected) {
            return false;
        }
    }
    if performed.basic_notes.iter().any(Option::is_none) {
        return false;
    }

    let root_midi = performed.root.midi_value();
    let threshold = config.extension_threshold_semitones as i32;
    performed.accidentals.iter().all(|note| {
        config.allow_additional_extensions
            && matches!(
                (note.midi_value(), root_midi),
                (Some(midi), Some(root)) if midi >= root + threshold
            )
    })
}

/// The smallest correction of what was played that would voice the target.
///
/// Matched notes stay where they were. Each missing note goes to the octave
/// closest to the stray notes (or, if none, to the notes accepted so far).
/// A target bass sits in the octave below the root.
pub fn goal_notes(performed: &PerformedChord, target: &Chord) -> Result<Vec<Note>> {
    let targets = target.basic_notes(None, false);

    let mut accepted: Vec<(i32, Note)> = Vec::new();
    for (played, wanted) in performed.basic_notes.iter().zip(&targets) {
        if let Some(played) = played {
            if let Some(midi) = played.midi_value() {
                accepted.push((midi, *wanted));
            }
        }
    }

    let strays: Vec<i32> = performed
        .accidentals
        .iter()
        .filter_map(Note::midi_value)
        .collect();

    for wanted in &performed.missing {
        let reference: Vec<i32> = if strays.is_empty() {
            accepted.iter().map(|(midi, _)| *midi).collect()
        } else {
            strays.clone()
        };

        let mut best: Option<(i32, i32)> = None;
        for octave in GOAL_OCTAVES {
            let candidate = (octave + 1) * OCTAVE_SIZE as i32 + wanted.pitch_class() as i32;
            let cost: i32 = reference.iter().map(|m| (candidate - m).abs()).sum();
            if best.map_or(true, |(_, best_cost)| cost < best_cost) {
                best = Some((candidate, cost));
            }
        }
        if let Some((midi, _)) = best {
            accepted.push((midi, *wanted));
        }
    }

    if let Some(bass) = &target.bass {
        let root_midi = accepted
            .iter()
            .find(|(_, note)| note.same_pitch_class(&target.root))
            .map(|(midi, _)| *midi)
            .or_else(|| performed.root.midi_value())
            .ok_or_else(|| Error::InvalidInput("performed root has no octave".into()))?;
        let root = Note::from_midi(midi_u8(root_midi)?);
        let placed = note_below(bass, &root)?;
        let midi = placed
            .midi_value()
            .ok_or_else(|| Error::InvalidInput(format!("bass {} has no octave", placed)))?;
        accepted.push((midi, *bass));
    }

    accepted.sort_by_key(|(midi, _)| *midi);
    accepted
        .into_iter()
        .map(|(midi, spelling)| Ok(Note::from_midi(midi_u8(midi)?).respelled_as(&spelling)))
        .collect()
}

fn midi_u8(midi: i32) -> Result<u8> {
    u8::try_from(midi)
        .ok()
        .filter(|m| *m <= 127)
        .ok_or_else(|| Error::InvalidInput(format!("MIDI value {} out of range", midi)))
}

/// Interprets, grades and builds the corrected voicing in one go.
pub fn evaluate(played: &[Note], target: &Chord, config: &PerformanceConfig) -> Result<Evaluation> {
    let performed = interpret_performance(played, target)?;
    let correct = is_correct(&performed, target, config);
    let goal_notes = goal_notes(&performed, target)?;
    debug!(
        target = %target,
        correct,
        missing = performed.missing.len(),
        accidentals = performed.accidentals.len(),
        "evaluated performance"
    );
    Ok(Evaluation {
        performed,
        correct,
        goal_notes,
    })
}
