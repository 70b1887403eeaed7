//! Interval names.

const INTERVAL_NAMES: [&str; 24] = [
    "perfect unison",
    "minor second",
    "major second",
    "minor third",
    "major third",
    "perfect fourth",
    "tritone",
    "perfect fifth",
    "minor sixth",
    "major sixth",
    "minor seventh",
    "major seventh",
    "perfect octave",
    "minor ninth",
    "major ninth",
    "minor tenth",
    "major tenth",
    "perfect eleventh",
    "diminished twelfth",
    "perfect twelfth",
    "minor thirteenth",
    "major thirteenth",
    "minor fourteenth",
    "major fourteenth",
];

/// Names the distance between two notes. Direction is ignored; anything
/// past two octaves is folded and suffixed with the octaves removed.
pub fn name_interval(semitones: i32) -> String {
    let span = INTERVAL_NAMES.len() as u32;
    let distance = semitones.unsigned_abs();
    let double_octaves = distance / span;
    let name = INTERVAL_NAMES[(distance % span) as usize];

    if double_octaves == 0 {
        name.to_string()
    } else {
        format!("{} +{}oct", name, double_octaves * 2)
    }
}
