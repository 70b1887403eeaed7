use chordconf::{ChordwiseConfig, KeyConfig, PerformanceConfig};

use crate::chord::Chord;
use crate::detect::detect_chords;
use crate::key::{detect_key_with, LikelyKey};
use crate::note::Note;
use crate::performance::{evaluate, Evaluation};
use crate::types::NoteHistogramBuckets;
use crate::Result;

/// Trait for harmony inference backends.
///
/// `HeuristicAnalyzer` is the template-matching implementation. The
/// [`Listener`](crate::Listener) only talks to this trait, so a learned
/// model can slot in later.
pub trait HarmonyAnalyzer: Send + Sync {
    fn detect_chords(&self, notes: &[Note]) -> Result<Vec<Chord>>;

    fn detect_key(&self, histogram: &NoteHistogramBuckets) -> Vec<LikelyKey>;

    fn evaluate(&self, played: &[Note], target: &Chord) -> Result<Evaluation>;
}

/// Triad-template chord matching, weighted scale-degree key scoring and
/// note-matching performance grading.
#[derive(Debug, Clone, Default)]
pub struct HeuristicAnalyzer {
    pub key: KeyConfig,
    pub performance: PerformanceConfig,
}

impl HeuristicAnalyzer {
    pub fn from_config(config: &ChordwiseConfig) -> Self {
        Self {
            key: config.key.clone(),
            performance: config.performance.clone(),
        }
    }
}

impl HarmonyAnalyzer for HeuristicAnalyzer {
    fn detect_chords(&self, notes: &[Note]) -> Result<Vec<Chord>> {
        detect_chords(notes)
    }

    fn detect_key(&self, histogram: &NoteHistogramBuckets) -> Vec<LikelyKey> {
        detect_key_with(histogram, &self.key)
    }

    fn evaluate(&self, played: &[Note], target: &Chord) -> Result<Evaluation> {
        evaluate(played, target, &self.performance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::parse_notes;

    #[test]
    fn heuristic_uses_its_config() {
        let strict = HeuristicAnalyzer {
            performance: PerformanceConfig {
                allow_additional_extensions: false,
                ..PerformanceConfig::default()
            },
            ..HeuristicAnalyzer::default()
        };
        let played = parse_notes(&["C4", "E4", "G4", "D5"]).unwrap();
        let target = Chord::lookup("C maj").unwrap();

        assert!(HeuristicAnalyzer::default().evaluate(&played, &target).unwrap().correct);
        assert!(!strict.evaluate(&played, &target).unwrap().correct);
    }

    #[test]
    fn usable_as_trait_object() {
        let analyzer: Box<dyn HarmonyAnalyzer> = Box::new(HeuristicAnalyzer::default());
        let chords = analyzer
            .detect_chords(&parse_notes(&["A3", "C4", "E4"]).unwrap())
            .unwrap();
        assert_eq!(chords[0].to_string(), "A m");

        let mut histogram = [0.0; 12];
        histogram[9] = 3.0;
        histogram[0] = 2.0;
        histogram[4] = 2.0;
        assert!(!analyzer.detect_key(&histogram).is_empty());
    }
}
