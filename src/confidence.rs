//! confidence.rs — How much to trust a fused value.
//!
//! Confidence is source coverage discounted by data provenance: the fraction
//! of structurally applicable sources that actually reported, times a
//! multiplier for how trustworthy the current model generation's training
//! data is. It is computed independently of fusion success: an indicator
//! with nothing to fuse gets confidence 0.0, never an error.

use crate::indicator::{ComponentSet, Provenance, Source};
use crate::phase::SourceWeights;

/// Trust discount per provenance tier.
pub fn provenance_multiplier(provenance: Provenance) -> f32 {
    match provenance {
        Provenance::ClinicalValidated => 1.0,
        Provenance::ExpertLabeled => 0.9,
        Provenance::ExpertValidated => 0.8,
        Provenance::AiGenerated => 0.6,
        Provenance::Synthetic => 0.4,
    }
}

/// Estimate confidence for one indicator under the active phase weights.
///
/// A source counts toward coverage only when it is present *and* the phase
/// actually listens to it; sources the phase ignores can neither help nor
/// hurt. Zero applicable sources yields 0.0 outright.
pub fn estimate(
    weights: &SourceWeights,
    components: &ComponentSet,
    provenance: Provenance,
) -> f32 {
    let applicable = weights.applicable_count();
    if applicable == 0 {
        return 0.0;
    }
    let covered = Source::ALL
        .iter()
        .filter(|&&s| weights.get(s) > 0.0 && components.get(s).present())
        .count();
    let base = covered as f32 / applicable as f32;
    clamp01(base * provenance_multiplier(provenance))
}

fn clamp01(x: f32) -> f32 {
    if x < 0.0 {
        0.0
    } else if x > 1.0 {
        1.0
    } else {
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights(a: f32, l: f32, s: f32) -> SourceWeights {
        SourceWeights {
            acoustic: a,
            language_model: l,
            specialized_model: s,
        }
    }

    #[test]
    fn full_coverage_clinical_data_is_fully_trusted() {
        let w = weights(0.2, 0.3, 0.5);
        let c = ComponentSet::new(Some(0.5), Some(0.5), Some(0.5));
        assert_eq!(estimate(&w, &c, Provenance::ClinicalValidated), 1.0);
    }

    #[test]
    fn one_of_two_applicable_sources_halves_the_base() {
        // Two-source phase, only acoustic reported.
        let w = weights(0.4, 0.6, 0.0);
        let c = ComponentSet::new(Some(0.10), None, None);
        let got = estimate(&w, &c, Provenance::AiGenerated);
        assert!((got - 0.5 * 0.6).abs() < 1e-6);
    }

    #[test]
    fn ignored_source_cannot_raise_coverage() {
        // Specialized model reported, but this phase gives it zero weight.
        let w = weights(0.4, 0.6, 0.0);
        let c = ComponentSet::new(Some(0.5), None, Some(0.9));
        let with_ignored = estimate(&w, &c, Provenance::ClinicalValidated);
        let without = estimate(&w, &ComponentSet::new(Some(0.5), None, None), Provenance::ClinicalValidated);
        assert_eq!(with_ignored, without);
        assert!((with_ignored - 0.5).abs() < 1e-6);
    }

    #[test]
    fn nothing_present_is_zero_confidence_not_an_error() {
        let w = weights(0.4, 0.6, 0.0);
        assert_eq!(estimate(&w, &ComponentSet::empty(), Provenance::ClinicalValidated), 0.0);
    }

    #[test]
    fn zero_applicable_sources_is_zero_confidence() {
        let w = weights(0.0, 0.0, 0.0);
        let c = ComponentSet::new(Some(0.5), Some(0.5), Some(0.5));
        assert_eq!(estimate(&w, &c, Provenance::ClinicalValidated), 0.0);
    }

    #[test]
    fn provenance_tiers_are_strictly_ordered() {
        let tiers = [
            Provenance::ClinicalValidated,
            Provenance::ExpertLabeled,
            Provenance::ExpertValidated,
            Provenance::AiGenerated,
            Provenance::Synthetic,
        ];
        for pair in tiers.windows(2) {
            assert!(provenance_multiplier(pair[0]) > provenance_multiplier(pair[1]));
        }
    }
}
