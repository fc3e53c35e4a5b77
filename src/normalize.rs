//! normalize.rs — Raw analyzer outputs → per-source sub-scores in [0,1].
//!
//! Three upstream analyzers speak three different dialects: acoustic features
//! are raw physical measurements (syllables/sec, energy, ratios), language
//! model scores are per-field probabilities with mixed polarity, and the
//! specialized models report per-condition probabilities (higher = sicker).
//! This module translates all of them into the one convention the rest of the
//! pipeline assumes: higher = healthier, clamped to [0,1].
//!
//! A rule returns `None` when the analyzer gave it nothing to work with; a
//! partially filled feature map is scored using only the fields present.

use std::collections::{BTreeMap, HashMap};

use crate::indicator::{ComponentSet, IndicatorKey};

// Raw acoustic feature keys produced by the audio front-end.
pub const SPEECH_RATE: &str = "speech_rate";
pub const ENERGY_MEAN: &str = "energy_mean";
pub const ENERGY_STD: &str = "energy_std";
pub const PAUSE_RATIO: &str = "pause_ratio";
pub const PITCH_STD: &str = "pitch_std";
pub const VOICE_ACTIVITY_RATIO: &str = "voice_activity_ratio";

/// Key carrying device-reported vitality inside `health_data`.
pub const VITALITY_SCORE: &str = "vitality_score";

/// Build the full per-indicator component sets for one analysis call.
pub fn normalize_components(
    acoustic: Option<&HashMap<String, f32>>,
    language_model: Option<&HashMap<String, f32>>,
    specialized: Option<&HashMap<String, f32>>,
) -> BTreeMap<IndicatorKey, ComponentSet> {
    IndicatorKey::ALL
        .iter()
        .map(|&key| {
            let a = acoustic.and_then(|f| acoustic_score(key, f));
            let l = language_model.and_then(|s| language_model_score(key, s));
            let m = specialized.and_then(|s| specialized_score(key, s));
            (key, ComponentSet::new(a, l, m))
        })
        .collect()
}

/// Acoustic sub-score for one indicator, `None` when no relevant raw feature
/// is present.
pub fn acoustic_score(key: IndicatorKey, features: &HashMap<String, f32>) -> Option<f32> {
    match key {
        IndicatorKey::Dri => acoustic_dri(features),
        IndicatorKey::Sdi => acoustic_sdi(features),
        IndicatorKey::Cfl => acoustic_cfl(features),
        IndicatorKey::Es => acoustic_es(features),
        IndicatorKey::Ov => acoustic_ov(features),
    }
}

/// Raw field lookup. A non-finite reading is a corrupt extraction, not a
/// measurement, and is treated exactly like a missing field.
fn finite(map: &HashMap<String, f32>, key: &str) -> Option<f32> {
    map.get(key).copied().filter(|v| v.is_finite())
}

/// Depression risk from voice: slow speech, low energy and long pauses each
/// add a penalty tier; the deeper tier replaces the shallower one.
fn acoustic_dri(features: &HashMap<String, f32>) -> Option<f32> {
    let mut penalty = 0.0f32;
    let mut seen = false;

    if let Some(rate) = finite(features, SPEECH_RATE) {
        seen = true;
        if rate < 2.0 {
            penalty += 0.30;
        } else if rate < 2.5 {
            penalty += 0.15;
        }
    }
    if let Some(energy) = finite(features, ENERGY_MEAN) {
        seen = true;
        if energy < 0.02 {
            penalty += 0.30;
        } else if energy < 0.05 {
            penalty += 0.15;
        }
    }
    if let Some(pause) = finite(features, PAUSE_RATIO) {
        seen = true;
        if pause > 0.45 {
            penalty += 0.30;
        } else if pause > 0.30 {
            penalty += 0.15;
        }
    }

    seen.then(|| clamp01(1.0 - clamp01(penalty)))
}

/// Sleep disorder from voice: fatigue shows up as flat, low-energy, slow
/// speech the morning after bad nights.
fn acoustic_sdi(features: &HashMap<String, f32>) -> Option<f32> {
    let mut penalty = 0.0f32;
    let mut seen = false;

    if let Some(energy) = finite(features, ENERGY_MEAN) {
        seen = true;
        if energy < 0.02 {
            penalty += 0.35;
        } else if energy < 0.05 {
            penalty += 0.20;
        }
    }
    if let Some(spread) = finite(features, ENERGY_STD) {
        seen = true;
        if spread < 0.01 {
            penalty += 0.20;
        }
    }
    if let Some(rate) = finite(features, SPEECH_RATE) {
        seen = true;
        if rate < 1.5 {
            penalty += 0.25;
        }
    }

    seen.then(|| clamp01(1.0 - clamp01(penalty)))
}

/// Cognitive function from voice: fluent pacing inside the normal band and
/// short pauses both reward; scores move symmetrically around 0.5.
fn acoustic_cfl(features: &HashMap<String, f32>) -> Option<f32> {
    let mut score = 0.5f32;
    let mut seen = false;

    if let Some(rate) = finite(features, SPEECH_RATE) {
        seen = true;
        if (2.0..=5.0).contains(&rate) {
            score += 0.25;
        } else {
            score -= 0.15;
        }
    }
    if let Some(pause) = finite(features, PAUSE_RATIO) {
        seen = true;
        if pause < 0.20 {
            score += 0.25;
        } else if pause > 0.40 {
            score -= 0.20;
        }
    }

    seen.then(|| clamp01(score))
}

/// Emotional stability from voice: high pitch and energy variability read as
/// agitation.
fn acoustic_es(features: &HashMap<String, f32>) -> Option<f32> {
    let mut score = 1.0f32;
    let mut seen = false;

    if let Some(pitch) = finite(features, PITCH_STD) {
        seen = true;
        if pitch > 80.0 {
            score -= 0.45;
        } else if pitch > 40.0 {
            score -= 0.25;
        }
    }
    if let Some(spread) = finite(features, ENERGY_STD) {
        seen = true;
        if spread > 0.10 {
            score -= 0.35;
        } else if spread > 0.05 {
            score -= 0.20;
        }
    }

    seen.then(|| clamp01(score))
}

/// Overall vitality from voice: a weighted blend of energy, pace and voice
/// activity. Sub-weights renormalize over the raw fields actually present so
/// a partial feature map still yields a fair [0,1] score.
fn acoustic_ov(features: &HashMap<String, f32>) -> Option<f32> {
    let mut weighted = 0.0f32;
    let mut weight_sum = 0.0f32;

    if let Some(energy) = finite(features, ENERGY_MEAN) {
        weighted += 0.4 * clamp01(energy / 0.08);
        weight_sum += 0.4;
    }
    if let Some(rate) = finite(features, SPEECH_RATE) {
        weighted += 0.3 * clamp01(rate / 2.0);
        weight_sum += 0.3;
    }
    if let Some(activity) = finite(features, VOICE_ACTIVITY_RATIO) {
        weighted += 0.3 * clamp01(activity);
        weight_sum += 0.3;
    }

    (weight_sum > 0.0).then(|| clamp01(weighted / weight_sum))
}

/// Language-model field for one indicator, with polarity corrected so higher
/// always means healthier. Risk-style fields are inverted, function-style
/// fields pass through.
pub fn language_model_score(key: IndicatorKey, scores: &HashMap<String, f32>) -> Option<f32> {
    match key {
        IndicatorKey::Dri => finite(scores, "depression_risk").map(|v| 1.0 - clamp01(v)),
        IndicatorKey::Sdi => finite(scores, "sleep_disorder").map(|v| 1.0 - clamp01(v)),
        IndicatorKey::Cfl => finite(scores, "cognitive_function").map(clamp01),
        IndicatorKey::Es => finite(scores, "emotional_stability").map(clamp01),
        IndicatorKey::Ov => finite(scores, "vitality").map(clamp01),
    }
}

/// Specialized-model condition probabilities (higher = sicker) mapped onto
/// indicators. ES reuses the depression probability on the rationale that
/// emotional instability tracks depressive signal; OV averages whatever
/// conditions are present. CFL has no specialized model at all.
pub fn specialized_score(key: IndicatorKey, scores: &HashMap<String, f32>) -> Option<f32> {
    match key {
        IndicatorKey::Dri => finite(scores, "depression").map(|p| 1.0 - clamp01(p)),
        IndicatorKey::Sdi => finite(scores, "insomnia").map(|p| 1.0 - clamp01(p)),
        IndicatorKey::Cfl => None,
        IndicatorKey::Es => finite(scores, "depression").map(|p| 1.0 - clamp01(p)),
        IndicatorKey::Ov => {
            let present: Vec<f32> = ["depression", "insomnia"]
                .iter()
                .filter_map(|c| finite(scores, c).map(clamp01))
                .collect();
            if present.is_empty() {
                None
            } else {
                let mean = present.iter().sum::<f32>() / present.len() as f32;
                Some(1.0 - mean)
            }
        }
    }
}

/// Device-reported vitality from `health_data`, if any.
pub fn health_vitality(health_data: Option<&HashMap<String, f32>>) -> Option<f32> {
    health_data
        .and_then(|d| finite(d, VITALITY_SCORE))
        .map(clamp01)
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

    fn feats(pairs: &[(&str, f32)]) -> HashMap<String, f32> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn dri_applies_all_three_deep_penalties() {
        // Very slow, very quiet, long pauses: 1.0 - (0.30 + 0.30 + 0.30).
        let f = feats(&[
            (SPEECH_RATE, 1.8),
            (ENERGY_MEAN, 0.01),
            (PAUSE_RATIO, 0.55),
        ]);
        let v = acoustic_score(IndicatorKey::Dri, &f).unwrap();
        assert!((v - 0.10).abs() < 1e-6, "got {v}");
    }

    #[test]
    fn dri_shallow_tier_applies_between_cutoffs() {
        let f = feats(&[(SPEECH_RATE, 2.2)]);
        let v = acoustic_score(IndicatorKey::Dri, &f).unwrap();
        assert!((v - 0.85).abs() < 1e-6);
    }

    #[test]
    fn dri_healthy_features_score_full() {
        let f = feats(&[
            (SPEECH_RATE, 3.5),
            (ENERGY_MEAN, 0.07),
            (PAUSE_RATIO, 0.15),
        ]);
        assert_eq!(acoustic_score(IndicatorKey::Dri, &f), Some(1.0));
    }

    #[test]
    fn absent_fields_do_not_penalize() {
        // Only pause_ratio present; speech/energy penalties must not fire.
        let f = feats(&[(PAUSE_RATIO, 0.55)]);
        let v = acoustic_score(IndicatorKey::Dri, &f).unwrap();
        assert!((v - 0.70).abs() < 1e-6);
    }

    #[test]
    fn no_relevant_fields_means_no_score() {
        let f = feats(&[(PITCH_STD, 30.0)]);
        assert_eq!(acoustic_score(IndicatorKey::Dri, &f), None);
        assert_eq!(acoustic_score(IndicatorKey::Dri, &HashMap::new()), None);
    }

    #[test]
    fn non_finite_fields_are_skipped_like_missing_ones() {
        // A lone corrupt reading produces no score at all.
        let f = feats(&[(ENERGY_MEAN, f32::NAN)]);
        assert_eq!(acoustic_score(IndicatorKey::Dri, &f), None);
        assert_eq!(acoustic_score(IndicatorKey::Ov, &f), None);

        // Next to finite fields it neither penalizes nor rescues.
        let f = feats(&[(SPEECH_RATE, 3.0), (ENERGY_MEAN, f32::INFINITY)]);
        assert_eq!(acoustic_score(IndicatorKey::Dri, &f), Some(1.0));

        let lm = feats(&[("vitality", f32::NAN)]);
        assert_eq!(language_model_score(IndicatorKey::Ov, &lm), None);

        let sp = feats(&[("depression", f32::NAN), ("insomnia", 0.2)]);
        let v = specialized_score(IndicatorKey::Ov, &sp).unwrap();
        assert!((v - 0.8).abs() < 1e-6);

        let h = feats(&[(VITALITY_SCORE, f32::NEG_INFINITY)]);
        assert_eq!(health_vitality(Some(&h)), None);
    }

    #[test]
    fn sdi_penalizes_flat_quiet_slow_speech() {
        let f = feats(&[
            (ENERGY_MEAN, 0.015),
            (ENERGY_STD, 0.005),
            (SPEECH_RATE, 1.2),
        ]);
        // 1.0 - (0.35 + 0.20 + 0.25) = 0.20
        let v = acoustic_score(IndicatorKey::Sdi, &f).unwrap();
        assert!((v - 0.20).abs() < 1e-6);
    }

    #[test]
    fn cfl_rewards_normal_band_and_short_pauses() {
        let good = feats(&[(SPEECH_RATE, 3.0), (PAUSE_RATIO, 0.10)]);
        assert_eq!(acoustic_score(IndicatorKey::Cfl, &good), Some(1.0));

        let slow = feats(&[(SPEECH_RATE, 1.0), (PAUSE_RATIO, 0.55)]);
        let v = acoustic_score(IndicatorKey::Cfl, &slow).unwrap();
        assert!((v - 0.15).abs() < 1e-6);

        // Mid-band pause ratio is neutral.
        let neutral = feats(&[(PAUSE_RATIO, 0.30)]);
        assert_eq!(acoustic_score(IndicatorKey::Cfl, &neutral), Some(0.5));
    }

    #[test]
    fn es_tiers_on_pitch_and_energy_variability() {
        let agitated = feats(&[(PITCH_STD, 95.0), (ENERGY_STD, 0.12)]);
        let v = acoustic_score(IndicatorKey::Es, &agitated).unwrap();
        assert!((v - 0.20).abs() < 1e-6);

        let calm = feats(&[(PITCH_STD, 20.0), (ENERGY_STD, 0.02)]);
        assert_eq!(acoustic_score(IndicatorKey::Es, &calm), Some(1.0));
    }

    #[test]
    fn ov_renormalizes_over_present_fields() {
        // Only voice activity present: its sub-weight carries everything.
        let f = feats(&[(VOICE_ACTIVITY_RATIO, 0.8)]);
        let v = acoustic_score(IndicatorKey::Ov, &f).unwrap();
        assert!((v - 0.8).abs() < 1e-6);

        // Full set at saturation levels.
        let full = feats(&[
            (ENERGY_MEAN, 0.08),
            (SPEECH_RATE, 2.0),
            (VOICE_ACTIVITY_RATIO, 1.0),
        ]);
        assert_eq!(acoustic_score(IndicatorKey::Ov, &full), Some(1.0));
    }

    #[test]
    fn language_model_polarity_is_corrected() {
        let scores = feats(&[
            ("depression_risk", 0.9),
            ("cognitive_function", 0.7),
            ("vitality", 1.4),
        ]);
        let dri = language_model_score(IndicatorKey::Dri, &scores).unwrap();
        assert!((dri - 0.1).abs() < 1e-6);
        assert_eq!(language_model_score(IndicatorKey::Cfl, &scores), Some(0.7));
        // Out-of-range inputs are clamped before use.
        assert_eq!(language_model_score(IndicatorKey::Ov, &scores), Some(1.0));
        assert_eq!(language_model_score(IndicatorKey::Es, &scores), None);
    }

    #[test]
    fn specialized_ov_averages_present_conditions() {
        let both = feats(&[("depression", 0.6), ("insomnia", 0.2)]);
        let v = specialized_score(IndicatorKey::Ov, &both).unwrap();
        assert!((v - 0.6).abs() < 1e-6); // 1 - mean(0.6, 0.2)

        let one = feats(&[("depression", 0.6)]);
        let v = specialized_score(IndicatorKey::Ov, &one).unwrap();
        assert!((v - 0.4).abs() < 1e-6);
    }

    #[test]
    fn specialized_cfl_is_structurally_absent() {
        let scores = feats(&[("depression", 0.9), ("insomnia", 0.9)]);
        assert_eq!(specialized_score(IndicatorKey::Cfl, &scores), None);
    }

    #[test]
    fn es_reuses_inverted_depression_probability() {
        let scores = feats(&[("depression", 0.25)]);
        let v = specialized_score(IndicatorKey::Es, &scores).unwrap();
        assert!((v - 0.75).abs() < 1e-6);
    }

    #[test]
    fn health_vitality_reads_and_clamps() {
        assert_eq!(health_vitality(None), None);
        let d = feats(&[(VITALITY_SCORE, 1.3)]);
        assert_eq!(health_vitality(Some(&d)), Some(1.0));
        let empty = HashMap::new();
        assert_eq!(health_vitality(Some(&empty)), None);
    }

    #[test]
    fn normalize_components_covers_all_indicators() {
        let acoustic = feats(&[(SPEECH_RATE, 3.0), (ENERGY_MEAN, 0.06)]);
        let lm = feats(&[("depression_risk", 0.2)]);
        let map = normalize_components(Some(&acoustic), Some(&lm), None);

        assert_eq!(map.len(), 5);
        assert!(map[&IndicatorKey::Dri].acoustic.present());
        assert!(map[&IndicatorKey::Dri].language_model.present());
        assert!(!map[&IndicatorKey::Dri].specialized_model.present());
        // ES has no acoustic fields in this map and no LM field either.
        assert_eq!(map[&IndicatorKey::Es].present_count(), 0);
    }
}
