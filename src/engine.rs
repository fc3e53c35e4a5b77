//! # Indicator Engine
//! Pure, testable pipeline that maps one call's analyzer outputs →
//! `AnalysisResult`. No I/O beyond optional config loading at construction;
//! suitable for unit tests and offline evaluation.
//!
//! Policy: an unknown phase fails the whole call; everything else degrades.
//! An indicator with no usable source stays in the result as `unknown`, and
//! cross-indicator inconsistencies are damped and reported, never fatal.

use std::collections::BTreeMap;

use chrono::Utc;

use crate::confidence;
use crate::consistency;
use crate::error::IndicatorError;
use crate::fusion;
use crate::indicator::{
    AnalysisInput, AnalysisResult, FusedIndicator, IndicatorKey, RiskLevel,
};
use crate::normalize;
use crate::phase::PhaseWeightTable;
use crate::risk::{self, Classified, RiskThresholds};
use crate::telemetry;
use crate::trend;

/// Fusion pipeline with its two config tables resolved at construction.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    weights: PhaseWeightTable,
    thresholds: RiskThresholds,
}

impl IndicatorEngine {
    /// Engine on the built-in seed tables.
    pub fn new() -> Self {
        Self {
            weights: PhaseWeightTable::default_seed(),
            thresholds: RiskThresholds::default(),
        }
    }

    /// Engine honoring `CARECALL_WEIGHTS_PATH` / `CARECALL_THRESHOLDS_PATH`.
    pub fn from_env() -> Self {
        Self {
            weights: PhaseWeightTable::from_env_or_default(),
            thresholds: RiskThresholds::from_env_or_default(),
        }
    }

    pub fn with_tables(weights: PhaseWeightTable, thresholds: RiskThresholds) -> Self {
        Self {
            weights,
            thresholds,
        }
    }

    /// Run the full pipeline over one input snapshot.
    pub fn analyze(&self, input: &AnalysisInput) -> Result<AnalysisResult, IndicatorError> {
        // 1) Resolve this phase's weight row for every indicator up front; an
        //    unresolvable phase is the only error that fails the whole call.
        let mut weight_rows = BTreeMap::new();
        for key in IndicatorKey::ALL {
            weight_rows.insert(key, self.weights.weights(input.phase, key)?);
        }

        // 2) Normalize raw analyzer outputs into per-source sub-scores.
        let components = normalize::normalize_components(
            input.acoustic.as_ref(),
            input.language_model.as_ref(),
            input.specialized_model.as_ref(),
        );
        let health = normalize::health_vitality(input.health_data.as_ref());

        // 3) Fuse per indicator. OV folds in device health on top of its
        //    fused value; an indicator with nothing to fuse is reported as
        //    unavailable rather than failing the call.
        let mut fused = BTreeMap::new();
        for key in IndicatorKey::ALL {
            match fusion::fuse(key, &weight_rows[&key], &components[&key]) {
                Ok(value) => {
                    let value = if key == IndicatorKey::Ov {
                        fusion::blend_health(value, health)
                    } else {
                        value
                    };
                    fused.insert(key, value);
                }
                Err(IndicatorError::InsufficientData { .. }) => {
                    tracing::debug!(
                        target: "engine",
                        indicator = %key,
                        "no usable source; reporting as unavailable"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        // 4) Cross-indicator plausibility pass; downstream steps see the
        //    adjusted values.
        let (adjusted, warnings) = consistency::adjust(&fused);

        // 5) Confidence and band classification per indicator. Confidence is
        //    coverage-based and independent of whether fusion succeeded.
        let mut indicators = BTreeMap::new();
        let mut classified_map: BTreeMap<IndicatorKey, Classified> = BTreeMap::new();
        for key in IndicatorKey::ALL {
            let conf = confidence::estimate(&weight_rows[&key], &components[&key], input.provenance);
            let value = adjusted.get(&key).copied();
            let classified = self.thresholds.classify(key, value);
            classified_map.insert(key, classified.clone());
            indicators.insert(
                key,
                FusedIndicator {
                    key,
                    value,
                    confidence: conf,
                    level: classified.level,
                    level_label: classified.label,
                    interpretation: classified.interpretation,
                    components: components[&key].value_map(),
                    trend: None,
                },
            );
        }

        // 6) Overall band + aggregate interpretation line.
        let (overall_risk, interpretation) = risk::overall_interpretation(&classified_map);

        // 7) Trend against the caller-provided previous snapshot.
        let points = trend::track(input.previous_snapshot.as_ref(), &adjusted);
        let levels: BTreeMap<IndicatorKey, RiskLevel> =
            indicators.iter().map(|(k, ind)| (*k, ind.level)).collect();
        let overall_trend = trend::aggregate(&points, &levels);
        for (key, point) in &points {
            if let Some(ind) = indicators.get_mut(key) {
                ind.trend = Some(*point);
            }
        }

        // 8) Assemble and record.
        let result = AnalysisResult {
            indicators,
            overall_risk,
            overall_trend,
            interpretation,
            timestamp: Utc::now().to_rfc3339(),
            warnings,
        };
        tracing::info!(
            target: "engine",
            phase = %input.phase,
            overall = %result.overall_risk,
            trend = %result.overall_trend,
            adjusted_pairs = result.warnings.len(),
            "analysis complete"
        );
        telemetry::record_analysis(&result);
        Ok(result)
    }
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot convenience over an engine on the seed tables.
pub fn compute_indicators(input: &AnalysisInput) -> Result<AnalysisResult, IndicatorError> {
    IndicatorEngine::new().analyze(input)
}
