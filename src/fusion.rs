//! fusion.rs — Weighted fusion of per-source sub-scores.
//!
//! One indicator, up to three sub-scores, one phase-gated weight triple in,
//! a single fused value out. A source participates only when it is present
//! *and* carries nonzero weight in the active phase; the weights of whatever
//! participates are renormalized so partial coverage never deflates a score.

use crate::error::IndicatorError;
use crate::indicator::{ComponentSet, IndicatorKey, Source};
use crate::phase::SourceWeights;

/// Blend factors applied when device health data accompanies the call.
const HEALTH_BLEND_FUSED: f32 = 0.6;
const HEALTH_BLEND_DEVICE: f32 = 0.4;

/// Fuse the present sub-scores of one indicator under the given weights.
///
/// Zero participating sources is the one hard failure of the pipeline:
/// there is no signal to renormalize, and inventing a neutral value here
/// would let "we know nothing" impersonate "we measured something".
pub fn fuse(
    indicator: IndicatorKey,
    weights: &SourceWeights,
    components: &ComponentSet,
) -> Result<f32, IndicatorError> {
    let mut weighted = 0.0f32;
    let mut weight_sum = 0.0f32;
    let mut used = 0usize;

    for source in Source::ALL {
        let weight = weights.get(source);
        if weight <= 0.0 {
            continue;
        }
        if let Some(value) = components.get(source).value {
            weighted += weight * value;
            weight_sum += weight;
            used += 1;
        }
    }

    if used == 0 || weight_sum <= 0.0 {
        return Err(IndicatorError::InsufficientData { indicator });
    }

    if used < weights.applicable_count() {
        tracing::debug!(
            target: "fusion",
            indicator = %indicator,
            used,
            applicable = weights.applicable_count(),
            weight_sum,
            "renormalizing over present sources"
        );
    }

    Ok(clamp01(weighted / weight_sum))
}

/// Fold device-reported vitality into an already-fused OV value. Health data
/// modulates an existing score; it is not a fourth source and cannot rescue a
/// fusion that produced nothing.
pub fn blend_health(fused: f32, health_vitality: Option<f32>) -> f32 {
    match health_vitality {
        Some(h) => clamp01(HEALTH_BLEND_FUSED * fused + HEALTH_BLEND_DEVICE * clamp01(h)),
        None => clamp01(fused),
    }
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
