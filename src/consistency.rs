//! consistency.rs — Cross-indicator plausibility adjustment.
//!
//! Certain indicator pairs are expected to move together: severe depressive
//! signal with perfect vitality is physiologically implausible and usually
//! means one analyzer mis-fired. When a watched pair lands far apart *and*
//! on opposite sides of the midpoint, both values are pulled toward each
//! other by a fixed fraction of the gap. Adjustment is metadata-producing,
//! never an error, and passes repeat until no rule fires, so adjusting an
//! already-adjusted map is a no-op.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::indicator::IndicatorKey;

/// Largest pair gap tolerated before the rule fires.
pub const PAIR_GAP_TOLERANCE: f32 = 0.4;
/// Fraction of the gap each side moves per pass.
pub const DAMPING: f32 = 0.25;
/// Gap halves each pass, so a couple of passes settle any pair; the cap only
/// guards against pathological multi-pair interplay.
const MAX_PASSES: usize = 8;
/// Float residue at the exact-tolerance boundary must not re-fire a rule.
const TOLERANCE_EPS: f32 = 1e-6;

/// A positively correlated indicator pair watched for implausible spreads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsistencyRule {
    pub left: IndicatorKey,
    pub right: IndicatorKey,
}

/// Watched pairs, evaluated in order within each pass.
pub const RULES: [ConsistencyRule; 4] = [
    ConsistencyRule {
        left: IndicatorKey::Dri,
        right: IndicatorKey::Ov,
    },
    ConsistencyRule {
        left: IndicatorKey::Dri,
        right: IndicatorKey::Es,
    },
    ConsistencyRule {
        left: IndicatorKey::Cfl,
        right: IndicatorKey::Es,
    },
    ConsistencyRule {
        left: IndicatorKey::Sdi,
        right: IndicatorKey::Ov,
    },
];

/// Record of one adjusted pair: original gap, values before the first pass
/// that touched the pair and after the last one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyWarning {
    pub pair: (IndicatorKey, IndicatorKey),
    pub gap: f32,
    pub before: (f32, f32),
    pub after: (f32, f32),
}

fn violates(a: f32, b: f32) -> bool {
    let gap = (a - b).abs();
    let opposite = (a > 0.5 && b < 0.5) || (a < 0.5 && b > 0.5);
    gap > PAIR_GAP_TOLERANCE + TOLERANCE_EPS && opposite
}

/// Damp implausible pairs in the fused value map. Indicators absent from the
/// map are skipped; values already plausible come back untouched.
pub fn adjust(
    values: &BTreeMap<IndicatorKey, f32>,
) -> (BTreeMap<IndicatorKey, f32>, Vec<ConsistencyWarning>) {
    let mut out = values.clone();
    let mut touched: BTreeMap<(IndicatorKey, IndicatorKey), ConsistencyWarning> = BTreeMap::new();

    for _pass in 0..MAX_PASSES {
        let mut fired = false;

        for rule in RULES {
            let (Some(&a), Some(&b)) = (out.get(&rule.left), out.get(&rule.right)) else {
                continue;
            };
            if !violates(a, b) {
                continue;
            }
            fired = true;

            let gap = (a - b).abs();
            let delta = DAMPING * (a - b);
            let a_new = clamp01(a - delta);
            let b_new = clamp01(b + delta);
            out.insert(rule.left, a_new);
            out.insert(rule.right, b_new);

            tracing::warn!(
                target: "consistency",
                left = %rule.left,
                right = %rule.right,
                gap,
                "implausible indicator spread; damping both values"
            );

            touched
                .entry((rule.left, rule.right))
                .and_modify(|w| w.after = (a_new, b_new))
                .or_insert(ConsistencyWarning {
                    pair: (rule.left, rule.right),
                    gap,
                    before: (a, b),
                    after: (a_new, b_new),
                });
        }

        if !fired {
            break;
        }
    }

    // Report in rule order, not map order.
    let warnings = RULES
        .iter()
        .filter_map(|r| touched.remove(&(r.left, r.right)))
        .collect();
    (out, warnings)
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
