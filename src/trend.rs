//! trend.rs — Direction of change between consecutive analyses.
//!
//! Trend is computed against whatever previous snapshot the caller supplies
//! (typically the last stored analysis). Per indicator: percentage change
//! inside a ±5% band counts as stable; a near-zero previous value makes the
//! percentage undefined, in which case any real recovery reads as improving.
//! The aggregate direction is a vote across indicators, with critical-band
//! indicators counting double so a collapse in one alarming score is not
//! outvoted by three flat healthy ones.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::indicator::{IndicatorKey, RiskLevel, TrendLabel};

/// Percentage change magnitude below which a score counts as stable.
pub const STABLE_BAND_PCT: f32 = 5.0;
/// Float residue at the band edge must not turn a true ±5% move into stable.
const BAND_EPS: f32 = 1e-4;
/// Previous values below this are treated as exactly zero.
const ZERO_EPS: f32 = 1e-9;

/// Change of one indicator relative to the previous snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub delta: f32,
    /// `None` when the previous value was zero (division undefined) or this
    /// is the first measurement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pct_change: Option<f32>,
    pub label: TrendLabel,
}

impl TrendPoint {
    fn baseline() -> Self {
        Self {
            delta: 0.0,
            pct_change: None,
            label: TrendLabel::Baseline,
        }
    }
}

/// Per-indicator trend points for the current fused values.
pub fn track(
    previous: Option<&BTreeMap<IndicatorKey, f32>>,
    current: &BTreeMap<IndicatorKey, f32>,
) -> BTreeMap<IndicatorKey, TrendPoint> {
    current
        .iter()
        .map(|(&key, &now)| {
            let point = match previous.and_then(|p| p.get(&key)) {
                None => TrendPoint::baseline(),
                Some(&prev) if prev < ZERO_EPS => TrendPoint {
                    delta: now - prev,
                    pct_change: None,
                    label: if now > ZERO_EPS {
                        TrendLabel::Improving
                    } else {
                        TrendLabel::Stable
                    },
                },
                Some(&prev) => {
                    let pct = (now - prev) / prev * 100.0;
                    let label = if pct >= STABLE_BAND_PCT - BAND_EPS {
                        TrendLabel::Improving
                    } else if pct <= -(STABLE_BAND_PCT - BAND_EPS) {
                        TrendLabel::Declining
                    } else {
                        TrendLabel::Stable
                    };
                    TrendPoint {
                        delta: now - prev,
                        pct_change: Some(pct),
                        label,
                    }
                }
            };
            (key, point)
        })
        .collect()
}

/// Aggregate direction across indicators. Baseline points abstain; critical
/// indicators vote twice; any tie at the top resolves to stable.
pub fn aggregate(
    points: &BTreeMap<IndicatorKey, TrendPoint>,
    levels: &BTreeMap<IndicatorKey, RiskLevel>,
) -> TrendLabel {
    let mut improving = 0u32;
    let mut declining = 0u32;
    let mut stable = 0u32;

    for (key, point) in points {
        let votes = if levels.get(key) == Some(&RiskLevel::Critical) {
            2
        } else {
            1
        };
        match point.label {
            TrendLabel::Baseline => {}
            TrendLabel::Improving => improving += votes,
            TrendLabel::Declining => declining += votes,
            TrendLabel::Stable => stable += votes,
        }
    }

    if improving == 0 && declining == 0 && stable == 0 {
        return TrendLabel::Baseline;
    }
    let top = improving.max(declining).max(stable);
    let winners = [improving, declining, stable]
        .iter()
        .filter(|&&v| v == top)
        .count();
    if winners > 1 {
        return TrendLabel::Stable;
    }
    if improving == top {
        TrendLabel::Improving
    } else if declining == top {
        TrendLabel::Declining
    } else {
        TrendLabel::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(IndicatorKey, f32)]) -> BTreeMap<IndicatorKey, f32> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn no_previous_snapshot_means_all_baseline() {
        let current = map(&[(IndicatorKey::Dri, 0.5), (IndicatorKey::Ov, 0.8)]);
        let points = track(None, &current);
        assert!(points.values().all(|p| p.label == TrendLabel::Baseline));
        assert!(points.values().all(|p| p.pct_change.is_none()));
    }

    #[test]
    fn recovery_from_low_score_reads_as_improving() {
        let prev = map(&[(IndicatorKey::Dri, 0.3)]);
        let current = map(&[(IndicatorKey::Dri, 0.5)]);
        let points = track(Some(&prev), &current);
        let p = &points[&IndicatorKey::Dri];
        assert_eq!(p.label, TrendLabel::Improving);
        assert!((p.delta - 0.2).abs() < 1e-6);
        let pct = p.pct_change.unwrap();
        assert!((pct - 66.6667).abs() < 0.01, "got {pct}");
    }

    #[test]
    fn small_moves_inside_the_band_are_stable() {
        let prev = map(&[(IndicatorKey::Es, 0.80)]);
        let current = map(&[(IndicatorKey::Es, 0.82)]);
        let points = track(Some(&prev), &current);
        // +2.5% sits inside the ±5% band.
        assert_eq!(points[&IndicatorKey::Es].label, TrendLabel::Stable);
    }

    #[test]
    fn five_percent_boundary_counts_as_movement() {
        let prev = map(&[(IndicatorKey::Cfl, 0.80)]);
        let up = map(&[(IndicatorKey::Cfl, 0.84)]);
        assert_eq!(track(Some(&prev), &up)[&IndicatorKey::Cfl].label, TrendLabel::Improving);
        let down = map(&[(IndicatorKey::Cfl, 0.76)]);
        assert_eq!(track(Some(&prev), &down)[&IndicatorKey::Cfl].label, TrendLabel::Declining);
    }

    #[test]
    fn zero_previous_has_no_percentage() {
        let prev = map(&[(IndicatorKey::Sdi, 0.0), (IndicatorKey::Ov, 0.0)]);
        let current = map(&[(IndicatorKey::Sdi, 0.4), (IndicatorKey::Ov, 0.0)]);
        let points = track(Some(&prev), &current);

        let sdi = &points[&IndicatorKey::Sdi];
        assert_eq!(sdi.label, TrendLabel::Improving);
        assert_eq!(sdi.pct_change, None);

        let ov = &points[&IndicatorKey::Ov];
        assert_eq!(ov.label, TrendLabel::Stable);
        assert_eq!(ov.pct_change, None);
    }

    #[test]
    fn indicator_missing_from_previous_is_baseline() {
        let prev = map(&[(IndicatorKey::Dri, 0.5)]);
        let current = map(&[(IndicatorKey::Dri, 0.5), (IndicatorKey::Cfl, 0.7)]);
        let points = track(Some(&prev), &current);
        assert_eq!(points[&IndicatorKey::Cfl].label, TrendLabel::Baseline);
        assert_eq!(points[&IndicatorKey::Dri].label, TrendLabel::Stable);
    }

    fn point(label: TrendLabel) -> TrendPoint {
        TrendPoint {
            delta: 0.0,
            pct_change: None,
            label,
        }
    }

    #[test]
    fn aggregate_follows_the_majority() {
        let points = BTreeMap::from([
            (IndicatorKey::Dri, point(TrendLabel::Declining)),
            (IndicatorKey::Sdi, point(TrendLabel::Declining)),
            (IndicatorKey::Cfl, point(TrendLabel::Improving)),
        ]);
        let levels = BTreeMap::new();
        assert_eq!(aggregate(&points, &levels), TrendLabel::Declining);
    }

    #[test]
    fn critical_indicators_vote_twice() {
        // One declining critical indicator outweighs one improving healthy one.
        let points = BTreeMap::from([
            (IndicatorKey::Dri, point(TrendLabel::Declining)),
            (IndicatorKey::Cfl, point(TrendLabel::Improving)),
        ]);
        let levels = BTreeMap::from([
            (IndicatorKey::Dri, RiskLevel::Critical),
            (IndicatorKey::Cfl, RiskLevel::Good),
        ]);
        assert_eq!(aggregate(&points, &levels), TrendLabel::Declining);
    }

    #[test]
    fn ties_resolve_to_stable() {
        let points = BTreeMap::from([
            (IndicatorKey::Dri, point(TrendLabel::Declining)),
            (IndicatorKey::Cfl, point(TrendLabel::Improving)),
        ]);
        assert_eq!(aggregate(&points, &BTreeMap::new()), TrendLabel::Stable);
    }

    #[test]
    fn baseline_points_abstain_entirely() {
        let points = BTreeMap::from([
            (IndicatorKey::Dri, point(TrendLabel::Baseline)),
            (IndicatorKey::Sdi, point(TrendLabel::Baseline)),
        ]);
        assert_eq!(aggregate(&points, &BTreeMap::new()), TrendLabel::Baseline);

        let mixed = BTreeMap::from([
            (IndicatorKey::Dri, point(TrendLabel::Baseline)),
            (IndicatorKey::Sdi, point(TrendLabel::Improving)),
        ]);
        assert_eq!(aggregate(&mixed, &BTreeMap::new()), TrendLabel::Improving);
    }
}
