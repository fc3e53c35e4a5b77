//! risk.rs — Band classification and overall risk aggregation.
//!
//! Every indicator shares the same four-band severity ladder; what differs
//! per indicator is where the cuts sit and what the bands are called (a bad
//! DRI is "critical", a bad CFL is "severe"). Both live in a TOML table: a
//! built-in copy is compiled in, and `CARECALL_THRESHOLDS_PATH` can point at
//! a replacement, falling back to the built-in on any load problem.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::indicator::{IndicatorKey, RiskLevel};

/// Env var pointing at a TOML threshold table override.
pub const THRESHOLDS_PATH_ENV: &str = "CARECALL_THRESHOLDS_PATH";

/// Interpretation attached when an indicator could not be computed at all.
const UNAVAILABLE_TEXT: &str = "Insufficient data to assess this indicator.";

static DEFAULT_THRESHOLDS: Lazy<RiskThresholds> = Lazy::new(|| {
    RiskThresholds::from_toml_str(include_str!("../config/risk_thresholds.toml"))
        .expect("embedded risk threshold table is valid")
});

/// Cut points and display strings for one indicator's four bands, ordered
/// worst to best.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandTable {
    pub cuts: [f32; 3],
    pub labels: [String; 4],
    pub interpretations: [String; 4],
}

impl BandTable {
    /// Index of the band a value falls into (0 = worst). Bands are half-open;
    /// a value exactly at a cut belongs to the better side.
    fn band(&self, value: f32) -> usize {
        self.cuts.iter().position(|&cut| value < cut).unwrap_or(3)
    }
}

/// Output of classifying one fused value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classified {
    pub level: RiskLevel,
    pub label: String,
    pub interpretation: String,
}

/// The full per-indicator threshold table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub version: String,
    #[serde(rename = "DRI")]
    dri: BandTable,
    #[serde(rename = "SDI")]
    sdi: BandTable,
    #[serde(rename = "CFL")]
    cfl: BandTable,
    #[serde(rename = "ES")]
    es: BandTable,
    #[serde(rename = "OV")]
    ov: BandTable,
}

const BAND_LEVELS: [RiskLevel; 4] = [
    RiskLevel::Critical,
    RiskLevel::Warning,
    RiskLevel::Caution,
    RiskLevel::Good,
];

impl RiskThresholds {
    pub fn band_table(&self, key: IndicatorKey) -> &BandTable {
        match key {
            IndicatorKey::Dri => &self.dri,
            IndicatorKey::Sdi => &self.sdi,
            IndicatorKey::Cfl => &self.cfl,
            IndicatorKey::Es => &self.es,
            IndicatorKey::Ov => &self.ov,
        }
    }

    /// Strict parse + sanity pass over every indicator's cut points.
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let table: RiskThresholds = toml::from_str(s).context("parsing risk threshold TOML")?;
        for key in IndicatorKey::ALL {
            let bands = table.band_table(key);
            let [t1, t2, t3] = bands.cuts;
            if !(0.0 < t1 && t1 < t2 && t2 < t3 && t3 < 1.0) {
                anyhow::bail!("{key} cuts must be strictly ascending inside (0,1), got {:?}", bands.cuts);
            }
            if bands.labels.iter().any(|l| l.trim().is_empty()) {
                anyhow::bail!("{key} has an empty band label");
            }
        }
        Ok(table)
    }

    /// Load from a TOML file, falling back to the built-in table on failure.
    pub fn load_from_file(path: &Path) -> Self {
        let parsed = std::fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|s| Self::from_toml_str(&s));
        match parsed {
            Ok(table) => {
                tracing::info!(
                    target: "risk",
                    path = %path.display(),
                    version = %table.version,
                    "loaded risk threshold table"
                );
                table
            }
            Err(e) => {
                tracing::warn!(
                    target: "risk",
                    path = %path.display(),
                    error = %e,
                    "cannot load risk thresholds; using built-in table"
                );
                DEFAULT_THRESHOLDS.clone()
            }
        }
    }

    /// Table from `CARECALL_THRESHOLDS_PATH` if set, otherwise the built-in.
    pub fn from_env_or_default() -> Self {
        match std::env::var(THRESHOLDS_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::load_from_file(Path::new(&path)),
            _ => DEFAULT_THRESHOLDS.clone(),
        }
    }

    /// Classify one fused value; `None` (nothing to fuse) maps to the
    /// `unknown` level rather than pretending to know a band.
    pub fn classify(&self, key: IndicatorKey, value: Option<f32>) -> Classified {
        let Some(v) = value else {
            return Classified {
                level: RiskLevel::Unknown,
                label: "unknown".to_string(),
                interpretation: UNAVAILABLE_TEXT.to_string(),
            };
        };
        let bands = self.band_table(key);
        let band = bands.band(v);
        Classified {
            level: BAND_LEVELS[band],
            label: bands.labels[band].clone(),
            interpretation: bands.interpretations[band].clone(),
        }
    }
}

impl Default for RiskThresholds {
    fn default() -> Self {
        DEFAULT_THRESHOLDS.clone()
    }
}

/// Most severe band among the classified indicators. `unknown` entries are
/// ignored unless nothing at all could be classified.
pub fn overall_risk(levels: &BTreeMap<IndicatorKey, RiskLevel>) -> RiskLevel {
    levels
        .values()
        .filter_map(|l| l.severity().map(|s| (s, *l)))
        .max_by_key(|(s, _)| *s)
        .map(|(_, l)| l)
        .unwrap_or(RiskLevel::Unknown)
}

/// The indicator to name first for a given overall band: DRI outranks SDI
/// outranks the rest, so a tie at the worst band reads as the depression
/// finding.
pub fn primary_concern(
    levels: &BTreeMap<IndicatorKey, RiskLevel>,
    overall: RiskLevel,
) -> Option<IndicatorKey> {
    overall.severity()?;
    IndicatorKey::ALL
        .iter()
        .copied()
        .find(|k| levels.get(k) == Some(&overall))
}

/// Aggregate interpretation line for the whole analysis.
pub fn overall_interpretation(
    classified: &BTreeMap<IndicatorKey, Classified>,
) -> (RiskLevel, String) {
    let levels: BTreeMap<IndicatorKey, RiskLevel> =
        classified.iter().map(|(k, c)| (*k, c.level)).collect();
    let overall = overall_risk(&levels);

    let text = match overall {
        RiskLevel::Unknown => "Insufficient data to assess overall wellbeing.".to_string(),
        RiskLevel::Good => "All assessable indicators are in their normal range.".to_string(),
        _ => match primary_concern(&levels, overall) {
            Some(key) => {
                let c = &classified[&key];
                format!("Primary concern: {} ({}). {}", key.name(), c.label, c.interpretation)
            }
            None => "Mixed indicator picture; review individual scores.".to_string(),
        },
    };
    (overall, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_table_parses_and_orders_cuts() {
        let t = RiskThresholds::default();
        assert_eq!(t.band_table(IndicatorKey::Dri).cuts, [0.25, 0.45, 0.65]);
        assert_eq!(t.band_table(IndicatorKey::Ov).cuts, [0.30, 0.50, 0.70]);
    }

    #[test]
    fn dri_bands_use_clinical_labels() {
        let t = RiskThresholds::default();
        assert_eq!(t.classify(IndicatorKey::Dri, Some(0.10)).level, RiskLevel::Critical);
        assert_eq!(t.classify(IndicatorKey::Dri, Some(0.10)).label, "critical");
        assert_eq!(t.classify(IndicatorKey::Dri, Some(0.30)).level, RiskLevel::Warning);
        assert_eq!(t.classify(IndicatorKey::Dri, Some(0.50)).level, RiskLevel::Caution);
        assert_eq!(t.classify(IndicatorKey::Dri, Some(0.90)).level, RiskLevel::Good);
    }

    #[test]
    fn band_boundaries_belong_to_the_better_side() {
        let t = RiskThresholds::default();
        assert_eq!(t.classify(IndicatorKey::Dri, Some(0.25)).level, RiskLevel::Warning);
        assert_eq!(t.classify(IndicatorKey::Dri, Some(0.65)).level, RiskLevel::Good);
    }

    #[test]
    fn polarity_extremes_hit_best_and_worst_bands() {
        // Higher is healthier for every indicator, whatever its label set.
        let t = RiskThresholds::default();
        for key in IndicatorKey::ALL {
            assert_eq!(t.classify(key, Some(1.0)).level, RiskLevel::Good);
            assert_eq!(t.classify(key, Some(0.0)).level, RiskLevel::Critical);
        }
    }

    #[test]
    fn cfl_shares_bands_but_not_labels() {
        let t = RiskThresholds::default();
        let worst = t.classify(IndicatorKey::Cfl, Some(0.05));
        assert_eq!(worst.level, RiskLevel::Critical);
        assert_eq!(worst.label, "severe");
        let best = t.classify(IndicatorKey::Cfl, Some(0.95));
        assert_eq!(best.label, "normal");
    }

    #[test]
    fn missing_value_classifies_as_unknown() {
        let t = RiskThresholds::default();
        let c = t.classify(IndicatorKey::Es, None);
        assert_eq!(c.level, RiskLevel::Unknown);
        assert_eq!(c.label, "unknown");
        assert_eq!(c.interpretation, UNAVAILABLE_TEXT);
    }

    #[test]
    fn invalid_cut_order_is_rejected() {
        let bad = include_str!("../config/risk_thresholds.toml")
            .replace("cuts = [0.25, 0.45, 0.65]", "cuts = [0.45, 0.25, 0.65]");
        assert!(RiskThresholds::from_toml_str(&bad).is_err());
    }

    #[test]
    fn overall_risk_takes_the_worst_band_and_skips_unknown() {
        let levels = BTreeMap::from([
            (IndicatorKey::Dri, RiskLevel::Good),
            (IndicatorKey::Sdi, RiskLevel::Warning),
            (IndicatorKey::Cfl, RiskLevel::Unknown),
            (IndicatorKey::Es, RiskLevel::Caution),
        ]);
        assert_eq!(overall_risk(&levels), RiskLevel::Warning);

        let all_unknown = BTreeMap::from([
            (IndicatorKey::Dri, RiskLevel::Unknown),
            (IndicatorKey::Ov, RiskLevel::Unknown),
        ]);
        assert_eq!(overall_risk(&all_unknown), RiskLevel::Unknown);
    }

    #[test]
    fn dri_wins_ties_at_the_worst_band() {
        let levels = BTreeMap::from([
            (IndicatorKey::Ov, RiskLevel::Critical),
            (IndicatorKey::Dri, RiskLevel::Critical),
            (IndicatorKey::Sdi, RiskLevel::Critical),
        ]);
        assert_eq!(primary_concern(&levels, RiskLevel::Critical), Some(IndicatorKey::Dri));
    }

    #[test]
    fn interpretation_names_the_primary_concern() {
        let t = RiskThresholds::default();
        let classified = BTreeMap::from([
            (IndicatorKey::Dri, t.classify(IndicatorKey::Dri, Some(0.10))),
            (IndicatorKey::Ov, t.classify(IndicatorKey::Ov, Some(0.80))),
        ]);
        let (overall, text) = overall_interpretation(&classified);
        assert_eq!(overall, RiskLevel::Critical);
        assert!(text.starts_with("Primary concern: Depression Risk (critical)."));
    }

    #[test]
    fn all_good_reads_as_normal_range() {
        let t = RiskThresholds::default();
        let classified = BTreeMap::from([
            (IndicatorKey::Dri, t.classify(IndicatorKey::Dri, Some(0.9))),
            (IndicatorKey::Es, t.classify(IndicatorKey::Es, Some(0.9))),
        ]);
        let (overall, text) = overall_interpretation(&classified);
        assert_eq!(overall, RiskLevel::Good);
        assert!(text.contains("normal range"));
    }
}
