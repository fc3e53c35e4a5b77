//! phase.rs — Phase-gated source weight table.
//!
//! Which analyzer gets how much say depends on the development phase: MVP
//! trusts only acoustic + language model, later phases shift weight onto the
//! specialized models as they come online. The table ships with a built-in
//! seed and can be replaced wholesale from a JSON file (path via
//! `CARECALL_WEIGHTS_PATH`); a broken or missing file falls back to the seed
//! so analysis never stops over a config problem.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::IndicatorError;
use crate::indicator::{IndicatorKey, Phase, Source};

/// Env var pointing at a JSON weight table override.
pub const WEIGHTS_PATH_ENV: &str = "CARECALL_WEIGHTS_PATH";

/// Weight triple for one indicator in one phase. Rows are expected to sum to
/// 1.0; fusion renormalizes over present sources anyway, so a slightly-off
/// row degrades gracefully instead of corrupting scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceWeights {
    pub acoustic: f32,
    pub language_model: f32,
    pub specialized_model: f32,
}

impl SourceWeights {
    pub fn get(&self, source: Source) -> f32 {
        match source {
            Source::Acoustic => self.acoustic,
            Source::LanguageModel => self.language_model,
            Source::SpecializedModel => self.specialized_model,
        }
    }

    /// Sources that structurally participate in this phase (nonzero weight).
    pub fn applicable_count(&self) -> usize {
        Source::ALL.iter().filter(|&&s| self.get(s) > 0.0).count()
    }

    pub fn sum(&self) -> f32 {
        self.acoustic + self.language_model + self.specialized_model
    }
}

/// The full phase × indicator weight table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseWeightTable {
    pub version: String,
    #[serde(rename = "phases")]
    rows: BTreeMap<Phase, BTreeMap<IndicatorKey, SourceWeights>>,
}

fn w(acoustic: f32, language_model: f32, specialized_model: f32) -> SourceWeights {
    SourceWeights {
        acoustic,
        language_model,
        specialized_model,
    }
}

impl PhaseWeightTable {
    /// Built-in table used whenever no valid override file is supplied.
    /// CFL carries zero specialized weight in every phase: no specialized
    /// cognition model exists, so its share goes to the other two sources.
    pub fn default_seed() -> Self {
        use IndicatorKey::*;
        let mut rows = BTreeMap::new();

        rows.insert(
            Phase::Mvp,
            BTreeMap::from([
                (Dri, w(0.40, 0.60, 0.0)),
                (Sdi, w(0.50, 0.50, 0.0)),
                (Cfl, w(0.40, 0.60, 0.0)),
                (Es, w(0.40, 0.60, 0.0)),
                (Ov, w(0.50, 0.50, 0.0)),
            ]),
        );
        rows.insert(
            Phase::Enhanced,
            BTreeMap::from([
                (Dri, w(0.20, 0.30, 0.50)),
                (Sdi, w(0.25, 0.35, 0.40)),
                (Cfl, w(0.40, 0.60, 0.0)),
                (Es, w(0.30, 0.40, 0.30)),
                (Ov, w(0.35, 0.45, 0.20)),
            ]),
        );
        rows.insert(
            Phase::Optimized,
            BTreeMap::from([
                (Dri, w(0.15, 0.25, 0.60)),
                (Sdi, w(0.20, 0.25, 0.55)),
                (Cfl, w(0.35, 0.65, 0.0)),
                (Es, w(0.25, 0.30, 0.45)),
                (Ov, w(0.30, 0.35, 0.35)),
            ]),
        );
        rows.insert(
            Phase::Clinical,
            BTreeMap::from([
                (Dri, w(0.20, 0.30, 0.50)),
                (Sdi, w(0.20, 0.30, 0.50)),
                (Cfl, w(0.30, 0.70, 0.0)),
                (Es, w(0.25, 0.35, 0.40)),
                (Ov, w(0.30, 0.40, 0.30)),
            ]),
        );

        Self {
            version: "seed-2026.08".to_string(),
            rows,
        }
    }

    /// Strict parse + sanity pass. Structural problems (missing rows,
    /// negative weights) are errors; soft problems (row sum off by a hair,
    /// nonzero CFL specialized weight) are repaired and logged.
    pub fn from_json_str(s: &str) -> anyhow::Result<Self> {
        let mut table: PhaseWeightTable =
            serde_json::from_str(s).context("parsing phase weight table JSON")?;

        for phase in Phase::ALL {
            let row = table
                .rows
                .get_mut(&phase)
                .with_context(|| format!("weight table has no {phase} row"))?;
            for key in IndicatorKey::ALL {
                let weights = row
                    .get_mut(&key)
                    .with_context(|| format!("{phase} row has no {key} entry"))?;
                if weights.acoustic < 0.0
                    || weights.language_model < 0.0
                    || weights.specialized_model < 0.0
                {
                    anyhow::bail!("negative weight for {key} in {phase}");
                }
                if (weights.sum() - 1.0).abs() > 0.01 {
                    tracing::warn!(
                        target: "weights",
                        %phase,
                        indicator = %key,
                        sum = weights.sum(),
                        "weight row does not sum to 1.0; fusion will renormalize"
                    );
                }
                if key == IndicatorKey::Cfl && weights.specialized_model > 0.0 {
                    tracing::warn!(
                        target: "weights",
                        %phase,
                        weight = weights.specialized_model,
                        "CFL has no specialized model; forcing its weight to zero"
                    );
                    weights.specialized_model = 0.0;
                }
            }
        }

        Ok(table)
    }

    /// Load from a JSON file, falling back to the seed on any failure.
    pub fn load_from_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(s) => match Self::from_json_str(&s) {
                Ok(table) => {
                    tracing::info!(
                        target: "weights",
                        path = %path.display(),
                        version = %table.version,
                        "loaded phase weight table"
                    );
                    table
                }
                Err(e) => {
                    tracing::warn!(
                        target: "weights",
                        path = %path.display(),
                        error = %e,
                        "invalid phase weight table; using built-in seed"
                    );
                    Self::default_seed()
                }
            },
            Err(e) => {
                tracing::warn!(
                    target: "weights",
                    path = %path.display(),
                    error = %e,
                    "cannot read phase weight table; using built-in seed"
                );
                Self::default_seed()
            }
        }
    }

    /// Table from `CARECALL_WEIGHTS_PATH` if set, otherwise the seed.
    pub fn from_env_or_default() -> Self {
        match std::env::var(WEIGHTS_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::load_from_file(Path::new(&path)),
            _ => Self::default_seed(),
        }
    }

    /// Weight triple for one indicator in one phase.
    pub fn weights(
        &self,
        phase: Phase,
        indicator: IndicatorKey,
    ) -> Result<SourceWeights, IndicatorError> {
        let row = self
            .rows
            .get(&phase)
            .ok_or_else(|| IndicatorError::InvalidPhase {
                phase: phase.to_string(),
                reason: "no row in weight table".to_string(),
            })?;
        row.get(&indicator)
            .copied()
            .ok_or_else(|| IndicatorError::InvalidPhase {
                phase: phase.to_string(),
                reason: format!("no {indicator} entry in weight table"),
            })
    }
}

impl Default for PhaseWeightTable {
    fn default() -> Self {
        Self::default_seed()
    }
}
