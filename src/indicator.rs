//! indicator.rs — Core value types for the five standardized wellbeing indicators.
//!
//! Everything here is a plain value object: computed fresh on each analysis
//! call, immutable once returned, and safe to serialize at the orchestration
//! boundary. Scores are normalized so that **higher always means healthier**
//! (0.0 = worst, 1.0 = best); raw sub-scores with the opposite polarity are
//! inverted in `normalize` before they ever reach fusion.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::consistency::ConsistencyWarning;
use crate::error::IndicatorError;
use crate::trend::TrendPoint;

/// The five standardized indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IndicatorKey {
    /// Depression Risk (inverted: 1.0 = no depressive signal).
    Dri,
    /// Sleep Disorder (inverted: 1.0 = healthy sleep signal).
    Sdi,
    /// Cognitive Function Level.
    Cfl,
    /// Emotional Stability.
    Es,
    /// Overall Vitality.
    Ov,
}

impl IndicatorKey {
    pub const ALL: [IndicatorKey; 5] = [
        IndicatorKey::Dri,
        IndicatorKey::Sdi,
        IndicatorKey::Cfl,
        IndicatorKey::Es,
        IndicatorKey::Ov,
    ];

    /// Short wire code, e.g. "DRI".
    pub fn code(self) -> &'static str {
        match self {
            IndicatorKey::Dri => "DRI",
            IndicatorKey::Sdi => "SDI",
            IndicatorKey::Cfl => "CFL",
            IndicatorKey::Es => "ES",
            IndicatorKey::Ov => "OV",
        }
    }

    /// Human-readable name used in interpretations.
    pub fn name(self) -> &'static str {
        match self {
            IndicatorKey::Dri => "Depression Risk",
            IndicatorKey::Sdi => "Sleep Disorder",
            IndicatorKey::Cfl => "Cognitive Function",
            IndicatorKey::Es => "Emotional Stability",
            IndicatorKey::Ov => "Overall Vitality",
        }
    }
}

impl fmt::Display for IndicatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One of the three independent analyzers feeding an indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Acoustic,
    LanguageModel,
    SpecializedModel,
}

impl Source {
    pub const ALL: [Source; 3] = [
        Source::Acoustic,
        Source::LanguageModel,
        Source::SpecializedModel,
    ];
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Source::Acoustic => "acoustic",
            Source::LanguageModel => "language_model",
            Source::SpecializedModel => "specialized_model",
        };
        f.write_str(s)
    }
}

/// Development-maturity stage gating which analyzer sources are trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    Mvp,
    Enhanced,
    Optimized,
    Clinical,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::Mvp,
        Phase::Enhanced,
        Phase::Optimized,
        Phase::Clinical,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Phase::Mvp => "MVP",
            Phase::Enhanced => "ENHANCED",
            Phase::Optimized => "OPTIMIZED",
            Phase::Clinical => "CLINICAL",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Phase {
    type Err = IndicatorError;

    /// Case-insensitive parse; an unrecognized phase is a caller bug and
    /// surfaces immediately.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MVP" => Ok(Phase::Mvp),
            "ENHANCED" => Ok(Phase::Enhanced),
            "OPTIMIZED" => Ok(Phase::Optimized),
            "CLINICAL" => Ok(Phase::Clinical),
            other => Err(IndicatorError::InvalidPhase {
                phase: other.to_string(),
                reason: "not one of MVP|ENHANCED|OPTIMIZED|CLINICAL".to_string(),
            }),
        }
    }
}

/// Trust tier of the data/labels behind the current analyzers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    ClinicalValidated,
    ExpertLabeled,
    ExpertValidated,
    AiGenerated,
    Synthetic,
}

/// Ordered severity bands shared by all indicators. Display labels differ by
/// indicator (see the threshold tables in `risk`), the band ordering does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Critical,
    Warning,
    Caution,
    Good,
    /// Only used when the fused value itself is unavailable.
    Unknown,
}

impl RiskLevel {
    /// Severity rank for "worst of" comparisons; `Unknown` has none.
    pub fn severity(self) -> Option<u8> {
        match self {
            RiskLevel::Critical => Some(3),
            RiskLevel::Warning => Some(2),
            RiskLevel::Caution => Some(1),
            RiskLevel::Good => Some(0),
            RiskLevel::Unknown => None,
        }
    }

    /// Warning and critical bands are the ones worth alerting on.
    pub fn is_actionable(self) -> bool {
        matches!(self, RiskLevel::Critical | RiskLevel::Warning)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Critical => "critical",
            RiskLevel::Warning => "warning",
            RiskLevel::Caution => "caution",
            RiskLevel::Good => "good",
            RiskLevel::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Per-indicator trend direction relative to the previous snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendLabel {
    /// First measurement; no delta computable.
    Baseline,
    Improving,
    Stable,
    Declining,
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrendLabel::Baseline => "baseline",
            TrendLabel::Improving => "improving",
            TrendLabel::Stable => "stable",
            TrendLabel::Declining => "declining",
        };
        f.write_str(s)
    }
}

/// One analyzer's contribution to an indicator. `value: None` means the
/// upstream analyzer produced no usable signal, deliberately distinct from a
/// legitimate 0.0, so missing data can never masquerade as a score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceComponent {
    pub source: Source,
    pub value: Option<f32>,
}

impl SourceComponent {
    /// A component from one reported value, clamped into [0,1]. Non-finite
    /// readings carry no information and count as absent.
    pub fn of(source: Source, value: f32) -> Self {
        Self {
            source,
            value: value.is_finite().then(|| clamp01(value)),
        }
    }

    /// An absent component (no usable signal from this analyzer).
    pub fn absent(source: Source) -> Self {
        Self {
            source,
            value: None,
        }
    }

    pub fn present(&self) -> bool {
        self.value.is_some()
    }
}

/// The full per-indicator component triple produced by normalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentSet {
    pub acoustic: SourceComponent,
    pub language_model: SourceComponent,
    pub specialized_model: SourceComponent,
}

impl ComponentSet {
    pub fn new(acoustic: Option<f32>, language_model: Option<f32>, specialized: Option<f32>) -> Self {
        let mk = |source, v: Option<f32>| match v {
            Some(x) => SourceComponent::of(source, x),
            None => SourceComponent::absent(source),
        };
        Self {
            acoustic: mk(Source::Acoustic, acoustic),
            language_model: mk(Source::LanguageModel, language_model),
            specialized_model: mk(Source::SpecializedModel, specialized),
        }
    }

    /// All three components absent.
    pub fn empty() -> Self {
        Self::new(None, None, None)
    }

    pub fn get(&self, source: Source) -> &SourceComponent {
        match source {
            Source::Acoustic => &self.acoustic,
            Source::LanguageModel => &self.language_model,
            Source::SpecializedModel => &self.specialized_model,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceComponent> {
        [&self.acoustic, &self.language_model, &self.specialized_model].into_iter()
    }

    pub fn present_count(&self) -> usize {
        self.iter().filter(|c| c.present()).count()
    }

    /// Per-source values as reported on `FusedIndicator.components`
    /// (`null` = analyzer produced nothing).
    pub fn value_map(&self) -> BTreeMap<Source, Option<f32>> {
        self.iter().map(|c| (c.source, c.value)).collect()
    }
}

/// One fully classified indicator: fused value, confidence, risk band,
/// human-readable interpretation, per-source components and optional trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedIndicator {
    pub key: IndicatorKey,
    /// `None` when fusion had no usable source (level is then `unknown`).
    pub value: Option<f32>,
    pub confidence: f32,
    pub level: RiskLevel,
    /// Indicator-specific band label (e.g. "severe" for CFL vs "critical" for DRI).
    pub level_label: String,
    pub interpretation: String,
    pub components: BTreeMap<Source, Option<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<TrendPoint>,
}

/// Everything `compute_indicators` hands back to the orchestration layer.
/// JSON round-trips losslessly; persistence (Firestore/BigQuery) lives outside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub indicators: BTreeMap<IndicatorKey, FusedIndicator>,
    pub overall_risk: RiskLevel,
    pub overall_trend: TrendLabel,
    /// Aggregate free-text interpretation naming the primary concern.
    pub interpretation: String,
    /// UTC ISO-8601 timestamp of the analysis.
    pub timestamp: String,
    /// Consistency adjustments applied to this result; metadata, never an error.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ConsistencyWarning>,
}

impl AnalysisResult {
    /// Fused values of the indicators that are actually available, in the
    /// shape `TrendTracker` expects as a previous snapshot.
    pub fn snapshot(&self) -> BTreeMap<IndicatorKey, f32> {
        self.indicators
            .iter()
            .filter_map(|(k, ind)| ind.value.map(|v| (*k, v)))
            .collect()
    }
}

/// Input snapshot for one analysis call. All analyzer dictionaries are
/// optional; a cancelled or failed upstream call simply arrives as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acoustic: Option<HashMap<String, f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_model: Option<HashMap<String, f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialized_model: Option<HashMap<String, f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_data: Option<HashMap<String, f32>>,
    pub phase: Phase,
    pub provenance: Provenance,
    /// Previous fused values, supplied by the caller (e.g. from history).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_snapshot: Option<BTreeMap<IndicatorKey, f32>>,
}

impl AnalysisInput {
    pub fn new(phase: Phase, provenance: Provenance) -> Self {
        Self {
            phase,
            provenance,
            ..Self::default()
        }
    }

    pub fn with_acoustic(mut self, features: HashMap<String, f32>) -> Self {
        self.acoustic = Some(features);
        self
    }

    pub fn with_language_model(mut self, scores: HashMap<String, f32>) -> Self {
        self.language_model = Some(scores);
        self
    }

    pub fn with_specialized_model(mut self, scores: HashMap<String, f32>) -> Self {
        self.specialized_model = Some(scores);
        self
    }

    pub fn with_health_data(mut self, data: HashMap<String, f32>) -> Self {
        self.health_data = Some(data);
        self
    }

    pub fn with_previous_snapshot(mut self, snapshot: BTreeMap<IndicatorKey, f32>) -> Self {
        self.previous_snapshot = Some(snapshot);
        self
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

impl Default for AnalysisInput {
    fn default() -> Self {
        Self {
            acoustic: None,
            language_model: None,
            specialized_model: None,
            health_data: None,
            phase: Phase::Mvp,
            provenance: Provenance::AiGenerated,
            previous_snapshot: None,
        }
    }
}
