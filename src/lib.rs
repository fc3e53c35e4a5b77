// src/lib.rs
// Public library surface for the orchestration layer, bins and tests.

pub mod alert;
pub mod confidence;
pub mod consistency;
pub mod engine;
pub mod error;
pub mod fusion;
pub mod history;
pub mod indicator;
pub mod normalize;
pub mod phase;
pub mod risk;
pub mod telemetry;
pub mod trend;

// ---- Re-exports for stable public API ----
pub use crate::engine::{compute_indicators, IndicatorEngine};
pub use crate::error::IndicatorError;
pub use crate::indicator::{
    AnalysisInput, AnalysisResult, FusedIndicator, IndicatorKey, Phase, Provenance, RiskLevel,
    Source, TrendLabel,
};

// Commonly inspected pieces of a result.
pub use crate::alert::AlertGate;
pub use crate::consistency::ConsistencyWarning;
pub use crate::history::SnapshotHistory;
pub use crate::phase::PhaseWeightTable;
pub use crate::risk::RiskThresholds;
pub use crate::trend::TrendPoint;
