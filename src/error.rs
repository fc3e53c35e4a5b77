//! error.rs — Typed failures of the indicator engine.
//!
//! Only two things can actually go wrong inside the pure computation:
//! an indicator ends up with zero usable sources, or the caller asks for a
//! phase the weight table cannot resolve. Everything else (missing features,
//! partial inputs, inconsistent scores) degrades gracefully and is reported
//! through the result itself, not through `Err`.

use thiserror::Error;

use crate::indicator::IndicatorKey;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndicatorError {
    /// No source produced a usable value for this indicator under the active
    /// phase weights. Distinct from a computed low score on purpose.
    #[error("no usable source for indicator {indicator}")]
    InsufficientData { indicator: IndicatorKey },

    /// The requested phase is unknown or has no row in the weight table.
    #[error("invalid phase {phase:?}: {reason}")]
    InvalidPhase { phase: String, reason: String },
}
