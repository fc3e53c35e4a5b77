//! telemetry.rs — Metric series emitted by the analysis pipeline.
//!
//! This crate only records through the `metrics` facade; installing an
//! exporter (Prometheus or otherwise) is the host application's business.
//! With no recorder installed every call here is a no-op.

use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;

use crate::indicator::AnalysisResult;

/// One-time metrics registration so series carry help text when scraped.
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("indicator_analyses_total", "Completed analysis calls.");
        describe_counter!(
            "indicator_unavailable_total",
            "Indicators that had no usable source in an analysis."
        );
        describe_counter!(
            "consistency_adjustments_total",
            "Indicator pairs damped by the consistency pass."
        );
        describe_counter!(
            "alerts_suppressed_total",
            "Actionable results swallowed by the alert cooldown gate."
        );
        describe_gauge!(
            "indicator_last_analysis_ts",
            "Unix ts when an analysis last completed."
        );
    });
}

/// Record one completed analysis.
pub fn record_analysis(result: &AnalysisResult) {
    ensure_metrics_described();

    counter!("indicator_analyses_total").increment(1);

    let unavailable = result
        .indicators
        .values()
        .filter(|ind| ind.value.is_none())
        .count();
    if unavailable > 0 {
        counter!("indicator_unavailable_total").increment(unavailable as u64);
    }
    if !result.warnings.is_empty() {
        counter!("consistency_adjustments_total").increment(result.warnings.len() as u64);
    }

    gauge!("indicator_last_analysis_ts").set(chrono::Utc::now().timestamp() as f64);
}

/// Record an actionable result that the cooldown gate decided to swallow.
pub fn record_suppressed_alert() {
    ensure_metrics_described();
    counter!("alerts_suppressed_total").increment(1);
}
