//! history.rs — In-memory record of recent analyses.
//!
//! Holds the last N fused snapshots per process so callers can feed
//! `previous_snapshot` without a storage round-trip and peek at recent runs
//! for diagnostics. Durable persistence lives outside this crate.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::indicator::{AnalysisResult, IndicatorKey, RiskLevel};

#[derive(Debug, Clone)]
pub struct SnapshotEntry {
    pub ts_unix: u64,
    /// Fused values of the indicators that were available.
    pub values: BTreeMap<IndicatorKey, f32>,
    pub overall_risk: RiskLevel,
}

#[derive(Debug)]
pub struct SnapshotHistory {
    inner: Mutex<Vec<SnapshotEntry>>,
    cap: usize,
}

impl SnapshotHistory {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            inner: Mutex::new(Vec::with_capacity(cap.min(10_000))),
            cap: cap.min(10_000),
        }
    }

    pub fn push(&self, result: &AnalysisResult) {
        let entry = SnapshotEntry {
            ts_unix: now_unix(),
            values: result.snapshot(),
            overall_risk: result.overall_risk,
        };

        let mut v = self.inner.lock().expect("history mutex poisoned");
        v.push(entry);
        if v.len() > self.cap {
            let excess = v.len() - self.cap;
            v.drain(0..excess);
        }
    }

    /// Values of the most recent entry, in the shape `AnalysisInput`
    /// expects for its previous snapshot.
    pub fn last_values(&self) -> Option<BTreeMap<IndicatorKey, f32>> {
        let v = self.inner.lock().expect("history mutex poisoned");
        v.last().map(|e| e.values.clone())
    }

    pub fn snapshot_last_n(&self, n: usize) -> Vec<SnapshotEntry> {
        let v = self.inner.lock().expect("history mutex poisoned");
        let start = v.len().saturating_sub(n);
        v[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("history mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
