use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use herald_core::BroadcastReport;

/// Running totals across all broadcasts since startup. Memory-only.
#[derive(Debug, Default)]
pub struct BroadcastStats {
    inner: Mutex<Totals>,
}

#[derive(Debug, Default, Clone)]
struct Totals {
    broadcasts: u64,
    succeeded: u64,
    failed: u64,
    last: Option<BroadcastReport>,
}

/// Point-in-time view rendered for `QueryStats`.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub registered_destinations: usize,
    pub broadcasts: u64,
    pub deliveries_succeeded: u64,
    pub deliveries_failed: u64,
    pub last_broadcast: Option<BroadcastReport>,
}

impl BroadcastStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, report: &BroadcastReport) {
        let mut totals = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        totals.broadcasts += 1;
        totals.succeeded += report.succeeded as u64;
        totals.failed += report.failed as u64;
        totals.last = Some(report.clone());
    }

    pub fn snapshot(&self, registered_destinations: usize) -> StatsSnapshot {
        let totals = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        StatsSnapshot {
            registered_destinations,
            broadcasts: totals.broadcasts,
            deliveries_succeeded: totals.succeeded,
            deliveries_failed: totals.failed,
            last_broadcast: totals.last,
        }
    }
}
