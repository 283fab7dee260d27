use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{DeliveryOutcome, FailureReason};

/// Identifier of one broadcast run (UUIDv7, time-sortable for log correlation).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a broadcast run: `Pending → InProgress → Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Pending,
    InProgress,
    Completed,
}

/// How a completed run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    /// Every destination was attempted.
    Exhausted,
    /// Cumulative rate-limit backoff hit the ceiling; the rest were marked rate limited.
    BackoffCeiling,
    /// Cancelled by the operator; unstarted destinations were marked cancelled.
    Cancelled,
}

/// Cumulative counts emitted to a progress sink after every outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub run_id: RunId,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl Progress {
    pub fn done(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.done())
    }
}

/// Final, frozen result of one broadcast run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastReport {
    pub run_id: RunId,
    /// Snapshot size at dispatch start.
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failure_breakdown: BTreeMap<FailureReason, usize>,
    /// Failed outcomes, in the order they were aggregated.
    pub failures: Vec<DeliveryOutcome>,
    pub completion: Completion,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BroadcastReport {
    /// `succeeded + failed == total`.
    pub fn is_conserved(&self) -> bool {
        self.succeeded + self.failed == self.total
    }

    pub fn failures_for(&self, reason: FailureReason) -> usize {
        self.failure_breakdown.get(&reason).copied().unwrap_or(0)
    }

    pub fn progress(&self) -> Progress {
        Progress {
            run_id: self.run_id.clone(),
            total: self.total,
            succeeded: self.succeeded,
            failed: self.failed,
        }
    }
}
