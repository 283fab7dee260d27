use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use herald_core::{
    BroadcastReport, Completion, DeliveryOutcome, DeliveryStatus, FailureReason, Progress, RunId,
};

/// Accumulates outcomes for one run. Owned exclusively by the run loop, so
/// counters are only ever touched from one place.
#[derive(Debug)]
pub(crate) struct Aggregator {
    run_id: RunId,
    total: usize,
    succeeded: usize,
    failed: usize,
    breakdown: BTreeMap<FailureReason, usize>,
    failures: Vec<DeliveryOutcome>,
    started_at: DateTime<Utc>,
}

impl Aggregator {
    pub(crate) fn new(run_id: RunId, total: usize) -> Self {
        Self {
            run_id,
            total,
            succeeded: 0,
            failed: 0,
            breakdown: BTreeMap::new(),
            failures: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub(crate) fn record(&mut self, outcome: DeliveryOutcome) {
        match outcome.status {
            DeliveryStatus::Success => self.succeeded += 1,
            DeliveryStatus::Failure(reason) => {
                self.failed += 1;
                *self.breakdown.entry(reason).or_insert(0) += 1;
                self.failures.push(outcome);
            }
        }
    }

    pub(crate) fn progress(&self) -> Progress {
        Progress {
            run_id: self.run_id.clone(),
            total: self.total,
            succeeded: self.succeeded,
            failed: self.failed,
        }
    }

    pub(crate) fn finish(self, completion: Completion) -> BroadcastReport {
        debug_assert_eq!(self.succeeded + self.failed, self.total);
        BroadcastReport {
            run_id: self.run_id,
            total: self.total,
            succeeded: self.succeeded,
            failed: self.failed,
            failure_breakdown: self.breakdown,
            failures: self.failures,
            completion,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use herald_core::{Destination, DestinationId};

    use super::*;

    fn dest(n: i64) -> Destination {
        Destination::new(DestinationId::Numeric(-n))
    }

    #[test]
    fn counts_and_breakdown_accumulate() {
        let mut agg = Aggregator::new(RunId::new(), 4);
        agg.record(DeliveryOutcome::success(dest(1)));
        agg.record(DeliveryOutcome::failure(dest(2), FailureReason::NotAdmin));
        agg.record(DeliveryOutcome::failure(dest(3), FailureReason::NotAdmin));
        assert_eq!(agg.progress().done(), 3);

        agg.record(DeliveryOutcome::failure(dest(4), FailureReason::Unknown));
        let report = agg.finish(Completion::Exhausted);

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 3);
        assert!(report.is_conserved());
        assert_eq!(report.failures_for(FailureReason::NotAdmin), 2);
        assert_eq!(report.failures_for(FailureReason::Unknown), 1);
        assert_eq!(report.failures.len(), 3);
    }

    #[test]
    fn breakdown_is_order_independent() {
        let outcomes = vec![
            DeliveryOutcome::failure(dest(1), FailureReason::RateLimited),
            DeliveryOutcome::success(dest(2)),
            DeliveryOutcome::failure(dest(3), FailureReason::DestinationGone),
        ];

        let mut forward = Aggregator::new(RunId::new(), 3);
        outcomes.iter().cloned().for_each(|o| forward.record(o));
        let mut backward = Aggregator::new(RunId::new(), 3);
        outcomes.into_iter().rev().for_each(|o| backward.record(o));

        let (a, b) = (
            forward.finish(Completion::Exhausted),
            backward.finish(Completion::Exhausted),
        );
        assert_eq!(a.failure_breakdown, b.failure_breakdown);
        assert_eq!((a.succeeded, a.failed), (b.succeeded, b.failed));
    }
}
