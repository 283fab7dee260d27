use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures_util::stream::{FuturesUnordered, StreamExt};
use futures_util::FutureExt;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use herald_core::config::DispatchConfig;
use herald_core::{
    BroadcastReport, Completion, DeliveryOutcome, Destination, FailureReason, Message, RunId,
    RunState,
};
use herald_registry::Snapshot;

use crate::error::{DispatchError, Result};
use crate::progress::ProgressSink;
use crate::report::Aggregator;
use crate::sender::{DeliverySender, SendError};

/// Fans a message out to a snapshot with bounded concurrency.
///
/// Each destination is attempted exactly once. A rate-limit signal pauses
/// the start of new sends (in-flight sends keep running) for the advised
/// wait. Overlapping pauses count once toward the run's cumulative pause;
/// once that would pass the configured ceiling, every destination not yet
/// started is recorded as rate limited and the run completes.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Broadcast `message` to every destination in `snapshot`.
    ///
    /// Fails only on structurally invalid input; delivery failures are
    /// reported in the returned [`BroadcastReport`].
    pub async fn dispatch(
        &self,
        message: &Message,
        snapshot: Snapshot,
        sender: &dyn DeliverySender,
        progress: &dyn ProgressSink,
    ) -> Result<BroadcastReport> {
        self.dispatch_with_cancel(message, snapshot, sender, progress, &CancellationToken::new())
            .await
    }

    /// Like [`dispatch`](Self::dispatch), but stops starting new sends once
    /// `cancel` fires. Sends already in flight finish; destinations never
    /// started are recorded as [`FailureReason::Cancelled`].
    pub async fn dispatch_with_cancel(
        &self,
        message: &Message,
        snapshot: Snapshot,
        sender: &dyn DeliverySender,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<BroadcastReport> {
        validate(message, &snapshot)?;

        let run_id = RunId::new();
        let total = snapshot.len();
        let pool_size = self.config.pool_size.max(1);
        let send_timeout = self.config.send_timeout();

        let mut aggregator = Aggregator::new(run_id.clone(), total);
        let mut state = RunState::Pending;
        let mut pending = snapshot.into_iter();
        let mut in_flight = FuturesUnordered::new();
        let mut backoff = Backoff::new(&self.config);
        let mut halt: Option<Completion> = None;

        info!(
            run_id = %run_id,
            total,
            pool_size,
            kind = %message.kind(),
            sender = sender.name(),
            "broadcast started"
        );

        loop {
            if backoff.resume_at.is_none() && halt.is_none() {
                while in_flight.len() < pool_size && pending.len() > 0 {
                    if cancel.is_cancelled() {
                        info!(run_id = %run_id, remaining = pending.len(), "broadcast cancelled");
                        halt = Some(Completion::Cancelled);
                        break;
                    }
                    let Some(destination) = pending.next() else {
                        break;
                    };
                    if state == RunState::Pending {
                        state = RunState::InProgress;
                        debug!(run_id = %run_id, "broadcast in progress");
                    }
                    in_flight.push(attempt(sender, destination, message, send_timeout));
                }
            }

            if in_flight.is_empty() {
                match backoff.resume_at.take() {
                    Some(at) if halt.is_none() && pending.len() > 0 => {
                        tokio::select! {
                            () = sleep_until(at) => {}
                            () = cancel.cancelled() => {
                                debug!(run_id = %run_id, "backoff pause interrupted by cancel");
                            }
                        }
                        continue;
                    }
                    _ => break,
                }
            }

            tokio::select! {
                Some((destination, result)) = in_flight.next() => {
                    let outcome = match result {
                        Ok(()) => DeliveryOutcome::success(destination),
                        Err(e) => {
                            warn!(
                                run_id = %run_id,
                                destination = %destination,
                                reason = %e.reason(),
                                error = %e,
                                "delivery failed"
                            );
                            if let SendError::RateLimited { retry_after } = e {
                                if halt.is_none() && !backoff.pause(retry_after) {
                                    warn!(
                                        run_id = %run_id,
                                        waited = ?backoff.waited,
                                        ceiling = ?backoff.ceiling,
                                        remaining = pending.len(),
                                        "backoff ceiling reached, giving up on remaining destinations"
                                    );
                                    halt = Some(Completion::BackoffCeiling);
                                }
                            }
                            DeliveryOutcome::failure(destination, e.reason()).with_detail(e.to_string())
                        }
                    };
                    aggregator.record(outcome);
                    progress.on_progress(&aggregator.progress());
                }
                () = sleep_until(backoff.resume_at.unwrap_or_else(Instant::now)), if backoff.resume_at.is_some() => {
                    backoff.resume_at = None;
                }
            }
        }

        let completion = halt.unwrap_or(Completion::Exhausted);
        let leftover_reason = match completion {
            Completion::Cancelled => FailureReason::Cancelled,
            _ => FailureReason::RateLimited,
        };
        for destination in pending {
            aggregator.record(DeliveryOutcome::failure(destination, leftover_reason));
            progress.on_progress(&aggregator.progress());
        }

        state = RunState::Completed;
        debug!(run_id = %run_id, state = ?state, "broadcast run finished");

        let report = aggregator.finish(completion);
        info!(
            run_id = %run_id,
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            completion = ?report.completion,
            "broadcast completed"
        );
        Ok(report)
    }
}

/// Reject input no run could sensibly process.
fn validate(message: &Message, snapshot: &Snapshot) -> Result<()> {
    if message.payload().trim().is_empty() {
        return Err(DispatchError::InvalidInput(format!(
            "{} message has an empty payload",
            message.kind()
        )));
    }
    if let Some(dup) = snapshot.first_duplicate() {
        return Err(DispatchError::InvalidInput(format!(
            "snapshot lists {dup} more than once"
        )));
    }
    Ok(())
}

/// One send, bounded by `timeout`. A panicking sender counts as a transport error.
async fn attempt(
    sender: &dyn DeliverySender,
    destination: Destination,
    message: &Message,
    timeout: Duration,
) -> (Destination, std::result::Result<(), SendError>) {
    let send = AssertUnwindSafe(sender.send(&destination, message)).catch_unwind();
    let result = match tokio::time::timeout(timeout, send).await {
        Ok(Ok(result)) => result,
        Ok(Err(_panic)) => Err(SendError::Transport("sender panicked".to_string())),
        Err(_elapsed) => Err(SendError::Timeout {
            ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    };
    (destination, result)
}

/// Per-run rate-limit pause bookkeeping.
struct Backoff {
    default_wait: Duration,
    ceiling: Duration,
    waited: Duration,
    resume_at: Option<Instant>,
}

impl Backoff {
    fn new(config: &DispatchConfig) -> Self {
        Self {
            default_wait: config.default_backoff(),
            ceiling: config.backoff_ceiling(),
            waited: Duration::ZERO,
            resume_at: None,
        }
    }

    /// Schedule a pause for the advised wait. Returns `false` when the pause
    /// would push the run's cumulative wait past the ceiling.
    fn pause(&mut self, retry_after: Option<Duration>) -> bool {
        self.pause_at(Instant::now(), retry_after)
    }

    /// Only the part of a pause that extends past the current deadline is
    /// charged against the ceiling.
    fn pause_at(&mut self, now: Instant, retry_after: Option<Duration>) -> bool {
        let wait = retry_after.unwrap_or(self.default_wait);
        let at = now + wait;
        let paused_until = self.resume_at.map_or(now, |current| current.max(now));
        let extension = at.saturating_duration_since(paused_until);
        if self.waited + extension > self.ceiling {
            return false;
        }
        if !extension.is_zero() {
            self.waited += extension;
            self.resume_at = Some(at);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff(default_ms: u64, ceiling_ms: u64) -> Backoff {
        Backoff::new(&DispatchConfig {
            default_backoff_ms: default_ms,
            backoff_ceiling_ms: ceiling_ms,
            ..DispatchConfig::default()
        })
    }

    #[test]
    fn zero_wait_never_pauses() {
        let mut b = backoff(100, 1_000);
        assert!(b.pause(Some(Duration::ZERO)));
        assert!(b.resume_at.is_none());
        assert_eq!(b.waited, Duration::ZERO);
    }

    #[test]
    fn missing_hint_uses_default_wait() {
        let mut b = backoff(100, 1_000);
        assert!(b.pause(None));
        assert_eq!(b.waited, Duration::from_millis(100));
        assert!(b.resume_at.is_some());
    }

    #[test]
    fn ceiling_is_cumulative_across_consecutive_pauses() {
        let mut b = backoff(100, 250);
        let ms = Duration::from_millis;
        assert!(b.pause(Some(ms(100))));
        // the dispatcher clears the deadline once the pause has elapsed
        b.resume_at = None;
        assert!(b.pause(Some(ms(100))));
        b.resume_at = None;
        assert!(!b.pause(Some(ms(100))));
        assert_eq!(b.waited, ms(200));
    }

    #[test]
    fn overlapping_pauses_keep_the_later_deadline() {
        let mut b = backoff(0, 10_000);
        b.pause(Some(Duration::from_millis(500)));
        let first = b.resume_at.unwrap();
        b.pause(Some(Duration::from_millis(10)));
        assert_eq!(b.resume_at, Some(first));
        assert_eq!(b.waited, Duration::from_millis(500));
    }

    #[test]
    fn simultaneous_hints_are_charged_once() {
        let mut b = backoff(0, 100);
        let now = Instant::now();
        let hint = Some(Duration::from_millis(40));
        for _ in 0..5 {
            assert!(b.pause_at(now, hint));
        }
        assert_eq!(b.waited, Duration::from_millis(40));
        assert_eq!(b.resume_at, Some(now + Duration::from_millis(40)));
    }

    #[test]
    fn later_hint_is_charged_only_for_its_extension() {
        let mut b = backoff(0, 1_000);
        let now = Instant::now();
        let ms = Duration::from_millis;
        assert!(b.pause_at(now, Some(ms(100))));
        assert!(b.pause_at(now + ms(30), Some(ms(100))));
        assert_eq!(b.waited, ms(130));
        assert_eq!(b.resume_at, Some(now + ms(130)));
    }

    #[test]
    fn ceiling_counts_extensions_not_hints() {
        let mut b = backoff(0, 100);
        let now = Instant::now();
        let ms = Duration::from_millis;
        assert!(b.pause_at(now, Some(ms(60))));
        assert!(b.pause_at(now, Some(ms(60))));
        // 60ms charged so far; another 60ms past the deadline would make 120ms
        assert!(!b.pause_at(now + ms(60), Some(ms(60))));
        assert_eq!(b.waited, ms(60));
    }

    #[test]
    fn empty_payload_is_invalid() {
        let err = validate(&Message::text("   "), &Snapshot::new(Vec::new())).unwrap_err();
        assert!(matches!(err, DispatchError::InvalidInput(_)));
    }
}
