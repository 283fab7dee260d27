//! Operator-facing progress sinks.
//!
//! A sink sees cumulative counts after every outcome. Delivery is advisory:
//! [`ProgressSink::on_progress`] is synchronous and must return immediately,
//! and an update that cannot be delivered is dropped, never retried.

use tokio::sync::{mpsc, watch};
use tracing::debug;

use herald_core::Progress;

pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, progress: &Progress);
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _progress: &Progress) {}
}

/// Bounded queue; updates are dropped when the consumer lags or has gone away.
impl ProgressSink for mpsc::Sender<Progress> {
    fn on_progress(&self, progress: &Progress) {
        if let Err(e) = self.try_send(progress.clone()) {
            debug!(run_id = %progress.run_id, error = %e, "progress update dropped");
        }
    }
}

/// Latest-value cell; a slow reader only ever sees the newest counts.
impl ProgressSink for watch::Sender<Option<Progress>> {
    fn on_progress(&self, progress: &Progress) {
        self.send_replace(Some(progress.clone()));
    }
}

impl<F> ProgressSink for F
where
    F: Fn(&Progress) + Send + Sync,
{
    fn on_progress(&self, progress: &Progress) {
        self(progress)
    }
}

#[cfg(test)]
mod tests {
    use herald_core::RunId;

    use super::*;

    fn progress(done: usize) -> Progress {
        Progress {
            run_id: RunId("run".to_string()),
            total: 10,
            succeeded: done,
            failed: 0,
        }
    }

    #[test]
    fn full_queue_drops_instead_of_blocking() {
        let (tx, mut rx) = mpsc::channel(1);
        tx.on_progress(&progress(1));
        tx.on_progress(&progress(2));
        assert_eq!(rx.try_recv().unwrap().succeeded, 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn closed_queue_is_ignored() {
        let (tx, rx) = mpsc::channel::<Progress>(1);
        drop(rx);
        tx.on_progress(&progress(1));
    }

    #[test]
    fn watch_keeps_only_latest() {
        let (tx, rx) = watch::channel(None);
        tx.on_progress(&progress(1));
        tx.on_progress(&progress(2));
        assert_eq!(rx.borrow().as_ref().map(|p| p.succeeded), Some(2));
    }
}
