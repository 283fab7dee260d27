use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use herald_core::{BroadcastReport, Destination, Intent, Message};
use herald_registry::DestinationRegistry;

use crate::dispatcher::Dispatcher;
use crate::progress::ProgressSink;
use crate::sender::DeliverySender;
use crate::stats::{BroadcastStats, StatsSnapshot};

/// Result of one intent, ready for the command surface to render.
#[derive(Debug, Clone)]
pub enum IntentReply {
    Added(Destination),
    Removed(Destination),
    Cleared(usize),
    Listed(Vec<Destination>),
    Broadcast(BroadcastReport),
    Stats(StatsSnapshot),
    /// Running broadcasts were told to stop starting new sends.
    Cancelled,
}

/// Owns the registry, dispatcher and running stats; the single entry point
/// for operator intents.
pub struct BroadcastService {
    registry: Arc<DestinationRegistry>,
    dispatcher: Dispatcher,
    sender: Arc<dyn DeliverySender>,
    stats: BroadcastStats,
    /// Parent of every running broadcast's token; replaced after each cancel.
    cancel: Mutex<CancellationToken>,
}

impl BroadcastService {
    pub fn new(
        registry: Arc<DestinationRegistry>,
        dispatcher: Dispatcher,
        sender: Arc<dyn DeliverySender>,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            sender,
            stats: BroadcastStats::new(),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn registry(&self) -> &Arc<DestinationRegistry> {
        &self.registry
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot(self.registry.size())
    }

    /// Apply one validated intent.
    ///
    /// Registry validation errors and invalid broadcast input come back as
    /// `Err`; delivery failures are inside the `Broadcast` reply.
    pub async fn handle(
        &self,
        intent: Intent,
        progress: &dyn ProgressSink,
    ) -> herald_core::Result<IntentReply> {
        debug!(intent = intent.name(), "handling intent");
        let reply = match intent {
            Intent::AddDestination { id } => IntentReply::Added(self.registry.add(id)?),
            Intent::RemoveDestination { selector } => {
                IntentReply::Removed(self.registry.remove(&selector)?)
            }
            Intent::ClearDestinations => IntentReply::Cleared(self.registry.clear()),
            Intent::ListDestinations => IntentReply::Listed(self.registry.list()),
            Intent::Broadcast { message } => {
                IntentReply::Broadcast(self.broadcast(&message, progress).await?)
            }
            Intent::QueryStats => IntentReply::Stats(self.stats()),
            Intent::CancelBroadcasts => {
                self.cancel_broadcasts();
                IntentReply::Cancelled
            }
        };
        Ok(reply)
    }

    /// Snapshot the registry and broadcast `message` to it.
    pub async fn broadcast(
        &self,
        message: &Message,
        progress: &dyn ProgressSink,
    ) -> herald_core::Result<BroadcastReport> {
        let snapshot = self.registry.snapshot();
        let cancel = self
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .child_token();

        let report = self
            .dispatcher
            .dispatch_with_cancel(message, snapshot, self.sender.as_ref(), progress, &cancel)
            .await?;
        self.stats.record(&report);
        Ok(report)
    }

    /// Cancel every running broadcast. Broadcasts started afterwards are unaffected.
    pub fn cancel_broadcasts(&self) {
        let mut token = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        token.cancel();
        *token = CancellationToken::new();
        info!("running broadcasts cancelled");
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use herald_core::config::DispatchConfig;
    use herald_core::{DestinationId, HeraldError, Selector};

    use super::*;
    use crate::progress::NoProgress;
    use crate::sender::SendError;

    struct AlwaysOk;

    #[async_trait]
    impl DeliverySender for AlwaysOk {
        fn name(&self) -> &str {
            "always-ok"
        }

        async fn send(&self, _: &Destination, _: &Message) -> Result<(), SendError> {
            Ok(())
        }
    }

    fn service() -> BroadcastService {
        BroadcastService::new(
            Arc::new(DestinationRegistry::new()),
            Dispatcher::new(DispatchConfig::default()),
            Arc::new(AlwaysOk),
        )
    }

    fn add(id: &str) -> Intent {
        Intent::AddDestination {
            id: id.parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn duplicate_add_surfaces_validation_error() {
        let svc = service();
        svc.handle(add("@chan1"), &NoProgress).await.unwrap();
        let err = svc.handle(add("@chan1"), &NoProgress).await.unwrap_err();
        assert!(matches!(err, HeraldError::DuplicateDestination { .. }));
        assert!(err.is_validation());
        assert_eq!(svc.registry().size(), 1);
    }

    #[tokio::test]
    async fn remove_list_and_clear_map_to_registry() {
        let svc = service();
        for id in ["@a_chan", "@b_chan", "@c_chan"] {
            svc.handle(add(id), &NoProgress).await.unwrap();
        }

        let removed = svc
            .handle(
                Intent::RemoveDestination {
                    selector: Selector::Position(2),
                },
                &NoProgress,
            )
            .await
            .unwrap();
        assert!(matches!(removed, IntentReply::Removed(d) if d.id == DestinationId::Handle("b_chan".into())));

        match svc.handle(Intent::ListDestinations, &NoProgress).await.unwrap() {
            IntentReply::Listed(list) => assert_eq!(list.len(), 2),
            other => panic!("unexpected reply: {other:?}"),
        }

        let cleared = svc.handle(Intent::ClearDestinations, &NoProgress).await.unwrap();
        assert!(matches!(cleared, IntentReply::Cleared(2)));
    }

    #[tokio::test]
    async fn broadcasts_feed_running_stats() {
        let svc = service();
        svc.handle(add("-1001"), &NoProgress).await.unwrap();
        svc.handle(add("-1002"), &NoProgress).await.unwrap();

        let message = Message::text("hello");
        for _ in 0..2 {
            svc.handle(
                Intent::Broadcast {
                    message: message.clone(),
                },
                &NoProgress,
            )
            .await
            .unwrap();
        }

        match svc.handle(Intent::QueryStats, &NoProgress).await.unwrap() {
            IntentReply::Stats(stats) => {
                assert_eq!(stats.registered_destinations, 2);
                assert_eq!(stats.broadcasts, 2);
                assert_eq!(stats.deliveries_succeeded, 4);
                assert_eq!(stats.deliveries_failed, 0);
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_message_is_rejected_without_recording_stats() {
        let svc = service();
        svc.handle(add("-1001"), &NoProgress).await.unwrap();
        let err = svc
            .handle(
                Intent::Broadcast {
                    message: Message::text(""),
                },
                &NoProgress,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
        assert_eq!(svc.stats().broadcasts, 0);
    }

    #[tokio::test]
    async fn cancel_does_not_affect_later_broadcasts() {
        let svc = service();
        svc.handle(add("-1001"), &NoProgress).await.unwrap();
        svc.handle(Intent::CancelBroadcasts, &NoProgress).await.unwrap();

        let report = svc
            .broadcast(&Message::text("after cancel"), &NoProgress)
            .await
            .unwrap();
        assert_eq!(report.succeeded, 1);
    }
}
