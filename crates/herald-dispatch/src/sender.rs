use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use herald_core::{Destination, FailureReason, Message};

/// Why the transport could not deliver to one destination.
#[derive(Debug, Error)]
pub enum SendError {
    /// The bot is not (or no longer) allowed to post in the destination.
    #[error("Bot lacks posting rights: {0}")]
    NotAdmin(String),

    /// The destination was deleted or the bot was removed from it.
    #[error("Destination unavailable: {0}")]
    DestinationGone(String),

    /// The transport is throttling us; `retry_after` is its advisory wait.
    #[error("Rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// Network or protocol failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The send exceeded its time budget.
    #[error("Send timed out after {ms}ms")]
    Timeout { ms: u64 },
}

impl SendError {
    /// Failure reason recorded in the broadcast report.
    pub fn reason(&self) -> FailureReason {
        match self {
            SendError::NotAdmin(_) => FailureReason::NotAdmin,
            SendError::DestinationGone(_) => FailureReason::DestinationGone,
            SendError::RateLimited { .. } => FailureReason::RateLimited,
            SendError::Transport(_) | SendError::Timeout { .. } => FailureReason::Unknown,
        }
    }
}

/// Delivery capability injected into the dispatcher: one message to one destination.
///
/// Implementations must be `Send + Sync`: the dispatcher keeps several sends
/// in flight against the same sender through a shared reference.
#[async_trait]
pub trait DeliverySender: Send + Sync {
    /// Stable lowercase name for logs (e.g. `"telegram"`).
    fn name(&self) -> &str;

    /// Deliver `message` to `destination` exactly once. No retries.
    async fn send(&self, destination: &Destination, message: &Message) -> Result<(), SendError>;
}
