//! Live broadcast progress shown by editing one status message.
//!
//! The dispatcher publishes into a `watch` channel (never blocks); a separate
//! task edits the status message with the latest counts at most once per
//! [`EDIT_INTERVAL`]; Telegram throttles frequent edits.

use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::MessageId;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use herald_core::Progress;

use crate::render;

pub const EDIT_INTERVAL: Duration = Duration::from_secs(2);

/// Spawn the status-message editor. Drop the returned sender to stop it.
pub fn spawn_status_updater(
    bot: Bot,
    chat_id: ChatId,
    message_id: MessageId,
) -> (watch::Sender<Option<Progress>>, JoinHandle<()>) {
    let (tx, mut rx) = watch::channel(None::<Progress>);
    let handle = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let Some(progress) = rx.borrow_and_update().clone() else {
                continue;
            };
            if progress.remaining() == 0 {
                // the final report replaces this message
                break;
            }
            if let Err(e) = bot
                .edit_message_text(chat_id, message_id, render::progress(&progress))
                .await
            {
                debug!(error = %e, "status message edit failed");
            }
            tokio::time::sleep(EDIT_INTERVAL).await;
        }
    });
    (tx, handle)
}
