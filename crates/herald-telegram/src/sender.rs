//! Telegram implementation of [`DeliverySender`].

use std::time::Duration;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageEntity, Recipient};
use teloxide::RequestError;
use tracing::warn;

use herald_core::{Destination, DestinationId, Message as Outbound, MessageKind};
use herald_dispatch::{DeliverySender, SendError};

/// Delivers broadcast payloads through the Bot API.
#[derive(Clone)]
pub struct TelegramSender {
    bot: Bot,
}

impl TelegramSender {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

/// Send a captionable media request, attaching the caption and its
/// formatting when present.
macro_rules! with_caption {
    ($request:expr, $caption:expr, $spans:expr) => {{
        let mut req = $request;
        if let Some(caption) = $caption {
            req = req.caption(caption);
            if let Some(spans) = $spans {
                req = req.caption_entities(spans);
            }
        }
        req.await.map(drop)
    }};
}

#[async_trait]
impl DeliverySender for TelegramSender {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, destination: &Destination, message: &Outbound) -> Result<(), SendError> {
        let to = recipient(&destination.id);
        let file = || InputFile::file_id(message.payload().to_string());
        let caption = message.caption();
        let spans = decode_entities(message);

        let result = match message.kind() {
            MessageKind::Text => {
                let mut req = self.bot.send_message(to, message.payload());
                if let Some(spans) = spans {
                    req = req.entities(spans);
                }
                req.await.map(drop)
            }
            MessageKind::Photo => with_caption!(self.bot.send_photo(to, file()), caption, spans),
            MessageKind::Video => with_caption!(self.bot.send_video(to, file()), caption, spans),
            MessageKind::Document => {
                with_caption!(self.bot.send_document(to, file()), caption, spans)
            }
            MessageKind::Audio => with_caption!(self.bot.send_audio(to, file()), caption, spans),
            MessageKind::Voice => with_caption!(self.bot.send_voice(to, file()), caption, spans),
            MessageKind::Animation => {
                with_caption!(self.bot.send_animation(to, file()), caption, spans)
            }
            MessageKind::Sticker => self.bot.send_sticker(to, file()).await.map(drop),
            MessageKind::Other(tag) => {
                return Err(SendError::Transport(format!(
                    "telegram cannot send {tag} messages"
                )))
            }
        };
        result.map_err(classify)
    }
}

/// Formatting captured by [`crate::media::extract`]; unreadable spans are
/// dropped so the message still goes out unformatted.
fn decode_entities(message: &Outbound) -> Option<Vec<MessageEntity>> {
    let raw = message.entities()?;
    match serde_json::from_value(raw.clone()) {
        Ok(spans) => Some(spans),
        Err(e) => {
            warn!(error = %e, "dropping unreadable formatting entities");
            None
        }
    }
}

/// Numeric ids address the chat directly; handles go through `@username`.
pub(crate) fn recipient(id: &DestinationId) -> Recipient {
    match id {
        DestinationId::Numeric(n) => Recipient::Id(ChatId(*n)),
        DestinationId::Handle(name) => Recipient::ChannelUsername(format!("@{name}")),
    }
}

fn classify(err: RequestError) -> SendError {
    match err {
        RequestError::RetryAfter(wait) => SendError::RateLimited {
            retry_after: Some(wait.duration()),
        },
        RequestError::MigrateToChatId(new_id) => {
            SendError::DestinationGone(format!("chat migrated to {}", new_id.0))
        }
        RequestError::Api(api) => classify_api(&api.to_string()),
        other => SendError::Transport(other.to_string()),
    }
}

/// Map a Bot API error description onto a failure class.
fn classify_api(description: &str) -> SendError {
    let lower = description.to_ascii_lowercase();
    let any = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if any(&["too many requests", "retry after"]) {
        SendError::RateLimited {
            retry_after: retry_hint(&lower),
        }
    } else if any(&[
        "not enough rights",
        "have no rights",
        "need administrator rights",
        "chat_write_forbidden",
        "not a member",
        "chat_admin_required",
    ]) {
        SendError::NotAdmin(description.to_string())
    } else if any(&[
        "chat not found",
        "kicked",
        "deactivated",
        "blocked by the user",
        "channel_private",
        "chat was deleted",
        "upgraded to a supergroup",
    ]) {
        SendError::DestinationGone(description.to_string())
    } else {
        SendError::Transport(description.to_string())
    }
}

/// Pull `retry after N` seconds out of a description, when present.
fn retry_hint(lower: &str) -> Option<Duration> {
    let (_, tail) = lower.split_once("retry after")?;
    let secs: String = tail
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    secs.parse().ok().map(Duration::from_secs)
}
