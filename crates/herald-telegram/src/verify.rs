//! Add-time channel check.
//!
//! A channel is registered only once the bot can see it and holds
//! administrator rights there. Handles resolve to the numeric chat id so
//! `@name` and `-100…` for the same channel cannot both be registered.

use teloxide::prelude::*;
use tracing::{debug, info};

use herald_core::DestinationId;

use crate::error::TelegramError;
use crate::sender::recipient;

/// A channel the bot may post to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedChannel {
    pub id: DestinationId,
    pub title: Option<String>,
}

pub async fn verify_channel(bot: &Bot, id: &DestinationId) -> Result<VerifiedChannel, TelegramError> {
    let chat = bot
        .get_chat(recipient(id))
        .await
        .map_err(|e| TelegramError::ChannelNotFound {
            id: id.to_string(),
            reason: e.to_string(),
        })?;

    let me = bot.get_me().await?;
    let member = bot.get_chat_member(chat.id, me.user.id).await?;
    let title = chat.title().map(str::to_string);
    if !member.kind.is_privileged() {
        debug!(destination = %id, chat_id = chat.id.0, "bot lacks admin rights");
        return Err(TelegramError::NotChannelAdmin {
            chat: chat_label(title.as_deref(), id),
        });
    }

    info!(destination = %id, chat_id = chat.id.0, "channel verified");
    Ok(VerifiedChannel {
        id: DestinationId::Numeric(chat.id.0),
        title,
    })
}

/// Human name for a chat: its title when it has one.
pub fn chat_label(title: Option<&str>, id: &DestinationId) -> String {
    match title {
        Some(title) if !title.trim().is_empty() => format!("{title} ({id})"),
        _ => id.to_string(),
    }
}
