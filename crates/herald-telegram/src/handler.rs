//! Telegram message handler registered in the teloxide Dispatcher.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::MessageId;
use tracing::{info, warn};

use herald_core::config::TelegramConfig;
use herald_core::{Intent, Message as Outbound};
use herald_dispatch::{BroadcastService, NoProgress};

use crate::commands::{self, Parsed, TEST_MESSAGE};
use crate::{media, owner, progress, render, verify};

/// Runs for every incoming `Message`:
/// 1. Bot-message filter
/// 2. `/myid`, answered for anyone
/// 3. Owner check (deny-by-default)
/// 4. Command interception
/// 5. Payload extraction and a non-blocking broadcast
pub async fn handle_message(
    bot: Bot,
    msg: Message,
    service: Arc<BroadcastService>,
    config: TelegramConfig,
) -> ResponseResult<()> {
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    if from.is_bot {
        return Ok(());
    }
    let user_id = from.id.0;
    let parsed = msg.text().and_then(commands::parse);

    if parsed == Some(Parsed::WhoAmI) {
        bot.send_message(msg.chat.id, render::my_id(user_id)).await?;
        return Ok(());
    }

    if !owner::is_owner(config.owner_id, user_id) {
        warn!(user_id, "rejected message from non-owner");
        bot.send_message(msg.chat.id, render::unauthorized(user_id))
            .await?;
        return Ok(());
    }

    if let Some(parsed) = parsed {
        let text = match parsed {
            Parsed::Reply(text) => text,
            Parsed::WhoAmI => render::my_id(user_id),
            Parsed::TestBroadcast => {
                return start_broadcast(bot, service, Outbound::text(TEST_MESSAGE), msg.chat.id)
                    .await;
            }
            Parsed::Intent(Intent::AddDestination { id }) if config.verify_channels => {
                match verify::verify_channel(&bot, &id).await {
                    Ok(channel) => {
                        info!(user_id, destination = %channel.id, "operator command");
                        let mut text =
                            run_intent(&service, Intent::AddDestination { id: channel.id }).await;
                        if let Some(title) = channel.title {
                            text.push_str(&format!("\n• Title: {title}"));
                        }
                        text
                    }
                    Err(e) => {
                        warn!(destination = %id, error = %e, "channel failed verification");
                        render::verify_error(&e)
                    }
                }
            }
            Parsed::Intent(intent) => {
                info!(user_id, intent = intent.name(), "operator command");
                run_intent(&service, intent).await
            }
        };
        for chunk in render::split_chunks(&text) {
            bot.send_message(msg.chat.id, chunk).await?;
        }
        return Ok(());
    }

    let Some(outbound) = media::extract(&msg) else {
        return Ok(());
    };
    start_broadcast(bot, service, outbound, msg.chat.id).await
}

async fn run_intent(service: &BroadcastService, intent: Intent) -> String {
    match service.handle(intent, &NoProgress).await {
        Ok(reply) => render::reply(&reply, service.registry().size()),
        Err(e) => render::error(&e),
    }
}

/// Post the status message, then run the broadcast in the background so
/// `/cancel` is handled while it runs.
async fn start_broadcast(
    bot: Bot,
    service: Arc<BroadcastService>,
    outbound: Outbound,
    chat_id: ChatId,
) -> ResponseResult<()> {
    let registered = service.registry().size();
    if registered == 0 {
        bot.send_message(chat_id, render::no_destinations()).await?;
        return Ok(());
    }

    let status = bot
        .send_message(chat_id, render::broadcast_started(registered))
        .await?;
    tokio::spawn(run_broadcast(bot, service, outbound, chat_id, status.id));
    Ok(())
}

async fn run_broadcast(
    bot: Bot,
    service: Arc<BroadcastService>,
    message: Outbound,
    chat_id: ChatId,
    status_id: MessageId,
) {
    let (progress, updater) = progress::spawn_status_updater(bot.clone(), chat_id, status_id);
    let result = service
        .handle(Intent::Broadcast { message }, &progress)
        .await;
    drop(progress);
    if let Err(e) = updater.await {
        warn!(error = %e, "status updater task failed");
    }

    let text = match result {
        Ok(reply) => render::reply(&reply, service.registry().size()),
        Err(e) => render::error(&e),
    };
    // the report may outgrow one message; the first chunk replaces the status
    let mut chunks = render::split_chunks(&text).into_iter();
    if let Some(first) = chunks.next() {
        if let Err(e) = bot.edit_message_text(chat_id, status_id, first.clone()).await {
            warn!(error = %e, "could not edit status message; sending report instead");
            if let Err(e) = bot.send_message(chat_id, first).await {
                warn!(error = %e, "could not deliver broadcast report");
            }
        }
    }
    for chunk in chunks {
        if let Err(e) = bot.send_message(chat_id, chunk).await {
            warn!(error = %e, "could not deliver broadcast report");
        }
    }
}
