//! Telegram command surface.
//!
//! Wraps a teloxide `Bot` + `Dispatcher` and drives the long-polling event
//! loop until the process exits. No public URL required.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::BotCommand;
use tracing::{info, warn};

use herald_core::config::TelegramConfig;
use herald_dispatch::BroadcastService;

use crate::error::TelegramError;
use crate::handler::handle_message;

pub struct TelegramAdapter {
    bot: Bot,
    service: Arc<BroadcastService>,
    config: TelegramConfig,
}

impl TelegramAdapter {
    /// Fails when the token or the owner id is missing.
    pub fn new(
        bot: Bot,
        config: &TelegramConfig,
        service: Arc<BroadcastService>,
    ) -> Result<Self, TelegramError> {
        if config.bot_token.trim().is_empty() {
            return Err(TelegramError::MissingToken);
        }
        if config.owner_id == 0 {
            return Err(TelegramError::MissingOwner);
        }
        Ok(Self {
            bot,
            service,
            config: config.clone(),
        })
    }

    /// Publish the command menu. Failure only costs the menu, so callers may ignore it.
    pub async fn register_commands(&self) -> Result<(), TelegramError> {
        let commands = vec![
            BotCommand::new("start", "Show help"),
            BotCommand::new("add_channel", "Register a channel"),
            BotCommand::new("remove_channel", "Unregister a channel"),
            BotCommand::new("list_channels", "List registered channels"),
            BotCommand::new("clear_channels", "Remove all channels"),
            BotCommand::new("stats", "Delivery statistics"),
            BotCommand::new("test", "Send a test message to every channel"),
            BotCommand::new("cancel", "Stop running broadcasts"),
            BotCommand::new("myid", "Show your Telegram user id"),
            BotCommand::new("help", "Show help"),
        ];
        self.bot.set_my_commands(commands).await?;
        Ok(())
    }

    /// Drive the long-polling loop. Returns when the dispatcher shuts down.
    pub async fn run(self) {
        if let Err(e) = self.register_commands().await {
            warn!(error = %e, "could not register bot commands");
        }

        info!(owner_id = self.config.owner_id, "Telegram: starting long-polling dispatcher");

        let handler = Update::filter_message().endpoint(handle_message);

        Dispatcher::builder(self.bot, handler)
            .dependencies(dptree::deps![self.service, self.config])
            .default_handler(|_upd| async {})
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }
}
