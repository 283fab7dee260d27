/// Errors raised by the Telegram surface outside of broadcast delivery.
#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("telegram request failed: {0}")]
    Request(#[from] teloxide::RequestError),

    #[error("telegram.bot_token is empty")]
    MissingToken,

    #[error("telegram.owner_id is not set; every command would be rejected")]
    MissingOwner,

    #[error("channel {id} could not be looked up: {reason}")]
    ChannelNotFound { id: String, reason: String },

    #[error("bot is not an administrator in {chat}")]
    NotChannelAdmin { chat: String },
}
