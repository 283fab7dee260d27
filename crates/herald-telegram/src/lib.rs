pub mod adapter;
pub mod commands;
pub mod error;
pub mod handler;
pub mod media;
pub mod owner;
pub mod progress;
pub mod render;
pub mod sender;
pub mod verify;

pub use adapter::TelegramAdapter;
pub use error::TelegramError;
pub use sender::TelegramSender;
