//! Telegram Bot API transport
//!
//! Long polling brings updates in, `TelegramClient` renders prompts and
//! broadcasts. Only the subset of the Bot API the composer needs is modeled.

mod client;
mod error;
pub mod poller;
pub mod types;

pub use client::TelegramClient;
pub use error::TelegramError;
