//! Runtime that drives composition sessions
//!
//! Inbound chat events are routed to one ordered worker per user; each event
//! runs through the pure transition and its effects are executed against the
//! transport and the sinks.

mod dispatch;
mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use dispatch::Dispatcher;
pub use executor::ComposerRuntime;

use crate::session::{MediaRef, MessageRef, UserId};
use crate::sinks::{AirtableStore, ChannelBroadcaster};
use crate::telegram::TelegramClient;
use chrono::NaiveDateTime;
use std::sync::Arc;

/// Type alias for production runtime with concrete implementations
pub type ProductionRuntime =
    ComposerRuntime<Arc<TelegramClient>, AirtableStore, ChannelBroadcaster<Arc<TelegramClient>>>;

/// Source of "now" for transitions
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Local wall-clock time
pub fn system_clock() -> Clock {
    Arc::new(|| chrono::Local::now().naive_local())
}

/// A user action as delivered by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Text and/or media
    Content {
        user: UserId,
        text: Option<String>,
        photo: Option<MediaRef>,
        video: Option<MediaRef>,
    },
    /// A slash command, as typed (`/start`, `/new@Bot`)
    Command { user: UserId, name: String },
    /// A button press
    Callback {
        user: UserId,
        /// Unique per press; redeliveries repeat it
        id: String,
        /// The message carrying the pressed button
        message: Option<MessageRef>,
        token: String,
    },
}

impl Inbound {
    pub fn user(&self) -> UserId {
        match self {
            Inbound::Content { user, .. }
            | Inbound::Command { user, .. }
            | Inbound::Callback { user, .. } => *user,
        }
    }
}
