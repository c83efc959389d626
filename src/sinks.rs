//! Destinations a finished post is delivered to

pub mod airtable;
pub mod broadcast;

pub use airtable::AirtableStore;
pub use broadcast::ChannelBroadcaster;

use thiserror::Error;

/// Failure of a single sink
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The destination answered, but not with success
    #[error("HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The destination could not be reached
    #[error("{0}")]
    Transport(String),
}
