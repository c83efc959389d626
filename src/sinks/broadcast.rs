//! Republishing finished posts to a channel through the chat transport

use super::SinkError;
use crate::runtime::traits::{Broadcaster, Transport};
use crate::session::{MediaKind, MediaRef, UserId};
use crate::ui::Prompt;
use async_trait::async_trait;

pub struct ChannelBroadcaster<T> {
    transport: T,
    channel: UserId,
}

impl<T: Transport> ChannelBroadcaster<T> {
    pub fn new(transport: T, channel: UserId) -> Self {
        Self { transport, channel }
    }
}

#[async_trait]
impl<T: Transport> Broadcaster for ChannelBroadcaster<T> {
    async fn broadcast(
        &self,
        kind: MediaKind,
        media: Option<&MediaRef>,
        caption: &str,
    ) -> Result<(), SinkError> {
        let sent = match media {
            Some(media) if kind != MediaKind::Text => {
                self.transport
                    .send_media(self.channel, kind, media, caption)
                    .await
            }
            _ => {
                self.transport
                    .send_prompt(self.channel, &Prompt::plain(caption))
                    .await
            }
        };
        sent.map(|_| ())
            .map_err(|e| SinkError::Transport(e.to_string()))
    }
}
