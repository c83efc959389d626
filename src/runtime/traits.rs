//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the runtime with mock implementations.

use crate::finalize::PostRecord;
use crate::session::{MediaKind, MediaRef, MessageRef, UserId};
use crate::sinks::SinkError;
use crate::telegram::TelegramError;
use crate::ui::Prompt;
use async_trait::async_trait;
use std::sync::Arc;

/// Chat transport: renders prompts and forwards media
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a prompt as a new message
    async fn send_prompt(&self, chat: UserId, prompt: &Prompt) -> Result<MessageRef, TelegramError>;

    /// Replace the text and keyboard of a previously sent prompt
    async fn edit_prompt(&self, message: &MessageRef, prompt: &Prompt) -> Result<(), TelegramError>;

    /// Send a media item by handle; `MediaKind::Text` sends the caption alone
    async fn send_media(
        &self,
        chat: UserId,
        kind: MediaKind,
        media: &MediaRef,
        caption: &str,
    ) -> Result<MessageRef, TelegramError>;

    /// Stop the client's spinner for a button press
    async fn acknowledge(&self, callback_id: &str) -> Result<(), TelegramError>;
}

/// Persistent destination for finished posts
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn persist(&self, record: &PostRecord) -> Result<(), SinkError>;
}

/// Channel a finished post is republished to
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast(
        &self,
        kind: MediaKind,
        media: Option<&MediaRef>,
        caption: &str,
    ) -> Result<(), SinkError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send_prompt(&self, chat: UserId, prompt: &Prompt) -> Result<MessageRef, TelegramError> {
        (**self).send_prompt(chat, prompt).await
    }

    async fn edit_prompt(&self, message: &MessageRef, prompt: &Prompt) -> Result<(), TelegramError> {
        (**self).edit_prompt(message, prompt).await
    }

    async fn send_media(
        &self,
        chat: UserId,
        kind: MediaKind,
        media: &MediaRef,
        caption: &str,
    ) -> Result<MessageRef, TelegramError> {
        (**self).send_media(chat, kind, media, caption).await
    }

    async fn acknowledge(&self, callback_id: &str) -> Result<(), TelegramError> {
        (**self).acknowledge(callback_id).await
    }
}

#[async_trait]
impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    async fn persist(&self, record: &PostRecord) -> Result<(), SinkError> {
        (**self).persist(record).await
    }
}

#[async_trait]
impl<T: Broadcaster + ?Sized> Broadcaster for Arc<T> {
    async fn broadcast(
        &self,
        kind: MediaKind,
        media: Option<&MediaRef>,
        caption: &str,
    ) -> Result<(), SinkError> {
        (**self).broadcast(kind, media, caption).await
    }
}
