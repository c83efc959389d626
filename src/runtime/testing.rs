//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::{Broadcaster, RecordStore, Transport};
use super::Clock;
use crate::finalize::PostRecord;
use crate::session::{MediaKind, MediaRef, MessageRef, UserId};
use crate::sinks::SinkError;
use crate::telegram::TelegramError;
use crate::ui::{Keyboard, Prompt};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::sync::{Arc, Mutex};

/// A clock frozen at `now`
pub fn fixed_clock(now: NaiveDateTime) -> Clock {
    Arc::new(move || now)
}

// ============================================================================
// Mock Transport
// ============================================================================

/// Everything a `MockTransport` was asked to deliver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Prompt {
        chat: UserId,
        message_id: i64,
        text: String,
        keyboard: Keyboard,
    },
    Edit {
        message: MessageRef,
        text: String,
        keyboard: Keyboard,
    },
    Media {
        chat: UserId,
        kind: MediaKind,
        media: MediaRef,
        caption: String,
    },
}

impl Sent {
    pub fn text(&self) -> &str {
        match self {
            Sent::Prompt { text, .. } | Sent::Edit { text, .. } => text,
            Sent::Media { caption, .. } => caption,
        }
    }

    pub fn keyboard(&self) -> Option<&Keyboard> {
        match self {
            Sent::Prompt { keyboard, .. } | Sent::Edit { keyboard, .. } => Some(keyboard),
            Sent::Media { .. } => None,
        }
    }
}

/// Transport that records deliveries and hands out increasing message ids
#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<Sent>>,
    acknowledged: Mutex<Vec<String>>,
    next_id: Mutex<i64>,
    fail_next: Mutex<Option<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next delivery fail with an API error
    pub fn fail_next(&self, message: impl Into<String>) {
        *self.fail_next.lock().unwrap() = Some(message.into());
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn acknowledged(&self) -> Vec<String> {
        self.acknowledged.lock().unwrap().clone()
    }

    /// The most recent message that carries a keyboard
    pub fn last_keyboard(&self) -> Option<Keyboard> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|s| s.keyboard().filter(|k| !k.is_empty()).cloned())
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    fn take_failure(&self) -> Result<(), TelegramError> {
        match self.fail_next.lock().unwrap().take() {
            Some(message) => Err(TelegramError::api(message)),
            None => Ok(()),
        }
    }

    fn next_message(&self, chat: UserId) -> MessageRef {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        MessageRef {
            chat,
            message_id: *next,
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_prompt(&self, chat: UserId, prompt: &Prompt) -> Result<MessageRef, TelegramError> {
        self.take_failure()?;
        let message = self.next_message(chat);
        self.sent.lock().unwrap().push(Sent::Prompt {
            chat,
            message_id: message.message_id,
            text: prompt.text.clone(),
            keyboard: prompt.keyboard.clone(),
        });
        Ok(message)
    }

    async fn edit_prompt(&self, message: &MessageRef, prompt: &Prompt) -> Result<(), TelegramError> {
        self.take_failure()?;
        self.sent.lock().unwrap().push(Sent::Edit {
            message: *message,
            text: prompt.text.clone(),
            keyboard: prompt.keyboard.clone(),
        });
        Ok(())
    }

    async fn send_media(
        &self,
        chat: UserId,
        kind: MediaKind,
        media: &MediaRef,
        caption: &str,
    ) -> Result<MessageRef, TelegramError> {
        self.take_failure()?;
        self.sent.lock().unwrap().push(Sent::Media {
            chat,
            kind,
            media: media.clone(),
            caption: caption.to_string(),
        });
        Ok(self.next_message(chat))
    }

    async fn acknowledge(&self, callback_id: &str) -> Result<(), TelegramError> {
        self.acknowledged
            .lock()
            .unwrap()
            .push(callback_id.to_string());
        Ok(())
    }
}

// ============================================================================
// Mock Sinks
// ============================================================================

/// Record store that keeps records in memory, or rejects them
#[derive(Default)]
pub struct MockRecordStore {
    records: Mutex<Vec<PostRecord>>,
    failure: Mutex<Option<String>>,
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every record from now on with a 422 carrying `body`
    pub fn fail_with(&self, body: impl Into<String>) {
        *self.failure.lock().unwrap() = Some(body.into());
    }

    pub fn records(&self) -> Vec<PostRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordStore for MockRecordStore {
    async fn persist(&self, record: &PostRecord) -> Result<(), SinkError> {
        if let Some(body) = self.failure.lock().unwrap().clone() {
            return Err(SinkError::Rejected { status: 422, body });
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Broadcaster that records what it would have published
#[derive(Default)]
pub struct MockBroadcaster {
    sent: Mutex<Vec<(MediaKind, Option<MediaRef>, String)>>,
    failure: Mutex<Option<String>>,
}

impl MockBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.failure.lock().unwrap() = Some(reason.into());
    }

    pub fn sent(&self) -> Vec<(MediaKind, Option<MediaRef>, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Broadcaster for MockBroadcaster {
    async fn broadcast(
        &self,
        kind: MediaKind,
        media: Option<&MediaRef>,
        caption: &str,
    ) -> Result<(), SinkError> {
        if let Some(reason) = self.failure.lock().unwrap().clone() {
            return Err(SinkError::Transport(reason));
        }
        self.sent
            .lock()
            .unwrap()
            .push((kind, media.cloned(), caption.to_string()));
        Ok(())
    }
}
