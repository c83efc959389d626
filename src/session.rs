//! Per-user composition sessions and the keyed store that owns them

use crate::platform::PlatformSet;
use crate::state_machine::event::ContentPayload;
use crate::state_machine::ComposeState;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// How many handled callback ids a slot remembers for duplicate suppression
const RECENT_CALLBACKS: usize = 32;

/// Stable identity of the composing user (their private chat id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque media handle understood by the transport
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaRef(pub String);

impl MediaRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Text,
    Photo,
    Video,
}

/// A message previously sent by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat: UserId,
    pub message_id: i64,
}

/// The in-progress post of one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub state: ComposeState,
    pub text: Option<String>,
    pub photo: Option<MediaRef>,
    pub video: Option<MediaRef>,
    /// Absent means "publish immediately"
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<NaiveTime>,
    pub platforms: PlatformSet,
    pub created_at: NaiveDateTime,
    pub touched_at: NaiveDateTime,
    /// Last prompt sent for this session; in-place re-renders edit it
    pub prompt: Option<MessageRef>,
}

impl Session {
    /// A fresh session that is waiting for content
    pub fn new(user_id: UserId, now: NaiveDateTime) -> Self {
        Self {
            user_id,
            state: ComposeState::AwaitingContent,
            text: None,
            photo: None,
            video: None,
            scheduled_date: None,
            scheduled_time: None,
            platforms: PlatformSet::new(),
            created_at: now,
            touched_at: now,
            prompt: None,
        }
    }

    /// Placeholder for a user with no open session
    pub fn idle(user_id: UserId, now: NaiveDateTime) -> Self {
        Self {
            state: ComposeState::Idle,
            ..Self::new(user_id, now)
        }
    }

    /// Merge content, never overwriting a filled field with an empty one
    pub fn merge_content(&mut self, content: ContentPayload) {
        if let Some(text) = content.text.filter(|t| !t.trim().is_empty()) {
            self.text = Some(text);
        }
        if let Some(photo) = content.photo {
            self.photo = Some(photo);
        }
        if let Some(video) = content.video {
            self.video = Some(video);
        }
    }
}

/// One user's entry in the store
#[derive(Debug, Default)]
pub struct Slot {
    session: Option<Session>,
    recent_callbacks: VecDeque<String>,
}

impl Slot {
    pub fn get(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn upsert(&mut self, session: Session) {
        self.session = Some(session);
    }

    pub fn delete(&mut self) -> Option<Session> {
        self.session.take()
    }

    /// Record a callback id; returns `false` if it was already handled
    pub fn remember_callback(&mut self, id: &str) -> bool {
        if self.recent_callbacks.iter().any(|seen| seen == id) {
            return false;
        }
        if self.recent_callbacks.len() == RECENT_CALLBACKS {
            self.recent_callbacks.pop_front();
        }
        self.recent_callbacks.push_back(id.to_string());
        true
    }
}

/// Sessions keyed by user, with mutual exclusion per key
#[derive(Debug, Default)]
pub struct SessionStore {
    slots: RwLock<HashMap<UserId, Arc<Mutex<Slot>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclusive access to one user's slot, created on first use
    pub async fn lock(&self, user: UserId) -> OwnedMutexGuard<Slot> {
        let existing = self.slots.read().await.get(&user).cloned();
        let slot = match existing {
            Some(slot) => slot,
            None => self
                .slots
                .write()
                .await
                .entry(user)
                .or_default()
                .clone(),
        };
        slot.lock_owned().await
    }

    #[allow(dead_code)] // Snapshot for tests and debugging
    pub async fn get(&self, user: UserId) -> Option<Session> {
        let slot = self.slots.read().await.get(&user).cloned()?;
        let session = slot.lock().await.get().cloned();
        session
    }

    /// Unlock a slot, dropping it from the store when it holds no session
    /// and nobody else is waiting on it
    pub async fn release(&self, user: UserId, slot: OwnedMutexGuard<Slot>) {
        let empty = slot.get().is_none();
        drop(slot);
        if !empty {
            return;
        }
        let mut slots = self.slots.write().await;
        let unused = slots.get(&user).is_some_and(|slot| {
            Arc::strong_count(slot) == 1 && slot.try_lock().is_ok_and(|guard| guard.get().is_none())
        });
        if unused {
            slots.remove(&user);
        }
    }

    /// Sessions currently open; slots busy in a handler count as open
    pub async fn active_sessions(&self) -> usize {
        let slots = self.slots.read().await;
        slots
            .values()
            .filter(|slot| match slot.try_lock() {
                Ok(guard) => guard.get().is_some(),
                Err(_) => true,
            })
            .count()
    }

    /// Drop sessions untouched since `cutoff`. Busy slots are skipped.
    pub async fn evict_untouched_since(&self, cutoff: NaiveDateTime) -> usize {
        let mut slots = self.slots.write().await;
        let mut evicted = 0;
        for slot in slots.values() {
            if let Ok(mut guard) = slot.try_lock() {
                if guard.get().is_some_and(|s| s.touched_at < cutoff) {
                    guard.delete();
                    evicted += 1;
                }
            }
        }
        // No new clones can be taken while we hold the write lock
        slots.retain(|_, slot| {
            Arc::strong_count(slot) > 1 || slot.try_lock().map_or(true, |g| g.get().is_some())
        });
        evicted
    }
}
