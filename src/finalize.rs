//! Turning a confirmed session into a record and delivering it to the sinks

use crate::platform::PlatformCatalog;
use crate::runtime::traits::{Broadcaster, RecordStore};
use crate::session::{MediaKind, MediaRef, Session, UserId};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use uuid::Uuid;

/// Caption used when a post has no text
pub const EMPTY_CAPTION: &str = "📝 Пост без текста.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PostStatus {
    Scheduled,
}

impl PostStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Scheduled => "Scheduled",
        }
    }
}

/// The immutable output of a completed composition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostRecord {
    pub user_id: UserId,
    pub text: Option<String>,
    pub photo: Option<MediaRef>,
    pub video: Option<MediaRef>,
    /// Selected platform ids, in catalog order
    pub platforms: Vec<String>,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: Option<NaiveTime>,
    pub created_at: NaiveDateTime,
    pub status: PostStatus,
}

impl PostRecord {
    /// Snapshot a session. A missing date means "publish now" and resolves to today.
    pub fn from_session(session: &Session, catalog: &PlatformCatalog, now: NaiveDateTime) -> Self {
        Self {
            user_id: session.user_id,
            text: session.text.clone(),
            photo: session.photo.clone(),
            video: session.video.clone(),
            platforms: catalog.ordered(&session.platforms),
            scheduled_date: session.scheduled_date.unwrap_or_else(|| now.date()),
            scheduled_time: session.scheduled_time,
            created_at: session.created_at,
            status: PostStatus::Scheduled,
        }
    }

    pub fn targets(&self, platform: &str) -> bool {
        self.platforms.iter().any(|p| p == platform)
    }

    /// The single media item a broadcast carries: video, else photo, else none
    pub fn broadcast_media(&self) -> (MediaKind, Option<&MediaRef>) {
        match (&self.video, &self.photo) {
            (Some(video), _) => (MediaKind::Video, Some(video)),
            (None, Some(photo)) => (MediaKind::Photo, Some(photo)),
            (None, None) => (MediaKind::Text, None),
        }
    }

    pub fn caption(&self) -> &str {
        self.text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(EMPTY_CAPTION)
    }
}

/// What happened to one sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOutcome {
    /// Not configured, or not targeted by the record
    Skipped,
    Delivered,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeReport {
    pub submission: Uuid,
    pub store: SinkOutcome,
    pub broadcast: SinkOutcome,
}

/// Delivers records to the optional store and broadcast sinks
///
/// The two sinks are independent: a failure in one never prevents the other.
pub struct FinalizeService<S, B> {
    store: Option<S>,
    broadcaster: Option<B>,
    broadcast_platform: String,
}

impl<S: RecordStore, B: Broadcaster> FinalizeService<S, B> {
    pub fn new(store: Option<S>, broadcaster: Option<B>, broadcast_platform: impl Into<String>) -> Self {
        Self {
            store,
            broadcaster,
            broadcast_platform: broadcast_platform.into(),
        }
    }

    pub async fn finalize(&self, record: &PostRecord) -> FinalizeReport {
        let submission = Uuid::new_v4();

        let store = match &self.store {
            None => SinkOutcome::Skipped,
            Some(store) => match store.persist(record).await {
                Ok(()) => {
                    tracing::info!(%submission, user = %record.user_id, "Post stored");
                    SinkOutcome::Delivered
                }
                Err(e) => {
                    tracing::warn!(%submission, user = %record.user_id, error = %e, "Storing post failed");
                    SinkOutcome::Failed(e.to_string())
                }
            },
        };

        let broadcast = match &self.broadcaster {
            Some(broadcaster) if record.targets(&self.broadcast_platform) => {
                let (kind, media) = record.broadcast_media();
                match broadcaster.broadcast(kind, media, record.caption()).await {
                    Ok(()) => {
                        tracing::info!(%submission, ?kind, "Post broadcast");
                        SinkOutcome::Delivered
                    }
                    Err(e) => {
                        tracing::warn!(%submission, ?kind, error = %e, "Broadcast failed");
                        SinkOutcome::Failed(e.to_string())
                    }
                }
            }
            _ => SinkOutcome::Skipped,
        };

        FinalizeReport {
            submission,
            store,
            broadcast,
        }
    }
}
