//! Composition states and the immutable context transitions read

use crate::calendar::CalendarLayout;
use crate::platform::PlatformCatalog;
use serde::{Deserialize, Serialize};

/// Where a user is in composing a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ComposeState {
    /// No post in progress
    #[default]
    Idle,
    /// Waiting for text, photo or video (or a skip)
    AwaitingContent,
    /// Waiting for a calendar pick, manual date or "publish now"
    AwaitingDate,
    /// Waiting for hour/minute picks; only when time granularity is enabled
    AwaitingTime,
    /// Toggling target platforms until confirm
    AwaitingPlatforms,
}

impl ComposeState {
    pub fn as_str(self) -> &'static str {
        match self {
            ComposeState::Idle => "idle",
            ComposeState::AwaitingContent => "awaiting_content",
            ComposeState::AwaitingDate => "awaiting_date",
            ComposeState::AwaitingTime => "awaiting_time",
            ComposeState::AwaitingPlatforms => "awaiting_platforms",
        }
    }

    /// Whether a post is being composed
    pub fn is_composing(self) -> bool {
        self != ComposeState::Idle
    }
}

/// Deployment policy the transition function consults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeContext {
    pub platforms: PlatformCatalog,
    pub calendar: CalendarLayout,
    /// Ask for a time of day after the date
    pub pick_time: bool,
}

impl Default for ComposeContext {
    fn default() -> Self {
        Self {
            platforms: PlatformCatalog::default(),
            calendar: CalendarLayout::Month,
            pick_time: true,
        }
    }
}
