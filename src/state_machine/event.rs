//! Events that drive a composition session

use crate::session::MediaRef;
use crate::ui::Action;
use chrono::NaiveDate;

/// Content carried by an inbound message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentPayload {
    pub text: Option<String>,
    pub photo: Option<MediaRef>,
    pub video: Option<MediaRef>,
}

impl ContentPayload {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // Commands
    Start,
    NewPost,
    Cancel,

    // Content step
    Content(ContentPayload),
    SkipContent,

    // Date step
    PickDate(NaiveDate),
    ManualEntry,
    PublishNow,

    // Time step
    PickHour(u32),
    PickMinute(u32),
    TimeDone,

    // Platform step
    TogglePlatform(String),
    Confirm,
}

impl Event {
    /// Map a chat command (`/start`, `/new@SomeBot`, ...) to an event
    pub fn from_command(name: &str) -> Option<Self> {
        let name = name.trim_start_matches('/');
        let name = name.split_once('@').map_or(name, |(name, _)| name);
        match name.to_ascii_lowercase().as_str() {
            "start" => Some(Event::Start),
            "new" => Some(Event::NewPost),
            "cancel" => Some(Event::Cancel),
            _ => None,
        }
    }

    /// Map a decoded button action to an event; inert buttons map to nothing
    pub fn from_action(action: Action) -> Option<Self> {
        Some(match action {
            Action::SkipContent => Event::SkipContent,
            Action::PickDate(date) => Event::PickDate(date),
            Action::PublishNow => Event::PublishNow,
            Action::ManualEntry => Event::ManualEntry,
            Action::PickHour(hour) => Event::PickHour(hour),
            Action::PickMinute(minute) => Event::PickMinute(minute),
            Action::TimeDone => Event::TimeDone,
            Action::TogglePlatform(id) => Event::TogglePlatform(id),
            Action::Confirm => Event::Confirm,
            Action::Cancel => Event::Cancel,
            Action::NewPost => Event::NewPost,
            Action::Noop => return None,
        })
    }

    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Start => "start",
            Event::NewPost => "new_post",
            Event::Cancel => "cancel",
            Event::Content(_) => "content",
            Event::SkipContent => "skip_content",
            Event::PickDate(_) => "pick_date",
            Event::ManualEntry => "manual_entry",
            Event::PublishNow => "publish_now",
            Event::PickHour(_) => "pick_hour",
            Event::PickMinute(_) => "pick_minute",
            Event::TimeDone => "time_done",
            Event::TogglePlatform(_) => "toggle_platform",
            Event::Confirm => "confirm",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands() {
        assert_eq!(Event::from_command("/start"), Some(Event::Start));
        assert_eq!(Event::from_command("/new@PostBot"), Some(Event::NewPost));
        assert_eq!(Event::from_command("cancel"), Some(Event::Cancel));
        assert_eq!(Event::from_command("/help"), None);
    }

    #[test]
    fn test_noop_action_has_no_event() {
        assert_eq!(Event::from_action(Action::Noop), None);
        assert_eq!(Event::from_action(Action::Confirm), Some(Event::Confirm));
    }
}
