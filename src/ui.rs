//! Transport-neutral UI description
//!
//! A prompt is text plus rows of buttons. Every button carries a typed
//! [`Action`]; the transport only ever sees the encoded callback token, and
//! tokens are decoded back into actions exactly once, at the boundary.

use chrono::NaiveDate;

/// Upper bound the Bot API puts on `callback_data`
pub const MAX_TOKEN_LEN: usize = 64;

const DATE_TOKEN_FORMAT: &str = "%Y-%m-%d";

/// What pressing a button asks the composer to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SkipContent,
    PickDate(NaiveDate),
    PublishNow,
    ManualEntry,
    PickHour(u32),
    PickMinute(u32),
    TimeDone,
    TogglePlatform(String),
    Confirm,
    Cancel,
    NewPost,
    /// Inert cell (weekday header, blank or past day)
    Noop,
}

impl Action {
    /// Encode as an opaque callback token
    pub fn encode(&self) -> String {
        match self {
            Action::SkipContent => "skip".to_string(),
            Action::PickDate(date) => format!("date:{}", date.format(DATE_TOKEN_FORMAT)),
            Action::PublishNow => "now".to_string(),
            Action::ManualEntry => "manual".to_string(),
            Action::PickHour(hour) => format!("hour:{hour}"),
            Action::PickMinute(minute) => format!("minute:{minute}"),
            Action::TimeDone => "time_done".to_string(),
            Action::TogglePlatform(id) => format!("platform:{id}"),
            Action::Confirm => "confirm".to_string(),
            Action::Cancel => "cancel".to_string(),
            Action::NewPost => "new_post".to_string(),
            Action::Noop => "noop".to_string(),
        }
    }

    /// Decode a callback token. Unknown or out-of-range tokens yield `None`.
    pub fn decode(token: &str) -> Option<Self> {
        if token.len() > MAX_TOKEN_LEN {
            return None;
        }
        let (kind, arg) = match token.split_once(':') {
            Some((kind, arg)) => (kind, Some(arg)),
            None => (token, None),
        };

        match (kind, arg) {
            ("skip", None) => Some(Action::SkipContent),
            ("date", Some(arg)) => NaiveDate::parse_from_str(arg, DATE_TOKEN_FORMAT)
                .ok()
                .map(Action::PickDate),
            ("now", None) => Some(Action::PublishNow),
            ("manual", None) => Some(Action::ManualEntry),
            ("hour", Some(arg)) => arg
                .parse::<u32>()
                .ok()
                .filter(|hour| *hour < 24)
                .map(Action::PickHour),
            ("minute", Some(arg)) => arg
                .parse::<u32>()
                .ok()
                .filter(|minute| *minute < 60 && minute % 5 == 0)
                .map(Action::PickMinute),
            ("time_done", None) => Some(Action::TimeDone),
            ("platform", Some(id)) if !id.is_empty() => {
                Some(Action::TogglePlatform(id.to_string()))
            }
            ("confirm", None) => Some(Action::Confirm),
            ("cancel", None) => Some(Action::Cancel),
            ("new_post", None) => Some(Action::NewPost),
            ("noop", None) => Some(Action::Noop),
            _ => None,
        }
    }
}

/// A selectable button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: Action,
}

impl Button {
    pub fn new(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

/// Buttons grouped into rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(mut self, buttons: Vec<Button>) -> Self {
        if !buttons.is_empty() {
            self.rows.push(buttons);
        }
        self
    }

    pub fn button(self, label: impl Into<String>, action: Action) -> Self {
        self.row(vec![Button::new(label, action)])
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All buttons, row-major
    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }

    /// Find the first button carrying `action`
    #[allow(dead_code)] // Used by keyboard assertions in tests
    pub fn find(&self, action: &Action) -> Option<&Button> {
        self.buttons().find(|b| &b.action == action)
    }
}

/// Text plus its keyboard, ready to render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub keyboard: Keyboard,
}

impl Prompt {
    pub fn new(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Keyboard::new())
    }
}
