//! Process configuration from environment variables

use crate::calendar::CalendarLayout;
use crate::platform::PlatformCatalog;
use crate::session::UserId;
use crate::sinks::airtable::AirtableConfig;
use crate::state_machine::ComposeContext;
use crate::ui::{Action, MAX_TOKEN_LEN};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TABLE: &str = "ContentItems";
const DEFAULT_BROADCAST_PLATFORM: &str = "Telegram";
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{key} has an invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Everything the process needs to start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub telegram_token: String,
    /// Store sink; disabled unless key and base are both set
    pub airtable: Option<AirtableConfig>,
    /// Broadcast sink target; disabled when unset
    pub broadcast_chat: Option<UserId>,
    pub broadcast_platform: String,
    pub compose: ComposeContext,
    /// Drop sessions untouched for this long; never when unset
    pub session_ttl: Option<Duration>,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset
    #[allow(clippy::too_many_lines)]
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let telegram_token = get("TELEGRAM_TOKEN").ok_or(ConfigError::Missing("TELEGRAM_TOKEN"))?;

        let airtable = match (get("AIRTABLE_API_KEY"), get("AIRTABLE_BASE_ID")) {
            (Some(api_key), Some(base_id)) => Some(AirtableConfig {
                api_key,
                base_id,
                table: get("AIRTABLE_TABLE_NAME").unwrap_or_else(|| DEFAULT_TABLE.to_string()),
            }),
            _ => None,
        };

        let broadcast_chat = get("BROADCAST_CHAT_ID")
            .map(|value| {
                value.parse::<i64>().map(UserId).map_err(|_| ConfigError::Invalid {
                    key: "BROADCAST_CHAT_ID",
                    value,
                    reason: "expected a numeric chat id",
                })
            })
            .transpose()?;

        let broadcast_platform =
            get("BROADCAST_PLATFORM").unwrap_or_else(|| DEFAULT_BROADCAST_PLATFORM.to_string());

        let platforms = match get("COMPOSER_PLATFORMS") {
            Some(value) => {
                let catalog = PlatformCatalog::parse(&value);
                if catalog.is_empty() {
                    return Err(ConfigError::Invalid {
                        key: "COMPOSER_PLATFORMS",
                        value,
                        reason: "no platforms listed",
                    });
                }
                // Every id must survive the round trip through a callback token
                let fits = |id: &str| Action::TogglePlatform(id.to_string()).encode().len() <= MAX_TOKEN_LEN;
                if !catalog.iter().all(|p| fits(p.id.as_str())) {
                    return Err(ConfigError::Invalid {
                        key: "COMPOSER_PLATFORMS",
                        value,
                        reason: "platform id too long for a button",
                    });
                }
                catalog
            }
            None => PlatformCatalog::default(),
        };

        let calendar = match get("COMPOSER_CALENDAR") {
            Some(value) => parse_calendar(&value).ok_or(ConfigError::Invalid {
                key: "COMPOSER_CALENDAR",
                value,
                reason: "expected `month` or `rolling:N` with N in 1..=60",
            })?,
            None => CalendarLayout::Month,
        };

        let pick_time = match get("COMPOSER_PICK_TIME") {
            Some(value) => parse_bool(&value).ok_or(ConfigError::Invalid {
                key: "COMPOSER_PICK_TIME",
                value,
                reason: "expected true or false",
            })?,
            None => true,
        };

        let session_ttl = get("COMPOSER_SESSION_TTL_MINUTES")
            .map(|value| match value.parse::<u64>() {
                Ok(minutes) if minutes > 0 => Ok(Duration::from_secs(minutes * 60)),
                _ => Err(ConfigError::Invalid {
                    key: "COMPOSER_SESSION_TTL_MINUTES",
                    value,
                    reason: "expected a positive number of minutes",
                }),
            })
            .transpose()?;

        let port = match get("PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value,
                reason: "expected a port number",
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            telegram_token,
            airtable,
            broadcast_chat,
            broadcast_platform,
            compose: ComposeContext {
                platforms,
                calendar,
                pick_time,
            },
            session_ttl,
            port,
        })
    }
}

fn parse_calendar(value: &str) -> Option<CalendarLayout> {
    if value.eq_ignore_ascii_case("month") {
        return Some(CalendarLayout::Month);
    }
    let days: u32 = value.strip_prefix("rolling:")?.trim().parse().ok()?;
    (1..=60).contains(&days).then_some(CalendarLayout::Rolling { days })
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
