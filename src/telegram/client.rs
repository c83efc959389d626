//! Bot API client over `reqwest`

use super::types::{
    AnswerCallbackQuery, ApiResponse, EditMessageText, GetUpdates, InlineKeyboardMarkup, Message,
    SendMessage, SendPhoto, SendVideo, Update,
};
use super::TelegramError;
use crate::runtime::traits::Transport;
use crate::session::{MediaKind, MediaRef, MessageRef, UserId};
use crate::ui::Prompt;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const DEFAULT_API_URL: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct TelegramClient {
    client: Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(token: &str) -> Self {
        Self::with_api_url(token, DEFAULT_API_URL)
    }

    /// Point the client at another Bot API server (self-hosted or a test double)
    pub fn with_api_url(token: &str, api_url: &str) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: format!("{}/bot{token}", api_url.trim_end_matches('/')),
        }
    }

    /// Long-poll for updates at or after `offset`
    pub async fn get_updates(&self, offset: i64, timeout: Duration) -> Result<Vec<Update>, TelegramError> {
        let params = GetUpdates {
            offset,
            timeout: timeout.as_secs(),
            allowed_updates: vec!["message", "callback_query"],
        };
        // The HTTP request must outlive the server-side wait
        self.call("getUpdates", &params, timeout + REQUEST_TIMEOUT).await
    }

    async fn call<P, R>(&self, method: &str, params: &P, timeout: Duration) -> Result<R, TelegramError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}/{method}", self.base_url))
            .timeout(timeout)
            .json(params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TelegramError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    TelegramError::network(format!("Connection failed: {e}"))
                } else {
                    TelegramError::network(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TelegramError::network(format!("Failed to read response: {e}")))?;

        if status.is_server_error() {
            return Err(TelegramError::network(format!("Server error {status}: {body}")));
        }

        let parsed: ApiResponse<R> = serde_json::from_str(&body).map_err(|e| {
            TelegramError::decode(format!("Failed to parse {method} response: {e} - body: {body}"))
        })?;

        classify(method, parsed)
    }
}

/// Turn an API envelope into a result
fn classify<R>(method: &str, response: ApiResponse<R>) -> Result<R, TelegramError> {
    let description = response
        .description
        .unwrap_or_else(|| "no description".to_string());

    if !response.ok {
        return Err(match response.error_code {
            Some(429) => {
                let mut err = TelegramError::rate_limit(format!("{method}: {description}"));
                if let Some(secs) = response.parameters.and_then(|p| p.retry_after) {
                    err = err.with_retry_after(Duration::from_secs(secs));
                }
                err
            }
            Some(code) => TelegramError::api(format!("{method} failed ({code}): {description}")),
            None => TelegramError::api(format!("{method} failed: {description}")),
        });
    }

    response
        .result
        .ok_or_else(|| TelegramError::decode(format!("{method}: ok response without result")))
}

#[async_trait]
impl Transport for TelegramClient {
    async fn send_prompt(&self, chat: UserId, prompt: &Prompt) -> Result<MessageRef, TelegramError> {
        let params = SendMessage {
            chat_id: chat.0,
            text: &prompt.text,
            reply_markup: InlineKeyboardMarkup::from_keyboard(&prompt.keyboard),
        };
        let message: Message = self.call("sendMessage", &params, REQUEST_TIMEOUT).await?;
        Ok(MessageRef {
            chat,
            message_id: message.message_id,
        })
    }

    async fn edit_prompt(&self, message: &MessageRef, prompt: &Prompt) -> Result<(), TelegramError> {
        let params = EditMessageText {
            chat_id: message.chat.0,
            message_id: message.message_id,
            text: &prompt.text,
            reply_markup: InlineKeyboardMarkup::from_keyboard(&prompt.keyboard),
        };
        // Result is the edited message, or `true` for inline messages
        match self
            .call::<_, serde_json::Value>("editMessageText", &params, REQUEST_TIMEOUT)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_modified() => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn send_media(
        &self,
        chat: UserId,
        kind: MediaKind,
        media: &MediaRef,
        caption: &str,
    ) -> Result<MessageRef, TelegramError> {
        let message: Message = match kind {
            MediaKind::Video => {
                let params = SendVideo {
                    chat_id: chat.0,
                    video: media.as_str(),
                    caption,
                };
                self.call("sendVideo", &params, REQUEST_TIMEOUT).await?
            }
            MediaKind::Photo => {
                let params = SendPhoto {
                    chat_id: chat.0,
                    photo: media.as_str(),
                    caption,
                };
                self.call("sendPhoto", &params, REQUEST_TIMEOUT).await?
            }
            MediaKind::Text => {
                let params = SendMessage {
                    chat_id: chat.0,
                    text: caption,
                    reply_markup: None,
                };
                self.call("sendMessage", &params, REQUEST_TIMEOUT).await?
            }
        };
        Ok(MessageRef {
            chat,
            message_id: message.message_id,
        })
    }

    async fn acknowledge(&self, callback_id: &str) -> Result<(), TelegramError> {
        let params = AnswerCallbackQuery {
            callback_query_id: callback_id,
        };
        let _: bool = self
            .call("answerCallbackQuery", &params, REQUEST_TIMEOUT)
            .await?;
        Ok(())
    }
}
