//! Bot API wire types and their mapping to inbound events

use crate::runtime::Inbound;
use crate::session::{MediaRef, MessageRef, UserId};
use crate::ui::Keyboard;
use serde::{Deserialize, Serialize};

// ============================================================================
// Responses
// ============================================================================

/// Envelope every Bot API method returns
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<u16>,
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseParameters {
    pub retry_after: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub photo: Option<Vec<PhotoSize>>,
    pub video: Option<Video>,
    pub document: Option<Document>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Video {
    pub file_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub file_id: String,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Serialize)]
pub struct GetUpdates {
    pub offset: i64,
    pub timeout: u64,
    pub allowed_updates: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct SendMessage<'a> {
    pub chat_id: i64,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

#[derive(Debug, Serialize)]
pub struct EditMessageText<'a> {
    pub chat_id: i64,
    pub message_id: i64,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

#[derive(Debug, Serialize)]
pub struct SendPhoto<'a> {
    pub chat_id: i64,
    pub photo: &'a str,
    pub caption: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SendVideo<'a> {
    pub chat_id: i64,
    pub video: &'a str,
    pub caption: &'a str,
}

#[derive(Debug, Serialize)]
pub struct AnswerCallbackQuery<'a> {
    pub callback_query_id: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineKeyboardMarkup {
    /// `None` for an empty keyboard, so the field is left out entirely
    pub fn from_keyboard(keyboard: &Keyboard) -> Option<Self> {
        if keyboard.is_empty() {
            return None;
        }
        let inline_keyboard = keyboard
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|button| InlineKeyboardButton {
                        text: button.label.clone(),
                        callback_data: button.action.encode(),
                    })
                    .collect()
            })
            .collect();
        Some(Self { inline_keyboard })
    }
}

// ============================================================================
// Inbound mapping
// ============================================================================

impl Message {
    fn reference(&self) -> MessageRef {
        MessageRef {
            chat: UserId(self.chat.id),
            message_id: self.message_id,
        }
    }

    /// Largest photo size; Telegram lists several resolutions of one image
    fn best_photo(&self) -> Option<MediaRef> {
        self.photo
            .as_ref()?
            .iter()
            .max_by_key(|size| u64::from(size.width) * u64::from(size.height))
            .map(|size| MediaRef::new(size.file_id.clone()))
    }

    fn any_video(&self) -> Option<MediaRef> {
        if let Some(video) = &self.video {
            return Some(MediaRef::new(video.file_id.clone()));
        }
        self.document
            .as_ref()
            .filter(|doc| {
                doc.mime_type
                    .as_deref()
                    .is_some_and(|mime| mime.starts_with("video"))
            })
            .map(|doc| MediaRef::new(doc.file_id.clone()))
    }
}

impl Update {
    /// Map an update from a private chat to an inbound event.
    ///
    /// Group traffic, edits and messages without usable content are dropped.
    pub fn into_inbound(self) -> Option<Inbound> {
        if let Some(query) = self.callback_query {
            return Some(Inbound::Callback {
                user: UserId(query.from.id),
                id: query.id,
                message: query.message.as_ref().map(Message::reference),
                token: query.data?,
            });
        }

        let message = self.message?;
        if message.chat.kind != "private" {
            return None;
        }
        let user = UserId(message.chat.id);

        if let Some(text) = message.text.as_deref() {
            if text.starts_with('/') {
                let name = text.split_whitespace().next().unwrap_or(text);
                return Some(Inbound::Command {
                    user,
                    name: name.to_string(),
                });
            }
        }

        let photo = message.best_photo();
        let video = message.any_video();
        let text = message.text.or(message.caption);
        if text.is_none() && photo.is_none() && video.is_none() {
            return None;
        }

        Some(Inbound::Content {
            user,
            text,
            photo,
            video,
        })
    }
}
