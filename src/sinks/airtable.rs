//! Airtable record store

use super::SinkError;
use crate::finalize::PostRecord;
use crate::runtime::traits::RecordStore;
use crate::session::MediaRef;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

const DEFAULT_API_URL: &str = "https://api.airtable.com/v0";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirtableConfig {
    pub api_key: String,
    pub base_id: String,
    pub table: String,
}

/// Creates one row per finished post
pub struct AirtableStore {
    client: Client,
    url: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct CreateRecord<'a> {
    fields: RecordFields<'a>,
}

#[derive(Debug, Serialize)]
struct RecordFields<'a> {
    #[serde(rename = "Text")]
    text: &'a str,
    #[serde(rename = "Platform")]
    platform: &'a [String],
    #[serde(rename = "Creation Date")]
    creation_date: String,
    #[serde(rename = "Scheduled Publish Date")]
    scheduled_date: String,
    #[serde(rename = "Scheduled Publish Time", skip_serializing_if = "Option::is_none")]
    scheduled_time: Option<String>,
    #[serde(rename = "Photo", skip_serializing_if = "Option::is_none")]
    photo: Option<&'a str>,
    #[serde(rename = "Video", skip_serializing_if = "Option::is_none")]
    video: Option<&'a str>,
    #[serde(rename = "Status")]
    status: &'static str,
}

impl<'a> CreateRecord<'a> {
    fn from_record(record: &'a PostRecord) -> Self {
        Self {
            fields: RecordFields {
                text: record.text.as_deref().unwrap_or_default(),
                platform: &record.platforms,
                creation_date: record.created_at.format("%Y-%m-%d").to_string(),
                scheduled_date: record.scheduled_date.format("%Y-%m-%d").to_string(),
                scheduled_time: record.scheduled_time.map(|t| t.format("%H:%M").to_string()),
                photo: record.photo.as_ref().map(MediaRef::as_str),
                video: record.video.as_ref().map(MediaRef::as_str),
                status: record.status.as_str(),
            },
        }
    }
}

impl AirtableStore {
    pub fn new(config: &AirtableConfig) -> Self {
        Self::with_api_url(config, DEFAULT_API_URL)
    }

    pub fn with_api_url(config: &AirtableConfig, api_url: &str) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: format!(
                "{}/{}/{}",
                api_url.trim_end_matches('/'),
                config.base_id,
                config.table
            ),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl RecordStore for AirtableStore {
    async fn persist(&self, record: &PostRecord) -> Result<(), SinkError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&CreateRecord::from_record(record))
            .send()
            .await
            .map_err(|e| SinkError::Transport(format!("Airtable request failed: {e}")))?;

        let status = response.status();
        if matches!(status.as_u16(), 200 | 201) {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(SinkError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
