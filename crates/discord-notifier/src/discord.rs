use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use tracing::debug;

use crate::config::TransportSettings;
use crate::error::Result;

/// Status and body of whatever Discord answered. Nothing else is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait MessageApi: Send + Sync {
    /// Posts one plain-text message. Any HTTP status is a response; only
    /// failing to get one at all is an error.
    async fn create_message(
        &self,
        channel_id: &str,
        credential: &Secret<String>,
        content: &str,
    ) -> Result<ApiResponse>;
}

#[derive(Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
}

/// `POST /channels/{id}/messages` over reqwest.
#[derive(Debug, Clone)]
pub struct DiscordClient {
    http: reqwest::Client,
    api_base: String,
}

impl DiscordClient {
    pub fn new(settings: &TransportSettings) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            http: builder.build()?,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn messages_url(&self, channel_id: &str) -> String {
        format!("{}/channels/{}/messages", self.api_base, channel_id)
    }
}

#[async_trait]
impl MessageApi for DiscordClient {
    async fn create_message(
        &self,
        channel_id: &str,
        credential: &Secret<String>,
        content: &str,
    ) -> Result<ApiResponse> {
        let url = self.messages_url(channel_id);
        debug!(%url, "posting message");

        let resp = self
            .http
            .post(&url)
            .header(AUTHORIZATION, format!("Bot {}", credential.expose_secret()))
            .json(&CreateMessage { content })
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok(ApiResponse { status, body })
    }
}
