use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::{
    common::{errors::NotifyError, types::ChannelId},
    tracker::Notifier,
};

const API_BASE: &str = "https://discord.com/api/v10";

/// Thin client for the platform REST API; only message creation is needed.
pub struct RestClient {
    http: Client,
    token: String,
}

impl RestClient {
    pub fn new(token: String) -> Result<Self, reqwest::Error> {
        let user_agent = format!(
            "DiscordBot (https://github.com/voicelog/voicelog, {})",
            env!("CARGO_PKG_VERSION")
        );
        let http = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { http, token })
    }

    pub async fn create_message(
        &self,
        channel: ChannelId,
        content: &str,
    ) -> Result<(), NotifyError> {
        let url = format!("{}/channels/{}/messages", API_BASE, channel);
        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bot {}", self.token))
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Api { status, body });
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for RestClient {
    async fn send_message(&self, channel: ChannelId, content: &str) -> Result<(), NotifyError> {
        self.create_message(channel, content).await
    }
}
