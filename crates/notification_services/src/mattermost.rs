use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::service::Notifier;
use crate::types::*;

/// Sends reports as a direct message from a Mattermost bot account.
pub struct MattermostNotifier {
    client: Client,
    api_url: String,
    token: String,
    channel_id: String,
}

impl MattermostNotifier {
    /// Authenticates the bot, looks up `username` and opens a direct channel between them.
    pub async fn new(
        server_url: &str,
        token: &str,
        username: &str,
    ) -> Result<Self, NotificationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                NotificationError::Network(format!("Failed to create HTTP client: {}", e))
            })?;

        Self::with_client(client, server_url, token, username).await
    }

    /// Same as [`MattermostNotifier::new`] with a caller-built HTTP client.
    pub async fn with_client(
        client: Client,
        server_url: &str,
        token: &str,
        username: &str,
    ) -> Result<Self, NotificationError> {
        let mut notifier = Self {
            client,
            api_url: api_base(server_url),
            token: token.to_string(),
            channel_id: String::new(),
        };

        let bot: MattermostUser = notifier
            .expect_json(
                notifier.client.get(format!("{}/users/me", notifier.api_url)),
                StatusCode::OK,
            )
            .await
            .map_err(|e| {
                NotificationError::Mattermost(format!("Unable to authenticate bot user: {}", e))
            })?;

        let recipient: MattermostUser = notifier
            .expect_json(
                notifier.client.get(format!(
                    "{}/users/username/{}",
                    notifier.api_url,
                    urlencoding::encode(username)
                )),
                StatusCode::OK,
            )
            .await
            .map_err(|_| {
                NotificationError::RecipientNotFound(format!(
                    "unable to find user id of {}",
                    username
                ))
            })?;

        let channel: MattermostChannel = notifier
            .expect_json(
                notifier
                    .client
                    .post(format!("{}/channels/direct", notifier.api_url))
                    .json(&[bot.id.as_str(), recipient.id.as_str()]),
                StatusCode::CREATED,
            )
            .await
            .map_err(|e| {
                NotificationError::Mattermost(format!(
                    "Unable to create direct channel between {} and {}: {}",
                    bot.username, recipient.username, e
                ))
            })?;

        log::info!(
            "Mattermost direct channel {} opened between {} and {}",
            channel.id,
            bot.username,
            recipient.username
        );
        notifier.channel_id = channel.id;

        Ok(notifier)
    }

    async fn expect_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        expected: StatusCode,
    ) -> Result<T, NotificationError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| NotificationError::Network(e.to_string()))?;

        if response.status() != expected {
            return Err(NotificationError::Mattermost(format!(
                "unexpected HTTP {} (wanted {})",
                response.status(),
                expected
            )));
        }

        response
            .json()
            .await
            .map_err(|e| NotificationError::Mattermost(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl Notifier for MattermostNotifier {
    async fn send_message(&self, body: &str) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(format!("{}/posts", self.api_url))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({
                "channel_id": self.channel_id,
                "message": body,
            }))
            .send()
            .await
            .map_err(|e| NotificationError::Network(e.to_string()))?;

        if response.status() != StatusCode::CREATED {
            return Err(NotificationError::Mattermost(format!(
                "error sending message to channel {}: HTTP {}",
                self.channel_id,
                response.status()
            )));
        }

        log::info!(
            "✅ Availability report posted to Mattermost channel {}",
            self.channel_id
        );
        Ok(())
    }
}

/// REST v4 root for a Mattermost server URL.
pub fn api_base(server_url: &str) -> String {
    format!("{}/api/v4", server_url.trim_end_matches('/'))
}
