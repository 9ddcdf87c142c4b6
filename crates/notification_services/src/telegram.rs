use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;

use crate::service::Notifier;
use crate::types::*;

/// Public Telegram Bot API host.
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Longest text Telegram accepts in a single message.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Long-poll window used when looking for the user's chat.
const UPDATES_TIMEOUT_SECS: u64 = 60;

/// How a report is handed to Telegram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelegramDelivery {
    /// Plain `sendMessage`.
    Message,
    /// `sendDocument` with the report attached as a text file.
    Document,
}

impl TelegramDelivery {
    /// Picks the delivery mode for a body; oversized bodies go as a file.
    pub fn for_body(body: &str) -> Self {
        if body.chars().count() > MAX_MESSAGE_CHARS {
            TelegramDelivery::Document
        } else {
            TelegramDelivery::Message
        }
    }
}

/// Sends reports as a direct message from a Telegram bot.
pub struct TelegramNotifier {
    client: Client,
    api_url: String,
    token: String,
    chat_id: i64,
}

impl TelegramNotifier {
    /// Authorises the bot and looks up the chat it shares with `username`.
    ///
    /// The user must have messaged the bot at least once, otherwise there is
    /// no chat to deliver into and setup fails.
    pub async fn new(username: &str, token: &str) -> Result<Self, NotificationError> {
        Self::with_api_url(TELEGRAM_API_URL, username, token).await
    }

    /// Same as [`TelegramNotifier::new`] against a custom Bot API host.
    pub async fn with_api_url(
        api_url: &str,
        username: &str,
        token: &str,
    ) -> Result<Self, NotificationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(UPDATES_TIMEOUT_SECS + 30))
            .build()
            .map_err(|e| {
                NotificationError::Network(format!("Failed to create HTTP client: {}", e))
            })?;

        Self::with_client(client, api_url, username, token).await
    }

    /// Same as [`TelegramNotifier::with_api_url`] with a caller-built HTTP client.
    ///
    /// The client's timeout must outlast the `getUpdates` long poll.
    pub async fn with_client(
        client: Client,
        api_url: &str,
        username: &str,
        token: &str,
    ) -> Result<Self, NotificationError> {
        let mut notifier = Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            chat_id: 0,
        };

        let bot: TelegramUser = notifier.call("getMe", &[]).await.map_err(|e| {
            NotificationError::Telegram(format!(
                "Unable to authorize bot with the given token: {}",
                e
            ))
        })?;
        let bot_name = bot.username.unwrap_or_else(|| bot.id.to_string());
        log::info!("Authorized on account {}", bot_name);

        let updates: Vec<TelegramUpdate> = notifier
            .call(
                "getUpdates",
                &[
                    ("offset", "0".to_string()),
                    ("timeout", UPDATES_TIMEOUT_SECS.to_string()),
                ],
            )
            .await?;

        notifier.chat_id = find_chat_id(&updates, username).ok_or_else(|| {
            NotificationError::RecipientNotFound(format!(
                "no chat with {}, send a message to the bot {} first",
                username, bot_name
            ))
        })?;

        log::info!(
            "chatID for the conversation between {} and bot {} is {}",
            username,
            bot_name,
            notifier.chat_id
        );

        Ok(notifier)
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T, NotificationError> {
        let response = self
            .client
            .get(self.method_url(method))
            .query(params)
            .send()
            .await
            .map_err(|e| NotificationError::Network(format!("{} request failed: {}", method, e)))?;

        parse_response(response).await
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_message(&self, body: &str) -> Result<(), NotificationError> {
        let request = match TelegramDelivery::for_body(body) {
            TelegramDelivery::Message => {
                let message = serde_json::json!({
                    "chat_id": self.chat_id,
                    "text": body,
                });
                self.client
                    .post(self.method_url("sendMessage"))
                    .json(&message)
            }
            TelegramDelivery::Document => {
                log::info!("Message body too long, sending it as a file");
                let file = Part::bytes(body.as_bytes().to_vec())
                    .file_name(document_file_name(Utc::now().timestamp()))
                    .mime_str("text/plain")
                    .map_err(|e| NotificationError::Telegram(e.to_string()))?;
                let form = Form::new()
                    .text("chat_id", self.chat_id.to_string())
                    .part("document", file);
                self.client
                    .post(self.method_url("sendDocument"))
                    .multipart(form)
            }
        };

        let response = request.send().await.map_err(|e| {
            NotificationError::Network(format!("Unable to send message to telegram: {}", e))
        })?;

        let _: serde_json::Value = parse_response(response).await?;
        log::info!(
            "✅ Availability report sent to Telegram chat {}",
            self.chat_id
        );
        Ok(())
    }
}

async fn parse_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, NotificationError> {
    let status = response.status();
    let envelope: TelegramResponse<T> = response.json().await.map_err(|e| {
        NotificationError::Telegram(format!("Failed to parse response (HTTP {}): {}", status, e))
    })?;

    if !envelope.ok {
        return Err(NotificationError::Telegram(
            envelope
                .description
                .unwrap_or_else(|| format!("request failed with HTTP {}", status)),
        ));
    }

    envelope
        .result
        .ok_or_else(|| NotificationError::Telegram("response carried no result".to_string()))
}

/// Finds the private chat whose peer has `username` (case-insensitive, `@` optional).
pub fn find_chat_id(updates: &[TelegramUpdate], username: &str) -> Option<i64> {
    let wanted = username.trim_start_matches('@');
    updates
        .iter()
        .filter_map(|update| update.message.as_ref())
        .find(|message| {
            message
                .chat
                .username
                .as_deref()
                .is_some_and(|name| name.eq_ignore_ascii_case(wanted))
        })
        .map(|message| message.chat.id)
}

/// Name of the attachment used for oversized reports.
pub fn document_file_name(unix_seconds: i64) -> String {
    format!("slots-available-{}.txt", unix_seconds)
}
