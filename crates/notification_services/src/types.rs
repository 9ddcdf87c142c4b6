use serde::Deserialize;

/// Errors raised while setting up or using a notification channel.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// Simple email service (SES) errors.
    #[error("AWS SES error: {0}")]
    SesError(String),

    /// Telegram Bot API errors.
    #[error("Telegram error: {0}")]
    Telegram(String),

    /// Mattermost REST API errors.
    #[error("Mattermost error: {0}")]
    Mattermost(String),

    /// The recipient could not be found for the configured channel.
    #[error("Recipient not found: {0}")]
    RecipientNotFound(String),

    /// Invalid email format.
    #[error("Invalid email format")]
    InvalidEmail,

    /// Network failure talking to the channel's API.
    #[error("Network error: {0}")]
    Network(String),
}

/// Envelope every Telegram Bot API response is wrapped in.
#[derive(Debug, Deserialize)]
pub struct TelegramResponse<T> {
    /// Whether the call succeeded.
    pub ok: bool,
    /// Human-readable error, present when `ok` is false.
    pub description: Option<String>,
    /// Payload, present when `ok` is true.
    pub result: Option<T>,
}

/// Subset of a Telegram `User` object.
#[derive(Debug, Deserialize)]
pub struct TelegramUser {
    /// Bot or user ID.
    pub id: i64,
    /// Username, without the leading `@`.
    pub username: Option<String>,
}

/// Subset of a Telegram `Update` object.
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    /// Update identifier.
    pub update_id: i64,
    /// Present when the update carries a message.
    pub message: Option<TelegramMessage>,
}

/// Subset of a Telegram `Message` object.
#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    /// Chat the message belongs to.
    pub chat: TelegramChat,
}

/// Subset of a Telegram `Chat` object.
#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    /// Chat ID used as the target of `sendMessage`.
    pub id: i64,
    /// Username of the private chat peer.
    pub username: Option<String>,
}

/// Subset of a Mattermost user record.
#[derive(Debug, Deserialize)]
pub struct MattermostUser {
    /// User ID.
    pub id: String,
    /// Login name.
    pub username: String,
}

/// Subset of a Mattermost channel record.
#[derive(Debug, Deserialize)]
pub struct MattermostChannel {
    /// Channel ID.
    pub id: String,
}
