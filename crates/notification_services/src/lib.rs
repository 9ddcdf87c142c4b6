//! # Notification Services
//!
//! This crate provides the channels availability reports are delivered through.
//! Every channel implements the [`Notifier`] capability, so the scan engine only
//! ever sees `send_message(body)`.

/// Mattermost direct-message channel.
pub mod mattermost;
/// The notifier capability and the email (AWS SES) channel.
pub mod service;
/// Telegram direct-message channel.
pub mod telegram;
/// Error and wire types used by the channels.
pub mod types;

#[cfg(test)]
mod test_support;

pub use mattermost::MattermostNotifier;
pub use service::{EmailNotifier, Notifier};
pub use telegram::TelegramNotifier;
pub use types::NotificationError;
