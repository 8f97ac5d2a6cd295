//! Status notifications through the host runtime's messaging adapters.
//!
//! Exactly one provider is configured at a time. Each provider is a
//! `NotificationChannel` that validates its own destination fields and shapes
//! the message into the payload its adapter expects. Delivery is fire and
//! forget: failures are logged and never reach the caller.

mod discord;
mod email;
mod pushover;
mod telegram;
mod text_only;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{NotificationConfig, NotificationProvider};
use crate::core::host::{MessageSender, Payload, SendCommand};

pub use discord::{DiscordChannel, DiscordTarget};
pub use email::EmailChannel;
pub use pushover::PushoverChannel;
pub use telegram::{BROADCAST_USER, TelegramChannel};
pub use text_only::TextOnlyChannel;

/// A fully addressed request for one adapter instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub instance: String,
    pub command: SendCommand,
    pub payload: Payload,
}

/// Why a channel declined to send. Not an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Skip {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("unsupported target {0:?}")]
    UnsupportedTarget(String),
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct DeliveryError(String);

/// Trait for notification channel implementations (Telegram, Discord, etc.)
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Provider name used in logs.
    fn name(&self) -> &'static str;

    fn build_payload(&self, message: &str) -> Result<Delivery, Skip>;

    async fn send(
        &self,
        sender: &dyn MessageSender,
        delivery: &Delivery,
    ) -> Result<(), DeliveryError> {
        sender
            .send_to(&delivery.instance, delivery.command, &delivery.payload)
            .await
            .map_err(|e| DeliveryError(format!("{:#}", e)))
    }
}

/// Factory function to create the channel selected by config
pub fn create_channel(config: &NotificationConfig) -> Option<Box<dyn NotificationChannel>> {
    let title = config.title.clone();
    match &config.provider {
        NotificationProvider::None | NotificationProvider::Unsupported(_) => None,
        NotificationProvider::Telegram => Some(Box::new(TelegramChannel::new(
            config.telegram.clone(),
            title,
        ))),
        NotificationProvider::Email => {
            Some(Box::new(EmailChannel::new(config.email.clone(), title)))
        }
        NotificationProvider::Pushover => Some(Box::new(PushoverChannel::new(
            config.pushover.clone(),
            title,
        ))),
        NotificationProvider::WhatsApp => Some(Box::new(TextOnlyChannel::new(
            "WhatsApp",
            config.whatsapp.clone(),
            title,
        ))),
        NotificationProvider::Signal => Some(Box::new(TextOnlyChannel::new(
            "Signal",
            config.signal.clone(),
            title,
        ))),
        NotificationProvider::Matrix => Some(Box::new(TextOnlyChannel::new(
            "Matrix",
            config.matrix.clone(),
            title,
        ))),
        NotificationProvider::Discord => Some(Box::new(DiscordChannel::new(
            config.discord.clone(),
            title,
        ))),
    }
}

/// Send `message` through the configured provider, if any.
pub async fn dispatch(config: &NotificationConfig, message: &str, sender: &dyn MessageSender) {
    if !config.enabled {
        return;
    }

    let Some(channel) = create_channel(config) else {
        debug!(provider = %config.provider, "No notification channel for provider");
        return;
    };

    let delivery = match channel.build_payload(message) {
        Ok(delivery) => delivery,
        Err(skip) => {
            debug!(provider = channel.name(), reason = %skip, "Notification skipped");
            return;
        }
    };

    match channel.send(sender, &delivery).await {
        Ok(()) => info!(
            provider = channel.name(),
            instance = %delivery.instance,
            "Notification sent"
        ),
        Err(e) => warn!("Error sending {} message: {}", channel.name(), e),
    }
}

/// Prefix `message` with the notification title line.
fn titled(title: &str, message: &str) -> String {
    format!("{}:\n{}", title, message)
}

/// Required, non-empty config field.
fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, Skip> {
    crate::config::non_empty(value).ok_or(Skip::MissingField(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::SimulatedSender;
    use serde_json::json;

    fn discord_config(target: &str) -> NotificationConfig {
        let mut config = NotificationConfig {
            enabled: true,
            provider: NotificationProvider::Discord,
            ..Default::default()
        };
        config.discord.instance = Some("discord.0".to_string());
        config.discord.target = Some(target.to_string());
        config
    }

    #[tokio::test]
    async fn test_disabled_sends_nothing() {
        let mut config = discord_config("123456");
        config.enabled = false;
        let sender = SimulatedSender::new();

        dispatch(&config, "done", &sender).await;

        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_provider_is_silent() {
        let mut config = discord_config("123456");
        config.provider = NotificationProvider::Unsupported("Carrier Pigeon".to_string());
        let sender = SimulatedSender::new();

        dispatch(&config, "done", &sender).await;

        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_sends_one_delivery() {
        let sender = SimulatedSender::new();

        dispatch(&discord_config("123/456"), "done", &sender).await;

        let sent = sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].instance, "discord.0");
        assert_eq!(sent[0].command, SendCommand::SendMessage);
        assert_eq!(sent[0].payload["serverId"], json!("123"));
        assert_eq!(sent[0].payload["channelId"], json!("456"));
    }

    #[tokio::test]
    async fn test_skipped_target_sends_nothing() {
        let sender = SimulatedSender::new();

        dispatch(&discord_config("abc"), "done", &sender).await;

        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failure_is_swallowed() {
        let sender = SimulatedSender::new().failing();

        // Must complete normally
        dispatch(&discord_config("123456"), "done", &sender).await;

        assert_eq!(sender.attempts(), 1);
        assert!(sender.sent().is_empty());
    }

    #[test]
    fn test_create_channel_names() {
        let mut config = NotificationConfig::default();
        let cases = [
            (NotificationProvider::Telegram, "Telegram"),
            (NotificationProvider::Email, "E-Mail"),
            (NotificationProvider::Pushover, "Pushover"),
            (NotificationProvider::WhatsApp, "WhatsApp"),
            (NotificationProvider::Signal, "Signal"),
            (NotificationProvider::Matrix, "Matrix"),
            (NotificationProvider::Discord, "Discord"),
        ];
        for (provider, name) in cases {
            config.provider = provider;
            assert_eq!(create_channel(&config).unwrap().name(), name);
        }

        config.provider = NotificationProvider::None;
        assert!(create_channel(&config).is_none());
    }

    #[test]
    fn test_titled() {
        assert_eq!(titled("Backup", "all good"), "Backup:\nall good");
    }
}
