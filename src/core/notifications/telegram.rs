use serde_json::json;

use super::{Delivery, NotificationChannel, Skip, required, titled};
use crate::config::{TelegramConfig, non_empty};
use crate::core::host::{Payload, SendCommand};

/// Recipient value that addresses every user known to the adapter.
pub const BROADCAST_USER: &str = "allTelegramUsers";

pub struct TelegramChannel {
    config: TelegramConfig,
    title: String,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig, title: String) -> Self {
        Self { config, title }
    }
}

impl NotificationChannel for TelegramChannel {
    fn name(&self) -> &'static str {
        "Telegram"
    }

    fn build_payload(&self, message: &str) -> Result<Delivery, Skip> {
        let instance = required(&self.config.instance, "instance")?;

        let mut payload = Payload::new();
        match non_empty(&self.config.user) {
            Some(BROADCAST_USER) | None => {}
            Some(user) => {
                payload.insert("user".to_string(), json!(user));
            }
        }
        payload.insert("text".to_string(), json!(titled(&self.title, message)));
        payload.insert(
            "disable_notification".to_string(),
            json!(self.config.silent),
        );

        Ok(Delivery {
            instance: instance.to_string(),
            command: SendCommand::Send,
            payload,
        })
    }
}
