use serde_json::json;

use super::{Delivery, NotificationChannel, Skip, required, titled};
use crate::config::InstanceOnlyConfig;
use crate::core::host::{Payload, SendCommand};

/// Providers whose adapter only needs the text (WhatsApp, Signal, Matrix).
pub struct TextOnlyChannel {
    name: &'static str,
    config: InstanceOnlyConfig,
    title: String,
}

impl TextOnlyChannel {
    pub fn new(name: &'static str, config: InstanceOnlyConfig, title: String) -> Self {
        Self {
            name,
            config,
            title,
        }
    }
}

impl NotificationChannel for TextOnlyChannel {
    fn name(&self) -> &'static str {
        self.name
    }

    fn build_payload(&self, message: &str) -> Result<Delivery, Skip> {
        let instance = required(&self.config.instance, "instance")?;

        let mut payload = Payload::new();
        payload.insert("text".to_string(), json!(titled(&self.title, message)));

        Ok(Delivery {
            instance: instance.to_string(),
            command: SendCommand::Send,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_only_payload() {
        let channel = TextOnlyChannel::new(
            "Signal",
            InstanceOnlyConfig {
                instance: Some("signal-cmb.0".to_string()),
            },
            "Backup".to_string(),
        );
        let delivery = channel.build_payload("done").unwrap();

        assert_eq!(delivery.instance, "signal-cmb.0");
        assert_eq!(delivery.command, SendCommand::Send);
        assert_eq!(delivery.payload.len(), 1);
        assert_eq!(delivery.payload["text"], json!("Backup:\ndone"));
    }

    #[test]
    fn test_missing_instance_skips() {
        let channel = TextOnlyChannel::new(
            "Matrix",
            InstanceOnlyConfig::default(),
            "Backup".to_string(),
        );
        assert_eq!(
            channel.build_payload("done"),
            Err(Skip::MissingField("instance"))
        );
    }
}
