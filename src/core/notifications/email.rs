use serde_json::json;

use super::{Delivery, NotificationChannel, Skip, required, titled};
use crate::config::EmailConfig;
use crate::core::host::{Payload, SendCommand};

pub struct EmailChannel {
    config: EmailConfig,
    title: String,
}

impl EmailChannel {
    pub fn new(config: EmailConfig, title: String) -> Self {
        Self { config, title }
    }
}

impl NotificationChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "E-Mail"
    }

    fn build_payload(&self, message: &str) -> Result<Delivery, Skip> {
        let instance = required(&self.config.instance, "instance")?;
        let receiver = required(&self.config.receiver, "receiver")?;
        let sender = required(&self.config.sender, "sender")?;

        let mut payload = Payload::new();
        payload.insert("text".to_string(), json!(titled(&self.title, message)));
        payload.insert("to".to_string(), json!(receiver));
        payload.insert("subject".to_string(), json!(self.title));
        payload.insert("from".to_string(), json!(sender));

        Ok(Delivery {
            instance: instance.to_string(),
            command: SendCommand::Send,
            payload,
        })
    }
}
