use serde_json::json;

use super::{Delivery, NotificationChannel, Skip, required, titled};
use crate::config::PushoverConfig;
use crate::core::host::{Payload, SendCommand};

/// Pushover priority for quiet delivery (no sound or vibration).
const QUIET_PRIORITY: i32 = -1;

pub struct PushoverChannel {
    config: PushoverConfig,
    title: String,
}

impl PushoverChannel {
    pub fn new(config: PushoverConfig, title: String) -> Self {
        Self { config, title }
    }
}

impl NotificationChannel for PushoverChannel {
    fn name(&self) -> &'static str {
        "Pushover"
    }

    fn build_payload(&self, message: &str) -> Result<Delivery, Skip> {
        let instance = required(&self.config.instance, "instance")?;
        let device = required(&self.config.device_id, "device_id")?;

        let mut payload = Payload::new();
        payload.insert("message".to_string(), json!(titled(&self.title, message)));
        payload.insert("sound".to_string(), json!(""));
        if self.config.silent {
            payload.insert("priority".to_string(), json!(QUIET_PRIORITY));
        }
        payload.insert("title".to_string(), json!(self.title));
        payload.insert("device".to_string(), json!(device));

        Ok(Delivery {
            instance: instance.to_string(),
            command: SendCommand::Send,
            payload,
        })
    }
}
