use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;

use super::{Delivery, NotificationChannel, Skip, required, titled};
use crate::config::DiscordConfig;
use crate::core::host::{Payload, SendCommand};

/// `<userId>` or `<serverId>/<channelId>`, ASCII digits only.
static TARGET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)(?:/([0-9]+))?$").expect("static regex is valid"));

/// Where a Discord message is routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscordTarget {
    User(String),
    Channel { server_id: String, channel_id: String },
}

impl DiscordTarget {
    pub fn parse(target: &str) -> Option<Self> {
        let caps = TARGET_RE.captures(target)?;
        let first = caps.get(1)?.as_str().to_string();
        Some(match caps.get(2) {
            Some(channel) => Self::Channel {
                server_id: first,
                channel_id: channel.as_str().to_string(),
            },
            None => Self::User(first),
        })
    }
}

pub struct DiscordChannel {
    config: DiscordConfig,
    title: String,
}

impl DiscordChannel {
    pub fn new(config: DiscordConfig, title: String) -> Self {
        Self { config, title }
    }
}

impl NotificationChannel for DiscordChannel {
    fn name(&self) -> &'static str {
        "Discord"
    }

    fn build_payload(&self, message: &str) -> Result<Delivery, Skip> {
        let instance = required(&self.config.instance, "instance")?;
        required(&self.config.target, "target")?;
        // Matched as configured; padding is not part of an id
        let target = self.config.target.as_deref().unwrap_or_default();

        let mut payload = Payload::new();
        match DiscordTarget::parse(target) {
            Some(DiscordTarget::User(user_id)) => {
                payload.insert("userId".to_string(), json!(user_id));
            }
            Some(DiscordTarget::Channel {
                server_id,
                channel_id,
            }) => {
                payload.insert("serverId".to_string(), json!(server_id));
                payload.insert("channelId".to_string(), json!(channel_id));
            }
            None => return Err(Skip::UnsupportedTarget(target.to_string())),
        }
        payload.insert("content".to_string(), json!(titled(&self.title, message)));

        Ok(Delivery {
            instance: instance.to_string(),
            command: SendCommand::SendMessage,
            payload,
        })
    }
}
