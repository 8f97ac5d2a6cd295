use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Payload forwarded to a notification adapter instance.
pub type Payload = serde_json::Map<String, Value>;

/// Command understood by notification adapter instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SendCommand {
    #[serde(rename = "send")]
    Send,
    #[serde(rename = "sendMessage")]
    SendMessage,
}

impl SendCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::SendMessage => "sendMessage",
        }
    }
}

impl fmt::Display for SendCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read access to the host runtime's object and state registry.
///
/// `Ok(None)` means the key does not exist; `Err` means the lookup itself
/// failed. Callers decide how to treat each.
#[async_trait]
pub trait HostRegistry: Send + Sync {
    /// Read an object such as `system.adapter.<name>.<instance>`.
    async fn get_object(&self, id: &str) -> Result<Option<Value>>;

    /// Read a state such as `system.host.<host>.diskFree`.
    async fn get_state(&self, id: &str) -> Result<Option<Value>>;
}

/// Delivery primitive of the host runtime's message bus.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_to(&self, instance: &str, command: SendCommand, payload: &Payload) -> Result<()>;
}

/// Captured result of an external process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs external processes to completion with output captured.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String]) -> std::io::Result<CommandOutput>;
}
