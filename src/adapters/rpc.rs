use std::net::SocketAddr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Value, json};

use crate::core::host::{HostRegistry, MessageSender, Payload, SendCommand};
use crate::rpc::{METHOD_GET_OBJECT, METHOD_GET_STATE, METHOD_SEND_TO, RpcClient};

/// Registry lookups served by the host runtime.
pub struct RpcHostRegistry {
    client: RpcClient,
}

impl RpcHostRegistry {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            client: RpcClient::new(addr),
        }
    }

    async fn get(&self, method: &str, id: &str) -> Result<Option<Value>> {
        let value: Value = self
            .client
            .call(method, Some(json!({ "id": id })))
            .await
            .with_context(|| format!("{} {} via {}", method, id, self.client.addr()))?;

        Ok(match value {
            Value::Null => None,
            other => Some(other),
        })
    }
}

#[async_trait]
impl HostRegistry for RpcHostRegistry {
    async fn get_object(&self, id: &str) -> Result<Option<Value>> {
        self.get(METHOD_GET_OBJECT, id).await
    }

    async fn get_state(&self, id: &str) -> Result<Option<Value>> {
        self.get(METHOD_GET_STATE, id).await
    }
}

/// Message delivery through the host runtime's `sendTo`.
pub struct RpcMessageSender {
    client: RpcClient,
}

impl RpcMessageSender {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            client: RpcClient::new(addr),
        }
    }
}

#[async_trait]
impl MessageSender for RpcMessageSender {
    async fn send_to(&self, instance: &str, command: SendCommand, payload: &Payload) -> Result<()> {
        let params = json!({
            "instance": instance,
            "command": command,
            "message": payload,
        });

        // The adapter's reply is not used
        let _: Value = self
            .client
            .call(METHOD_SEND_TO, Some(params))
            .await
            .with_context(|| format!("sendTo {} failed", instance))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    /// Answer a single request with `result` and hand back its params.
    async fn serve_once(listener: TcpListener, result: Value) -> Value {
        let (stream, _) = listener.accept().await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut line = String::new();
        BufReader::new(reader).read_line(&mut line).await.unwrap();
        let request: Value = serde_json::from_str(line.trim()).unwrap();

        let reply = json!({"jsonrpc": "2.0", "result": result, "id": request["id"]});
        writer
            .write_all(format!("{}\n", reply).as_bytes())
            .await
            .unwrap();
        request
    }

    #[tokio::test]
    async fn test_registry_null_is_absent() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let registry = RpcHostRegistry::new(listener.local_addr().unwrap());
        let server = tokio::spawn(serve_once(listener, Value::Null));

        let value = registry.get_state("system.host.nas.diskFree").await.unwrap();
        assert!(value.is_none());

        let request = server.await.unwrap();
        assert_eq!(request["method"], "states.get");
        assert_eq!(request["params"]["id"], "system.host.nas.diskFree");
    }

    #[tokio::test]
    async fn test_send_to_forwards_payload() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let sender = RpcMessageSender::new(listener.local_addr().unwrap());
        let server = tokio::spawn(serve_once(listener, json!({"ok": true})));

        let mut payload = Payload::new();
        payload.insert("userId".to_string(), json!("123"));
        sender
            .send_to("discord.0", SendCommand::SendMessage, &payload)
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert_eq!(request["method"], "messages.sendTo");
        assert_eq!(request["params"]["instance"], "discord.0");
        assert_eq!(request["params"]["command"], "sendMessage");
        assert_eq!(request["params"]["message"]["userId"], "123");
    }
}
