use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;
use tracing::info;

use crate::core::host::{
    CommandOutput, CommandRunner, HostRegistry, MessageSender, Payload, SendCommand,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory registry.
#[derive(Default)]
pub struct SimulatedRegistry {
    objects: HashMap<String, Value>,
    states: HashMap<String, Value>,
    failing: bool,
    lookups: Mutex<Vec<String>>,
}

impl SimulatedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, id: &str, object: Value) -> Self {
        self.objects.insert(id.to_string(), object);
        self
    }

    pub fn with_state(mut self, id: &str, state: Value) -> Self {
        self.states.insert(id.to_string(), state);
        self
    }

    /// Make every lookup return an error.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Ids looked up so far, in order.
    pub fn lookups(&self) -> Vec<String> {
        lock(&self.lookups).clone()
    }

    fn lookup(&self, map: &HashMap<String, Value>, id: &str) -> Result<Option<Value>> {
        lock(&self.lookups).push(id.to_string());
        if self.failing {
            bail!("simulated registry failure for {}", id);
        }
        Ok(map.get(id).cloned())
    }
}

#[async_trait]
impl HostRegistry for SimulatedRegistry {
    async fn get_object(&self, id: &str) -> Result<Option<Value>> {
        self.lookup(&self.objects, id)
    }

    async fn get_state(&self, id: &str) -> Result<Option<Value>> {
        self.lookup(&self.states, id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub instance: String,
    pub command: SendCommand,
    pub payload: Payload,
}

/// Records deliveries instead of sending them.
#[derive(Default)]
pub struct SimulatedSender {
    failing: bool,
    attempts: Mutex<usize>,
    sent: Mutex<Vec<SentMessage>>,
}

impl SimulatedSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every delivery fail.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Successful deliveries.
    pub fn sent(&self) -> Vec<SentMessage> {
        lock(&self.sent).clone()
    }

    /// Every call, failed or not.
    pub fn attempts(&self) -> usize {
        *lock(&self.attempts)
    }
}

#[async_trait]
impl MessageSender for SimulatedSender {
    async fn send_to(&self, instance: &str, command: SendCommand, payload: &Payload) -> Result<()> {
        *lock(&self.attempts) += 1;
        if self.failing {
            bail!("simulated transport failure");
        }

        info!(instance, %command, "(Simulated) message delivered");
        lock(&self.sent).push(SentMessage {
            instance: instance.to_string(),
            command,
            payload: payload.clone(),
        });
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RunnerCall {
    pub program: String,
    pub args: Vec<String>,
    /// When the process was started, on the tokio clock.
    pub at: Instant,
}

enum RunnerBehavior {
    Exit(CommandOutput),
    /// The program cannot be spawned at all.
    Unavailable,
}

/// Records process invocations and returns a canned result.
pub struct SimulatedRunner {
    behavior: RunnerBehavior,
    calls: Mutex<Vec<RunnerCall>>,
}

impl SimulatedRunner {
    pub fn succeeding(stdout: &str) -> Self {
        Self::with_behavior(RunnerBehavior::Exit(CommandOutput {
            success: true,
            code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }))
    }

    pub fn failing(code: i32, stderr: &str) -> Self {
        Self::with_behavior(RunnerBehavior::Exit(CommandOutput {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }))
    }

    pub fn unavailable() -> Self {
        Self::with_behavior(RunnerBehavior::Unavailable)
    }

    fn with_behavior(behavior: RunnerBehavior) -> Self {
        Self {
            behavior,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RunnerCall> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl CommandRunner for SimulatedRunner {
    async fn run(&self, program: &str, args: &[String]) -> std::io::Result<CommandOutput> {
        info!(program, ?args, "(Simulated) running command");
        lock(&self.calls).push(RunnerCall {
            program: program.to_string(),
            args: args.to_vec(),
            at: Instant::now(),
        });

        match &self.behavior {
            RunnerBehavior::Exit(output) => Ok(output.clone()),
            RunnerBehavior::Unavailable => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{}: command not found", program),
            )),
        }
    }
}
