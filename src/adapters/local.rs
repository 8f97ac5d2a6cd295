use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use nix::sys::statvfs::statvfs;
use serde_json::{Value, json};
use tokio::process::Command;
use tracing::debug;

use crate::config::HostConfig;
use crate::core::host::{CommandOutput, CommandRunner, HostRegistry};

/// Registry backed by this machine.
///
/// Answers only the two keys the storage check needs: the instance object
/// (whose host is this machine) and that host's `diskFree` state, measured
/// with `statvfs` on `local_path`.
pub struct LocalHostRegistry {
    instance_id: String,
    local_path: PathBuf,
}

impl LocalHostRegistry {
    pub fn new(host: &HostConfig) -> Self {
        Self {
            instance_id: host.instance_object_id(),
            local_path: host.local_path.clone(),
        }
    }
}

fn hostname() -> Result<String> {
    let name = nix::unistd::gethostname().context("Failed to read host name")?;
    Ok(name.to_string_lossy().into_owned())
}

/// Free space available to unprivileged users, in MB.
fn disk_free_mb(path: PathBuf) -> Result<u64> {
    let stats = statvfs(&path).with_context(|| format!("statvfs failed for {}", path.display()))?;
    let bytes = stats.blocks_available() as u64 * stats.fragment_size() as u64;
    Ok(bytes / (1024 * 1024))
}

#[async_trait]
impl HostRegistry for LocalHostRegistry {
    async fn get_object(&self, id: &str) -> Result<Option<Value>> {
        if id != self.instance_id {
            return Ok(None);
        }
        Ok(Some(json!({"common": {"host": hostname()?}})))
    }

    async fn get_state(&self, id: &str) -> Result<Option<Value>> {
        let expected = format!("system.host.{}.diskFree", hostname()?);
        if id != expected {
            return Ok(None);
        }

        let path = self.local_path.clone();
        let free = tokio::task::spawn_blocking(move || disk_free_mb(path)).await??;
        debug!(path = %self.local_path.display(), free_mb = free, "Measured local free space");
        Ok(Some(json!({"val": free})))
    }
}

/// Runs processes on this machine.
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[String]) -> std::io::Result<CommandOutput> {
        debug!(program, ?args, "Running command");
        let output = Command::new(program).args(args).output().await?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
