//! Implementations of the host seams.
//!
//! - `rpc`: the host runtime reached over JSON-RPC
//! - `local`: this machine, no host runtime involved
//! - `simulated`: in-memory, records every call

mod local;
mod rpc;
mod simulated;

use std::sync::Arc;

use serde_json::json;

use crate::config::HostConfig;
use crate::core::host::{CommandRunner, HostRegistry, MessageSender};

pub use local::{LocalHostRegistry, SystemRunner};
pub use rpc::{RpcHostRegistry, RpcMessageSender};
pub use simulated::{RunnerCall, SentMessage, SimulatedRegistry, SimulatedRunner, SimulatedSender};

/// Host name the simulated registry reports.
pub const SIMULATED_HOST: &str = "simulated-host";
/// Free space (MB) the simulated registry reports.
pub const SIMULATED_DISK_FREE_MB: u64 = 2048;

pub fn get_registry(host: &HostConfig, simulation: bool) -> Arc<dyn HostRegistry> {
    if simulation {
        return Arc::new(
            SimulatedRegistry::new()
                .with_object(
                    &host.instance_object_id(),
                    json!({"common": {"host": SIMULATED_HOST}}),
                )
                .with_state(
                    &format!("system.host.{}.diskFree", SIMULATED_HOST),
                    json!({"val": SIMULATED_DISK_FREE_MB}),
                ),
        );
    }

    match host.rpc_addr {
        Some(addr) => Arc::new(RpcHostRegistry::new(addr)),
        None => Arc::new(LocalHostRegistry::new(host)),
    }
}

/// Message transport, if one is reachable in this mode.
pub fn get_sender(host: &HostConfig, simulation: bool) -> Option<Arc<dyn MessageSender>> {
    if simulation {
        return Some(Arc::new(SimulatedSender::new()));
    }

    host.rpc_addr
        .map(|addr| Arc::new(RpcMessageSender::new(addr)) as Arc<dyn MessageSender>)
}

pub fn get_runner(simulation: bool) -> Arc<dyn CommandRunner> {
    if simulation {
        return Arc::new(SimulatedRunner::succeeding(""));
    }

    Arc::new(SystemRunner)
}
