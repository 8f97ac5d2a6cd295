//! Free-space health check of the host running the backup.

use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use crate::config::{HostConfig, StorageConfig};
use crate::core::host::HostRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskState {
    Ok,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Nas,
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskHealthReport {
    pub disk_state: DiskState,
    /// Free space in MB as reported by the host.
    pub disk_free: f64,
    pub storage: StorageKind,
    /// Whether a backup may start now.
    pub ready: bool,
}

/// Classify free space against the two thresholds (all in MB).
pub fn classify(disk_free: f64, error_threshold: u64, warning_threshold: u64) -> DiskState {
    if disk_free > warning_threshold as f64 {
        DiskState::Ok
    } else if disk_free > error_threshold as f64 {
        DiskState::Warn
    } else {
        DiskState::Error
    }
}

/// Evaluate the free space of the host this instance runs on.
///
/// Returns `None` when either the host identity or its `diskFree` metric
/// cannot be resolved, including on lookup errors. Absence is silent; only a
/// classified report logs.
pub async fn evaluate(
    host: &HostConfig,
    storage: &StorageConfig,
    registry: &dyn HostRegistry,
) -> Option<DiskHealthReport> {
    let instance_id = host.instance_object_id();
    let hostname = registry
        .get_object(&instance_id)
        .await
        .ok()
        .flatten()
        .as_ref()
        .and_then(host_of)?;

    let state_id = format!("system.host.{}.diskFree", hostname);
    let disk_free = registry
        .get_state(&state_id)
        .await
        .ok()
        .flatten()
        .as_ref()
        .and_then(numeric_val)?;

    let error_threshold = storage.error_threshold();
    let warning_threshold = storage.warning_threshold();
    let disk_state = classify(disk_free, error_threshold, warning_threshold);

    let report = DiskHealthReport {
        disk_state,
        disk_free,
        storage: if storage.nas_enabled {
            StorageKind::Nas
        } else {
            StorageKind::Local
        },
        ready: storage.nas_enabled || disk_free > error_threshold as f64,
    };

    match disk_state {
        DiskState::Ok => {}
        DiskState::Warn => warn!(
            "On the host \"{}\" only {} MB free space is available! Please check your system!",
            hostname, disk_free
        ),
        DiskState::Error => error!(
            "On the host \"{}\" only {} MB free space is available! Local backups are currently not possible. Please check your system!",
            hostname, disk_free
        ),
    }

    Some(report)
}

fn host_of(object: &Value) -> Option<String> {
    object
        .pointer("/common/host")
        .and_then(Value::as_str)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
}

fn numeric_val(state: &Value) -> Option<f64> {
    let val = match state.get("val")? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    val.filter(|v| v.is_finite())
}
