//! Release of a network-mounted backup target.

use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::config::MountOptions;
use crate::core::host::CommandRunner;
use crate::core::job::StepSink;

/// Step name recorded in the job log.
pub const UMOUNT_STEP: &str = "umount";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnmountOutcome {
    /// The target is not a CIFS/NFS share; nothing to release.
    NotNetworkMount,
    Unmounted { stdout: String },
}

#[derive(Debug, Error)]
pub enum UnmountError {
    /// Configuration error, raised before any side effect.
    #[error("NO mount path specified!")]
    MissingMountPath,
    #[error("umount {target} failed: {detail}")]
    Command { target: String, detail: String },
}

/// Detach the network share at `options.backup_dir`.
///
/// Waits the grace delay first so writers can close their handles, then
/// makes exactly one `umount` attempt. The outcome is recorded in `sink`
/// unless the mount path itself is missing.
#[instrument(skip_all, fields(mount_type = %options.mount_type))]
pub async fn unmount(
    options: &MountOptions,
    runner: &dyn CommandRunner,
    sink: &mut dyn StepSink,
) -> Result<UnmountOutcome, UnmountError> {
    if options.mount.as_deref().is_none_or(str::is_empty) {
        return Err(UnmountError::MissingMountPath);
    }

    if !options.mount_type.is_network() {
        debug!("Backup target is not a network mount, skipping unmount");
        return Ok(UnmountOutcome::NotNetworkMount);
    }

    let target = options.backup_dir.display().to_string();
    debug!(delay_secs = options.grace_delay_secs, target = %target, "Waiting before unmount");
    tokio::time::sleep(options.grace_delay()).await;

    let result = runner.run("umount", &[target.clone()]).await;

    let detail = match result {
        Ok(output) if output.success => {
            info!(target = %target, "Network storage unmounted");
            sink.record_done(UMOUNT_STEP);
            return Ok(UnmountOutcome::Unmounted {
                stdout: output.stdout,
            });
        }
        Ok(output) => {
            error!("{}", output.stderr.trim_end());
            match output.code {
                Some(code) => format!("exit code {}: {}", code, output.stderr.trim()),
                None => format!("terminated by signal: {}", output.stderr.trim()),
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to run umount");
            e.to_string()
        }
    };

    sink.record_error(UMOUNT_STEP, detail.clone());
    Err(UnmountError::Command { target, detail })
}
