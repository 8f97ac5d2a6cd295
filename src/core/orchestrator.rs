//! Backup job pipeline.
//!
//! A job runs: storage check -> transfer command -> unmount, then reports
//! through the notification channel. How a failing step affects the job is
//! decided only by `failure_policy`.

use thiserror::Error;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::context::AppContext;
use crate::core::job::{JobContext, StepSink};
use crate::core::models::JobReport;
use crate::core::notifications;
use crate::core::storage_check::{self, DiskHealthReport};
use crate::core::unmount::{self, UMOUNT_STEP, UnmountError, UnmountOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    StorageCheck,
    Transfer,
    Unmount,
}

impl StepKind {
    /// Name used in the job log.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StorageCheck => "storageCheck",
            Self::Transfer => "transfer",
            Self::Unmount => UMOUNT_STEP,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// The job fails and the remaining regular steps are skipped.
    Abort,
    /// The failure is logged and recorded; the job carries on.
    Continue,
}

/// What a failure of each step means for the job.
pub const fn failure_policy(kind: StepKind) -> FailurePolicy {
    match kind {
        StepKind::StorageCheck => FailurePolicy::Abort,
        StepKind::Transfer => FailurePolicy::Abort,
        StepKind::Unmount => FailurePolicy::Continue,
    }
}

#[derive(Debug, Error)]
pub enum StepError {
    #[error("only {disk_free} MB free on local storage, more than {required} MB required")]
    InsufficientSpace { disk_free: f64, required: u64 },
    #[error("transfer command failed: {0}")]
    Transfer(String),
    #[error(transparent)]
    Unmount(#[from] UnmountError),
}

impl StepError {
    /// Raised before any side effect, so it is not in the job log.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Unmount(UnmountError::MissingMountPath))
    }
}

#[derive(Debug)]
pub enum StepOutcome {
    Success,
    SoftFailure(StepError),
    HardFailure(StepError),
}

impl StepOutcome {
    /// Apply the step's failure policy to its result.
    pub fn from_result(kind: StepKind, result: Result<(), StepError>) -> Self {
        match (result, failure_policy(kind)) {
            (Ok(()), _) => Self::Success,
            (Err(e), FailurePolicy::Continue) => Self::SoftFailure(e),
            (Err(e), FailurePolicy::Abort) => Self::HardFailure(e),
        }
    }

    pub fn is_hard(&self) -> bool {
        matches!(self, Self::HardFailure(_))
    }
}

pub struct Orchestrator {
    ctx: AppContext,
}

impl Orchestrator {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// Run one complete backup job and notify about its result.
    pub async fn run_job(&self) -> JobReport {
        let mut job = JobContext::new(self.ctx.config.backup.name.clone());
        let span = info_span!("job", job_id = %job.id(), name = %job.name());

        async {
            info!("Backup job started");
            let report = self.run_steps(&mut job).await;
            self.notify(&report.summary()).await;
            info!(success = report.success, "Backup job finished");
            report
        }
        .instrument(span)
        .await
    }

    async fn run_steps(&self, job: &mut JobContext) -> JobReport {
        let mut config_errors = Vec::new();

        let result = self.storage_step(job).await;
        let check = self.settle(StepKind::StorageCheck, result, &mut config_errors);
        if check.is_hard() {
            return report_with(job, false, config_errors);
        }

        let result = self.transfer_step(job).await;
        let transfer = self.settle(StepKind::Transfer, result, &mut config_errors);

        // The share is released even when the transfer failed
        if self.ctx.config.mount.mount_type.is_network() {
            let result = self.unmount_step(job).await;
            self.settle(StepKind::Unmount, result, &mut config_errors);
        }

        report_with(job, !transfer.is_hard(), config_errors)
    }

    fn settle(
        &self,
        kind: StepKind,
        result: Result<(), StepError>,
        config_errors: &mut Vec<(StepKind, String)>,
    ) -> StepOutcome {
        let outcome = StepOutcome::from_result(kind, result);
        match &outcome {
            StepOutcome::Success => debug!(step = kind.as_str(), "Step finished"),
            StepOutcome::SoftFailure(e) => {
                warn!(step = kind.as_str(), error = %e, "Step failed, continuing job")
            }
            StepOutcome::HardFailure(e) => {
                error!(step = kind.as_str(), error = %e, "Step failed, aborting job")
            }
        }
        if let StepOutcome::SoftFailure(e) | StepOutcome::HardFailure(e) = &outcome {
            if e.is_configuration() {
                config_errors.push((kind, e.to_string()));
            }
        }
        outcome
    }

    /// Evaluate free space on the backup host.
    pub async fn check_storage(&self) -> Option<DiskHealthReport> {
        let config = &self.ctx.config;
        storage_check::evaluate(&config.host, &config.storage, self.ctx.registry.as_ref()).await
    }

    async fn storage_step(&self, job: &mut JobContext) -> Result<(), StepError> {
        let step = StepKind::StorageCheck.as_str();
        let Some(report) = self.check_storage().await else {
            warn!("Free disk space could not be determined, proceeding without storage check");
            return Ok(());
        };

        if report.ready {
            job.record_done(step);
            return Ok(());
        }

        let err = StepError::InsufficientSpace {
            disk_free: report.disk_free,
            required: self.ctx.config.storage.error_threshold(),
        };
        job.record_error(step, err.to_string());
        Err(err)
    }

    async fn transfer_step(&self, job: &mut JobContext) -> Result<(), StepError> {
        let step = StepKind::Transfer.as_str();
        let Some(command) = crate::config::non_empty(&self.ctx.config.backup.command) else {
            debug!("No transfer command configured");
            return Ok(());
        };

        info!(command, "Running transfer command");
        let args = ["-c".to_string(), command.to_string()];
        let detail = match self.ctx.runner.run("sh", &args).await {
            Ok(output) if output.success => {
                job.record_done(step);
                return Ok(());
            }
            Ok(output) => match output.code {
                Some(code) => format!("exit code {}: {}", code, output.stderr.trim()),
                None => format!("terminated by signal: {}", output.stderr.trim()),
            },
            Err(e) => e.to_string(),
        };

        job.record_error(step, detail.clone());
        Err(StepError::Transfer(detail))
    }

    async fn unmount_step(&self, job: &mut JobContext) -> Result<(), StepError> {
        self.unmount(job).await?;
        Ok(())
    }

    /// Release the network share, recording the outcome into `sink`.
    pub async fn unmount(&self, sink: &mut dyn StepSink) -> Result<UnmountOutcome, UnmountError> {
        unmount::unmount(&self.ctx.config.mount, self.ctx.runner.as_ref(), sink).await
    }

    /// Send `message` through the configured notification channel.
    pub async fn notify(&self, message: &str) {
        let config = &self.ctx.config.notifications;
        if !config.enabled {
            return;
        }

        match &self.ctx.sender {
            Some(sender) => notifications::dispatch(config, message, sender.as_ref()).await,
            None => warn!("Notifications are enabled but no message transport is configured"),
        }
    }
}

fn report_with(
    job: &JobContext,
    success: bool,
    config_errors: Vec<(StepKind, String)>,
) -> JobReport {
    let mut report = JobReport::from_job(job, success);
    for (kind, detail) in config_errors {
        report.errors.entry(kind.as_str().to_string()).or_insert(detail);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_policy_table() {
        assert_eq!(failure_policy(StepKind::StorageCheck), FailurePolicy::Abort);
        assert_eq!(failure_policy(StepKind::Transfer), FailurePolicy::Abort);
        assert_eq!(failure_policy(StepKind::Unmount), FailurePolicy::Continue);
    }

    #[test]
    fn test_outcome_follows_policy() {
        let soft = StepOutcome::from_result(
            StepKind::Unmount,
            Err(StepError::Unmount(UnmountError::MissingMountPath)),
        );
        assert!(matches!(soft, StepOutcome::SoftFailure(_)));

        let hard = StepOutcome::from_result(
            StepKind::Transfer,
            Err(StepError::Transfer("exit code 1".to_string())),
        );
        assert!(hard.is_hard());

        assert!(matches!(
            StepOutcome::from_result(StepKind::StorageCheck, Ok(())),
            StepOutcome::Success
        ));
    }

    #[test]
    fn test_configuration_errors() {
        assert!(StepError::Unmount(UnmountError::MissingMountPath).is_configuration());
        assert!(!StepError::Transfer("x".to_string()).is_configuration());
    }
}
