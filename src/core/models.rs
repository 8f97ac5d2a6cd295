use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::job::JobContext;

/// Final summary of one backup job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub job_id: Uuid,
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// False when a step with an abort policy failed.
    pub success: bool,
    pub done: Vec<String>,
    pub errors: BTreeMap<String, String>,
}

impl JobReport {
    pub fn from_job(job: &JobContext, success: bool) -> Self {
        Self {
            job_id: job.id(),
            name: job.name().to_string(),
            started_at: job.started_at(),
            finished_at: Utc::now(),
            success,
            done: job.done().into_iter().map(str::to_string).collect(),
            errors: job
                .errors()
                .into_iter()
                .map(|(step, detail)| (step.to_string(), detail.to_string()))
                .collect(),
        }
    }

    /// Human-readable status line(s) for notifications.
    pub fn summary(&self) -> String {
        let issues: Vec<String> = self
            .errors
            .iter()
            .map(|(step, detail)| format!("- {}: {}", step, detail))
            .collect();

        match (self.success, issues.is_empty()) {
            (true, true) => format!("Backup \"{}\" completed successfully.", self.name),
            (true, false) => format!(
                "Backup \"{}\" completed with warnings:\n{}",
                self.name,
                issues.join("\n")
            ),
            (false, _) => format!("Backup \"{}\" failed:\n{}", self.name, issues.join("\n")),
        }
    }
}
