//! Per-job event log.
//!
//! Every step of a job appends to one `JobContext`. Steps only see it as a
//! write-only `StepSink`; the reporting stage reads the derived `done()` and
//! `errors()` views once the job is over.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum EventOutcome {
    Done,
    Error(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct JobEvent {
    pub step: String,
    pub outcome: EventOutcome,
    pub at: DateTime<Utc>,
}

/// Write-only view of a job's event log handed to steps.
pub trait StepSink: Send {
    fn record_done(&mut self, step: &str);
    fn record_error(&mut self, step: &str, detail: String);
}

#[derive(Debug, Clone)]
pub struct JobContext {
    id: Uuid,
    name: String,
    started_at: DateTime<Utc>,
    events: Vec<JobEvent>,
}

impl JobContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            started_at: Utc::now(),
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn events(&self) -> &[JobEvent] {
        &self.events
    }

    /// Steps that completed, in execution order.
    pub fn done(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter(|e| e.outcome == EventOutcome::Done)
            .map(|e| e.step.as_str())
            .collect()
    }

    /// Latest error per step.
    pub fn errors(&self) -> BTreeMap<&str, &str> {
        self.events
            .iter()
            .filter_map(|e| match &e.outcome {
                EventOutcome::Error(detail) => Some((e.step.as_str(), detail.as_str())),
                EventOutcome::Done => None,
            })
            .collect()
    }

    fn push(&mut self, step: &str, outcome: EventOutcome) {
        self.events.push(JobEvent {
            step: step.to_string(),
            outcome,
            at: Utc::now(),
        });
    }
}

impl StepSink for JobContext {
    fn record_done(&mut self, step: &str) {
        self.push(step, EventOutcome::Done);
    }

    fn record_error(&mut self, step: &str, detail: String) {
        self.push(step, EventOutcome::Error(detail));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_done_keeps_order_and_duplicates() {
        let mut job = JobContext::new("test");
        job.record_done("transfer");
        job.record_done("umount");
        job.record_done("transfer");

        assert_eq!(job.done(), vec!["transfer", "umount", "transfer"]);
        assert!(job.errors().is_empty());
    }

    #[test]
    fn test_errors_last_write_wins() {
        let mut job = JobContext::new("test");
        job.record_error("umount", "busy".to_string());
        job.record_done("notify");
        job.record_error("umount", "not mounted".to_string());

        let errors = job.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("umount"), Some(&"not mounted"));
        assert_eq!(job.events().len(), 3);
    }

    #[test]
    fn test_event_serialization() {
        let mut job = JobContext::new("test");
        job.record_error("umount", "busy".to_string());

        let json = serde_json::to_value(&job.events()[0]).unwrap();
        assert_eq!(json["step"], "umount");
        assert_eq!(json["outcome"]["status"], "error");
        assert_eq!(json["outcome"]["detail"], "busy");
    }
}
