pub mod host;
pub mod job;
pub mod models;
pub mod notifications;
pub mod orchestrator;
pub mod storage_check;
pub mod unmount;

pub use host::{CommandOutput, CommandRunner, HostRegistry, MessageSender, Payload, SendCommand};
pub use job::{EventOutcome, JobContext, JobEvent, StepSink};
pub use models::JobReport;
pub use orchestrator::{FailurePolicy, Orchestrator, StepError, StepKind, StepOutcome};
pub use storage_check::{DiskHealthReport, DiskState, StorageKind};
pub use unmount::{UnmountError, UnmountOutcome};
