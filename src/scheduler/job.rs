use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a job. `Done` and `Failed` are terminal; nothing
/// transitions out of them. The discriminant order is the snapshot
/// status code and must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    InWork,
    Done,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::InWork => write!(f, "in-work"),
            JobStatus::Done => write!(f, "done"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One unit of work: an opaque shell command and where it is in its life.
/// Records are kept after completion so the operator can still report on
/// them; only process exit discards them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub command: String,
    pub status: JobStatus,
}

impl Job {
    pub fn new(command: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            command,
            status: JobStatus::Pending,
        }
    }
}
