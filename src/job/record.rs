use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::job::fingerprint::fingerprint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Running,
    /// Exited zero; rewritten as `Complete` before the record is persisted.
    Success,
    Failed,
    Skipped,
    Complete,
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Running => write!(f, "RUNNING"),
            JobStatus::Success => write!(f, "SUCCESS"),
            JobStatus::Failed => write!(f, "FAILED"),
            JobStatus::Skipped => write!(f, "SKIPPED"),
            JobStatus::Complete => write!(f, "COMPLETE"),
        }
    }
}

/// Lock and metadata stored under the job's fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub fingerprint: String,
    pub status: JobStatus,
    pub started_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<i64>,
    #[serde(default)]
    pub duration_seconds: i64,
    pub args: Vec<String>,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub lock_ttl_seconds: u64,
    #[serde(default)]
    pub retention_ttl_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
}

impl JobRecord {
    /// A fresh RUNNING record for `args`, not yet persisted anywhere.
    pub fn new(args: Vec<String>, started_at: i64, lock_ttl_seconds: u64) -> Self {
        Self {
            fingerprint: fingerprint(&args),
            status: JobStatus::Running,
            started_at,
            ended_at: None,
            duration_seconds: 0,
            args,
            error_message: String::new(),
            lock_ttl_seconds,
            retention_ttl_seconds: 0,
            pid: None,
        }
    }

    /// Stamp the end time and derive the duration.
    pub fn mark_ended(&mut self, ended_at: i64) {
        let ended_at = ended_at.max(self.started_at);
        self.ended_at = Some(ended_at);
        self.duration_seconds = ended_at - self.started_at;
    }

    /// The command line as a single display string.
    pub fn command(&self) -> String {
        self.args.join(" ")
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }
}
