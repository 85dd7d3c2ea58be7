use serde::{Deserialize, Serialize};
use std::fmt;

/// Status code the backend reports for a finished job.
pub const JOB_SUCCESS_CODE: i64 = 2;

/// An offline job as reported by the Transfer Backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub name: String,
    pub status: JobStatus,
}

impl Job {
    pub fn is_completed(&self) -> bool {
        self.status.is_success()
    }
}

/// Job status; backends report either a label or a numeric code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobStatus {
    Code(i64),
    Text(String),
}

impl JobStatus {
    /// `"Success"` (any case) or code 2.
    pub fn is_success(&self) -> bool {
        match self {
            JobStatus::Code(code) => *code == JOB_SUCCESS_CODE,
            JobStatus::Text(text) => text.trim().eq_ignore_ascii_case("success"),
        }
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Text(String::new())
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Code(code) => write!(f, "{}", code),
            JobStatus::Text(text) => write!(f, "{}", text),
        }
    }
}
