//! Operational log rows written on critical job failures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Error => "error",
        }
    }
}

/// Append-only diagnostic record. `error_details` varies by failure site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobLogEntry {
    pub job_name: String,
    pub status: JobStatus,
    pub message: String,
    pub error_details: Value,
    pub created_at: DateTime<Utc>,
}

impl JobLogEntry {
    pub fn error(job_name: &str, message: impl Into<String>, error_details: Value) -> Self {
        Self {
            job_name: job_name.to_string(),
            status: JobStatus::Error,
            message: message.into(),
            error_details,
            created_at: Utc::now(),
        }
    }
}
