//! Best-effort writer for the operational log table.

use crate::models::JobLogEntry;
use crate::services::store::DevotionalStore;
use serde_json::Value;
use std::sync::Arc;

/// Appends `status = "error"` rows for one job.
///
/// Write failures are reported through tracing and otherwise dropped; a
/// caller never sees them.
#[derive(Clone)]
pub struct JobLogger {
    store: Arc<dyn DevotionalStore>,
    job_name: &'static str,
}

impl JobLogger {
    pub fn new(store: Arc<dyn DevotionalStore>, job_name: &'static str) -> Self {
        Self { store, job_name }
    }

    pub async fn error(&self, message: impl Into<String>, error_details: Value) {
        let entry = JobLogEntry::error(self.job_name, message, error_details);

        tracing::error!(
            job = self.job_name,
            message = %entry.message,
            details = %entry.error_details,
            "Job failure"
        );

        if let Err(e) = self.store.append_job_log(&entry).await {
            tracing::warn!(
                job = self.job_name,
                error = %e,
                "Failed to write job log entry"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::{MemoryStore, StoreError, StoreOp};
    use serde_json::json;

    #[tokio::test]
    async fn writes_error_rows() {
        let store = Arc::new(MemoryStore::new());
        let logger = JobLogger::new(store.clone(), "passage-generate");

        logger.error("Failed to save passage", json!({"error_code": "23505"})).await;

        let logs = store.logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].job_name, "passage-generate");
        assert_eq!(logs[0].status.as_str(), "error");
        assert_eq!(logs[0].error_details["error_code"], "23505");
    }

    #[tokio::test]
    async fn write_failures_are_swallowed() {
        let store = Arc::new(MemoryStore::new());
        store.fail(StoreOp::AppendLog, StoreError::new("log table unavailable"));
        let logger = JobLogger::new(store.clone(), "passage-generate");

        logger.error("anything", json!({})).await;

        assert!(store.logs().is_empty());
    }
}
