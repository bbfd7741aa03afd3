//! Per-user devotional batch job.
//!
//! One invocation selects a page of pending feelings, claims them, and
//! generates in fixed-size concurrent chunks. A failed item is logged and
//! released so a later run picks it up again.

use super::{
    generate_text, generation_failure_details, parse_failure_details, parser, prompt,
    with_fields, JobError, JobLogger, PRIVATE_DEVOTIONAL_JOB,
};
use crate::config::BatchConfig;
use crate::models::PendingDevotional;
use crate::services::metrics::record_job_run;
use crate::services::providers::{GenerationParams, TextProvider};
use crate::services::store::DevotionalStore;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde_json::{json, Value};
use service_core::retry::RetryConfig;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Counts for one batch invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub selected: usize,
    pub claimed: usize,
    pub processed: usize,
    /// Items that were released after a failure.
    pub failed: Vec<Uuid>,
}

#[derive(Clone)]
pub struct PrivateDevotionalJob {
    store: Arc<dyn DevotionalStore>,
    provider: Arc<dyn TextProvider>,
    logger: JobLogger,
    batch: BatchConfig,
}

impl PrivateDevotionalJob {
    pub fn new(
        store: Arc<dyn DevotionalStore>,
        provider: Arc<dyn TextProvider>,
        batch: BatchConfig,
    ) -> Self {
        Self {
            logger: JobLogger::new(store.clone(), PRIVATE_DEVOTIONAL_JOB),
            store,
            provider,
            batch,
        }
    }

    pub async fn run(&self) -> Result<BatchReport, JobError> {
        self.run_at(Utc::now()).await
    }

    #[instrument(skip(self), fields(job = PRIVATE_DEVOTIONAL_JOB))]
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<BatchReport, JobError> {
        let result = self.execute(now).await;
        let outcome = match &result {
            Ok(report) if report.selected == 0 => "empty",
            Ok(report) if report.failed.is_empty() => "processed",
            Ok(_) => "partial",
            Err(e) => e.kind(),
        };
        record_job_run(PRIVATE_DEVOTIONAL_JOB, outcome);
        result
    }

    async fn execute(&self, now: DateTime<Utc>) -> Result<BatchReport, JobError> {
        let pending = match self
            .store
            .pending_private_devotionals(self.batch.page_size)
            .await
        {
            Ok(pending) => pending,
            Err(source) => {
                self.logger
                    .error("Failed to fetch pending devotionals", source.details())
                    .await;
                return Err(JobError::Store {
                    message: "Failed to fetch pending devotionals.",
                    source,
                });
            }
        };

        if pending.is_empty() {
            info!("No pending devotionals to process");
            return Ok(BatchReport::default());
        }

        let ids: Vec<Uuid> = pending.iter().map(|item| item.id).collect();
        let claimed: HashSet<Uuid> = match self.store.claim_private_devotionals(&ids, now).await {
            Ok(claimed) => claimed.into_iter().collect(),
            Err(source) => {
                self.logger
                    .error(
                        "Failed to mark devotionals as processing",
                        with_fields(source.details(), json!({"devotional_ids": ids})),
                    )
                    .await;
                return Err(JobError::Store {
                    message: "Failed to mark devotionals as processing.",
                    source,
                });
            }
        };

        let selected = pending.len();
        let items: Vec<PendingDevotional> = pending
            .into_iter()
            .filter(|item| claimed.contains(&item.id))
            .collect();
        if items.len() < selected {
            warn!(
                selected = selected,
                claimed = items.len(),
                "Some pending devotionals were claimed by another run"
            );
        }

        let mut report = BatchReport {
            selected,
            claimed: items.len(),
            ..Default::default()
        };

        for chunk in items.chunks(self.batch.chunk_size.max(1)) {
            debug!(chunk_len = chunk.len(), "Generating chunk");
            let results = join_all(chunk.iter().map(|item| self.process_item(item, now))).await;

            for (item, ok) in chunk.iter().zip(results) {
                if ok {
                    report.processed += 1;
                } else {
                    report.failed.push(item.id);
                }
            }
        }

        info!(
            processed = report.processed,
            failed = report.failed.len(),
            "Private devotional batch finished"
        );
        Ok(report)
    }

    /// Generate and store one item. On failure, logs once and releases the row.
    async fn process_item(&self, item: &PendingDevotional, now: DateTime<Utc>) -> bool {
        match self.generate_item(item, now).await {
            Ok(()) => {
                debug!(devotional_id = %item.id, "Private devotional completed");
                true
            }
            Err((message, details)) => {
                let item_fields = json!({
                    "devotional_id": item.id,
                    "feeling": item.feeling,
                });
                self.logger
                    .error(
                        format!("{} for devotional {}", message, item.id),
                        with_fields(details, item_fields),
                    )
                    .await;

                if let Err(e) = self.store.release_private_devotional(item.id, now).await {
                    warn!(
                        devotional_id = %item.id,
                        error = %e,
                        "Failed to release private devotional"
                    );
                }
                false
            }
        }
    }

    async fn generate_item(
        &self,
        item: &PendingDevotional,
        now: DateTime<Utc>,
    ) -> Result<(), (&'static str, Value)> {
        let prompt = prompt::private_devotional_prompt(&item.feeling);

        let generated = generate_text(
            self.provider.as_ref(),
            PRIVATE_DEVOTIONAL_JOB,
            &RetryConfig::no_retry(),
            &prompt,
            GenerationParams::DEVOTIONAL,
        )
        .await
        .map_err(|failure| {
            (
                "Generation API call failed",
                generation_failure_details(&failure),
            )
        })?;

        let content = parser::parse_devotional(&generated.value).map_err(|e| {
            (
                "Generated devotional could not be used",
                parse_failure_details(&generated.value, &e),
            )
        })?;

        self.store
            .complete_private_devotional(item.id, &content, now)
            .await
            .map_err(|e| ("Failed to update devotional", e.details()))
    }
}
