//! Daily scripture passage job.

use super::{
    generate_text, generation_failure_details, parse_failure_details, parser, prompt,
    with_fields, DailyOutcome, JobError, JobLogger, PASSAGE_JOB,
};
use crate::models::{DayWindow, Passage};
use crate::services::metrics::record_job_run;
use crate::services::providers::{GenerationParams, TextProvider};
use crate::services::store::DevotionalStore;
use chrono::{DateTime, Utc};
use serde_json::json;
use service_core::retry::RetryConfig;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Generates at most one passage per UTC day.
#[derive(Clone)]
pub struct PassageJob {
    store: Arc<dyn DevotionalStore>,
    provider: Arc<dyn TextProvider>,
    logger: JobLogger,
    retry: RetryConfig,
    recent_reference_limit: i64,
}

impl PassageJob {
    pub fn new(
        store: Arc<dyn DevotionalStore>,
        provider: Arc<dyn TextProvider>,
        retry: RetryConfig,
        recent_reference_limit: i64,
    ) -> Self {
        Self {
            logger: JobLogger::new(store.clone(), PASSAGE_JOB),
            store,
            provider,
            retry,
            recent_reference_limit,
        }
    }

    pub async fn run(&self) -> Result<DailyOutcome<Passage>, JobError> {
        self.run_at(Utc::now()).await
    }

    #[instrument(skip(self), fields(job = PASSAGE_JOB))]
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<DailyOutcome<Passage>, JobError> {
        let result = self.execute(now).await;
        let outcome = match &result {
            Ok(DailyOutcome::AlreadyExists(_)) => "already_exists",
            Ok(DailyOutcome::Created(_)) => "created",
            Err(e) => e.kind(),
        };
        record_job_run(PASSAGE_JOB, outcome);
        result
    }

    async fn execute(&self, now: DateTime<Utc>) -> Result<DailyOutcome<Passage>, JobError> {
        let day = DayWindow::containing(now);

        match self.store.find_passage_for_day(&day).await {
            Ok(Some(existing)) => {
                info!(passage_id = %existing, "Passage already exists for today");
                return Ok(DailyOutcome::AlreadyExists(existing));
            }
            Ok(None) => {}
            Err(source) => {
                self.logger
                    .error(
                        "Failed to check for an existing passage",
                        with_fields(source.details(), json!({"date_check": day.date_label()})),
                    )
                    .await;
                return Err(JobError::Store {
                    message: "Error checking existing passage",
                    source,
                });
            }
        }

        let recent = match self
            .store
            .recent_passage_references(self.recent_reference_limit)
            .await
        {
            Ok(references) => references,
            Err(e) => {
                warn!(error = %e, "Could not load recent passages, continuing without them");
                Vec::new()
            }
        };

        let prompt = prompt::passage_prompt(&recent);
        let generated = match generate_text(
            self.provider.as_ref(),
            PASSAGE_JOB,
            &self.retry,
            &prompt,
            GenerationParams::PASSAGE,
        )
        .await
        {
            Ok(generated) => generated,
            Err(failure) => {
                self.logger
                    .error(
                        "Generation API call failed after retries",
                        generation_failure_details(&failure),
                    )
                    .await;
                return Err(JobError::Generation {
                    message: "Error calling Gemini API after multiple retries",
                    attempts: failure.attempts,
                    source: failure.error,
                });
            }
        };

        let passage = match parser::parse_passage(&generated.value) {
            Ok(passage) => passage,
            Err(source) => {
                let message = match source {
                    parser::ParseError::MissingFields { .. } => "Missing passage fields",
                    _ => "Failed to parse passage generated by AI.",
                };
                self.logger
                    .error(
                        "Generated passage could not be used",
                        parse_failure_details(&generated.value, &source),
                    )
                    .await;
                return Err(JobError::MalformedOutput { message, source });
            }
        };

        match self.store.insert_passage(&passage, now).await {
            Ok(row) => {
                info!(
                    passage_id = %row.id,
                    verse_reference = %row.verse_reference,
                    attempts = generated.attempts,
                    "Daily passage generated"
                );
                Ok(DailyOutcome::Created(row))
            }
            Err(source) => {
                let preview = serde_json::to_string(&passage).unwrap_or_default();
                self.logger
                    .error(
                        "Failed to save passage",
                        with_fields(
                            source.details(),
                            json!({
                                "passage_data": parser::truncate(&preview, parser::PARSED_PREVIEW_CHARS)
                            }),
                        ),
                    )
                    .await;
                Err(JobError::Store {
                    message: "Failed to save passage to database.",
                    source,
                })
            }
        }
    }
}
