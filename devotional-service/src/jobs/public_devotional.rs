//! Shared daily devotional job.

use super::{
    generate_text, generation_failure_details, parse_failure_details, parser, prompt,
    with_fields, DailyOutcome, JobError, JobLogger, PUBLIC_DEVOTIONAL_JOB,
};
use crate::models::{DayWindow, PublicDevotional};
use crate::services::metrics::record_job_run;
use crate::services::providers::{GenerationParams, TextProvider};
use crate::services::store::DevotionalStore;
use chrono::{DateTime, Utc};
use serde_json::json;
use service_core::retry::RetryConfig;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Generates at most one titled public devotional per UTC day, on a random theme.
#[derive(Clone)]
pub struct PublicDevotionalJob {
    store: Arc<dyn DevotionalStore>,
    provider: Arc<dyn TextProvider>,
    logger: JobLogger,
    recent_reference_limit: i64,
}

impl PublicDevotionalJob {
    pub fn new(
        store: Arc<dyn DevotionalStore>,
        provider: Arc<dyn TextProvider>,
        recent_reference_limit: i64,
    ) -> Self {
        Self {
            logger: JobLogger::new(store.clone(), PUBLIC_DEVOTIONAL_JOB),
            store,
            provider,
            recent_reference_limit,
        }
    }

    pub async fn run(&self) -> Result<DailyOutcome<PublicDevotional>, JobError> {
        let theme = prompt::pick_theme(&mut rand::thread_rng());
        self.run_at(Utc::now(), theme).await
    }

    #[instrument(skip(self), fields(job = PUBLIC_DEVOTIONAL_JOB))]
    pub async fn run_at(
        &self,
        now: DateTime<Utc>,
        theme: &str,
    ) -> Result<DailyOutcome<PublicDevotional>, JobError> {
        let result = self.execute(now, theme).await;
        let outcome = match &result {
            Ok(DailyOutcome::AlreadyExists(_)) => "already_exists",
            Ok(DailyOutcome::Created(_)) => "created",
            Err(e) => e.kind(),
        };
        record_job_run(PUBLIC_DEVOTIONAL_JOB, outcome);
        result
    }

    async fn execute(
        &self,
        now: DateTime<Utc>,
        theme: &str,
    ) -> Result<DailyOutcome<PublicDevotional>, JobError> {
        let day = DayWindow::containing(now);

        match self.store.find_public_devotional_for_day(&day).await {
            Ok(Some(existing)) => {
                info!(devotional_id = %existing, "Devotional already exists for today");
                return Ok(DailyOutcome::AlreadyExists(existing));
            }
            Ok(None) => {}
            Err(source) => {
                self.logger
                    .error(
                        "Failed to check for an existing devotional",
                        with_fields(source.details(), json!({"date_check": day.date_label()})),
                    )
                    .await;
                return Err(JobError::Store {
                    message: "Error checking existing devotional",
                    source,
                });
            }
        }

        let recent = match self
            .store
            .recent_public_devotional_references(self.recent_reference_limit)
            .await
        {
            Ok(references) => references,
            Err(e) => {
                warn!(error = %e, "Could not load recent devotionals, continuing without them");
                Vec::new()
            }
        };

        let prompt = prompt::public_devotional_prompt(theme, &recent);
        let generated = match generate_text(
            self.provider.as_ref(),
            PUBLIC_DEVOTIONAL_JOB,
            &RetryConfig::no_retry(),
            &prompt,
            GenerationParams::DEVOTIONAL,
        )
        .await
        {
            Ok(generated) => generated,
            Err(failure) => {
                self.logger
                    .error(
                        "Generation API call failed",
                        with_fields(generation_failure_details(&failure), json!({"theme": theme})),
                    )
                    .await;
                return Err(JobError::Generation {
                    message: "Error calling Gemini API",
                    attempts: failure.attempts,
                    source: failure.error,
                });
            }
        };

        let content = match parser::parse_devotional(&generated.value) {
            Ok(content) => content,
            Err(source) => {
                let message = match source {
                    parser::ParseError::MissingFields { .. } => "Missing devotional fields",
                    _ => "Failed to parse devotional generated by AI.",
                };
                self.logger
                    .error(
                        "Generated devotional could not be used",
                        with_fields(
                            parse_failure_details(&generated.value, &source),
                            json!({"theme": theme}),
                        ),
                    )
                    .await;
                return Err(JobError::MalformedOutput { message, source });
            }
        };

        match self.store.insert_public_devotional(&content, now).await {
            Ok(row) => {
                info!(
                    devotional_id = %row.id,
                    theme = theme,
                    verse_reference = %content.verse_reference,
                    "Daily public devotional generated"
                );
                Ok(DailyOutcome::Created(row))
            }
            Err(source) => {
                self.logger
                    .error(
                        "Failed to save public devotional",
                        with_fields(source.details(), json!({"theme": theme})),
                    )
                    .await;
                Err(JobError::Store {
                    message: "Failed to save devotional to database.",
                    source,
                })
            }
        }
    }
}
