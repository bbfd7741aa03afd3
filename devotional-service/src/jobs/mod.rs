//! The generation jobs.
//!
//! Every job follows the same shape: duplicate guard or pending selection,
//! context, prompt, generation, parse, persist. Critical failures are written
//! to the operational log before the error is returned.

pub mod failure_log;
pub mod parser;
pub mod passage;
pub mod private_devotional;
pub mod prompt;
pub mod public_devotional;

pub use failure_log::JobLogger;
pub use passage::PassageJob;
pub use private_devotional::{BatchReport, PrivateDevotionalJob};
pub use public_devotional::PublicDevotionalJob;

use crate::services::metrics::{record_generation_call, record_generation_duration};
use crate::services::providers::{
    GenerationParams, ProviderError, TextProvider, OVERLOADED_STATUS,
};
use crate::services::store::StoreError;
use axum::http::StatusCode;
use parser::ParseError;
use serde_json::{json, Value};
use service_core::retry::{retry_call, Attempted, RetryConfig, RetryError};
use std::time::Instant;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

pub const PASSAGE_JOB: &str = "passage-generate";
pub const PUBLIC_DEVOTIONAL_JOB: &str = "public-devotional-generate";
pub const PRIVATE_DEVOTIONAL_JOB: &str = "private-devotional-generate";

/// Result of a duplicate-guarded job.
#[derive(Debug, Clone, PartialEq)]
pub enum DailyOutcome<T> {
    /// Content for the day already existed; nothing was generated.
    AlreadyExists(Uuid),
    Created(T),
}

/// An invocation-level failure. Every variant has already been logged.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("{message}")]
    Store {
        message: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("{message}")]
    Generation {
        message: &'static str,
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    #[error("{message}")]
    MalformedOutput {
        message: &'static str,
        #[source]
        source: ParseError,
    },
}

impl JobError {
    /// Upstream status for generation failures when one was observed.
    ///
    /// A 2xx reply without candidate text is malformed output like any other.
    pub fn status_code(&self) -> StatusCode {
        match self {
            JobError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            JobError::MalformedOutput { .. }
            | JobError::Generation {
                source: ProviderError::InvalidEnvelope { .. },
                ..
            } => StatusCode::BAD_GATEWAY,
            JobError::Generation { source, .. } => source
                .status()
                .and_then(|s| StatusCode::from_u16(s).ok())
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    pub fn details(&self) -> Option<&'static str> {
        match self {
            JobError::Generation { source, .. } => {
                if source.status() == Some(OVERLOADED_STATUS) {
                    Some("The model is currently overloaded")
                } else {
                    Some("API error")
                }
            }
            _ => None,
        }
    }

    /// Metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::Store { .. } => "store_error",
            JobError::Generation { .. } => "generation_error",
            JobError::MalformedOutput { .. } => "malformed_output",
        }
    }
}

/// Call the provider under `retry`, recording per-call metrics.
pub(crate) async fn generate_text(
    provider: &dyn TextProvider,
    job: &'static str,
    retry: &RetryConfig,
    prompt: &str,
    params: GenerationParams,
) -> Result<Attempted<String>, RetryError<ProviderError>> {
    let started = Instant::now();

    let result = retry_call(retry, job, ProviderError::is_transient, |attempt| async move {
        debug!(job, attempt, prompt_len = prompt.len(), "Calling generation API");
        let result = provider.generate(prompt, &params).await;
        record_generation_call(job, if result.is_ok() { "ok" } else { "error" });
        result
    })
    .await;

    record_generation_duration(job, started.elapsed().as_secs_f64());
    result
}

/// Log details for a generation failure.
pub(crate) fn generation_failure_details(failure: &RetryError<ProviderError>) -> Value {
    json!({
        "error_message": failure.error.to_string(),
        "status": failure.error.status(),
        "response_text": failure
            .error
            .body()
            .map(|body| parser::truncate(body, parser::RAW_PREVIEW_CHARS)),
        "retry_attempts": failure.attempts,
    })
}

/// Log details for a parse or validation failure.
pub(crate) fn parse_failure_details(raw: &str, error: &ParseError) -> Value {
    json!({
        "error_message": error.to_string(),
        "missing_fields": error.missing_fields(),
        "raw_response": parser::truncate(raw, parser::RAW_PREVIEW_CHARS),
        "response_length": raw.chars().count(),
        "parsed_data": error.parsed_preview(),
    })
}

/// Merge `extra` into an object of log details.
pub(crate) fn with_fields(mut details: Value, extra: Value) -> Value {
    if let (Value::Object(base), Value::Object(extra)) = (&mut details, extra) {
        base.extend(extra);
    }
    details
}
