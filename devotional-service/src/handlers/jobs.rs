//! Scheduler-facing job triggers.
//!
//! Each trigger runs its job to completion and maps the outcome onto the
//! `{success, message, data?}` envelope.

use crate::jobs::{DailyOutcome, JobError};
use crate::startup::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use service_core::error::AppError;
use service_core::response::ApiResponse;

impl IntoResponse for JobError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut body = ApiResponse::failure(self.to_string());
        if let Some(details) = self.details() {
            body = body.with_details(details);
        }
        body.respond(status)
    }
}

pub async fn passage_generate(State(state): State<AppState>) -> Result<Response, JobError> {
    let response = match state.passage_job.run().await? {
        DailyOutcome::AlreadyExists(passage_id) => {
            ApiResponse::success("Passage already exists for today.")
                .with_data(json!({"already_exists": true, "passage_id": passage_id}))
        }
        DailyOutcome::Created(passage) => {
            ApiResponse::success("Daily passage generated and saved successfully.")
                .with_data(json!(passage))
        }
    };
    Ok(response.respond(StatusCode::OK))
}

pub async fn public_devotional_generate(
    State(state): State<AppState>,
) -> Result<Response, JobError> {
    let response = match state.public_devotional_job.run().await? {
        DailyOutcome::AlreadyExists(devotional_id) => {
            ApiResponse::success("Devotional already exists for today.")
                .with_data(json!({"already_exists": true, "devotional_id": devotional_id}))
        }
        DailyOutcome::Created(devotional) => {
            ApiResponse::success("Daily public devotional generated successfully.")
                .with_data(json!({"devotional_id": devotional.id}))
        }
    };
    Ok(response.respond(StatusCode::OK))
}

pub async fn private_devotional_generate(
    State(state): State<AppState>,
) -> Result<Response, JobError> {
    let report = state.private_devotional_job.run().await?;

    let message = if report.selected == 0 {
        "No pending devotionals to process.".to_string()
    } else {
        format!("Processed {} devotionals successfully.", report.processed)
    };

    Ok(ApiResponse::success(message)
        .with_data(json!({"processed": report.processed}))
        .respond(StatusCode::OK))
}

/// Plain `OPTIONS` outside a CORS preflight.
pub async fn options_ok() -> &'static str {
    "ok"
}

pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
