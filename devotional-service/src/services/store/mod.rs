//! Persistence for generated content and the operational log.
//!
//! Jobs depend on [`DevotionalStore`]; production wires [`PgStore`], tests use
//! [`MemoryStore`].

pub mod memory;
pub mod postgres;

pub use memory::{MemoryStore, StoreOp};
pub use postgres::PgStore;

use crate::models::{
    DayWindow, DevotionalContent, JobLogEntry, NewPassage, Passage, PendingDevotional,
    PublicDevotional,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use sqlx::postgres::PgDatabaseError;
use thiserror::Error;
use uuid::Uuid;

/// A failed store operation, with the backend's diagnostics when it gave any.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
    /// SQLSTATE code.
    pub code: Option<String>,
    pub hint: Option<String>,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            hint: None,
        }
    }

    /// `error_message` / `error_code` / `error_hint` fields for log details.
    pub fn details(&self) -> Value {
        json!({
            "error_message": self.message,
            "error_code": self.code,
            "error_hint": self.hint,
        })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => Self {
                message: db_err.message().to_string(),
                code: db_err.code().map(|c| c.into_owned()),
                hint: db_err
                    .try_downcast_ref::<PgDatabaseError>()
                    .and_then(|pg| pg.hint())
                    .map(str::to_string),
            },
            _ => Self::new(err.to_string()),
        }
    }
}

#[async_trait]
pub trait DevotionalStore: Send + Sync {
    /// Cheap round trip used by the readiness probe.
    async fn health_check(&self) -> Result<(), StoreError>;

    /// Id of any passage created inside `day`.
    async fn find_passage_for_day(&self, day: &DayWindow) -> Result<Option<Uuid>, StoreError>;

    /// References of the `limit` most recently created passages, newest first.
    async fn recent_passage_references(&self, limit: i64) -> Result<Vec<String>, StoreError>;

    async fn insert_passage(
        &self,
        passage: &NewPassage,
        at: DateTime<Utc>,
    ) -> Result<Passage, StoreError>;

    /// Id of a titled public devotional created inside `day`.
    async fn find_public_devotional_for_day(
        &self,
        day: &DayWindow,
    ) -> Result<Option<Uuid>, StoreError>;

    async fn recent_public_devotional_references(
        &self,
        limit: i64,
    ) -> Result<Vec<String>, StoreError>;

    async fn insert_public_devotional(
        &self,
        content: &DevotionalContent,
        at: DateTime<Utc>,
    ) -> Result<PublicDevotional, StoreError>;

    /// Unclaimed private rows with a feeling and no title.
    async fn pending_private_devotionals(
        &self,
        limit: i64,
    ) -> Result<Vec<PendingDevotional>, StoreError>;

    /// Set `processing` on every id still pending; returns the ids actually claimed.
    async fn claim_private_devotionals(
        &self,
        ids: &[Uuid],
        at: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, StoreError>;

    /// Write generated content to a claimed row and clear `processing`.
    async fn complete_private_devotional(
        &self,
        id: Uuid,
        content: &DevotionalContent,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Clear `processing` without touching content, leaving the row pending.
    async fn release_private_devotional(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn append_job_log(&self, entry: &JobLogEntry) -> Result<(), StoreError>;
}
