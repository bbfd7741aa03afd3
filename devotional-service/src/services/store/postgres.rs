//! PostgreSQL store.

use super::{DevotionalStore, StoreError};
use crate::models::{
    DayWindow, DevotionalContent, JobLogEntry, NewPassage, Passage, PendingDevotional,
    PublicDevotional,
};
use crate::services::metrics::DB_QUERY_DURATION;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "devotional-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl DevotionalStore for PgStore {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Passages
    // -------------------------------------------------------------------------

    #[instrument(skip(self), fields(day = %day.date_label()))]
    async fn find_passage_for_day(&self, day: &DayWindow) -> Result<Option<Uuid>, StoreError> {
        let _timer = DB_QUERY_DURATION
            .with_label_values(&["find_passage_for_day"])
            .start_timer();

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM passages
            WHERE created_at >= $1 AND created_at < $2
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(day.start)
        .bind(day.end)
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }

    #[instrument(skip(self))]
    async fn recent_passage_references(&self, limit: i64) -> Result<Vec<String>, StoreError> {
        let _timer = DB_QUERY_DURATION
            .with_label_values(&["recent_passage_references"])
            .start_timer();

        let references = sqlx::query_scalar::<_, String>(
            r#"
            SELECT verse_reference FROM passages
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(references)
    }

    #[instrument(skip(self, passage), fields(verse_reference = %passage.verse_reference))]
    async fn insert_passage(
        &self,
        passage: &NewPassage,
        at: DateTime<Utc>,
    ) -> Result<Passage, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_passage"])
            .start_timer();

        let row = sqlx::query_as::<_, Passage>(
            r#"
            INSERT INTO passages (id, verse_reference, verse_text, reading_time_estimate, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id, verse_reference, verse_text, reading_time_estimate, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&passage.verse_reference)
        .bind(&passage.verse_text)
        .bind(passage.reading_time_estimate)
        .bind(at)
        .fetch_one(&self.pool)
        .await?;

        timer.observe_duration();
        info!(passage_id = %row.id, "Passage inserted");

        Ok(row)
    }

    // -------------------------------------------------------------------------
    // Public devotionals
    // -------------------------------------------------------------------------

    #[instrument(skip(self), fields(day = %day.date_label()))]
    async fn find_public_devotional_for_day(
        &self,
        day: &DayWindow,
    ) -> Result<Option<Uuid>, StoreError> {
        let _timer = DB_QUERY_DURATION
            .with_label_values(&["find_public_devotional_for_day"])
            .start_timer();

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM public_devotionals
            WHERE created_at >= $1 AND created_at < $2 AND title IS NOT NULL
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(day.start)
        .bind(day.end)
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }

    #[instrument(skip(self))]
    async fn recent_public_devotional_references(
        &self,
        limit: i64,
    ) -> Result<Vec<String>, StoreError> {
        let _timer = DB_QUERY_DURATION
            .with_label_values(&["recent_public_devotional_references"])
            .start_timer();

        let references = sqlx::query_scalar::<_, String>(
            r#"
            SELECT verse_reference FROM public_devotionals
            WHERE verse_reference IS NOT NULL
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(references)
    }

    #[instrument(skip(self, content), fields(title = %content.title))]
    async fn insert_public_devotional(
        &self,
        content: &DevotionalContent,
        at: DateTime<Utc>,
    ) -> Result<PublicDevotional, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_public_devotional"])
            .start_timer();

        let row = sqlx::query_as::<_, PublicDevotional>(
            r#"
            INSERT INTO public_devotionals
                (id, title, description, verse_reference, verse_text, reflection,
                 application, prayer, reading_time_estimate, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING id, title, description, verse_reference, verse_text, reflection,
                      application, prayer, reading_time_estimate, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&content.title)
        .bind(&content.description)
        .bind(&content.verse_reference)
        .bind(&content.verse_text)
        .bind(&content.reflection)
        .bind(&content.application)
        .bind(&content.prayer)
        .bind(content.reading_time_estimate)
        .bind(at)
        .fetch_one(&self.pool)
        .await?;

        timer.observe_duration();
        info!(devotional_id = %row.id, "Public devotional inserted");

        Ok(row)
    }

    // -------------------------------------------------------------------------
    // Private devotionals
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn pending_private_devotionals(
        &self,
        limit: i64,
    ) -> Result<Vec<PendingDevotional>, StoreError> {
        let _timer = DB_QUERY_DURATION
            .with_label_values(&["pending_private_devotionals"])
            .start_timer();

        let rows = sqlx::query_as::<_, PendingDevotional>(
            r#"
            SELECT id, feeling FROM private_devotionals
            WHERE title IS NULL AND feeling IS NOT NULL AND processing = false
            ORDER BY created_at
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Fetched pending private devotionals");
        Ok(rows)
    }

    #[instrument(skip(self, ids), fields(requested = ids.len()))]
    async fn claim_private_devotionals(
        &self,
        ids: &[Uuid],
        at: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, StoreError> {
        let _timer = DB_QUERY_DURATION
            .with_label_values(&["claim_private_devotionals"])
            .start_timer();

        let claimed = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE private_devotionals
            SET processing = true, updated_at = $2
            WHERE id = ANY($1) AND processing = false AND title IS NULL
            RETURNING id
            "#,
        )
        .bind(ids)
        .bind(at)
        .fetch_all(&self.pool)
        .await?;

        debug!(claimed = claimed.len(), "Claimed private devotionals");
        Ok(claimed)
    }

    #[instrument(skip(self, content), fields(devotional_id = %id))]
    async fn complete_private_devotional(
        &self,
        id: Uuid,
        content: &DevotionalContent,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let _timer = DB_QUERY_DURATION
            .with_label_values(&["complete_private_devotional"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE private_devotionals
            SET title = $2, description = $3, verse_reference = $4, verse_text = $5,
                reflection = $6, application = $7, prayer = $8, reading_time_estimate = $9,
                processing = false, updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&content.title)
        .bind(&content.description)
        .bind(&content.verse_reference)
        .bind(&content.verse_text)
        .bind(&content.reflection)
        .bind(&content.application)
        .bind(&content.prayer)
        .bind(content.reading_time_estimate)
        .bind(at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::new(format!(
                "Private devotional {} not found",
                id
            )));
        }

        Ok(())
    }

    #[instrument(skip(self), fields(devotional_id = %id))]
    async fn release_private_devotional(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let _timer = DB_QUERY_DURATION
            .with_label_values(&["release_private_devotional"])
            .start_timer();

        sqlx::query(
            r#"
            UPDATE private_devotionals
            SET processing = false, updated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Operational log
    // -------------------------------------------------------------------------

    #[instrument(skip(self, entry), fields(job_name = %entry.job_name))]
    async fn append_job_log(&self, entry: &JobLogEntry) -> Result<(), StoreError> {
        let _timer = DB_QUERY_DURATION
            .with_label_values(&["append_job_log"])
            .start_timer();

        sqlx::query(
            r#"
            INSERT INTO cron_jobs_logs (id, job_name, status, message, error_details, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&entry.job_name)
        .bind(entry.status.as_str())
        .bind(&entry.message)
        .bind(&entry.error_details)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
