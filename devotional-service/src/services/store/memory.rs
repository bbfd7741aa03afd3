//! In-process store for tests and local runs.
//!
//! Mirrors the PostgreSQL semantics: half-open day windows, newest-first
//! recency, conditional claims. Any operation can be made to fail, optionally
//! only for one row.

use super::{DevotionalStore, StoreError};
use crate::models::{
    DayWindow, DevotionalContent, JobLogEntry, NewPassage, Passage, PendingDevotional,
    PrivateDevotional, PublicDevotional,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    FindPassage,
    RecentPassages,
    InsertPassage,
    FindPublicDevotional,
    RecentPublicDevotionals,
    InsertPublicDevotional,
    PendingPrivate,
    ClaimPrivate,
    CompletePrivate,
    ReleasePrivate,
    AppendLog,
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    op: StoreOp,
    row: Option<Uuid>,
    error: StoreError,
}

#[derive(Default)]
struct Tables {
    passages: Vec<Passage>,
    public_devotionals: Vec<PublicDevotional>,
    private_devotionals: Vec<PrivateDevotional>,
    logs: Vec<JobLogEntry>,
    failures: Vec<InjectedFailure>,
    operations: usize,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call of `op` fail.
    pub fn fail(&self, op: StoreOp, error: StoreError) {
        self.lock().failures.push(InjectedFailure {
            op,
            row: None,
            error,
        });
    }

    /// Make `op` fail only when it targets `row`.
    pub fn fail_for_row(&self, op: StoreOp, row: Uuid, error: StoreError) {
        self.lock().failures.push(InjectedFailure {
            op,
            row: Some(row),
            error,
        });
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    pub fn seed_passage(&self, passage: Passage) {
        self.lock().passages.push(passage);
    }

    pub fn seed_public_devotional(&self, devotional: PublicDevotional) {
        self.lock().public_devotionals.push(devotional);
    }

    pub fn seed_private_devotional(&self, devotional: PrivateDevotional) {
        self.lock().private_devotionals.push(devotional);
    }

    pub fn passages(&self) -> Vec<Passage> {
        self.lock().passages.clone()
    }

    pub fn public_devotionals(&self) -> Vec<PublicDevotional> {
        self.lock().public_devotionals.clone()
    }

    pub fn private_devotionals(&self) -> Vec<PrivateDevotional> {
        self.lock().private_devotionals.clone()
    }

    pub fn private_devotional(&self, id: Uuid) -> Option<PrivateDevotional> {
        self.lock()
            .private_devotionals
            .iter()
            .find(|row| row.id == id)
            .cloned()
    }

    pub fn logs(&self) -> Vec<JobLogEntry> {
        self.lock().logs.clone()
    }

    /// Number of trait operations attempted so far, failed ones included.
    pub fn operation_count(&self) -> usize {
        self.lock().operations
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // A panicking test thread must not hide the tables from the others.
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Count the operation and return the injected failure, if any.
    fn begin(&self, op: StoreOp, row: Option<Uuid>) -> Result<MutexGuard<'_, Tables>, StoreError> {
        let mut tables = self.lock();
        tables.operations += 1;

        let injected = tables
            .failures
            .iter()
            .find(|f| f.op == op && (f.row.is_none() || f.row == row))
            .map(|f| f.error.clone());

        match injected {
            Some(error) => Err(error),
            None => Ok(tables),
        }
    }
}

fn newest_first<T>(rows: &[T], created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<&T> {
    let mut sorted: Vec<&T> = rows.iter().collect();
    sorted.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
    sorted
}

#[async_trait]
impl DevotionalStore for MemoryStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn find_passage_for_day(&self, day: &DayWindow) -> Result<Option<Uuid>, StoreError> {
        let tables = self.begin(StoreOp::FindPassage, None)?;
        Ok(tables
            .passages
            .iter()
            .filter(|p| day.contains(p.created_at))
            .min_by_key(|p| p.created_at)
            .map(|p| p.id))
    }

    async fn recent_passage_references(&self, limit: i64) -> Result<Vec<String>, StoreError> {
        let tables = self.begin(StoreOp::RecentPassages, None)?;
        Ok(newest_first(&tables.passages, |p| p.created_at)
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|p| p.verse_reference.clone())
            .collect())
    }

    async fn insert_passage(
        &self,
        passage: &NewPassage,
        at: DateTime<Utc>,
    ) -> Result<Passage, StoreError> {
        let mut tables = self.begin(StoreOp::InsertPassage, None)?;
        let row = Passage {
            id: Uuid::new_v4(),
            verse_reference: passage.verse_reference.clone(),
            verse_text: passage.verse_text.clone(),
            reading_time_estimate: passage.reading_time_estimate,
            created_at: at,
            updated_at: at,
        };
        tables.passages.push(row.clone());
        Ok(row)
    }

    async fn find_public_devotional_for_day(
        &self,
        day: &DayWindow,
    ) -> Result<Option<Uuid>, StoreError> {
        let tables = self.begin(StoreOp::FindPublicDevotional, None)?;
        Ok(tables
            .public_devotionals
            .iter()
            .filter(|d| d.title.is_some() && day.contains(d.created_at))
            .min_by_key(|d| d.created_at)
            .map(|d| d.id))
    }

    async fn recent_public_devotional_references(
        &self,
        limit: i64,
    ) -> Result<Vec<String>, StoreError> {
        let tables = self.begin(StoreOp::RecentPublicDevotionals, None)?;
        Ok(newest_first(&tables.public_devotionals, |d| d.created_at)
            .into_iter()
            .filter_map(|d| d.verse_reference.clone())
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn insert_public_devotional(
        &self,
        content: &DevotionalContent,
        at: DateTime<Utc>,
    ) -> Result<PublicDevotional, StoreError> {
        let mut tables = self.begin(StoreOp::InsertPublicDevotional, None)?;
        let row = PublicDevotional {
            id: Uuid::new_v4(),
            title: Some(content.title.clone()),
            description: Some(content.description.clone()),
            verse_reference: Some(content.verse_reference.clone()),
            verse_text: Some(content.verse_text.clone()),
            reflection: Some(content.reflection.clone()),
            application: Some(content.application.clone()),
            prayer: Some(content.prayer.clone()),
            reading_time_estimate: Some(content.reading_time_estimate),
            created_at: at,
            updated_at: at,
        };
        tables.public_devotionals.push(row.clone());
        Ok(row)
    }

    async fn pending_private_devotionals(
        &self,
        limit: i64,
    ) -> Result<Vec<PendingDevotional>, StoreError> {
        let tables = self.begin(StoreOp::PendingPrivate, None)?;
        let mut pending: Vec<&PrivateDevotional> = tables
            .private_devotionals
            .iter()
            .filter(|row| row.is_pending())
            .collect();
        pending.sort_by_key(|row| row.created_at);

        Ok(pending
            .into_iter()
            .take(limit.max(0) as usize)
            .filter_map(|row| {
                row.feeling.clone().map(|feeling| PendingDevotional {
                    id: row.id,
                    feeling,
                })
            })
            .collect())
    }

    async fn claim_private_devotionals(
        &self,
        ids: &[Uuid],
        at: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, StoreError> {
        let mut tables = self.begin(StoreOp::ClaimPrivate, None)?;
        let mut claimed = Vec::new();
        for row in tables
            .private_devotionals
            .iter_mut()
            .filter(|row| ids.contains(&row.id))
        {
            if !row.processing && row.title.is_none() {
                row.processing = true;
                row.updated_at = at;
                claimed.push(row.id);
            }
        }
        Ok(claimed)
    }

    async fn complete_private_devotional(
        &self,
        id: Uuid,
        content: &DevotionalContent,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.begin(StoreOp::CompletePrivate, Some(id))?;
        match tables.private_devotionals.iter_mut().find(|row| row.id == id) {
            Some(row) => {
                row.apply(content, at);
                Ok(())
            }
            None => Err(StoreError::new(format!(
                "Private devotional {} not found",
                id
            ))),
        }
    }

    async fn release_private_devotional(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.begin(StoreOp::ReleasePrivate, Some(id))?;
        if let Some(row) = tables.private_devotionals.iter_mut().find(|row| row.id == id) {
            row.processing = false;
            row.updated_at = at;
        }
        Ok(())
    }

    async fn append_job_log(&self, entry: &JobLogEntry) -> Result<(), StoreError> {
        let mut tables = self.begin(StoreOp::AppendLog, None)?;
        tables.logs.push(entry.clone());
        Ok(())
    }
}
