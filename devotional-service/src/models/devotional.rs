//! Devotional content shared by the public and private streams.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Generated devotional fields, validated before any write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DevotionalContent {
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(length(min = 1))]
    pub description: String,
    #[validate(length(min = 1))]
    pub verse_reference: String,
    #[validate(length(min = 1))]
    pub verse_text: String,
    pub reflection: String,
    pub application: String,
    pub prayer: String,
    pub reading_time_estimate: i32,
}

/// One devotional of the shared daily stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PublicDevotional {
    pub id: Uuid,
    pub title: Option<String>,
    pub description: Option<String>,
    pub verse_reference: Option<String>,
    pub verse_text: Option<String>,
    pub reflection: Option<String>,
    pub application: Option<String>,
    pub prayer: Option<String>,
    pub reading_time_estimate: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user-submitted feeling waiting for its devotional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PendingDevotional {
    pub id: Uuid,
    pub feeling: String,
}

/// A row of the per-user stream.
///
/// `title` stays null until generation succeeds; `processing` marks a row
/// claimed by a running batch.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PrivateDevotional {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub feeling: Option<String>,
    pub processing: bool,
    pub title: Option<String>,
    pub description: Option<String>,
    pub verse_reference: Option<String>,
    pub verse_text: Option<String>,
    pub reflection: Option<String>,
    pub application: Option<String>,
    pub prayer: Option<String>,
    pub reading_time_estimate: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PrivateDevotional {
    /// A freshly submitted feeling, as the user-facing API creates it.
    pub fn pending(user_id: Option<Uuid>, feeling: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            feeling: Some(feeling.into()),
            processing: false,
            title: None,
            description: None,
            verse_reference: None,
            verse_text: None,
            reflection: None,
            application: None,
            prayer: None,
            reading_time_estimate: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.title.is_none() && self.feeling.is_some() && !self.processing
    }

    pub fn apply(&mut self, content: &DevotionalContent, at: DateTime<Utc>) {
        self.title = Some(content.title.clone());
        self.description = Some(content.description.clone());
        self.verse_reference = Some(content.verse_reference.clone());
        self.verse_text = Some(content.verse_text.clone());
        self.reflection = Some(content.reflection.clone());
        self.application = Some(content.application.clone());
        self.prayer = Some(content.prayer.clone());
        self.reading_time_estimate = Some(content.reading_time_estimate);
        self.processing = false;
        self.updated_at = at;
    }
}
