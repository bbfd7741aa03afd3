//! Daily scripture passage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A persisted daily passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Passage {
    pub id: Uuid,
    pub verse_reference: String,
    /// Numbered verses separated by `<br>` markers.
    pub verse_text: String,
    pub reading_time_estimate: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A generated passage that has not been stored yet.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct NewPassage {
    #[validate(length(min = 1))]
    pub verse_reference: String,
    #[validate(length(min = 1))]
    pub verse_text: String,
    pub reading_time_estimate: i32,
}
