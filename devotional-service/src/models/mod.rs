//! Domain models for the devotional service.

pub mod day_window;
pub mod devotional;
pub mod job_log;
pub mod passage;

pub use day_window::DayWindow;
pub use devotional::{DevotionalContent, PendingDevotional, PrivateDevotional, PublicDevotional};
pub use job_log::{JobLogEntry, JobStatus};
pub use passage::{NewPassage, Passage};
