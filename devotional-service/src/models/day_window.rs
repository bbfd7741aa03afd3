use chrono::{DateTime, Duration, NaiveTime, Utc};

/// The UTC calendar day containing an instant, as a half-open range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    pub fn containing(now: DateTime<Utc>) -> Self {
        let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        Self {
            start,
            end: start + Duration::days(1),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }

    /// `YYYY-MM-DD`, for log details.
    pub fn date_label(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }
}
