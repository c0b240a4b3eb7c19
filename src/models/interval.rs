use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::models::intent::ValidationError;

/// Half-open time range `[start, end)`. Back-to-back intervals do not
/// overlap. All instants are stored normalized to UTC; wall-clock input
/// goes through `from_local` with the configured deployment timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::EmptyInterval);
        }
        Ok(Self { start, end })
    }

    /// Build an interval from wall-clock times in the given timezone.
    /// Normalization to UTC happens here, once, so every later comparison
    /// is a plain instant comparison.
    pub fn from_local(
        start: NaiveDateTime,
        end: NaiveDateTime,
        tz: Tz,
    ) -> Result<Self, ValidationError> {
        let start = resolve_local(start, tz)?;
        let end = resolve_local(end, tz)?;
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Smallest interval covering both `self` and `other`.
    pub fn hull(&self, other: &TimeInterval) -> TimeInterval {
        TimeInterval {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn format_local(&self, tz: Tz) -> String {
        let start = self.start.with_timezone(&tz);
        let end = self.end.with_timezone(&tz);
        if start.date_naive() == end.date_naive() {
            format!(
                "{} - {}",
                start.format("%a %d %b %Y, %H:%M"),
                end.format("%H:%M")
            )
        } else {
            format!(
                "{} - {}",
                start.format("%a %d %b %Y, %H:%M"),
                end.format("%a %d %b %Y, %H:%M")
            )
        }
    }
}

fn resolve_local(naive: NaiveDateTime, tz: Tz) -> Result<DateTime<Utc>, ValidationError> {
    // Asia/Kolkata has no DST, but the contract stays explicit for any
    // configured timezone: ambiguous times take the earlier offset,
    // nonexistent times are rejected.
    naive
        .and_local_timezone(tz)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| ValidationError::InvalidLocalTime(naive.to_string()))
}
