use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::event::Event;
use crate::models::interval::TimeInterval;

/// Malformed intent fields, rejected before any planning happens. These
/// never surface to the user as a calendar conflict.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("interval end must be after its start")]
    EmptyInterval,
    #[error("local time {0} does not exist in the configured timezone")]
    InvalidLocalTime(String),
    #[error("duration must be positive")]
    NonPositiveDuration,
    #[error("update carries neither a new title nor a new time")]
    NoChanges,
}

/// Fuzzy reference to an existing event: title plus an approximate
/// interval, since the user's utterance carries no stable id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSelector {
    pub title: String,
    pub around: TimeInterval,
}

impl EventSelector {
    pub fn matches(&self, event: &Event) -> bool {
        event.title.trim().eq_ignore_ascii_case(self.title.trim())
            && event.interval.overlaps(&self.around)
    }
}

/// What the user wants done, produced by the external NLU layer. Fields
/// are assumed present; semantic validation is ours.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Intent {
    Create {
        title: String,
        interval: TimeInterval,
    },
    Update {
        selector: EventSelector,
        new_title: Option<String>,
        new_interval: Option<TimeInterval>,
    },
    Delete {
        selector: EventSelector,
    },
    List {
        window: TimeInterval,
    },
    FindSlot {
        duration_minutes: i64,
        window: TimeInterval,
    },
}

impl Intent {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Intent::Create { title, .. } => non_empty_title(title),
            Intent::Update {
                selector,
                new_title,
                new_interval,
            } => {
                non_empty_title(&selector.title)?;
                if new_title.is_none() && new_interval.is_none() {
                    return Err(ValidationError::NoChanges);
                }
                if let Some(title) = new_title {
                    non_empty_title(title)?;
                }
                Ok(())
            }
            Intent::Delete { selector } => non_empty_title(&selector.title),
            Intent::List { .. } => Ok(()),
            Intent::FindSlot {
                duration_minutes, ..
            } => {
                if *duration_minutes <= 0 {
                    return Err(ValidationError::NonPositiveDuration);
                }
                Ok(())
            }
        }
    }

    /// The window the event snapshot must cover for this intent to be
    /// planned.
    pub fn snapshot_window(&self) -> TimeInterval {
        match self {
            Intent::Create { interval, .. } => *interval,
            Intent::Update {
                selector,
                new_interval,
                ..
            } => match new_interval {
                Some(interval) => selector.around.hull(interval),
                None => selector.around,
            },
            Intent::Delete { selector } => selector.around,
            Intent::List { window } => *window,
            Intent::FindSlot { window, .. } => *window,
        }
    }
}

fn non_empty_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(())
}
