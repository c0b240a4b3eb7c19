use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::interval::TimeInterval;

/// A calendar event. The id is provider-assigned and stays empty until
/// the event has been committed; the engine only ever reads snapshot
/// events or constructs new ones for proposed operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub interval: TimeInterval,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Event {
    pub fn draft(title: impl Into<String>, interval: TimeInterval) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            interval,
            metadata: BTreeMap::new(),
        }
    }

    pub fn is_persisted(&self) -> bool {
        !self.id.is_empty()
    }
}

/// Read-only view of calendar events covering a queried window, fetched
/// fresh before every planning decision and again before every commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSnapshot {
    pub window: TimeInterval,
    events: Vec<Event>,
}

impl EventSnapshot {
    /// Events are kept in start-time ascending order regardless of what
    /// the provider returned.
    pub fn new(window: TimeInterval, mut events: Vec<Event>) -> Self {
        events.sort_by_key(|event| event.interval.start());
        Self { window, events }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn overlapping<'a>(
        &'a self,
        interval: &'a TimeInterval,
    ) -> impl Iterator<Item = &'a Event> {
        self.events
            .iter()
            .filter(move |event| event.interval.overlaps(interval))
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Event> {
        if id.is_empty() {
            return None;
        }
        self.events.iter().find(|event| event.id == id)
    }
}
