use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::event::{Event, EventSnapshot};
use crate::models::interval::TimeInterval;
use crate::models::plan::{ActionPlan, PlanKind};

/// Failures from the calendar provider. Surfaced to the user with a
/// generic retry suggestion and never retried automatically, since a
/// blind commit retry risks duplicate creation.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("calendar provider unreachable: {0}")]
    Network(String),
    #[error("calendar provider timed out after {0}s")]
    Timeout(u64),
    #[error("calendar provider rate limit hit")]
    RateLimited,
    #[error("calendar provider error: {0}")]
    Backend(String),
}

/// The calendar store is the sole source of truth for persisted events.
/// The engine fetches a fresh snapshot before every planning decision
/// and again before every commit.
#[async_trait]
pub trait CalendarClient: Send + Sync {
    async fn fetch_snapshot(&self, window: TimeInterval) -> Result<EventSnapshot, ProviderError>;

    /// Apply a confirmed plan. Create and update return the stored event
    /// with its provider-assigned id; delete echoes the removed event.
    async fn commit(&self, plan: &ActionPlan) -> Result<Event, ProviderError>;
}

/// Calendar backed by process memory, optionally persisted to a JSON
/// file so the CLI keeps its events between runs. Also serves as the
/// provider in integration tests.
pub struct InMemoryCalendarClient {
    events: Mutex<Vec<Event>>,
    backing_file: Option<PathBuf>,
}

impl InMemoryCalendarClient {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events: Mutex::new(events),
            backing_file: None,
        }
    }

    /// Load events from a JSON file; a missing file starts an empty
    /// calendar. Commits write the full event list back.
    pub fn load(path: PathBuf) -> Result<Self, ProviderError> {
        let events = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|err| ProviderError::Backend(format!("invalid calendar file: {err}")))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(ProviderError::Backend(err.to_string())),
        };
        Ok(Self {
            events: Mutex::new(events),
            backing_file: Some(path),
        })
    }

    async fn persist(&self, events: &[Event]) -> Result<(), ProviderError> {
        let Some(path) = &self.backing_file else {
            return Ok(());
        };
        let content = serde_json::to_string_pretty(events)
            .map_err(|err| ProviderError::Backend(err.to_string()))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|err| ProviderError::Backend(err.to_string()))
    }
}

#[async_trait]
impl CalendarClient for InMemoryCalendarClient {
    async fn fetch_snapshot(&self, window: TimeInterval) -> Result<EventSnapshot, ProviderError> {
        let events = self.events.lock().await;
        let in_window = events
            .iter()
            .filter(|event| event.interval.overlaps(&window))
            .cloned()
            .collect();
        Ok(EventSnapshot::new(window, in_window))
    }

    async fn commit(&self, plan: &ActionPlan) -> Result<Event, ProviderError> {
        let mut events = self.events.lock().await;
        let committed = match plan.kind {
            PlanKind::Create => {
                let proposed = plan
                    .proposed
                    .as_ref()
                    .ok_or_else(|| ProviderError::Backend("create plan without proposed event".to_string()))?;
                let mut stored = proposed.clone();
                stored.id = Uuid::new_v4().to_string();
                events.push(stored.clone());
                stored
            }
            PlanKind::Update => {
                let proposed = plan
                    .proposed
                    .as_ref()
                    .ok_or_else(|| ProviderError::Backend("update plan without proposed event".to_string()))?;
                let slot = events
                    .iter_mut()
                    .find(|event| event.id == proposed.id)
                    .ok_or_else(|| {
                        ProviderError::Backend(format!("event {} no longer exists", proposed.id))
                    })?;
                *slot = proposed.clone();
                slot.clone()
            }
            PlanKind::Delete => {
                let target = plan
                    .target
                    .as_ref()
                    .ok_or_else(|| ProviderError::Backend("delete plan without target".to_string()))?;
                let index = events
                    .iter()
                    .position(|event| event.id == target.id)
                    .ok_or_else(|| {
                        ProviderError::Backend(format!("event {} no longer exists", target.id))
                    })?;
                events.remove(index)
            }
            PlanKind::List | PlanKind::FindSlot => {
                return Err(ProviderError::Backend(
                    "informational plan cannot be committed".to_string(),
                ));
            }
        };
        self.persist(&events).await?;
        Ok(committed)
    }
}
