use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::models::event::Event;
use crate::models::intent::Intent;
use crate::models::interval::TimeInterval;
use crate::models::plan::{ActionPlan, ConfirmationState, PlanKind};
use crate::service::calendar_client::{CalendarClient, ProviderError};
use crate::service::conflict::find_conflicts;
use crate::service::planner::{self, PlanError};
use crate::service::slots::find_slots;
use crate::service::vocabulary::{ConfirmationVocabulary, ReplyKind};

pub type SessionId = String;

/// A plan moving through its confirmation cycle. Exactly one of these
/// may be non-terminal per session.
#[derive(Debug, Clone)]
pub struct PendingPlan {
    pub plan: ActionPlan,
    pub state: ConfirmationState,
    pub proposed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: HashMap<SessionId, PendingPlan>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    pub fn insert(&mut self, session_id: &str, pending: PendingPlan) {
        self.sessions.insert(session_id.to_string(), pending);
    }

    pub fn get(&self, session_id: &str) -> Option<&PendingPlan> {
        self.sessions.get(session_id)
    }

    pub fn remove(&mut self, session_id: &str) -> Option<PendingPlan> {
        self.sessions.remove(session_id)
    }
}

/// Inputs delivered by the dialogue front end. The front end owns the
/// timeout clock for proposed plans and delivers `TimeoutElapsed`.
#[derive(Debug)]
pub enum SessionEvent {
    IntentSubmitted { session_id: String, intent: Intent },
    ReplySubmitted { session_id: String, text: String },
    TimeoutElapsed { session_id: String },
}

impl SessionEvent {
    pub fn session_id(&self) -> &str {
        match self {
            SessionEvent::IntentSubmitted { session_id, .. } => session_id,
            SessionEvent::ReplySubmitted { session_id, .. } => session_id,
            SessionEvent::TimeoutElapsed { session_id } => session_id,
        }
    }
}

#[derive(Debug, Clone)]
pub enum EngineReply {
    /// A plan is proposed and waits for a confirmation phrase.
    AwaitingConfirmation { plan_id: String, summary: String },
    /// List/FindSlot output; nothing to confirm.
    Informational { summary: String },
    /// The requested time is taken; carries the conflicting events and
    /// alternative free slots of the same duration.
    ConflictDetected {
        conflicts: Vec<Event>,
        alternatives: Vec<TimeInterval>,
        summary: String,
    },
    /// Unrecognized reply; the pending plan is unchanged.
    Reprompt { summary: String },
    Cancelled { plan_id: String },
    Committed { event: Event, summary: String },
}

#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("a plan is already awaiting confirmation; cancel it first")]
    PlanPending,
    #[error("there is no plan awaiting confirmation")]
    NoPendingPlan,
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Drives intents through plan → confirm → commit against the external
/// calendar. Sessions are independent; each holds at most one
/// non-terminal plan, so a single conversation stays strictly
/// sequential while separate sessions run in parallel.
pub struct SchedulerEngine {
    store: Arc<Mutex<SessionStore>>,
    client: Arc<dyn CalendarClient>,
    vocabulary: ConfirmationVocabulary,
    config: SchedulerConfig,
}

impl SchedulerEngine {
    pub fn new(
        store: Arc<Mutex<SessionStore>>,
        client: Arc<dyn CalendarClient>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            client,
            vocabulary: config.vocabulary(),
            config,
        }
    }

    pub async fn handle_event(
        &self,
        event: SessionEvent,
        now: DateTime<Utc>,
    ) -> Result<EngineReply, EngineError> {
        match event {
            SessionEvent::IntentSubmitted { session_id, intent } => {
                self.handle_intent(&session_id, intent, now).await
            }
            SessionEvent::ReplySubmitted { session_id, text } => {
                self.handle_reply(&session_id, &text, now).await
            }
            SessionEvent::TimeoutElapsed { session_id } => self.handle_timeout(&session_id).await,
        }
    }

    async fn handle_intent(
        &self,
        session_id: &str,
        intent: Intent,
        now: DateTime<Utc>,
    ) -> Result<EngineReply, EngineError> {
        {
            let mut store = self.store.lock().await;
            if let Some(pending) = store.get(session_id) {
                if !pending.state.is_terminal() {
                    if now >= pending.expires_at {
                        info!(session_id, plan_id = %pending.plan.id, "expiring stale plan");
                        store.remove(session_id);
                    } else {
                        return Err(EngineError::PlanPending);
                    }
                }
            }
        }

        intent.validate().map_err(PlanError::from)?;

        // Always a fresh snapshot; staleness is bounded again at commit.
        let window = intent.snapshot_window();
        let snapshot = self.client.fetch_snapshot(window).await?;

        let plan = match planner::plan(
            &intent,
            &snapshot,
            self.config.timezone,
            self.config.max_slot_results,
        ) {
            Ok(plan) => plan,
            Err(PlanError::Conflict(conflicts)) => {
                return self.conflict_reply(&intent, conflicts).await;
            }
            Err(err) => return Err(err.into()),
        };

        if plan.requires_confirmation() {
            let summary = plan.summary.clone();
            let plan_id = plan.id.clone();
            let pending = PendingPlan {
                plan,
                state: ConfirmationState::Proposed,
                proposed_at: now,
                expires_at: now + self.config.confirm_timeout,
            };
            let mut store = self.store.lock().await;
            store.insert(session_id, pending);
            info!(session_id, %plan_id, "plan proposed");
            Ok(EngineReply::AwaitingConfirmation { plan_id, summary })
        } else {
            Ok(EngineReply::Informational {
                summary: plan.summary,
            })
        }
    }

    /// Requested time is taken: report the clashing events together with
    /// alternative free slots of the same duration, searched over the
    /// configured day window around the requested start.
    async fn conflict_reply(
        &self,
        intent: &Intent,
        conflicts: Vec<Event>,
    ) -> Result<EngineReply, EngineError> {
        let mut alternatives = Vec::new();
        if let Some(requested) = requested_interval(intent) {
            if let Some(day_window) = self.day_window(&requested) {
                let snapshot = self.client.fetch_snapshot(day_window).await?;
                alternatives = find_slots(
                    requested.duration(),
                    &day_window,
                    &snapshot,
                    self.config.max_slot_results,
                );
            }
        }

        let tz = self.config.timezone;
        let mut summary = planner::render_conflicts(&conflicts, tz);
        if !alternatives.is_empty() {
            summary.push_str("\nYou could try instead:");
            for slot in &alternatives {
                summary.push_str(&format!("\n- {}", slot.format_local(tz)));
            }
        }
        debug!(conflicts = conflicts.len(), alternatives = alternatives.len(), "conflict reply");
        Ok(EngineReply::ConflictDetected {
            conflicts,
            alternatives,
            summary,
        })
    }

    async fn handle_reply(
        &self,
        session_id: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<EngineReply, EngineError> {
        let pending_snapshot = {
            let store = self.store.lock().await;
            store.get(session_id).cloned()
        };
        let Some(mut pending) = pending_snapshot else {
            return Err(EngineError::NoPendingPlan);
        };
        if pending.state.is_terminal() {
            return Err(EngineError::NoPendingPlan);
        }
        if now >= pending.expires_at {
            // The plan was discarded by timeout; a late confirmation
            // must not revive it.
            warn!(session_id, plan_id = %pending.plan.id, "reply after timeout, plan discarded");
            let mut store = self.store.lock().await;
            store.remove(session_id);
            return Err(EngineError::NoPendingPlan);
        }

        match self.vocabulary.classify(text) {
            ReplyKind::Unrecognized => Ok(EngineReply::Reprompt {
                summary: pending.plan.summary.clone(),
            }),
            ReplyKind::Cancel => {
                pending.state = ConfirmationState::Cancelled;
                let plan_id = pending.plan.id.clone();
                let mut store = self.store.lock().await;
                store.insert(session_id, pending);
                info!(session_id, %plan_id, "plan cancelled by user");
                Ok(EngineReply::Cancelled { plan_id })
            }
            ReplyKind::Confirm => {
                pending.state = ConfirmationState::Confirmed;
                {
                    let mut store = self.store.lock().await;
                    store.insert(session_id, pending.clone());
                }
                match self.commit(&pending.plan).await {
                    Ok(event) => {
                        pending.state = ConfirmationState::Committed;
                        let summary = committed_summary(&pending.plan, &event, &self.config);
                        let mut store = self.store.lock().await;
                        store.insert(session_id, pending);
                        info!(session_id, event_id = %event.id, "plan committed");
                        Ok(EngineReply::Committed { event, summary })
                    }
                    Err(err) => {
                        pending.state = ConfirmationState::Failed;
                        let mut store = self.store.lock().await;
                        store.insert(session_id, pending);
                        warn!(session_id, error = %err, "commit failed");
                        Err(err)
                    }
                }
            }
        }
    }

    async fn handle_timeout(&self, session_id: &str) -> Result<EngineReply, EngineError> {
        let mut store = self.store.lock().await;
        let Some(pending) = store.get(session_id) else {
            return Err(EngineError::NoPendingPlan);
        };
        if pending.state != ConfirmationState::Proposed {
            return Err(EngineError::NoPendingPlan);
        }
        let mut pending = pending.clone();
        pending.state = ConfirmationState::Cancelled;
        let plan_id = pending.plan.id.clone();
        store.insert(session_id, pending);
        info!(session_id, %plan_id, "plan cancelled by timeout");
        Ok(EngineReply::Cancelled { plan_id })
    }

    /// The snapshot used at planning time is never trusted for the
    /// write: re-fetch and re-check immediately before commit, and fail
    /// with a conflict rather than overwrite an event that appeared in
    /// the meantime.
    async fn commit(&self, plan: &ActionPlan) -> Result<Event, EngineError> {
        let interval = match (&plan.proposed, &plan.target) {
            (Some(proposed), _) => proposed.interval,
            (None, Some(target)) => target.interval,
            (None, None) => {
                return Err(ProviderError::Backend(
                    "plan carries no event to commit".to_string(),
                )
                .into());
            }
        };
        let snapshot = self.client.fetch_snapshot(interval).await?;

        match plan.kind {
            PlanKind::Create => {
                let conflicts = find_conflicts(&interval, &snapshot, None);
                if !conflicts.is_empty() {
                    return Err(PlanError::Conflict(conflicts).into());
                }
            }
            PlanKind::Update => {
                let exclude = plan.target.as_ref().map(|target| target.id.as_str());
                let conflicts = find_conflicts(&interval, &snapshot, exclude);
                if !conflicts.is_empty() {
                    return Err(PlanError::Conflict(conflicts).into());
                }
            }
            PlanKind::Delete => {
                let target = plan.target.as_ref();
                if target.and_then(|t| snapshot.find_by_id(&t.id)).is_none() {
                    let title = target.map(|t| t.title.clone()).unwrap_or_default();
                    return Err(PlanError::NotFound(title).into());
                }
            }
            PlanKind::List | PlanKind::FindSlot => {
                return Err(ProviderError::Backend(
                    "informational plan cannot be committed".to_string(),
                )
                .into());
            }
        }

        Ok(self.client.commit(plan).await?)
    }
}

fn requested_interval(intent: &Intent) -> Option<TimeInterval> {
    match intent {
        Intent::Create { interval, .. } => Some(*interval),
        Intent::Update { new_interval, .. } => *new_interval,
        _ => None,
    }
}

fn committed_summary(plan: &ActionPlan, event: &Event, config: &SchedulerConfig) -> String {
    let when = event.interval.format_local(config.timezone);
    match plan.kind {
        PlanKind::Create => format!("Created \"{}\" on {}.", event.title, when),
        PlanKind::Update => format!("Updated \"{}\"; now on {}.", event.title, when),
        PlanKind::Delete => format!("Deleted \"{}\" ({}).", event.title, when),
        PlanKind::List | PlanKind::FindSlot => plan.summary.clone(),
    }
}

impl SchedulerEngine {
    /// Local-day search window (day_start..day_end hours) around the
    /// requested interval, used for alternative-slot suggestions.
    fn day_window(&self, around: &TimeInterval) -> Option<TimeInterval> {
        let tz = self.config.timezone;
        let local_day = around.start().with_timezone(&tz).date_naive();
        let start = local_day.and_hms_opt(self.config.day_start_hour, 0, 0)?;
        let end = if self.config.day_end_hour == 24 {
            local_day.succ_opt()?.and_hms_opt(0, 0, 0)?
        } else {
            local_day.and_hms_opt(self.config.day_end_hour, 0, 0)?
        };
        TimeInterval::from_local(start, end, tz).ok()
    }
}
