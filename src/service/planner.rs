use chrono::Duration;
use chrono_tz::Tz;
use thiserror::Error;
use uuid::Uuid;

use crate::models::event::{Event, EventSnapshot};
use crate::models::intent::{EventSelector, Intent, ValidationError};
use crate::models::interval::TimeInterval;
use crate::models::plan::{ActionPlan, PlanKind};
use crate::service::conflict::find_conflicts;
use crate::service::slots::find_slots;

/// Planning failures, returned as values so the dialogue layer can
/// render every case uniformly.
#[derive(Debug, Clone, Error)]
pub enum PlanError {
    #[error("the requested time overlaps {} existing event(s)", .0.len())]
    Conflict(Vec<Event>),
    #[error("{} events match; please disambiguate", .0.len())]
    AmbiguousTarget(Vec<Event>),
    #[error("no event named '{0}' found around the requested time")]
    NotFound(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Outcome of resolving a fuzzy selector against the snapshot. Explicit
/// so the planner never silently picks the first of several matches.
#[derive(Debug, Clone)]
pub enum TargetResolution {
    Unique(Event),
    Ambiguous(Vec<Event>),
    NotFound,
}

pub fn resolve_target(selector: &EventSelector, snapshot: &EventSnapshot) -> TargetResolution {
    let mut matches: Vec<Event> = snapshot
        .events()
        .iter()
        .filter(|event| selector.matches(event))
        .cloned()
        .collect();
    match matches.len() {
        0 => TargetResolution::NotFound,
        1 => TargetResolution::Unique(matches.remove(0)),
        _ => TargetResolution::Ambiguous(matches),
    }
}

/// Turn a validated intent into an action plan against the snapshot.
/// Create and update fail with `Conflict` when the requested interval is
/// taken; the caller re-plans against the slot finder's output.
pub fn plan(
    intent: &Intent,
    snapshot: &EventSnapshot,
    tz: Tz,
    max_slot_results: usize,
) -> Result<ActionPlan, PlanError> {
    intent.validate()?;

    match intent {
        Intent::Create { title, interval } => {
            let conflicts = find_conflicts(interval, snapshot, None);
            if !conflicts.is_empty() {
                return Err(PlanError::Conflict(conflicts));
            }
            let proposed = Event::draft(title.trim(), *interval);
            let summary = format!(
                "Create \"{}\" on {}.",
                proposed.title,
                interval.format_local(tz)
            );
            Ok(build_plan(PlanKind::Create, None, Some(proposed), summary))
        }
        Intent::Update {
            selector,
            new_title,
            new_interval,
        } => {
            let target = resolve(selector, snapshot)?;
            let mut proposed = target.clone();
            if let Some(title) = new_title {
                proposed.title = title.trim().to_string();
            }
            if let Some(interval) = new_interval {
                // An unchanged interval cannot introduce a conflict, so
                // only a time change is checked.
                let conflicts = find_conflicts(interval, snapshot, Some(&target.id));
                if !conflicts.is_empty() {
                    return Err(PlanError::Conflict(conflicts));
                }
                proposed.interval = *interval;
            }
            let summary = format!(
                "Update \"{}\" ({}) to \"{}\" on {}.",
                target.title,
                target.interval.format_local(tz),
                proposed.title,
                proposed.interval.format_local(tz)
            );
            Ok(build_plan(
                PlanKind::Update,
                Some(target),
                Some(proposed),
                summary,
            ))
        }
        Intent::Delete { selector } => {
            let target = resolve(selector, snapshot)?;
            let summary = format!(
                "Delete \"{}\" on {}.",
                target.title,
                target.interval.format_local(tz)
            );
            Ok(build_plan(PlanKind::Delete, Some(target), None, summary))
        }
        Intent::List { window } => {
            let summary = render_agenda(snapshot, window, tz);
            Ok(build_plan(PlanKind::List, None, None, summary))
        }
        Intent::FindSlot {
            duration_minutes,
            window,
        } => {
            let duration = Duration::minutes(*duration_minutes);
            let slots = find_slots(duration, window, snapshot, max_slot_results);
            let summary = render_slots(&slots, duration, window, tz);
            Ok(build_plan(PlanKind::FindSlot, None, None, summary))
        }
    }
}

fn resolve(selector: &EventSelector, snapshot: &EventSnapshot) -> Result<Event, PlanError> {
    match resolve_target(selector, snapshot) {
        TargetResolution::Unique(event) => Ok(event),
        TargetResolution::Ambiguous(events) => Err(PlanError::AmbiguousTarget(events)),
        TargetResolution::NotFound => Err(PlanError::NotFound(selector.title.clone())),
    }
}

fn build_plan(
    kind: PlanKind,
    target: Option<Event>,
    proposed: Option<Event>,
    summary: String,
) -> ActionPlan {
    ActionPlan {
        id: Uuid::new_v4().to_string(),
        kind,
        target,
        proposed,
        conflicts: Vec::new(),
        summary,
    }
}

pub fn render_agenda(snapshot: &EventSnapshot, window: &TimeInterval, tz: Tz) -> String {
    if snapshot.is_empty() {
        return format!("No events between {}.", window.format_local(tz));
    }
    let mut body = format!("Events between {}:", window.format_local(tz));
    for event in snapshot.events() {
        body.push_str(&format!(
            "\n- \"{}\" on {}",
            event.title,
            event.interval.format_local(tz)
        ));
    }
    body
}

pub fn render_slots(
    slots: &[TimeInterval],
    duration: Duration,
    window: &TimeInterval,
    tz: Tz,
) -> String {
    if slots.is_empty() {
        return format!(
            "No free {}-minute slots between {}.",
            duration.num_minutes(),
            window.format_local(tz)
        );
    }
    let mut body = format!("Free {}-minute slots:", duration.num_minutes());
    for slot in slots {
        body.push_str(&format!("\n- {}", slot.format_local(tz)));
    }
    body
}

pub fn render_conflicts(conflicts: &[Event], tz: Tz) -> String {
    let mut body = "That time is taken by:".to_string();
    for event in conflicts {
        body.push_str(&format!(
            "\n- \"{}\" on {}",
            event.title,
            event.interval.format_local(tz)
        ));
    }
    body
}
