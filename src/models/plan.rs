use serde::{Deserialize, Serialize};

use crate::models::event::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanKind {
    Create,
    Update,
    Delete,
    List,
    FindSlot,
}

/// Lifecycle of a plan inside one confirmation cycle. `Proposed` is the
/// initial state; `Committed`, `Cancelled` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmationState {
    Proposed,
    Confirmed,
    Cancelled,
    Committed,
    Failed,
}

impl ConfirmationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConfirmationState::Committed
                | ConfirmationState::Cancelled
                | ConfirmationState::Failed
        )
    }
}

/// The engine's proposed action, pending user confirmation. A plan never
/// outlives one confirmation cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionPlan {
    pub id: String,
    pub kind: PlanKind,
    /// Existing event the plan acts on (update/delete).
    pub target: Option<Event>,
    /// Post-state event (create/update); id is empty for not-yet-created
    /// events and carries the target's id on update.
    pub proposed: Option<Event>,
    pub conflicts: Vec<Event>,
    pub summary: String,
}

impl ActionPlan {
    /// List and FindSlot are informational and never reach the
    /// committing transition.
    pub fn requires_confirmation(&self) -> bool {
        matches!(self.kind, PlanKind::Create | PlanKind::Update | PlanKind::Delete)
    }
}
