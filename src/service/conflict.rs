use crate::models::event::{Event, EventSnapshot};
use crate::models::interval::TimeInterval;

/// Every snapshot event whose interval overlaps `candidate`, in snapshot
/// order (start-time ascending). `exclude` skips the event being updated
/// so it does not conflict with itself. Pure and idempotent; an empty
/// result means the candidate time is free.
pub fn find_conflicts(
    candidate: &TimeInterval,
    snapshot: &EventSnapshot,
    exclude: Option<&str>,
) -> Vec<Event> {
    snapshot
        .overlapping(candidate)
        .filter(|event| match exclude {
            Some(id) => !id.is_empty() && event.id != id,
            None => true,
        })
        .cloned()
        .collect()
}
