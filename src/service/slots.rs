use chrono::{DateTime, Duration, Utc};

use crate::models::event::EventSnapshot;
use crate::models::interval::TimeInterval;

/// Free intervals of exactly `duration`, earliest first, found by
/// walking the gaps between busy times inside `window`. Returns at most
/// `max_results` slots; an empty result is a valid "no slots found"
/// outcome, never an error.
pub fn find_slots(
    duration: Duration,
    window: &TimeInterval,
    snapshot: &EventSnapshot,
    max_results: usize,
) -> Vec<TimeInterval> {
    if max_results == 0 || duration <= Duration::zero() || duration > window.duration() {
        return Vec::new();
    }

    // Busy times clamped to the window, sorted by start. Overlapping
    // events are merged by the cursor walk below, so a gap is never
    // reported inside a longer event.
    let mut busy: Vec<(DateTime<Utc>, DateTime<Utc>)> = snapshot
        .overlapping(window)
        .map(|event| {
            (
                event.interval.start().max(window.start()),
                event.interval.end().min(window.end()),
            )
        })
        .collect();
    busy.sort_by_key(|(start, _)| *start);

    let mut slots = Vec::new();
    let mut cursor = window.start();
    for (busy_start, busy_end) in busy {
        if busy_start - cursor >= duration {
            if let Ok(slot) = TimeInterval::new(cursor, cursor + duration) {
                slots.push(slot);
                if slots.len() >= max_results {
                    return slots;
                }
            }
        }
        cursor = cursor.max(busy_end);
    }

    if window.end() - cursor >= duration {
        if let Ok(slot) = TimeInterval::new(cursor, cursor + duration) {
            slots.push(slot);
        }
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::Event;
    use chrono::TimeZone;

    fn interval(start_h: u32, start_m: u32, end_h: u32, end_m: u32) -> TimeInterval {
        TimeInterval::new(
            Utc.with_ymd_and_hms(2026, 3, 2, start_h, start_m, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 2, end_h, end_m, 0).unwrap(),
        )
        .unwrap()
    }

    fn snapshot(window: TimeInterval, events: Vec<TimeInterval>) -> EventSnapshot {
        let events = events
            .into_iter()
            .enumerate()
            .map(|(i, at)| {
                let mut event = Event::draft(format!("event {i}"), at);
                event.id = format!("e{i}");
                event
            })
            .collect();
        EventSnapshot::new(window, events)
    }

    #[test]
    fn gap_between_events_is_found_first() {
        // Scenario: events [09:00,10:00) and [11:00,12:00) in [09:00,12:00)
        let window = interval(9, 0, 12, 0);
        let snapshot = snapshot(window, vec![interval(9, 0, 10, 0), interval(11, 0, 12, 0)]);
        let slots = find_slots(Duration::minutes(60), &window, &snapshot, 5);
        assert_eq!(slots, vec![interval(10, 0, 11, 0)]);
    }

    #[test]
    fn empty_calendar_yields_slot_at_window_start() {
        let window = interval(9, 0, 18, 0);
        let snapshot = snapshot(window, vec![]);
        let slots = find_slots(Duration::minutes(30), &window, &snapshot, 3);
        assert_eq!(slots.first(), Some(&interval(9, 0, 9, 30)));
        assert_eq!(slots.len(), 1);
    }

    #[test]
    fn slots_never_overlap_events_and_stay_in_window() {
        let window = interval(8, 0, 20, 0);
        let busy = vec![
            interval(9, 0, 10, 30),
            interval(10, 0, 11, 0), // overlaps the previous event
            interval(13, 0, 14, 0),
        ];
        let snapshot = snapshot(window, busy);
        let slots = find_slots(Duration::minutes(45), &window, &snapshot, 10);

        assert!(!slots.is_empty());
        for slot in &slots {
            assert_eq!(slot.duration(), Duration::minutes(45));
            assert!(slot.start() >= window.start() && slot.end() <= window.end());
            for event in snapshot.events() {
                assert!(!slot.overlaps(&event.interval));
            }
        }
    }

    #[test]
    fn full_window_yields_no_slots() {
        let window = interval(9, 0, 12, 0);
        let snapshot = snapshot(window, vec![interval(9, 0, 12, 0)]);
        assert!(find_slots(Duration::minutes(15), &window, &snapshot, 5).is_empty());
    }

    #[test]
    fn respects_max_results() {
        let window = interval(8, 0, 20, 0);
        let busy = vec![
            interval(9, 0, 9, 30),
            interval(11, 0, 11, 30),
            interval(14, 0, 14, 30),
        ];
        let snapshot = snapshot(window, busy);
        let slots = find_slots(Duration::minutes(30), &window, &snapshot, 2);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0], interval(8, 0, 8, 30));
    }

    #[test]
    fn event_outside_window_is_ignored() {
        let window = interval(9, 0, 11, 0);
        let snapshot = snapshot(window, vec![interval(14, 0, 15, 0)]);
        let slots = find_slots(Duration::minutes(120), &window, &snapshot, 5);
        assert_eq!(slots, vec![interval(9, 0, 11, 0)]);
    }

    #[test]
    fn duration_longer_than_window_is_empty() {
        let window = interval(9, 0, 10, 0);
        let snapshot = snapshot(window, vec![]);
        assert!(find_slots(Duration::hours(2), &window, &snapshot, 5).is_empty());
    }
}
