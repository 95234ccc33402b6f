//! Pairwise time-conflict detection.

use tracing::debug;

use crate::models::{ScheduleItem, TimeConflict};
use crate::time::overlap_millis;

const MILLIS_PER_MINUTE: i64 = 60_000;

/// Finds every overlapping pair in `items`.
///
/// Pairs are reported once, as `(i, j)` with `i < j` by input index. Items
/// without a start or end are ignored, and overlaps shorter than a whole
/// minute (including touching boundaries) are not conflicts.
pub fn detect_conflicts(items: &[ScheduleItem]) -> Vec<TimeConflict> {
    let mut conflicts = Vec::new();

    for (i, first) in items.iter().enumerate() {
        for second in &items[i + 1..] {
            if let Some(overlap_minutes) = overlap_minutes(first, second) {
                conflicts.push(TimeConflict {
                    item1: first.clone(),
                    item2: second.clone(),
                    overlap_minutes,
                });
            }
        }
    }

    debug!(items = items.len(), conflicts = conflicts.len(), "conflict_scan_complete");
    conflicts
}

/// Schedule items that `candidate` overlaps by at least one minute.
pub fn conflicts_with<'a>(
    candidate: &ScheduleItem,
    items: &'a [ScheduleItem],
) -> Vec<&'a ScheduleItem> {
    items
        .iter()
        .filter(|item| item.event_id != candidate.event_id)
        .filter(|item| overlap_minutes(candidate, item).is_some())
        .collect()
}

/// Whole minutes of overlap, or `None` if there is no conflict.
fn overlap_minutes(a: &ScheduleItem, b: &ScheduleItem) -> Option<i64> {
    let (a_start, a_end) = (a.start?, a.end?);
    let (b_start, b_end) = (b.start?, b.end?);

    let minutes = overlap_millis(a_start, a_end, b_start, b_end) / MILLIS_PER_MINUTE;
    (minutes > 0).then_some(minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 15, hour, minute, 0).unwrap()
    }

    fn item(id: &str, start: (u32, u32), end: (u32, u32)) -> ScheduleItem {
        ScheduleItem {
            event_id: id.to_string(),
            start: Some(at(start.0, start.1)),
            end: Some(at(end.0, end.1)),
            priority: 1,
            added_at: at(7, 0),
        }
    }

    #[test]
    fn test_half_hour_overlap() {
        let conflicts =
            detect_conflicts(&[item("a", (9, 0), (10, 0)), item("b", (9, 30), (10, 30))]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].overlap_minutes, 30);
        assert_eq!(conflicts[0].item1.event_id, "a");
        assert_eq!(conflicts[0].item2.event_id, "b");
    }

    #[test]
    fn test_touching_boundaries_are_not_conflicts() {
        let conflicts =
            detect_conflicts(&[item("a", (9, 0), (10, 0)), item("b", (10, 0), (11, 0))]);
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_items_without_times_are_skipped() {
        let mut untimed = item("c", (9, 0), (12, 0));
        untimed.end = None;
        let conflicts = detect_conflicts(&[item("a", (9, 0), (10, 0)), untimed]);
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_sub_minute_overlap_is_ignored() {
        let a = item("a", (9, 0), (10, 0));
        let mut b = item("b", (10, 0), (11, 0));
        b.start = Some(at(10, 0) - chrono::Duration::seconds(30));
        assert!(detect_conflicts(&[a, b]).is_empty());
    }

    #[test]
    fn test_every_pair_reported_once() {
        let items = vec![
            item("a", (9, 0), (12, 0)),
            item("b", (9, 30), (10, 0)),
            item("c", (11, 0), (13, 0)),
        ];
        let conflicts = detect_conflicts(&items);
        let pairs: Vec<(&str, &str)> = conflicts
            .iter()
            .map(|c| (c.item1.event_id.as_str(), c.item2.event_id.as_str()))
            .collect();
        assert_eq!(pairs, vec![("a", "b"), ("a", "c")]);
    }

    #[test]
    fn test_conflicts_with_candidate() {
        let schedule = vec![item("a", (9, 0), (10, 0)), item("b", (11, 0), (12, 0))];
        let candidate = item("x", (9, 45), (11, 15));
        let hits: Vec<&str> = conflicts_with(&candidate, &schedule)
            .iter()
            .map(|i| i.event_id.as_str())
            .collect();
        assert_eq!(hits, vec!["a", "b"]);
    }
}
