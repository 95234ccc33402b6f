//! Interval arithmetic over event times.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};

/// A half-open `[start, end)` interval. `end` is always after `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawTimeSlot")]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTimeSlot {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawTimeSlot> for TimeSlot {
    type Error = PlannerError;

    fn try_from(raw: RawTimeSlot) -> Result<Self> {
        Self::new(raw.start, raw.end)
    }
}

impl TimeSlot {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end <= start {
            return Err(PlannerError::InvalidTimeSlot);
        }
        Ok(Self { start, end })
    }

    /// Builds a slot from optional bounds, returning `None` when either bound
    /// is missing or the interval is empty.
    pub fn from_bounds(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Option<Self> {
        match (start, end) {
            (Some(start), Some(end)) if end > start => Some(Self { start, end }),
            _ => None,
        }
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// True if `other` lies entirely within this slot.
    pub fn contains(&self, other: &TimeSlot) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        overlap_millis(self.start, self.end, other.start, other.end) > 0
    }
}

/// Length of the intersection of two intervals in milliseconds (0 if disjoint).
pub fn overlap_millis(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> i64 {
    let latest_start = a_start.max(b_start);
    let earliest_end = a_end.min(b_end);
    (earliest_end - latest_start).num_milliseconds().max(0)
}

/// Union of the given slots, sorted by start. Touching slots are merged.
pub fn merge_slots(slots: &[TimeSlot]) -> Vec<TimeSlot> {
    let mut sorted = slots.to_vec();
    sorted.sort_by_key(|slot| (slot.start, slot.end));

    let mut merged: Vec<TimeSlot> = Vec::with_capacity(sorted.len());
    for slot in sorted {
        match merged.last_mut() {
            Some(last) if slot.start <= last.end => {
                last.end = last.end.max(slot.end);
            }
            _ => merged.push(slot),
        }
    }
    merged
}

/// Free slots inside `window` not covered by any of `busy`.
pub fn free_slots(window: TimeSlot, busy: &[TimeSlot]) -> Vec<TimeSlot> {
    let clipped: Vec<TimeSlot> = busy
        .iter()
        .filter_map(|slot| {
            TimeSlot::from_bounds(
                Some(slot.start.max(window.start)),
                Some(slot.end.min(window.end)),
            )
        })
        .collect();

    let mut gaps = Vec::new();
    let mut cursor = window.start;
    for slot in merge_slots(&clipped) {
        if slot.start > cursor {
            gaps.push(TimeSlot { start: cursor, end: slot.start });
        }
        cursor = cursor.max(slot.end);
    }
    if cursor < window.end {
        gaps.push(TimeSlot { start: cursor, end: window.end });
    }
    gaps
}
