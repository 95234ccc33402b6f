//! A visitor's schedule as a pure state machine.
//!
//! Transitions never mutate in place: `apply` consumes the old state and
//! returns the next one, so UI layers can diff or replay them.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::conflicts::detect_conflicts;
use crate::models::{EventId, ScheduleItem, TimeConflict};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ScheduleAction {
    Add { item: ScheduleItem },
    Remove { event_id: EventId },
    UpdatePriority { event_id: EventId, priority: u32 },
    Clear,
}

/// Ordered set of schedule items keyed by event ID.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleState {
    items: Vec<ScheduleItem>,
}

impl ScheduleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a state from stored items, keeping the first of any duplicate.
    pub fn from_items(items: impl IntoIterator<Item = ScheduleItem>) -> Self {
        items
            .into_iter()
            .fold(Self::new(), |state, item| state.apply(ScheduleAction::Add { item }))
    }

    pub fn items(&self) -> &[ScheduleItem] {
        &self.items
    }

    pub fn contains(&self, event_id: &str) -> bool {
        self.items.iter().any(|item| item.event_id == event_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Conflicts in the current state; recomputed on every call.
    pub fn conflicts(&self) -> Vec<TimeConflict> {
        detect_conflicts(&self.items)
    }

    /// Returns the state after `action`. Invalid actions (duplicate add,
    /// unknown event, zero priority) leave the state unchanged.
    pub fn apply(mut self, action: ScheduleAction) -> Self {
        let changed = match action {
            ScheduleAction::Add { mut item } => {
                if self.contains(&item.event_id) {
                    false
                } else {
                    item.priority = item.priority.max(1);
                    self.items.push(item);
                    true
                }
            }
            ScheduleAction::Remove { event_id } => {
                let before = self.items.len();
                self.items.retain(|item| item.event_id != event_id);
                self.items.len() != before
            }
            ScheduleAction::UpdatePriority { event_id, priority } => {
                match self.items.iter_mut().find(|item| item.event_id == event_id) {
                    Some(item) if priority > 0 && item.priority != priority => {
                        item.priority = priority;
                        true
                    }
                    _ => false,
                }
            }
            ScheduleAction::Clear => {
                let had_items = !self.items.is_empty();
                self.items.clear();
                had_items
            }
        };

        debug!(changed, items = self.items.len(), "schedule_transition");
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn item(id: &str, hour: u32) -> ScheduleItem {
        ScheduleItem {
            event_id: id.to_string(),
            start: Some(Utc.with_ymd_and_hms(2025, 11, 15, hour, 0, 0).unwrap()),
            end: Some(Utc.with_ymd_and_hms(2025, 11, 15, hour + 1, 0, 0).unwrap()),
            priority: 1,
            added_at: Utc.with_ymd_and_hms(2025, 11, 14, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_add_is_keyed_by_event_id() {
        let state = ScheduleState::new()
            .apply(ScheduleAction::Add { item: item("a", 9) })
            .apply(ScheduleAction::Add { item: item("a", 11) });
        assert_eq!(state.len(), 1);
        assert_eq!(state.items()[0].start, item("a", 9).start);
    }

    #[test]
    fn test_remove_and_clear() {
        let state = ScheduleState::from_items([item("a", 9), item("b", 11)]);
        let state = state.apply(ScheduleAction::Remove { event_id: "a".to_string() });
        assert!(!state.contains("a"));
        assert!(state.contains("b"));
        assert!(state.apply(ScheduleAction::Clear).is_empty());
    }

    #[test]
    fn test_update_priority_ignores_zero() {
        let state = ScheduleState::from_items([item("a", 9)]);
        let state = state.apply(ScheduleAction::UpdatePriority {
            event_id: "a".to_string(),
            priority: 4,
        });
        assert_eq!(state.items()[0].priority, 4);
        let state = state.apply(ScheduleAction::UpdatePriority {
            event_id: "a".to_string(),
            priority: 0,
        });
        assert_eq!(state.items()[0].priority, 4);
    }

    #[test]
    fn test_conflicts_follow_state() {
        let mut overlapping = item("b", 9);
        overlapping.start = Some(Utc.with_ymd_and_hms(2025, 11, 15, 9, 30, 0).unwrap());
        let state = ScheduleState::from_items([item("a", 9), overlapping]);
        assert_eq!(state.conflicts().len(), 1);
        let state = state.apply(ScheduleAction::Remove { event_id: "b".to_string() });
        assert!(state.conflicts().is_empty());
    }

    #[test]
    fn test_action_wire_format() {
        let json = r#"{"type": "update_priority", "eventId": "a", "priority": 2}"#;
        let action: ScheduleAction = serde_json::from_str(json).unwrap();
        assert_eq!(
            action,
            ScheduleAction::UpdatePriority {
                event_id: "a".to_string(),
                priority: 2
            }
        );
    }
}
