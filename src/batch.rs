//! Bulk "add these events" with a conflict-skip policy.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::BatchOptions;
use crate::conflicts::conflicts_with;
use crate::error::{PlannerError, Result};
use crate::models::{EventId, ScheduleItem};
use crate::traits::EventCatalog;

fn default_skip_conflicts() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAddRequest {
    pub event_ids: Vec<EventId>,
    #[serde(default = "default_skip_conflicts")]
    pub skip_conflicts: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_override: Option<u32>,
}

impl BatchAddRequest {
    pub fn validate(&self, options: &BatchOptions) -> Result<()> {
        if self.priority_override == Some(0) {
            return Err(PlannerError::invalid("priorityOverride must be at least 1"));
        }
        if self.event_ids.len() > options.max_batch_size {
            return Err(PlannerError::invalid(format!(
                "at most {} events can be added at once, got {}",
                options.max_batch_size,
                self.event_ids.len()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Conflict,
    UnknownEvent,
    AlreadyScheduled,
    DuplicateInBatch,
}

/// A non-fatal per-item failure; the rest of the batch still runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemFailure {
    pub event_id: EventId,
    pub reason: FailureReason,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicting_with: Vec<EventId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAddResult {
    pub added_count: usize,
    /// Everything not added, so `added_count + skipped_count` is the request size.
    pub skipped_count: usize,
    pub conflict_count: usize,
    pub added_event_ids: Vec<EventId>,
    pub skipped_event_ids: Vec<EventId>,
    pub conflicting_event_ids: Vec<EventId>,
    pub failures: Vec<BatchItemFailure>,
    /// New schedule items for the caller's store, in request order.
    pub added_items: Vec<ScheduleItem>,
}

/// Adds `request.event_ids` in order on top of `current`.
///
/// Each event is checked against the current schedule plus the events
/// accepted earlier in the same batch.
pub fn batch_add<C: EventCatalog>(
    request: &BatchAddRequest,
    current: &[ScheduleItem],
    catalog: &C,
    options: &BatchOptions,
    added_at: DateTime<Utc>,
) -> Result<BatchAddResult> {
    request.validate(options)?;

    let priority = request.priority_override.unwrap_or(options.default_priority).max(1);
    let existing: HashSet<&str> = current.iter().map(|item| item.event_id.as_str()).collect();

    let mut working: Vec<ScheduleItem> = current.to_vec();
    let mut accepted: HashSet<EventId> = HashSet::new();
    let mut added_items = Vec::new();
    let mut skipped_event_ids = Vec::new();
    let mut conflicting_event_ids = Vec::new();
    let mut failures = Vec::new();

    for event_id in &request.event_ids {
        let mut fail = |reason: FailureReason, conflicting_with: Vec<EventId>| {
            failures.push(BatchItemFailure {
                event_id: event_id.clone(),
                reason,
                conflicting_with,
            });
        };

        if existing.contains(event_id.as_str()) {
            skipped_event_ids.push(event_id.clone());
            fail(FailureReason::AlreadyScheduled, Vec::new());
            continue;
        }
        if accepted.contains(event_id) {
            skipped_event_ids.push(event_id.clone());
            fail(FailureReason::DuplicateInBatch, Vec::new());
            continue;
        }
        let Some(event) = catalog.event(event_id) else {
            skipped_event_ids.push(event_id.clone());
            fail(FailureReason::UnknownEvent, Vec::new());
            continue;
        };

        let item = ScheduleItem::for_event(event, priority, added_at);
        let clashes: Vec<EventId> = conflicts_with(&item, &working)
            .into_iter()
            .map(|other| other.event_id.clone())
            .collect();

        if clashes.is_empty() {
            accepted.insert(event_id.clone());
            working.push(item.clone());
            added_items.push(item);
            continue;
        }

        debug!(event_id = %event_id, clashes = ?clashes, "batch_item_conflicts");
        conflicting_event_ids.push(event_id.clone());
        if request.skip_conflicts {
            skipped_event_ids.push(event_id.clone());
        }
        fail(FailureReason::Conflict, clashes);
    }

    let added_event_ids: Vec<EventId> =
        added_items.iter().map(|item| item.event_id.clone()).collect();
    let result = BatchAddResult {
        added_count: added_event_ids.len(),
        skipped_count: request.event_ids.len() - added_event_ids.len(),
        conflict_count: conflicting_event_ids.len(),
        added_event_ids,
        skipped_event_ids,
        conflicting_event_ids,
        failures,
        added_items,
    };

    info!(
        requested = request.event_ids.len(),
        added = result.added_count,
        skipped = result.skipped_count,
        conflicts = result.conflict_count,
        "batch_add_complete"
    );
    Ok(result)
}
