//! In-memory popularity counters.
//!
//! Counters live for the lifetime of the process. Each event gets its own
//! set of atomics; the map lock is only taken for writing the first time an
//! event is seen.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::EventId;
use crate::traits::PopularityStore;

/// A schedule add counts as much as this many views.
const SCHEDULED_WEIGHT: u64 = 5;
const RISING_RATIO: f64 = 1.2;
const FALLING_RATIO: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Rising,
    #[default]
    Stable,
    Falling,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPopularity {
    pub event_id: EventId,
    pub view_count: u64,
    pub add_to_schedule_count: u64,
    pub popularity_score: f64,
    pub trend: Trend,
}

impl EventPopularity {
    pub fn empty(event_id: &str) -> Self {
        Self {
            event_id: event_id.to_string(),
            view_count: 0,
            add_to_schedule_count: 0,
            popularity_score: 0.0,
            trend: Trend::Stable,
        }
    }
}

/// Immutable copy of the counters used for one scoring run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopularitySnapshot {
    entries: HashMap<EventId, EventPopularity>,
}

impl PopularitySnapshot {
    pub fn from_entries(entries: impl IntoIterator<Item = EventPopularity>) -> Self {
        Self {
            entries: entries.into_iter().map(|entry| (entry.event_id.clone(), entry)).collect(),
        }
    }

    pub fn get(&self, event_id: &str) -> Option<&EventPopularity> {
        self.entries.get(event_id)
    }

    pub fn score(&self, event_id: &str) -> f64 {
        self.get(event_id).map_or(0.0, |entry| entry.popularity_score)
    }

    pub fn max_score(&self) -> f64 {
        self.entries.values().map(|entry| entry.popularity_score).fold(0.0, f64::max)
    }

    /// Score at the given percentile (0..1) over `event_ids`, counting events
    /// without counters as 0.
    pub fn percentile_threshold<'a>(
        &self,
        event_ids: impl IntoIterator<Item = &'a str>,
        percentile: f64,
    ) -> f64 {
        let mut scores: Vec<f64> = event_ids.into_iter().map(|id| self.score(id)).collect();
        if scores.is_empty() {
            return 0.0;
        }
        scores.sort_by(f64::total_cmp);
        let rank = ((scores.len() - 1) as f64 * percentile.clamp(0.0, 1.0)).round() as usize;
        scores[rank]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Default)]
struct Counters {
    views: AtomicU64,
    scheduled: AtomicU64,
    period_views: AtomicU64,
    period_scheduled: AtomicU64,
    previous_period_score: AtomicU64,
}

impl Counters {
    fn period_score(&self) -> u64 {
        self.period_views.load(Ordering::Relaxed)
            + self.period_scheduled.load(Ordering::Relaxed) * SCHEDULED_WEIGHT
    }

    fn to_popularity(&self, event_id: &str) -> EventPopularity {
        let views = self.views.load(Ordering::Relaxed);
        let scheduled = self.scheduled.load(Ordering::Relaxed);

        EventPopularity {
            event_id: event_id.to_string(),
            view_count: views,
            add_to_schedule_count: scheduled,
            popularity_score: (views + scheduled * SCHEDULED_WEIGHT) as f64,
            trend: trend(self.period_score(), self.previous_period_score.load(Ordering::Relaxed)),
        }
    }
}

fn trend(current: u64, previous: u64) -> Trend {
    if previous == 0 {
        return if current > 0 { Trend::Rising } else { Trend::Stable };
    }
    let ratio = current as f64 / previous as f64;
    if ratio > RISING_RATIO {
        Trend::Rising
    } else if ratio < FALLING_RATIO {
        Trend::Falling
    } else {
        Trend::Stable
    }
}

/// Thread-safe counter map. Create one per process and share it by `Arc`.
#[derive(Debug, Default)]
pub struct InMemoryPopularityStore {
    counters: RwLock<HashMap<EventId, Arc<Counters>>>,
}

impl InMemoryPopularityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn counters_for(&self, event_id: &str) -> Arc<Counters> {
        if let Ok(map) = self.counters.read()
            && let Some(counters) = map.get(event_id)
        {
            return Arc::clone(counters);
        }
        match self.counters.write() {
            Ok(mut map) => Arc::clone(map.entry(event_id.to_string()).or_default()),
            Err(poisoned) => {
                Arc::clone(poisoned.into_inner().entry(event_id.to_string()).or_default())
            }
        }
    }

    /// Starts a new trend period. The closing period becomes the baseline the
    /// next one is compared against; totals are unaffected.
    pub fn roll_period(&self) {
        let Ok(map) = self.counters.read() else {
            warn!("popularity_lock_poisoned");
            return;
        };
        for counters in map.values() {
            let closing = counters.period_views.swap(0, Ordering::Relaxed)
                + counters.period_scheduled.swap(0, Ordering::Relaxed) * SCHEDULED_WEIGHT;
            counters.previous_period_score.store(closing, Ordering::Relaxed);
        }
        debug!(events = map.len(), "popularity_period_rolled");
    }

    /// Drops every counter.
    pub fn reset(&self) {
        match self.counters.write() {
            Ok(mut map) => map.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl PopularityStore for InMemoryPopularityStore {
    fn track_view(&self, event_id: &str) {
        let counters = self.counters_for(event_id);
        counters.views.fetch_add(1, Ordering::Relaxed);
        counters.period_views.fetch_add(1, Ordering::Relaxed);
    }

    fn track_scheduled(&self, event_id: &str) {
        let counters = self.counters_for(event_id);
        counters.scheduled.fetch_add(1, Ordering::Relaxed);
        counters.period_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    fn popularity(&self, event_id: &str) -> EventPopularity {
        let counters = self
            .counters
            .read()
            .ok()
            .and_then(|map| map.get(event_id).map(Arc::clone));
        match counters {
            Some(counters) => counters.to_popularity(event_id),
            None => EventPopularity::empty(event_id),
        }
    }

    fn snapshot(&self) -> PopularitySnapshot {
        let Ok(map) = self.counters.read() else {
            warn!("popularity_lock_poisoned");
            return PopularitySnapshot::default();
        };
        PopularitySnapshot::from_entries(
            map.iter().map(|(id, counters)| counters.to_popularity(id)),
        )
    }
}
