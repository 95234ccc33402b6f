//! Test fixtures for openhouse-planner.
//!
//! Provides realistic test data including:
//! - Real campus building coordinates
//! - Builders for catalog events and schedule items

#![allow(dead_code)]

pub mod campus_locations;

pub use campus_locations::*;

use chrono::{DateTime, Duration, TimeZone, Utc};

use openhouse_planner::catalog::InMemoryCatalog;
use openhouse_planner::models::{Event, ScheduleItem};

/// Open-house day used throughout the tests.
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 15, hour, minute, 0).unwrap()
}

/// Builder for catalog events with sensible defaults.
#[derive(Clone, Debug)]
pub struct EventBuilder {
    event: Event,
}

impl EventBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            event: Event {
                id: id.to_string(),
                title: format!("Event {id}"),
                event_type: None,
                time_start: Some(at(9, 0)),
                time_end: Some(at(10, 0)),
                study_program_ids: Vec::new(),
                location: None,
                institution_id: None,
            },
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.event.title = title.to_string();
        self
    }

    pub fn kind(mut self, event_type: &str) -> Self {
        self.event.event_type = Some(event_type.to_string());
        self
    }

    /// Starts at `hour:minute` and lasts `minutes`.
    pub fn at(mut self, hour: u32, minute: u32, minutes: i64) -> Self {
        let start = at(hour, minute);
        self.event.time_start = Some(start);
        self.event.time_end = Some(start + Duration::minutes(minutes));
        self
    }

    pub fn untimed(mut self) -> Self {
        self.event.time_start = None;
        self.event.time_end = None;
        self
    }

    pub fn programs(mut self, ids: &[&str]) -> Self {
        self.event.study_program_ids = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn in_building(mut self, building: Building) -> Self {
        self.event.location = Some(building.location());
        self
    }

    pub fn institution(mut self, id: &str) -> Self {
        self.event.institution_id = Some(id.to_string());
        self
    }

    pub fn build(self) -> Event {
        self.event
    }
}

pub fn catalog(events: Vec<Event>) -> InMemoryCatalog {
    InMemoryCatalog::new(events)
}

/// Schedules `event` with priority 1, added at 07:00.
pub fn item(event: &Event) -> ScheduleItem {
    ScheduleItem::for_event(event, 1, at(7, 0))
}

pub fn item_with(event: &Event, priority: u32, added_minute: u32) -> ScheduleItem {
    ScheduleItem::for_event(event, priority, at(7, added_minute))
}

pub fn items(catalog: &InMemoryCatalog, ids: &[&str]) -> Vec<ScheduleItem> {
    use openhouse_planner::traits::EventCatalog;
    ids.iter()
        .filter_map(|id| catalog.event(id))
        .map(item)
        .collect()
}
