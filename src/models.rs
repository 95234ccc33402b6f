//! Catalog and schedule data shared by every planner component.
//!
//! These are plain serde types; the wire format is camelCase JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};
use crate::time::TimeSlot;

pub type EventId = String;

/// A point on the globe in degrees. Deserializing validates the ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawCoordinates")]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCoordinates {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinates> for Coordinates {
    type Error = PlannerError;

    fn try_from(raw: RawCoordinates) -> Result<Self> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl Coordinates {
    /// Creates coordinates, rejecting non-finite or out-of-range values.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        let coords = Self { latitude, longitude };
        if !coords.is_valid() {
            return Err(PlannerError::InvalidCoordinates { latitude, longitude });
        }
        Ok(coords)
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A building or room where events take place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution_id: Option<String>,
    pub coordinates: Coordinates,
}

/// An event as returned by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub study_program_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution_id: Option<String>,
}

impl Event {
    /// The event's time slot, if both bounds are known.
    pub fn slot(&self) -> Option<TimeSlot> {
        TimeSlot::from_bounds(self.time_start, self.time_end)
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.location.as_ref().map(|location| location.coordinates)
    }

    /// Institution of the event, falling back to the location's institution.
    pub fn institution(&self) -> Option<&str> {
        self.institution_id
            .as_deref()
            .or_else(|| {
                self.location
                    .as_ref()
                    .and_then(|location| location.institution_id.as_deref())
            })
    }
}

/// One entry of a visitor's personal schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleItem {
    pub event_id: EventId,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    /// Larger values are more important. Always at least 1.
    pub priority: u32,
    pub added_at: DateTime<Utc>,
}

impl ScheduleItem {
    /// Schedules `event` with the given priority.
    pub fn for_event(event: &Event, priority: u32, added_at: DateTime<Utc>) -> Self {
        Self {
            event_id: event.id.clone(),
            start: event.time_start,
            end: event.time_end,
            priority: priority.max(1),
            added_at,
        }
    }

    pub fn slot(&self) -> Option<TimeSlot> {
        TimeSlot::from_bounds(self.start, self.end)
    }
}

/// A pair of schedule items whose times overlap by at least one minute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeConflict {
    pub item1: ScheduleItem,
    pub item2: ScheduleItem,
    pub overlap_minutes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_range_validation() {
        assert!(Coordinates::new(52.52, 13.40).is_ok());
        assert!(Coordinates::new(91.0, 0.0).is_err());
        assert!(Coordinates::new(0.0, -180.5).is_err());
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_out_of_range_coordinates_fail_to_parse() {
        let bogus = r#"{"latitude": 200.0, "longitude": 500.0}"#;
        assert!(serde_json::from_str::<Coordinates>(bogus).is_err());
        let munich = r#"{"latitude": 48.15, "longitude": 11.57}"#;
        let parsed = serde_json::from_str::<Coordinates>(munich);
        assert_eq!(parsed.unwrap(), Coordinates { latitude: 48.15, longitude: 11.57 });
    }

    #[test]
    fn test_event_deserializes_from_camel_case() {
        let json = r#"{
            "id": "e1",
            "title": "Robotics lab tour",
            "eventType": "tour",
            "timeStart": "2025-11-15T09:00:00Z",
            "timeEnd": "2025-11-15T10:00:00Z",
            "studyProgramIds": ["cs"],
            "location": {
                "id": "b1",
                "name": "Engineering Hall",
                "institutionId": "uni-a",
                "coordinates": {"latitude": 52.5, "longitude": 13.4}
            }
        }"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.event_type.as_deref(), Some("tour"));
        assert_eq!(event.slot().unwrap().duration_minutes(), 60);
        assert_eq!(event.institution(), Some("uni-a"));
    }

    #[test]
    fn test_schedule_item_priority_floor() {
        let event: Event = serde_json::from_str(r#"{"id": "e1", "title": "Talk"}"#).unwrap();
        let item = ScheduleItem::for_event(&event, 0, Utc::now());
        assert_eq!(item.priority, 1);
        assert!(item.slot().is_none());
    }
}
