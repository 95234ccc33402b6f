//! Walking feasibility between two consecutive events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::TravelTimeSettings;
use crate::haversine::haversine_meters;
use crate::models::{Coordinates, Event, EventId};

/// How comfortably a visitor can walk from one event to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelStatus {
    Ok,
    Tight,
    Insufficient,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelTimeAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_event_id: Option<EventId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_event_id: Option<EventId>,
    pub distance_meters: f64,
    pub walking_time_seconds: f64,
    /// `None` when either event has no time; the transition is then unconstrained.
    pub time_between_events_seconds: Option<f64>,
    /// `None` when either time or either location is missing.
    pub time_margin_seconds: Option<f64>,
    pub status: TravelStatus,
    /// False when a location was missing and the distance defaulted to 0.
    pub location_known: bool,
}

/// One end of a transition: an event, or the visitor's current position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TravelStop<'a> {
    pub event_id: Option<&'a str>,
    pub coordinates: Option<Coordinates>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl<'a> From<&'a Event> for TravelStop<'a> {
    fn from(event: &'a Event) -> Self {
        Self {
            event_id: Some(event.id.as_str()),
            coordinates: event.coordinates(),
            start: event.time_start,
            end: event.time_end,
        }
    }
}

/// Analyses the walk from `from` (which ends first) to `to`.
pub fn analyze_travel(
    from: &Event,
    to: &Event,
    settings: &TravelTimeSettings,
) -> TravelTimeAnalysis {
    analyze_stops(&TravelStop::from(from), &TravelStop::from(to), settings)
}

/// Analyses a transition between arbitrary stops.
pub fn analyze_stops(
    from: &TravelStop<'_>,
    to: &TravelStop<'_>,
    settings: &TravelTimeSettings,
) -> TravelTimeAnalysis {
    let (distance_meters, location_known) = match (from.coordinates, to.coordinates) {
        (Some(a), Some(b)) => (haversine_meters(a, b), true),
        _ => {
            warn!(
                from = from.event_id.unwrap_or("current_location"),
                to = to.event_id.unwrap_or("current_location"),
                "travel_location_missing"
            );
            (0.0, false)
        }
    };
    let walking_time_seconds = distance_meters / settings.walking_speed.meters_per_second();

    // Overlapping events yield 0 here; the conflict detector reports those.
    let time_between_events_seconds = match (from.end, to.start) {
        (Some(end), Some(start)) => {
            Some(((start - end).num_milliseconds() as f64 / 1000.0).max(0.0))
        }
        _ => None,
    };
    let time_margin_seconds = time_between_events_seconds
        .filter(|_| location_known)
        .map(|between| between - walking_time_seconds - settings.buffer_seconds());

    let status = match time_margin_seconds {
        Some(margin) => classify_margin(margin, settings),
        None => TravelStatus::Ok,
    };

    debug!(
        distance_meters,
        walking_time_seconds,
        margin = ?time_margin_seconds,
        status = ?status,
        "travel_analyzed"
    );

    TravelTimeAnalysis {
        from_event_id: from.event_id.map(str::to_string),
        to_event_id: to.event_id.map(str::to_string),
        distance_meters,
        walking_time_seconds,
        time_between_events_seconds,
        time_margin_seconds,
        status,
        location_known,
    }
}

/// Maps a time margin to a status: negative is insufficient, below the
/// warning threshold is tight.
pub fn classify_margin(margin_seconds: f64, settings: &TravelTimeSettings) -> TravelStatus {
    if margin_seconds < 0.0 {
        TravelStatus::Insufficient
    } else if margin_seconds < settings.min_warning_seconds() {
        TravelStatus::Tight
    } else {
        TravelStatus::Ok
    }
}
