//! Walking routes through a visitor's schedule.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::TravelTimeSettings;
use crate::conflicts::conflicts_with;
use crate::error::{PlannerError, Result};
use crate::models::{Coordinates, Event, EventId, ScheduleItem};
use crate::traits::EventCatalog;
use crate::travel::{analyze_stops, analyze_travel, TravelStatus, TravelStop, TravelTimeAnalysis};

pub const CURRENT_LOCATION_ID: &str = "current_location";
pub const DEFAULT_ALTERNATIVES_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaypointKind {
    Building,
    Event,
    CurrentLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    pub id: String,
    pub name: String,
    /// Missing when the event has no location; legs touching it have length 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    pub kind: WaypointKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_end: Option<DateTime<Utc>>,
}

impl Waypoint {
    pub fn for_event(event: &Event) -> Self {
        Self {
            id: event.id.clone(),
            name: event
                .location
                .as_ref()
                .map_or_else(|| event.title.clone(), |location| location.name.clone()),
            coordinates: event.coordinates(),
            kind: WaypointKind::Event,
            event_id: Some(event.id.clone()),
            title: Some(event.title.clone()),
            time_start: event.time_start,
            time_end: event.time_end,
        }
    }

    pub fn current_location(coordinates: Coordinates) -> Self {
        Self {
            id: CURRENT_LOCATION_ID.to_string(),
            name: "Current location".to_string(),
            coordinates: Some(coordinates),
            kind: WaypointKind::CurrentLocation,
            event_id: None,
            title: None,
            time_start: None,
            time_end: None,
        }
    }

    fn stop(&self) -> TravelStop<'_> {
        TravelStop {
            event_id: self.event_id.as_deref(),
            coordinates: self.coordinates,
            start: self.time_start,
            end: self.time_end,
        }
    }

    fn label(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.name)
    }
}

/// The walk between two consecutive waypoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteLeg {
    from: Waypoint,
    to: Waypoint,
    distance_meters: f64,
    duration_seconds: i64,
}

impl RouteLeg {
    pub fn from(&self) -> &Waypoint {
        &self.from
    }

    pub fn to(&self) -> &Waypoint {
        &self.to
    }

    pub fn distance_meters(&self) -> f64 {
        self.distance_meters
    }

    pub fn duration_seconds(&self) -> i64 {
        self.duration_seconds
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteWarning {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_event_id: Option<EventId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_event_id: Option<EventId>,
    pub severity: WarningSeverity,
    pub message: String,
    pub analysis: TravelTimeAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub waypoints: Vec<Waypoint>,
    pub legs: Vec<RouteLeg>,
    pub total_distance_meters: f64,
    pub total_duration_seconds: i64,
    pub has_warnings: bool,
    pub warnings: Vec<RouteWarning>,
}

/// Orders the scheduled events into a walking route.
///
/// Items are sorted by start time (untimed items last) and the current
/// location, if given, becomes the first waypoint and must be in range.
/// Items whose event is not in the catalog are left out. At least two
/// waypoints are required.
pub fn build_route<C: EventCatalog>(
    items: &[ScheduleItem],
    catalog: &C,
    settings: &TravelTimeSettings,
    current_location: Option<Coordinates>,
) -> Result<Route> {
    if let Some(coordinates) = current_location
        && !coordinates.is_valid()
    {
        return Err(PlannerError::InvalidCoordinates {
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
        });
    }

    let mut sorted: Vec<&ScheduleItem> = items.iter().collect();
    sorted.sort_by(|a, b| {
        compare_start(a.start, b.start).then_with(|| a.event_id.cmp(&b.event_id))
    });

    let mut waypoints = Vec::with_capacity(sorted.len() + 1);
    if let Some(coordinates) = current_location {
        waypoints.push(Waypoint::current_location(coordinates));
    }
    for item in sorted {
        match catalog.event(&item.event_id) {
            Some(event) => waypoints.push(Waypoint::for_event(event)),
            None => warn!(event_id = %item.event_id, "route_event_not_in_catalog"),
        }
    }

    if waypoints.len() < 2 {
        return Err(PlannerError::invalid(format!(
            "a route needs at least 2 waypoints, got {}",
            waypoints.len()
        )));
    }

    let mut legs = Vec::with_capacity(waypoints.len() - 1);
    let mut warnings = Vec::new();
    let mut total_distance_meters = 0.0;
    let mut total_duration_seconds = 0;

    for pair in waypoints.windows(2) {
        let (from, to) = (&pair[0], &pair[1]);
        let analysis = analyze_stops(&from.stop(), &to.stop(), settings);

        let leg = RouteLeg {
            from: from.clone(),
            to: to.clone(),
            distance_meters: analysis.distance_meters,
            duration_seconds: analysis.walking_time_seconds.round() as i64,
        };
        total_distance_meters += leg.distance_meters;
        total_duration_seconds += leg.duration_seconds;
        legs.push(leg);

        if let Some(warning) = warning_for(from, to, analysis, settings) {
            warnings.push(warning);
        }
    }

    info!(
        waypoints = waypoints.len(),
        total_distance_meters,
        warnings = warnings.len(),
        "route_built"
    );

    Ok(Route {
        waypoints,
        legs,
        total_distance_meters,
        total_duration_seconds,
        has_warnings: !warnings.is_empty(),
        warnings,
    })
}

fn warning_for(
    from: &Waypoint,
    to: &Waypoint,
    analysis: TravelTimeAnalysis,
    settings: &TravelTimeSettings,
) -> Option<RouteWarning> {
    let walk_minutes = (analysis.walking_time_seconds / 60.0).ceil();
    let (severity, message) = match analysis.status {
        TravelStatus::Ok => return None,
        TravelStatus::Tight => (
            WarningSeverity::Warning,
            format!(
                concat!(
                    "Tight connection from \"{}\" to \"{}\": ",
                    "about {} min walk ({:.0} m), little time to spare"
                ),
                from.label(),
                to.label(),
                walk_minutes,
                analysis.distance_meters
            ),
        ),
        TravelStatus::Insufficient => (
            WarningSeverity::Error,
            format!(
                concat!(
                    "Not enough time to get from \"{}\" to \"{}\": ",
                    "{} min walk plus {} min buffer, {} min available"
                ),
                from.label(),
                to.label(),
                walk_minutes,
                settings.buffer_minutes,
                (analysis.time_between_events_seconds.unwrap_or(0.0) / 60.0).floor()
            ),
        ),
    };

    Some(RouteWarning {
        from_event_id: from.event_id.clone(),
        to_event_id: to.event_id.clone(),
        severity,
        message,
        analysis,
    })
}

/// A substitute for an event that clashes with the rest of the schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativeEvent {
    pub event: Event,
    pub shared_study_program_ids: Vec<String>,
    pub same_event_type: bool,
    /// Worst transition status into and out of the alternative.
    pub travel_status: TravelStatus,
    pub walking_time_seconds: f64,
}

/// Finds events that could replace `conflicting_event_id`.
///
/// Candidates share a study program or the event type, are not scheduled
/// yet and fit around the remaining items. They are ranked by how easily
/// the visitor can walk to and from them.
pub fn find_alternatives<C: EventCatalog>(
    conflicting_event_id: &str,
    items: &[ScheduleItem],
    catalog: &C,
    settings: &TravelTimeSettings,
    limit: usize,
) -> Vec<AlternativeEvent> {
    let Some(target) = catalog.event(conflicting_event_id) else {
        warn!(event_id = conflicting_event_id, "alternatives_unknown_event");
        return Vec::new();
    };

    let rest: Vec<ScheduleItem> = items
        .iter()
        .filter(|item| item.event_id != conflicting_event_id)
        .cloned()
        .collect();
    let scheduled: HashSet<&str> = items.iter().map(|item| item.event_id.as_str()).collect();

    let mut alternatives: Vec<AlternativeEvent> = catalog
        .events()
        .iter()
        .filter(|event| event.id != target.id && !scheduled.contains(event.id.as_str()))
        .filter_map(|event| {
            let shared: Vec<String> = event
                .study_program_ids
                .iter()
                .filter(|id| target.study_program_ids.contains(id))
                .cloned()
                .collect();
            let same_type = event.event_type.is_some() && event.event_type == target.event_type;
            if shared.is_empty() && !same_type {
                return None;
            }

            event.slot()?;
            let as_item = ScheduleItem::for_event(event, 1, Utc::now());
            if !conflicts_with(&as_item, &rest).is_empty() {
                return None;
            }

            let (travel_status, walking_time_seconds) = travel_fit(event, &rest, catalog, settings);
            Some(AlternativeEvent {
                event: event.clone(),
                shared_study_program_ids: shared,
                same_event_type: same_type,
                travel_status,
                walking_time_seconds,
            })
        })
        .collect();

    alternatives.sort_by(|a, b| {
        a.travel_status
            .cmp(&b.travel_status)
            .then_with(|| a.walking_time_seconds.total_cmp(&b.walking_time_seconds))
            .then_with(|| compare_start(a.event.time_start, b.event.time_start))
            .then_with(|| a.event.id.cmp(&b.event.id))
    });
    alternatives.truncate(limit);

    debug!(event_id = conflicting_event_id, found = alternatives.len(), "alternatives_found");
    alternatives
}

/// Worst status and total walking time between `event` and its scheduled
/// neighbours.
pub(crate) fn travel_fit<C: EventCatalog>(
    event: &Event,
    schedule: &[ScheduleItem],
    catalog: &C,
    settings: &TravelTimeSettings,
) -> (TravelStatus, f64) {
    let (previous, next) = neighbours(event, schedule, catalog);

    let mut status = TravelStatus::Ok;
    let mut walking = 0.0;
    if let Some(previous) = previous {
        let analysis = analyze_travel(previous, event, settings);
        status = status.max(analysis.status);
        walking += analysis.walking_time_seconds;
    }
    if let Some(next) = next {
        let analysis = analyze_travel(event, next, settings);
        status = status.max(analysis.status);
        walking += analysis.walking_time_seconds;
    }
    (status, walking)
}

/// The scheduled events ending last before `event` starts and starting
/// first after it ends.
pub(crate) fn neighbours<'c, C: EventCatalog>(
    event: &Event,
    schedule: &[ScheduleItem],
    catalog: &'c C,
) -> (Option<&'c Event>, Option<&'c Event>) {
    let Some(slot) = event.slot() else {
        return (None, None);
    };

    let previous = schedule
        .iter()
        .filter(|item| item.event_id != event.id)
        .filter_map(|item| Some((item.end?, item)))
        .filter(|(end, _)| *end <= slot.start)
        .max_by(|(a, x), (b, y)| a.cmp(b).then_with(|| y.event_id.cmp(&x.event_id)))
        .and_then(|(_, item)| catalog.event(&item.event_id));

    let next = schedule
        .iter()
        .filter(|item| item.event_id != event.id)
        .filter_map(|item| Some((item.start?, item)))
        .filter(|(start, _)| *start >= slot.end)
        .min_by(|(a, x), (b, y)| a.cmp(b).then_with(|| x.event_id.cmp(&y.event_id)))
        .and_then(|(_, item)| catalog.event(&item.event_id));

    (previous, next)
}

/// Orders optional start times ascending with missing times last.
pub(crate) fn compare_start(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
