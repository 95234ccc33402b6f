//! Recommendation scoring.
//!
//! Every candidate is scored against seven weighted reasons. Each reason that
//! contributes points is kept on the result so the UI can explain the rank.
//! Scoring is a pure function of the context, the catalog and one popularity
//! snapshot, so repeated calls return identical output.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, Timelike, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{RecommendOptions, ScoringWeights, TravelTimeSettings};
use crate::conflicts::conflicts_with;
use crate::error::{PlannerError, Result};
use crate::models::{Event, EventId, ScheduleItem};
use crate::popularity::PopularitySnapshot;
use crate::route::{compare_start, neighbours};
use crate::time::TimeSlot;
use crate::traits::EventCatalog;
use crate::travel::{analyze_travel, TravelTimeAnalysis};

/// What the engine knows about the visitor. Never modified by scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecommendationContext {
    pub scheduled_event_ids: Vec<EventId>,
    /// Preferred study programs, possibly suggested by the chat navigator.
    pub study_program_ids: Vec<String>,
    pub available_time_slots: Vec<TimeSlot>,
    pub institution_id: Option<String>,
    pub preferred_event_types: Vec<String>,
    pub viewed_event_ids: Vec<EventId>,
    pub dismissed_event_ids: Vec<EventId>,
    pub max_travel_minutes: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecommendationFilters {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Drop conflicting candidates instead of just withholding the no-conflict points.
    pub exclude_conflicts: bool,
    pub only_high_demand: bool,
    /// Allow-list of event types; empty allows all.
    pub event_types: Vec<String>,
    pub min_score: Option<f64>,
    pub limit: Option<usize>,
}

impl RecommendationFilters {
    pub fn validate(&self) -> Result<()> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date)
            && end < start
        {
            return Err(PlannerError::invalid("endDate must not be before startDate"));
        }
        if let Some(min_score) = self.min_score
            && !min_score.is_finite()
        {
            return Err(PlannerError::invalid("minScore must be a finite number"));
        }
        Ok(())
    }

    fn admits(&self, event: &Event) -> bool {
        if let Some(start_date) = self.start_date
            && event.time_start.is_none_or(|start| start < start_date)
        {
            return false;
        }
        if let Some(end_date) = self.end_date
            && event.time_end.is_none_or(|end| end > end_date)
        {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonType {
    StudyProgram,
    EventType,
    TimeFit,
    Popularity,
    Diversity,
    Location,
    NoConflict,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationReason {
    #[serde(rename = "type")]
    pub reason_type: ReasonType,
    pub description: String,
    /// Share of the maximum score this reason contributed, in `[0, 1]`.
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecommendation {
    pub event: Event,
    pub score: f64,
    pub reasons: Vec<RecommendationReason>,
    pub conflicts_with_schedule: bool,
    pub conflicting_event_ids: Vec<EventId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_time_from_previous: Option<TravelTimeAnalysis>,
    pub is_high_demand: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupCategory {
    StudyProgram,
    EventType,
    TimeSlot,
    Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationGroup {
    pub category: GroupCategory,
    pub key: String,
    pub label: String,
    pub event_ids: Vec<EventId>,
    pub average_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResponse {
    pub recommendations: Vec<EventRecommendation>,
    pub groups: Vec<RecommendationGroup>,
    /// Matches after filtering, before the limit is applied.
    pub total_available: usize,
}

/// Scores candidates for one visitor against one popularity snapshot.
pub struct RecommendationScorer<'a, C: EventCatalog> {
    catalog: &'a C,
    context: &'a RecommendationContext,
    popularity: &'a PopularitySnapshot,
    weights: ScoringWeights,
    settings: TravelTimeSettings,
    options: &'a RecommendOptions,
    schedule: Vec<ScheduleItem>,
    type_counts: HashMap<String, usize>,
    program_counts: HashMap<String, usize>,
    max_popularity: f64,
    high_demand_threshold: f64,
}

impl<'a, C: EventCatalog + Sync> RecommendationScorer<'a, C> {
    pub fn new(
        catalog: &'a C,
        context: &'a RecommendationContext,
        popularity: &'a PopularitySnapshot,
        weights: ScoringWeights,
        settings: TravelTimeSettings,
        options: &'a RecommendOptions,
    ) -> Self {
        let schedule = schedule_from_context(context, catalog);

        let mut type_counts: HashMap<String, usize> = HashMap::new();
        let mut program_counts: HashMap<String, usize> = HashMap::new();
        for event in schedule.iter().filter_map(|item| catalog.event(&item.event_id)) {
            if let Some(event_type) = &event.event_type {
                *type_counts.entry(event_type.clone()).or_default() += 1;
            }
            for program in &event.study_program_ids {
                *program_counts.entry(program.clone()).or_default() += 1;
            }
        }

        let high_demand_threshold = popularity.percentile_threshold(
            catalog.events().iter().map(|event| event.id.as_str()),
            options.high_demand_percentile,
        );

        Self {
            catalog,
            context,
            popularity,
            weights,
            settings,
            options,
            schedule,
            type_counts,
            program_counts,
            max_popularity: popularity.max_score(),
            high_demand_threshold,
        }
    }

    /// Scores, ranks and filters the candidate pool.
    pub fn recommend(&self, filters: &RecommendationFilters) -> Result<RecommendationResponse> {
        filters.validate()?;

        let pool = self.candidate_pool(filters);
        let mut scored: Vec<EventRecommendation> = pool
            .par_iter()
            .filter_map(|event| self.score_event(event, filters.exclude_conflicts))
            .collect();
        rank(&mut scored);

        let pool_size = pool.len();
        let mut recommendations: Vec<EventRecommendation> = scored
            .into_iter()
            .filter(|rec| {
                filters.event_types.is_empty()
                    || rec
                        .event
                        .event_type
                        .as_ref()
                        .is_some_and(|event_type| filters.event_types.contains(event_type))
            })
            .filter(|rec| filters.min_score.is_none_or(|min| rec.score >= min))
            .filter(|rec| !filters.only_high_demand || rec.is_high_demand)
            .collect();

        let total_available = recommendations.len();
        recommendations.truncate(filters.limit.unwrap_or(self.options.default_limit));
        let groups = group_recommendations(&recommendations);

        debug!(
            pool = pool_size,
            total_available,
            returned = recommendations.len(),
            "recommendations_ranked"
        );

        Ok(RecommendationResponse {
            recommendations,
            groups,
            total_available,
        })
    }

    /// Catalog events the visitor has not scheduled or dismissed.
    fn candidate_pool(&self, filters: &RecommendationFilters) -> Vec<&'a Event> {
        let excluded: HashSet<&str> = self
            .context
            .scheduled_event_ids
            .iter()
            .chain(&self.context.dismissed_event_ids)
            .map(String::as_str)
            .collect();

        self.catalog
            .events()
            .iter()
            .filter(|event| !excluded.contains(event.id.as_str()))
            .filter(|event| {
                self.context
                    .institution_id
                    .as_deref()
                    .is_none_or(|institution| event.institution() == Some(institution))
            })
            .filter(|event| filters.admits(event))
            .collect()
    }

    /// Scores one event. Returns `None` if it conflicts and conflicts are excluded.
    pub fn score_event(
        &self,
        event: &Event,
        exclude_conflicts: bool,
    ) -> Option<EventRecommendation> {
        let candidate = ScheduleItem::for_event(event, 1, DateTime::<Utc>::UNIX_EPOCH);
        let conflicting_event_ids: Vec<EventId> = conflicts_with(&candidate, &self.schedule)
            .into_iter()
            .map(|item| item.event_id.clone())
            .collect();
        if exclude_conflicts && !conflicting_event_ids.is_empty() {
            return None;
        }

        let total = self.weights.total();
        let mut points = 0.0;
        let mut reasons = Vec::new();
        let mut add = |reason_type: ReasonType, contribution: f64, description: String| {
            if contribution > 0.0 {
                points += contribution;
                reasons.push(RecommendationReason {
                    reason_type,
                    description,
                    weight: (contribution / total).clamp(0.0, 1.0),
                });
            }
        };

        let shared: Vec<&str> = event
            .study_program_ids
            .iter()
            .filter(|id| self.context.study_program_ids.contains(id))
            .map(String::as_str)
            .collect();
        if !shared.is_empty() {
            add(
                ReasonType::StudyProgram,
                self.weights.study_program,
                format!("Matches your study program interests ({})", shared.join(", ")),
            );
        }

        if let Some(event_type) = &event.event_type
            && self.context.preferred_event_types.contains(event_type)
        {
            add(
                ReasonType::EventType,
                self.weights.event_type,
                format!("You prefer {event_type} events"),
            );
        }

        if let Some(slot) = event.slot()
            && self.context.available_time_slots.iter().any(|free| free.contains(&slot))
        {
            add(
                ReasonType::TimeFit,
                self.weights.time_fit,
                "Fits into your available time".to_string(),
            );
        }

        let popularity = self.popularity.score(&event.id);
        if self.max_popularity > 0.0 {
            add(
                ReasonType::Popularity,
                self.weights.popularity * (popularity / self.max_popularity).clamp(0.0, 1.0),
                "Popular with other visitors".to_string(),
            );
        }

        if self.is_underrepresented(event) {
            add(
                ReasonType::Diversity,
                self.weights.diversity,
                "Adds variety to your schedule".to_string(),
            );
        }

        let (previous, next) = neighbours(event, &self.schedule, self.catalog);
        let travel_time_from_previous =
            previous.map(|previous| analyze_travel(previous, event, &self.settings));
        let travel_to_next = next.map(|next| analyze_travel(event, next, &self.settings));
        let nearest_walk = travel_time_from_previous
            .iter()
            .chain(travel_to_next.iter())
            .filter(|analysis| analysis.location_known)
            .map(|analysis| analysis.walking_time_seconds)
            .min_by(f64::total_cmp);
        if let Some(walk_seconds) = nearest_walk {
            let max_travel_seconds = f64::from(
                self.context
                    .max_travel_minutes
                    .unwrap_or(self.options.default_max_travel_minutes)
                    .max(1),
            ) * 60.0;
            add(
                ReasonType::Location,
                self.weights.location * (1.0 - walk_seconds / max_travel_seconds).clamp(0.0, 1.0),
                format!("About {} min walk from your schedule", (walk_seconds / 60.0).ceil()),
            );
        }

        if conflicting_event_ids.is_empty() {
            add(
                ReasonType::NoConflict,
                self.weights.no_conflict,
                "No conflict with your schedule".to_string(),
            );
        }

        let score = round2((points * 100.0 / total).clamp(0.0, 100.0));
        let is_high_demand = popularity > 0.0 && popularity > self.high_demand_threshold;

        Some(EventRecommendation {
            event: event.clone(),
            score,
            reasons,
            conflicts_with_schedule: !conflicting_event_ids.is_empty(),
            conflicting_event_ids,
            travel_time_from_previous,
            is_high_demand,
        })
    }

    /// True if the event's type or one of its programs is rarer than average
    /// in the schedule (or absent from it).
    fn is_underrepresented(&self, event: &Event) -> bool {
        let type_mean = mean_occurrence(&self.type_counts);
        let program_mean = mean_occurrence(&self.program_counts);

        let type_rare = event.event_type.as_ref().is_some_and(|event_type| {
            let count = self.type_counts.get(event_type).copied().unwrap_or(0);
            count == 0 || (count as f64) < type_mean
        });
        let program_rare = event.study_program_ids.iter().any(|program| {
            let count = self.program_counts.get(program).copied().unwrap_or(0);
            count == 0 || (count as f64) < program_mean
        });
        type_rare || program_rare
    }
}

/// Resolves the context's scheduled IDs to schedule items via the catalog.
pub fn schedule_from_context<C: EventCatalog>(
    context: &RecommendationContext,
    catalog: &C,
) -> Vec<ScheduleItem> {
    let mut seen = HashSet::new();
    context
        .scheduled_event_ids
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .filter_map(|id| catalog.event(id))
        .map(|event| ScheduleItem::for_event(event, 1, DateTime::<Utc>::UNIX_EPOCH))
        .collect()
}

/// Sorts by score descending, then earlier start, then event ID.
pub fn rank(recommendations: &mut [EventRecommendation]) {
    recommendations.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| compare_start(a.event.time_start, b.event.time_start))
            .then_with(|| a.event.id.cmp(&b.event.id))
    });
}

/// Buckets recommendations for presentation. Order within a bucket follows
/// the ranking.
pub fn group_recommendations(recommendations: &[EventRecommendation]) -> Vec<RecommendationGroup> {
    let mut buckets: BTreeMap<(GroupCategory, String), (String, Vec<EventId>, f64)> =
        BTreeMap::new();
    let mut put = |category: GroupCategory, key: String, label: String, rec: &EventRecommendation| {
        let bucket = buckets.entry((category, key)).or_insert_with(|| (label, Vec::new(), 0.0));
        bucket.1.push(rec.event.id.clone());
        bucket.2 += rec.score;
    };

    for rec in recommendations {
        for program in &rec.event.study_program_ids {
            put(GroupCategory::StudyProgram, program.clone(), program.clone(), rec);
        }
        if let Some(event_type) = &rec.event.event_type {
            put(GroupCategory::EventType, event_type.clone(), event_type.clone(), rec);
        }
        if let Some(start) = rec.event.time_start {
            let hour = start.with_minute(0).and_then(|t| t.with_second(0)).unwrap_or(start);
            let until = hour + Duration::hours(1);
            let label = format!("{}–{}", hour.format("%H:%M"), until.format("%H:%M"));
            put(GroupCategory::TimeSlot, hour.format("%H:00").to_string(), label, rec);
        }
        if let Some(location) = &rec.event.location {
            put(GroupCategory::Location, location.id.clone(), location.name.clone(), rec);
        }
    }

    buckets
        .into_iter()
        .map(|((category, key), (label, event_ids, sum))| RecommendationGroup {
            category,
            key,
            label,
            average_score: round2(sum / event_ids.len() as f64),
            event_ids,
        })
        .collect()
}

fn mean_occurrence(counts: &HashMap<String, usize>) -> f64 {
    if counts.is_empty() {
        return 0.0;
    }
    counts.values().sum::<usize>() as f64 / counts.len() as f64
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
