//! Schedule quality analysis and improvement suggestions.
//!
//! Suggestions are greedy and local: each one is computed independently and
//! nothing here attempts a global reordering of the day.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::OptimizerOptions;
use crate::conflicts::detect_conflicts;
use crate::models::{Coordinates, EventId, ScheduleItem, TimeConflict};
use crate::recommend::EventRecommendation;
use crate::route::compare_start;
use crate::time::{free_slots, TimeSlot};
use crate::traits::{DistanceMatrixProvider, EventCatalog};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationType {
    ResolveConflict,
    FillGap,
    ReduceTravel,
    AddDiversity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Swap,
    Remove,
    Add,
    Move,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedAction {
    pub action: ActionKind,
    pub event_ids: Vec<EventId>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleOptimization {
    #[serde(rename = "type")]
    pub optimization_type: OptimizationType,
    pub suggested_action: SuggestedAction,
    /// Estimated impact, 0..100.
    pub benefit_score: f64,
}

/// A conflict with event titles resolved for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictView {
    pub event1_id: EventId,
    pub event1_title: String,
    pub event2_id: EventId,
    pub event2_title: String,
    pub overlap_minutes: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiversityAnalysis {
    pub event_types: BTreeMap<String, usize>,
    pub study_programs: BTreeMap<String, usize>,
    pub locations: BTreeMap<String, usize>,
    /// 0..1; see [`diversity_of`].
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleOptimizationResult {
    pub current_score: f64,
    pub gaps: Vec<TimeSlot>,
    pub conflicts: Vec<ConflictView>,
    pub diversity: DiversityAnalysis,
    pub optimizations: Vec<ScheduleOptimization>,
}

/// Operating hours of the day the schedule falls on, in UTC.
///
/// The day is taken from the earliest timed item; `None` if no item has times.
pub fn operating_window(items: &[ScheduleItem], options: &OptimizerOptions) -> Option<TimeSlot> {
    let offset = FixedOffset::east_opt(options.utc_offset_minutes.checked_mul(60)?)?;
    let first = items.iter().filter_map(ScheduleItem::slot).map(|slot| slot.start).min()?;
    let day = first.with_timezone(&offset).date_naive();

    let start = day.and_time(options.day_start).and_local_timezone(offset).single()?;
    let end = day.and_time(options.day_end).and_local_timezone(offset).single()?;
    TimeSlot::from_bounds(Some(start.with_timezone(&Utc)), Some(end.with_timezone(&Utc)))
}

/// Free time within operating hours not covered by any timed item.
pub fn schedule_gaps(items: &[ScheduleItem], options: &OptimizerOptions) -> Vec<TimeSlot> {
    let Some(window) = operating_window(items, options) else {
        return Vec::new();
    };
    let busy: Vec<TimeSlot> = items.iter().filter_map(ScheduleItem::slot).collect();
    free_slots(window, &busy)
}

/// Scores the schedule and proposes improvements, best first.
///
/// `candidates` are ranked recommendations for this schedule; they feed the
/// fill-gap and diversity suggestions.
pub fn analyze_schedule<C, M>(
    items: &[ScheduleItem],
    catalog: &C,
    candidates: &[EventRecommendation],
    matrix_provider: &M,
    options: &OptimizerOptions,
) -> ScheduleOptimizationResult
where
    C: EventCatalog,
    M: DistanceMatrixProvider,
{
    let raw_conflicts = detect_conflicts(items);
    let gaps = schedule_gaps(items, options);
    let diversity = diversity_of(items, catalog);

    let idle_gap_count = idle_gaps(items, &gaps, options.long_gap_minutes);
    let diversity_penalty = if items.len() >= 2 {
        options.max_diversity_penalty * (1.0 - diversity.score)
    } else {
        0.0
    };
    let current_score = (100.0
        - options.conflict_penalty * raw_conflicts.len() as f64
        - options.gap_penalty * idle_gap_count as f64
        - diversity_penalty)
        .clamp(0.0, 100.0);

    let title = |id: &str| {
        catalog.event(id).map_or_else(|| id.to_string(), |event| event.title.clone())
    };
    let conflicts = raw_conflicts
        .iter()
        .map(|conflict| ConflictView {
            event1_id: conflict.item1.event_id.clone(),
            event1_title: title(&conflict.item1.event_id),
            event2_id: conflict.item2.event_id.clone(),
            event2_title: title(&conflict.item2.event_id),
            overlap_minutes: conflict.overlap_minutes,
        })
        .collect();

    let mut optimizations: Vec<ScheduleOptimization> = raw_conflicts
        .iter()
        .map(|conflict| resolve_conflict(conflict, &title))
        .collect();

    let mut suggested: HashSet<&str> = HashSet::new();
    for gap in gaps.iter().filter(|gap| gap.duration_minutes() >= options.min_fill_gap_minutes) {
        let Some(candidate) = candidates.iter().find(|rec| {
            !suggested.contains(rec.event.id.as_str())
                && rec.event.slot().is_some_and(|slot| gap.contains(&slot))
        }) else {
            continue;
        };
        suggested.insert(&candidate.event.id);
        optimizations.push(fill_gap(gap, candidate));
    }

    if let Some(optimization) =
        reduce_travel(items, catalog, matrix_provider, options.travel_improvement_threshold)
    {
        optimizations.push(optimization);
    }

    if !items.is_empty()
        && let Some(optimization) = add_diversity(&diversity, candidates, catalog, &suggested)
    {
        optimizations.push(optimization);
    }

    optimizations.sort_by(|a, b| b.benefit_score.total_cmp(&a.benefit_score));

    debug!(
        items = items.len(),
        current_score,
        conflicts = raw_conflicts.len(),
        gaps = gaps.len(),
        suggestions = optimizations.len(),
        "schedule_analyzed"
    );

    ScheduleOptimizationResult {
        current_score: round2(current_score),
        gaps,
        conflicts,
        diversity,
        optimizations,
    }
}

/// Gaps between the first and last scheduled item longer than `threshold_minutes`.
fn idle_gaps(items: &[ScheduleItem], gaps: &[TimeSlot], threshold_minutes: i64) -> usize {
    let slots: Vec<TimeSlot> = items.iter().filter_map(ScheduleItem::slot).collect();
    let (Some(first), Some(last)) = (
        slots.iter().map(|slot| slot.start).min(),
        slots.iter().map(|slot| slot.end).max(),
    ) else {
        return 0;
    };
    gaps.iter()
        .filter(|gap| gap.start >= first && gap.end <= last)
        .filter(|gap| gap.duration_minutes() > threshold_minutes)
        .count()
}

/// Frequency maps plus a 0..1 score: the mean of the distinct-type ratio and
/// the distinct-program ratio, each over the items that carry that attribute.
/// Items with neither leave the score at 1.
pub fn diversity_of<C: EventCatalog>(items: &[ScheduleItem], catalog: &C) -> DiversityAnalysis {
    let mut analysis = DiversityAnalysis::default();
    let (mut typed, mut with_programs) = (0usize, 0usize);
    for event in items.iter().filter_map(|item| catalog.event(&item.event_id)) {
        if let Some(event_type) = &event.event_type {
            typed += 1;
            *analysis.event_types.entry(event_type.clone()).or_default() += 1;
        }
        if !event.study_program_ids.is_empty() {
            with_programs += 1;
        }
        for program in &event.study_program_ids {
            *analysis.study_programs.entry(program.clone()).or_default() += 1;
        }
        if let Some(location) = &event.location {
            *analysis.locations.entry(location.name.clone()).or_default() += 1;
        }
    }

    let ratios: Vec<f64> = [
        (analysis.event_types.len(), typed),
        (analysis.study_programs.len(), with_programs),
    ]
    .into_iter()
    .filter(|&(_, carriers)| carriers > 1)
    .map(|(distinct, carriers)| (distinct as f64 / carriers as f64).min(1.0))
    .collect();

    analysis.score = if ratios.is_empty() {
        1.0
    } else {
        ratios.iter().sum::<f64>() / ratios.len() as f64
    };
    analysis
}

/// The item to drop from a conflicting pair: lower priority, then the one
/// added later.
pub fn item_to_remove(conflict: &TimeConflict) -> (&ScheduleItem, &ScheduleItem) {
    let (a, b) = (&conflict.item1, &conflict.item2);
    let order = a
        .priority
        .cmp(&b.priority)
        .then_with(|| b.added_at.cmp(&a.added_at));
    match order {
        Ordering::Less => (a, b),
        Ordering::Greater => (b, a),
        Ordering::Equal => (b, a),
    }
}

fn resolve_conflict(
    conflict: &TimeConflict,
    title: &impl Fn(&str) -> String,
) -> ScheduleOptimization {
    let (remove, keep) = item_to_remove(conflict);
    ScheduleOptimization {
        optimization_type: OptimizationType::ResolveConflict,
        suggested_action: SuggestedAction {
            action: ActionKind::Remove,
            event_ids: vec![remove.event_id.clone()],
            reason: format!(
                "\"{}\" overlaps \"{}\" by {} min; drop the lower-priority one",
                title(&remove.event_id),
                title(&keep.event_id),
                conflict.overlap_minutes
            ),
        },
        benefit_score: (50.0 + conflict.overlap_minutes as f64).min(100.0),
    }
}

fn fill_gap(gap: &TimeSlot, candidate: &EventRecommendation) -> ScheduleOptimization {
    let filled = candidate
        .event
        .slot()
        .map_or(0.0, |slot| slot.duration_minutes() as f64 / gap.duration_minutes().max(1) as f64);
    ScheduleOptimization {
        optimization_type: OptimizationType::FillGap,
        suggested_action: SuggestedAction {
            action: ActionKind::Add,
            event_ids: vec![candidate.event.id.clone()],
            reason: format!(
                "You are free {}–{}; \"{}\" fits in this gap",
                gap.start.format("%H:%M"),
                gap.end.format("%H:%M"),
                candidate.event.title
            ),
        },
        benefit_score: round2((candidate.score * 0.7 + 30.0 * filled.min(1.0)).min(100.0)),
    }
}

/// Suggests visiting located events in nearest-neighbour order when that
/// walks materially less than the current time order.
fn reduce_travel<C, M>(
    items: &[ScheduleItem],
    catalog: &C,
    matrix_provider: &M,
    threshold: f64,
) -> Option<ScheduleOptimization>
where
    C: EventCatalog,
    M: DistanceMatrixProvider,
{
    let mut located: Vec<(&ScheduleItem, Coordinates)> = items
        .iter()
        .filter_map(|item| Some((item, catalog.event(&item.event_id)?.coordinates()?)))
        .collect();
    if located.len() < 3 {
        return None;
    }
    located.sort_by(|(a, _), (b, _)| {
        compare_start(a.start, b.start).then_with(|| a.event_id.cmp(&b.event_id))
    });

    let coords: Vec<Coordinates> = located.iter().map(|(_, coords)| *coords).collect();
    let matrix = matrix_provider.matrix_for(&coords);
    if matrix.len() != coords.len() {
        warn!(expected = coords.len(), got = matrix.len(), "travel_matrix_size_mismatch");
        return None;
    }

    let current_order: Vec<usize> = (0..coords.len()).collect();
    let current_cost = path_cost(&current_order, &matrix);
    let nn_order = nearest_neighbor_order(&matrix);
    let nn_cost = path_cost(&nn_order, &matrix);

    if current_cost <= 0 {
        return None;
    }
    let saving = 1.0 - nn_cost as f64 / current_cost as f64;
    if saving <= threshold {
        return None;
    }

    let event_ids: Vec<EventId> = nn_order.iter().map(|&i| located[i].0.event_id.clone()).collect();
    Some(ScheduleOptimization {
        optimization_type: OptimizationType::ReduceTravel,
        suggested_action: SuggestedAction {
            action: ActionKind::Swap,
            event_ids,
            reason: format!(
                "Prioritising events in this order cuts walking by {:.0}% ({} min less)",
                saving * 100.0,
                (current_cost - nn_cost) / 60
            ),
        },
        benefit_score: round2((saving * 100.0).min(100.0)),
    })
}

/// Greedy tour from index 0, always walking to the closest unvisited stop.
fn nearest_neighbor_order(matrix: &[Vec<i32>]) -> Vec<usize> {
    let n = matrix.len();
    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut current = 0;
    visited[0] = true;
    order.push(0);

    while order.len() < n {
        let next = (0..n)
            .filter(|&j| !visited[j])
            .min_by_key(|&j| (matrix[current][j], j));
        let Some(next) = next else { break };
        visited[next] = true;
        order.push(next);
        current = next;
    }
    order
}

fn path_cost(order: &[usize], matrix: &[Vec<i32>]) -> i32 {
    order.windows(2).map(|pair| matrix[pair[0]][pair[1]]).sum()
}

fn add_diversity<C: EventCatalog>(
    diversity: &DiversityAnalysis,
    candidates: &[EventRecommendation],
    catalog: &C,
    already_suggested: &HashSet<&str>,
) -> Option<ScheduleOptimization> {
    let counts: HashMap<&str, usize> = diversity
        .event_types
        .iter()
        .map(|(event_type, count)| (event_type.as_str(), *count))
        .collect();
    let mean = if counts.is_empty() {
        0.0
    } else {
        counts.values().sum::<usize>() as f64 / counts.len() as f64
    };

    let candidate = candidates.iter().find(|rec| {
        !already_suggested.contains(rec.event.id.as_str())
            && catalog.event(&rec.event.id).is_some()
            && rec.event.event_type.as_deref().is_some_and(|event_type| {
                let count = counts.get(event_type).copied().unwrap_or(0);
                count == 0 || (count as f64) < mean
            })
    })?;

    let event_type = candidate.event.event_type.as_deref().unwrap_or_default();
    Some(ScheduleOptimization {
        optimization_type: OptimizationType::AddDiversity,
        suggested_action: SuggestedAction {
            action: ActionKind::Add,
            event_ids: vec![candidate.event.id.clone()],
            reason: format!(
                "Your schedule has few {} events; \"{}\" broadens it",
                event_type, candidate.event.title
            ),
        },
        benefit_score: round2(((1.0 - diversity.score) * 50.0 + candidate.score * 0.3).min(100.0)),
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
