//! Planner facade.
//!
//! Bundles the catalog snapshot, the shared popularity store and the
//! configuration behind the operations callers use. Every input and output
//! is plain serde data, so any transport can sit in front of it.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::batch::{batch_add, BatchAddRequest, BatchAddResult};
use crate::config::{EngineConfig, TravelTimeSettings};
use crate::conflicts::detect_conflicts;
use crate::error::Result;
use crate::haversine::HaversineMatrix;
use crate::models::{Coordinates, Event, ScheduleItem, TimeConflict};
use crate::optimizer::{analyze_schedule, schedule_gaps, ScheduleOptimizationResult};
use crate::popularity::EventPopularity;
use crate::recommend::{
    RecommendationContext, RecommendationFilters, RecommendationResponse, RecommendationScorer,
};
use crate::route::{
    build_route, find_alternatives, AlternativeEvent, Route, DEFAULT_ALTERNATIVES_LIMIT,
};
use crate::traits::{EventCatalog, PopularityStore};
use crate::travel::{analyze_travel, TravelTimeAnalysis};

pub struct Planner<C, P> {
    catalog: C,
    popularity: Arc<P>,
    config: EngineConfig,
}

impl<C, P> Planner<C, P>
where
    C: EventCatalog + Sync,
    P: PopularityStore,
{
    pub fn new(catalog: C, popularity: Arc<P>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            catalog,
            popularity,
            config,
        })
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Swaps in a freshly fetched catalog snapshot.
    pub fn replace_catalog(&mut self, catalog: C) {
        self.catalog = catalog;
    }

    pub fn detect_conflicts(&self, items: &[ScheduleItem]) -> Vec<TimeConflict> {
        detect_conflicts(items)
    }

    /// Walking feasibility from `from` to `to`; `settings` defaults to the configured ones.
    pub fn analyze_travel(
        &self,
        from: &Event,
        to: &Event,
        settings: Option<TravelTimeSettings>,
    ) -> TravelTimeAnalysis {
        analyze_travel(from, to, &settings.unwrap_or(self.config.travel))
    }

    #[instrument(skip_all, fields(items = items.len(), has_location = current_location.is_some()))]
    pub fn build_route(
        &self,
        items: &[ScheduleItem],
        settings: Option<TravelTimeSettings>,
        current_location: Option<Coordinates>,
    ) -> Result<Route> {
        build_route(items, &self.catalog, &settings.unwrap_or(self.config.travel), current_location)
    }

    #[instrument(skip_all, fields(event_id = conflicting_event_id, items = items.len()))]
    pub fn find_alternatives(
        &self,
        conflicting_event_id: &str,
        items: &[ScheduleItem],
        limit: Option<usize>,
    ) -> Vec<AlternativeEvent> {
        find_alternatives(
            conflicting_event_id,
            items,
            &self.catalog,
            &self.config.travel,
            limit.unwrap_or(DEFAULT_ALTERNATIVES_LIMIT),
        )
    }

    #[instrument(skip_all, fields(scheduled = context.scheduled_event_ids.len()))]
    pub fn recommend(
        &self,
        context: &RecommendationContext,
        filters: &RecommendationFilters,
    ) -> Result<RecommendationResponse> {
        let snapshot = self.popularity.snapshot();
        let scorer = RecommendationScorer::new(
            &self.catalog,
            context,
            &snapshot,
            self.config.weights,
            self.config.travel,
            &self.config.recommend,
        );
        scorer.recommend(filters)
    }

    /// Adds events in bulk and counts each accepted one as scheduled.
    #[instrument(
        skip_all,
        fields(requested = request.event_ids.len(), skip_conflicts = request.skip_conflicts)
    )]
    pub fn batch_add(
        &self,
        request: &BatchAddRequest,
        current_items: &[ScheduleItem],
    ) -> Result<BatchAddResult> {
        let result =
            batch_add(request, current_items, &self.catalog, &self.config.batch, Utc::now())?;
        for event_id in &result.added_event_ids {
            self.popularity.track_scheduled(event_id);
        }
        Ok(result)
    }

    #[instrument(skip_all, fields(items = items.len()))]
    pub fn analyze_schedule(&self, items: &[ScheduleItem]) -> ScheduleOptimizationResult {
        let options = &self.config.optimizer;

        let study_program_ids: BTreeSet<String> = items
            .iter()
            .filter_map(|item| self.catalog.event(&item.event_id))
            .flat_map(|event| event.study_program_ids.iter().cloned())
            .collect();
        let context = RecommendationContext {
            scheduled_event_ids: items.iter().map(|item| item.event_id.clone()).collect(),
            study_program_ids: study_program_ids.into_iter().collect(),
            available_time_slots: schedule_gaps(items, options),
            ..RecommendationContext::default()
        };
        let filters = RecommendationFilters {
            exclude_conflicts: true,
            limit: Some(self.catalog.events().len()),
            ..RecommendationFilters::default()
        };
        let candidates = match self.recommend(&context, &filters) {
            Ok(response) => response.recommendations,
            Err(err) => {
                warn!(error = %err, "schedule_candidates_unavailable");
                Vec::new()
            }
        };

        let result = analyze_schedule(
            items,
            &self.catalog,
            &candidates,
            &HaversineMatrix::for_speed(self.config.travel.walking_speed),
            options,
        );
        info!(
            current_score = result.current_score,
            suggestions = result.optimizations.len(),
            "schedule_analysis_complete"
        );
        result
    }

    pub fn track_view(&self, event_id: &str) {
        self.popularity.track_view(event_id);
    }

    pub fn track_scheduled(&self, event_id: &str) {
        self.popularity.track_scheduled(event_id);
    }

    pub fn popularity(&self, event_id: &str) -> EventPopularity {
        self.popularity.popularity(event_id)
    }
}
