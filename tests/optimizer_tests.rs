//! Schedule analysis and improvement suggestions.

mod fixtures;

use std::sync::Arc;

use openhouse_planner::catalog::InMemoryCatalog;
use openhouse_planner::config::EngineConfig;
use openhouse_planner::engine::Planner;
use openhouse_planner::models::Event;
use openhouse_planner::optimizer::{ActionKind, OptimizationType, ScheduleOptimizationResult};
use openhouse_planner::popularity::InMemoryPopularityStore;

use fixtures::*;

fn planner(events: Vec<Event>) -> Planner<InMemoryCatalog, InMemoryPopularityStore> {
    let popularity = Arc::new(InMemoryPopularityStore::new());
    Planner::new(catalog(events), popularity, EngineConfig::default()).unwrap()
}

fn of_type(
    result: &ScheduleOptimizationResult,
    kind: OptimizationType,
) -> Vec<&openhouse_planner::optimizer::ScheduleOptimization> {
    result
        .optimizations
        .iter()
        .filter(|opt| opt.optimization_type == kind)
        .collect()
}

#[test]
fn test_empty_schedule_is_perfect() {
    let planner = planner(vec![EventBuilder::new("a").kind("lecture").build()]);

    let result = planner.analyze_schedule(&[]);

    assert_eq!(result.current_score, 100.0);
    assert!(result.gaps.is_empty());
    assert!(result.conflicts.is_empty());
    assert!(result.optimizations.is_empty());
}

#[test]
fn test_conflict_suggests_dropping_lower_priority() {
    let a = EventBuilder::new("a").title("Robotics").at(9, 0, 60).kind("lecture").build();
    let b = EventBuilder::new("b").title("Chemistry").at(9, 30, 60).kind("tour").build();
    let planner = planner(vec![a.clone(), b.clone()]);

    let result = planner.analyze_schedule(&[item_with(&a, 3, 0), item_with(&b, 1, 5)]);

    assert_eq!(result.current_score, 85.0);
    assert_eq!(result.conflicts.len(), 1);
    assert_eq!(result.conflicts[0].event1_title, "Robotics");
    assert_eq!(result.conflicts[0].overlap_minutes, 30);

    let resolve = of_type(&result, OptimizationType::ResolveConflict);
    assert_eq!(resolve.len(), 1);
    assert_eq!(resolve[0].suggested_action.action, ActionKind::Remove);
    assert_eq!(resolve[0].suggested_action.event_ids, vec!["b".to_string()]);
    assert_eq!(resolve[0].benefit_score, 80.0);
}

#[test]
fn test_long_gap_is_filled_with_fitting_event() {
    let a = EventBuilder::new("a").at(9, 0, 60).kind("lecture").build();
    let b = EventBuilder::new("b").at(14, 0, 60).kind("tour").build();
    let c = EventBuilder::new("c").title("Open Lab").at(11, 0, 60).kind("lecture").build();
    let planner = planner(vec![a.clone(), b.clone(), c]);

    let result = planner.analyze_schedule(&[item(&a), item(&b)]);

    // one idle stretch of four hours between the two items
    assert_eq!(result.current_score, 95.0);
    assert_eq!(result.gaps.len(), 3);
    assert_eq!((result.gaps[1].start, result.gaps[1].end), (at(10, 0), at(14, 0)));

    let fill = of_type(&result, OptimizationType::FillGap);
    assert_eq!(fill.len(), 1);
    assert_eq!(fill[0].suggested_action.action, ActionKind::Add);
    assert_eq!(fill[0].suggested_action.event_ids, vec!["c".to_string()]);
    assert!(fill[0].suggested_action.reason.contains("Open Lab"));
}

#[test]
fn test_zig_zag_route_suggests_shorter_order() {
    let first = EventBuilder::new("first")
        .at(9, 0, 60)
        .kind("lecture")
        .in_building(TECH_MAIN)
        .build();
    let across = EventBuilder::new("across")
        .at(10, 0, 60)
        .kind("tour")
        .in_building(UNI_MAIN)
        .build();
    let back = EventBuilder::new("back")
        .at(11, 0, 60)
        .kind("lab")
        .in_building(TECH_AUDIMAX)
        .build();
    let planner = planner(vec![first.clone(), across.clone(), back.clone()]);

    let result = planner.analyze_schedule(&[item(&first), item(&across), item(&back)]);

    let travel = of_type(&result, OptimizationType::ReduceTravel);
    assert_eq!(travel.len(), 1);
    assert_eq!(travel[0].suggested_action.action, ActionKind::Swap);
    assert_eq!(
        travel[0].suggested_action.event_ids,
        vec!["first".to_string(), "back".to_string(), "across".to_string()]
    );
    assert!(travel[0].benefit_score > 40.0);
}

#[test]
fn test_compact_route_needs_no_reordering() {
    let a = EventBuilder::new("a").at(9, 0, 60).in_building(TECH_MAIN).build();
    let b = EventBuilder::new("b").at(10, 0, 60).in_building(TECH_AUDIMAX).build();
    let c = EventBuilder::new("c").at(11, 0, 60).in_building(UNI_MAIN).build();
    let planner = planner(vec![a.clone(), b.clone(), c.clone()]);

    let result = planner.analyze_schedule(&[item(&a), item(&b), item(&c)]);

    assert!(of_type(&result, OptimizationType::ReduceTravel).is_empty());
}

#[test]
fn test_one_sided_schedule_suggests_other_event_type() {
    let a = EventBuilder::new("a").at(9, 0, 60).kind("lecture").build();
    let b = EventBuilder::new("b").at(10, 0, 60).kind("lecture").build();
    let tour = EventBuilder::new("tour").title("Campus Tour").untimed().kind("tour").build();
    let planner = planner(vec![a.clone(), b.clone(), tour]);

    let result = planner.analyze_schedule(&[item(&a), item(&b)]);

    assert_eq!(result.diversity.score, 0.5);
    assert_eq!(result.diversity.event_types.get("lecture"), Some(&2));
    assert_eq!(result.current_score, 90.0);

    let diversity = of_type(&result, OptimizationType::AddDiversity);
    assert_eq!(diversity.len(), 1);
    assert_eq!(diversity[0].suggested_action.event_ids, vec!["tour".to_string()]);
}

#[test]
fn test_suggestions_are_sorted_by_benefit() {
    let a = EventBuilder::new("a").at(9, 0, 60).kind("lecture").in_building(TECH_MAIN).build();
    let b = EventBuilder::new("b").at(9, 45, 60).kind("lecture").in_building(UNI_MAIN).build();
    let c = EventBuilder::new("c").at(13, 0, 60).kind("tour").in_building(TECH_AUDIMAX).build();
    let d = EventBuilder::new("d").at(15, 0, 60).kind("lab").build();
    let planner = planner(vec![a.clone(), b.clone(), c.clone(), d]);

    let result = planner.analyze_schedule(&[item(&a), item(&b), item(&c)]);

    assert!(!result.optimizations.is_empty());
    assert!(
        result
            .optimizations
            .windows(2)
            .all(|pair| pair[0].benefit_score >= pair[1].benefit_score)
    );
}
