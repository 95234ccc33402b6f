//! Seams to the engine's external collaborators.
//!
//! The engine never reaches for global state: the catalog and the popularity
//! counters are passed in, so tests can substitute fakes.

use crate::models::{Coordinates, Event};
use crate::popularity::{EventPopularity, PopularitySnapshot};

/// Read access to the event catalog.
pub trait EventCatalog {
    fn event(&self, id: &str) -> Option<&Event>;

    /// All events, in a stable order.
    fn events(&self) -> &[Event];
}

/// Process-wide view and schedule counters.
///
/// Implementations are shared between concurrent requests, so increments
/// must be atomic per event.
pub trait PopularityStore: Send + Sync {
    fn track_view(&self, event_id: &str);

    fn track_scheduled(&self, event_id: &str);

    fn popularity(&self, event_id: &str) -> EventPopularity;

    /// A consistent copy of all counters for one scoring run.
    fn snapshot(&self) -> PopularitySnapshot;
}

/// Provides a walking-time matrix (seconds) for a set of locations.
///
/// The matrix is indexed by the provided location order.
pub trait DistanceMatrixProvider {
    fn matrix_for(&self, locations: &[Coordinates]) -> Vec<Vec<i32>>;
}
