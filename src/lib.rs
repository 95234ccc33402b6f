//! openhouse-planner core
//!
//! Conflict detection, walking-time feasibility, recommendation scoring and
//! schedule optimization for visitors of a one-day, multi-campus open house.

pub mod batch;
pub mod catalog;
pub mod config;
pub mod conflicts;
pub mod engine;
pub mod error;
pub mod haversine;
pub mod models;
pub mod optimizer;
pub mod popularity;
pub mod recommend;
pub mod route;
pub mod schedule_state;
pub mod time;
pub mod traits;
pub mod travel;

pub use engine::Planner;
pub use error::{PlannerError, Result};
