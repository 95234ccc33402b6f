//! Error type for the planner engine.
//!
//! Only malformed input and collaborator failures surface as errors. Missing
//! locations or times degrade the affected field instead.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, PlannerError>;

#[derive(Debug, Error)]
pub enum PlannerError {
    /// The request failed basic shape validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("coordinates out of range: lat={latitude}, lng={longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    /// A time slot whose end is not after its start.
    #[error("time slot must end after it starts")]
    InvalidTimeSlot,

    #[error("invalid configuration: {0}")]
    Config(String),

    /// The event catalog could not be fetched.
    #[error("catalog request failed: {0}")]
    Catalog(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PlannerError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }
}
