//! Engine configuration.
//!
//! Every section has a `Default` matching the product defaults, and every
//! field may be omitted from JSON.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};

/// Largest offset `chrono::FixedOffset` accepts, in minutes.
const MAX_UTC_OFFSET_MINUTES: i32 = 24 * 60 - 1;

/// Walking pace used to turn distances into walking times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalkingSpeed {
    Slow,
    #[default]
    Normal,
    Fast,
}

impl WalkingSpeed {
    pub fn meters_per_second(self) -> f64 {
        match self {
            WalkingSpeed::Slow => 0.8,
            WalkingSpeed::Normal => 1.2,
            WalkingSpeed::Fast => 1.5,
        }
    }
}

/// Per-call travel settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TravelTimeSettings {
    pub walking_speed: WalkingSpeed,
    /// Safety buffer added on top of the walking time.
    pub buffer_minutes: u32,
    /// Margins below this are reported as tight.
    pub min_warning_minutes: u32,
}

impl Default for TravelTimeSettings {
    fn default() -> Self {
        Self {
            walking_speed: WalkingSpeed::Normal,
            buffer_minutes: 5,
            min_warning_minutes: 3,
        }
    }
}

impl TravelTimeSettings {
    pub fn buffer_seconds(&self) -> f64 {
        f64::from(self.buffer_minutes) * 60.0
    }

    pub fn min_warning_seconds(&self) -> f64 {
        f64::from(self.min_warning_minutes) * 60.0
    }
}

/// Points each recommendation reason can contribute.
///
/// Scores are normalised by the sum, so the weights need not add up to 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScoringWeights {
    pub study_program: f64,
    pub event_type: f64,
    pub time_fit: f64,
    pub popularity: f64,
    pub diversity: f64,
    pub location: f64,
    pub no_conflict: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            study_program: 30.0,
            event_type: 15.0,
            time_fit: 15.0,
            popularity: 10.0,
            diversity: 10.0,
            location: 10.0,
            no_conflict: 10.0,
        }
    }
}

impl ScoringWeights {
    pub fn total(&self) -> f64 {
        self.study_program
            + self.event_type
            + self.time_fit
            + self.popularity
            + self.diversity
            + self.location
            + self.no_conflict
    }

    fn validate(&self) -> Result<()> {
        let all = [
            self.study_program,
            self.event_type,
            self.time_fit,
            self.popularity,
            self.diversity,
            self.location,
            self.no_conflict,
        ];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(PlannerError::Config(
                "scoring weights must be finite and non-negative".into(),
            ));
        }
        if self.total() <= 0.0 {
            return Err(PlannerError::Config("scoring weights must not all be zero".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecommendOptions {
    pub default_limit: usize,
    /// Percentile (0..1) of popularity scores above which an event is high demand.
    pub high_demand_percentile: f64,
    /// Used when the context carries no travel tolerance.
    pub default_max_travel_minutes: u32,
}

impl Default for RecommendOptions {
    fn default() -> Self {
        Self {
            default_limit: 20,
            high_demand_percentile: 0.8,
            default_max_travel_minutes: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptimizerOptions {
    /// Operating hours of the event day, local to `utc_offset_minutes`.
    pub day_start: NaiveTime,
    pub day_end: NaiveTime,
    pub utc_offset_minutes: i32,
    pub conflict_penalty: f64,
    pub gap_penalty: f64,
    /// Idle gaps longer than this are penalised.
    pub long_gap_minutes: i64,
    pub max_diversity_penalty: f64,
    /// Gaps at least this long get a fill suggestion.
    pub min_fill_gap_minutes: i64,
    /// Relative saving required before suggesting a reorder.
    pub travel_improvement_threshold: f64,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        Self {
            day_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            day_end: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
            utc_offset_minutes: 0,
            conflict_penalty: 15.0,
            gap_penalty: 5.0,
            long_gap_minutes: 60,
            max_diversity_penalty: 20.0,
            min_fill_gap_minutes: 30,
            travel_improvement_threshold: 0.10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BatchOptions {
    pub default_priority: u32,
    pub max_batch_size: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            default_priority: 1,
            max_batch_size: 50,
        }
    }
}

/// Endpoint settings for the HTTP event catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CatalogConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Top-level configuration for [`crate::engine::Planner`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub travel: TravelTimeSettings,
    pub weights: ScoringWeights,
    pub recommend: RecommendOptions,
    pub optimizer: OptimizerOptions,
    pub batch: BatchOptions,
    pub catalog: CatalogConfig,
}

impl EngineConfig {
    /// Parses and validates a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        if !(0.0..=1.0).contains(&self.recommend.high_demand_percentile) {
            return Err(PlannerError::Config("highDemandPercentile must be within 0..1".into()));
        }
        let offset = self.optimizer.utc_offset_minutes;
        if !(-MAX_UTC_OFFSET_MINUTES..=MAX_UTC_OFFSET_MINUTES).contains(&offset) {
            return Err(PlannerError::Config(format!(
                "utcOffsetMinutes must be within ±{MAX_UTC_OFFSET_MINUTES}"
            )));
        }
        if self.optimizer.day_end <= self.optimizer.day_start {
            return Err(PlannerError::Config("dayEnd must be after dayStart".into()));
        }
        if self.batch.default_priority == 0 {
            return Err(PlannerError::Config("defaultPriority must be at least 1".into()));
        }
        if self.batch.max_batch_size == 0 {
            return Err(PlannerError::Config("maxBatchSize must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_travel_settings() {
        let settings = TravelTimeSettings::default();
        assert_eq!(settings.walking_speed, WalkingSpeed::Normal);
        assert_eq!(settings.buffer_seconds(), 300.0);
        assert_eq!(settings.min_warning_seconds(), 180.0);
    }

    #[test]
    fn test_default_weights_sum_to_hundred() {
        assert_eq!(ScoringWeights::default().total(), 100.0);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{"travel": {"walkingSpeed": "slow"}, "weights": {"studyProgram": 40}}"#,
        )
        .unwrap();
        assert_eq!(config.travel.walking_speed, WalkingSpeed::Slow);
        assert_eq!(config.travel.buffer_minutes, 5);
        assert_eq!(config.weights.study_program, 40.0);
        assert_eq!(config.weights.event_type, 15.0);
        assert_eq!(config.optimizer.day_start, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
    }

    #[test]
    fn test_rejects_negative_weights() {
        let err = EngineConfig::from_json_str(r#"{"weights": {"popularity": -1}}"#).unwrap_err();
        assert!(matches!(err, PlannerError::Config(_)));
    }

    #[test]
    fn test_rejects_out_of_range_utc_offset() {
        let err = EngineConfig::from_json_str(r#"{"optimizer": {"utcOffsetMinutes": 100000000}}"#)
            .unwrap_err();
        assert!(matches!(err, PlannerError::Config(_)));
        let err = EngineConfig::from_json_str(r#"{"optimizer": {"utcOffsetMinutes": -1440}}"#)
            .unwrap_err();
        assert!(matches!(err, PlannerError::Config(_)));
        let config = EngineConfig::from_json_str(r#"{"optimizer": {"utcOffsetMinutes": -600}}"#);
        assert!(config.is_ok());
    }

    #[test]
    fn test_rejects_inverted_operating_hours() {
        let json = r#"{"optimizer": {"dayStart": "18:00:00", "dayEnd": "08:00:00"}}"#;
        let err = EngineConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err, PlannerError::Config(_)));
    }
}
