//! Enrichment Stage: derived metrics, temporal context and quality scoring
//!
//! ## Annotations Added
//!
//! | Key | When | Meaning |
//! |-----|------|---------|
//! | `value_fahrenheit`, `value_kelvin` | unit is Celsius | converted temperature |
//! | `value_psi`, `value_inhg` | unit is hPa | converted pressure |
//! | `hour_of_day`, `day_of_week`, `is_weekend` | always | UTC calendar context of the timestamp |
//! | `age_seconds`, `is_fresh` | always | age at enrichment time, fresh if under 5 minutes |
//! | `quality_score`, `quality_label` | always | see below |
//!
//! ## Quality Score
//!
//! ```text
//! score = 1.0
//!       - 0.5  if the received value was non-finite
//!       - 0.2  if the value is outside the expected operating range
//!       - 0.1  if older than 10 minutes
//!       - 0.2  more if older than 60 minutes
//! score = max(score, 0.0)
//! ```
//!
//! Labels: Excellent ≥ 0.9, Good ≥ 0.7, Fair ≥ 0.5, Poor ≥ 0.3, else Critical.
//!
//! The stage never fails and never touches identity fields, the value, or
//! the timestamp.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::constants::quality::*;
use crate::constants::ranges::{
    expected_range, is_celsius, is_hectopascal, round_to, DEFAULT_PRECISION, INHG_PER_HPA,
    KELVIN_OFFSET, PSI_PER_HPA,
};
use crate::reading::{meta, Reading};
use crate::time::{Clock, SystemClock};

/// Discretized quality score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityLabel {
    /// Score ≥ 0.9
    Excellent,
    /// Score ≥ 0.7
    Good,
    /// Score ≥ 0.5
    Fair,
    /// Score ≥ 0.3
    Poor,
    /// Anything lower
    Critical,
}

impl QualityLabel {
    /// Label for a score in [0, 1]
    pub fn from_score(score: f64) -> Self {
        if score >= LABEL_EXCELLENT {
            Self::Excellent
        } else if score >= LABEL_GOOD {
            Self::Good
        } else if score >= LABEL_FAIR {
            Self::Fair
        } else if score >= LABEL_POOR {
            Self::Poor
        } else {
            Self::Critical
        }
    }

    /// Lower-case name stored in metadata
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
            Self::Critical => "critical",
        }
    }
}

/// Quality score of a (cleaned) reading at time `now`
pub fn quality_score(reading: &Reading, now: DateTime<Utc>) -> f64 {
    let mut score = QUALITY_SCORE_START;

    if reading.flag(meta::NON_FINITE) {
        score -= PENALTY_NON_FINITE;
    }

    if let Some(expected) = expected_range(&reading.sensor_type) {
        if !expected.contains(reading.value) {
            score -= PENALTY_UNEXPECTED_RANGE;
        }
    }

    let age = reading.age_at(now);
    if age > Duration::minutes(STALE_AFTER_MINUTES) {
        score -= PENALTY_STALE;
    }
    if age > Duration::minutes(VERY_STALE_AFTER_MINUTES) {
        score -= PENALTY_VERY_STALE;
    }

    // Two decimals keeps label cut-offs exact after repeated subtraction
    round_to(score.max(QUALITY_SCORE_FLOOR), 2)
}

/// Stage adding derived metrics, temporal context and quality
pub struct EnrichmentStage<C: Clock = SystemClock> {
    clock: C,
}

impl EnrichmentStage<SystemClock> {
    /// Create a stage using the system clock
    pub fn new() -> Self {
        Self { clock: SystemClock }
    }
}

impl Default for EnrichmentStage<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> EnrichmentStage<C> {
    /// Create a stage reading "now" from `clock`
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    /// Enrich a reading
    pub fn enrich(&self, mut reading: Reading) -> Reading {
        let now = self.clock.now();

        add_unit_conversions(&mut reading);
        add_temporal_context(&mut reading);

        let age = reading.age_at(now);
        reading.annotate(meta::AGE_SECONDS, age.num_seconds());
        reading.annotate(meta::IS_FRESH, age < Duration::minutes(FRESH_WITHIN_MINUTES));

        let score = quality_score(&reading, now);
        let label = QualityLabel::from_score(score);
        reading.annotate(meta::QUALITY_SCORE, score);
        reading.annotate(meta::QUALITY_LABEL, label.as_str());

        log::trace!(
            "enrichment: {}/{} quality {} ({})",
            reading.device_id,
            reading.sensor_type,
            score,
            label.as_str()
        );

        reading
    }
}

fn add_unit_conversions(reading: &mut Reading) {
    let value = reading.value;
    if !value.is_finite() {
        return;
    }

    if reading.sensor_type == "temperature" && is_celsius(&reading.unit) {
        reading.annotate(meta::FAHRENHEIT, round_to(value * 9.0 / 5.0 + 32.0, DEFAULT_PRECISION));
        reading.annotate(meta::KELVIN, round_to(value + KELVIN_OFFSET, DEFAULT_PRECISION));
    } else if reading.sensor_type == "pressure" && is_hectopascal(&reading.unit) {
        reading.annotate(meta::PSI, round_to(value * PSI_PER_HPA, DEFAULT_PRECISION));
        reading.annotate(meta::INHG, round_to(value * INHG_PER_HPA, DEFAULT_PRECISION));
    }
}

fn add_temporal_context(reading: &mut Reading) {
    let timestamp = reading.timestamp;
    let weekday = timestamp.weekday();

    reading.annotate(meta::HOUR_OF_DAY, timestamp.hour());
    reading.annotate(meta::DAY_OF_WEEK, weekday_name(weekday));
    reading.annotate(meta::IS_WEEKEND, matches!(weekday, Weekday::Sat | Weekday::Sun));
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::FixedClock;
    use chrono::TimeZone;
    use serde_json::json;

    // Saturday
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 14, 30, 0).unwrap()
    }

    fn stage() -> EnrichmentStage<FixedClock> {
        EnrichmentStage::with_clock(FixedClock::new(now()))
    }

    fn reading(sensor_type: &str, value: f64, unit: &str, age: Duration) -> Reading {
        Reading::builder("dev-1", sensor_type)
            .value(value, unit)
            .timestamp(now() - age)
            .build()
    }

    #[test]
    fn temperature_conversions() {
        let enriched = stage().enrich(reading("temperature", 25.0, "°C", Duration::zero()));
        assert_eq!(enriched.metric(meta::FAHRENHEIT), Some(77.0));
        assert_eq!(enriched.metric(meta::KELVIN), Some(298.15));
        assert!(enriched.metric(meta::PSI).is_none());
    }

    #[test]
    fn pressure_conversions() {
        let enriched = stage().enrich(reading("pressure", 1013.25, "hPa", Duration::zero()));
        assert_eq!(enriched.metric(meta::PSI), Some(14.7));
        assert_eq!(enriched.metric(meta::INHG), Some(29.92));
    }

    #[test]
    fn no_conversion_for_other_units() {
        let enriched = stage().enrich(reading("temperature", 77.0, "°F", Duration::zero()));
        assert!(enriched.metric(meta::FAHRENHEIT).is_none());
    }

    #[test]
    fn temporal_context() {
        let enriched = stage().enrich(reading("humidity", 40.0, "%", Duration::hours(2)));
        assert_eq!(enriched.metadata[meta::HOUR_OF_DAY], json!(12));
        assert_eq!(enriched.metadata[meta::DAY_OF_WEEK], json!("saturday"));
        assert!(enriched.flag(meta::IS_WEEKEND));
    }

    #[test]
    fn fresh_reading_scores_excellent() {
        let enriched = stage().enrich(reading("humidity", 40.0, "%", Duration::minutes(1)));
        assert_eq!(enriched.metric(meta::QUALITY_SCORE), Some(1.0));
        assert_eq!(enriched.metadata[meta::QUALITY_LABEL], json!("excellent"));
        assert!(enriched.flag(meta::IS_FRESH));
    }

    #[test]
    fn penalties_accumulate() {
        // outside expected humidity range, 15 minutes old
        let enriched = stage().enrich(reading("humidity", 95.0, "%", Duration::minutes(15)));
        assert_eq!(enriched.metric(meta::QUALITY_SCORE), Some(0.7));
        assert_eq!(enriched.metadata[meta::QUALITY_LABEL], json!("good"));
        assert!(!enriched.flag(meta::IS_FRESH));

        // non-finite, unexpected, very stale: 1.0 - 0.5 - 0.2 - 0.1 - 0.2
        let mut broken = reading("humidity", 95.0, "%", Duration::hours(3));
        broken.annotate(meta::NON_FINITE, true);
        let enriched = stage().enrich(broken);
        assert_eq!(enriched.metric(meta::QUALITY_SCORE), Some(0.0));
        assert_eq!(enriched.metadata[meta::QUALITY_LABEL], json!("critical"));
    }

    #[test]
    fn labels() {
        assert_eq!(QualityLabel::from_score(0.95), QualityLabel::Excellent);
        assert_eq!(QualityLabel::from_score(0.7), QualityLabel::Good);
        assert_eq!(QualityLabel::from_score(0.5), QualityLabel::Fair);
        assert_eq!(QualityLabel::from_score(0.3), QualityLabel::Poor);
        assert_eq!(QualityLabel::from_score(0.29), QualityLabel::Critical);
    }

    #[test]
    fn identity_fields_untouched() {
        let original = reading("pressure", 990.0, "hPa", Duration::minutes(3));
        let enriched = stage().enrich(original.clone());

        assert_eq!(enriched.device_id, original.device_id);
        assert_eq!(enriched.sensor_type, original.sensor_type);
        assert_eq!(enriched.timestamp, original.timestamp);
        assert_eq!(enriched.value, original.value);
    }
}
