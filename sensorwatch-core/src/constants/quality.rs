//! Quality Scoring Parameters
//!
//! The Enrichment Stage scores every reading starting from
//! `QUALITY_SCORE_START` and subtracting penalties. The score is floored at
//! `QUALITY_SCORE_FLOOR` and then discretized into a label.

// ===== SCORE =====

/// Score every reading starts from
pub const QUALITY_SCORE_START: f64 = 1.0;

/// Lowest possible score
pub const QUALITY_SCORE_FLOOR: f64 = 0.0;

/// Penalty when the received value was NaN or infinite
pub const PENALTY_NON_FINITE: f64 = 0.5;

/// Penalty when the value is outside the expected operating range
pub const PENALTY_UNEXPECTED_RANGE: f64 = 0.2;

/// Penalty when the reading is older than `STALE_AFTER_MINUTES`
pub const PENALTY_STALE: f64 = 0.1;

/// Additional penalty when the reading is older than `VERY_STALE_AFTER_MINUTES`
pub const PENALTY_VERY_STALE: f64 = 0.2;

// ===== AGE =====

/// Age after which a reading counts as stale (minutes)
pub const STALE_AFTER_MINUTES: i64 = 10;

/// Age after which a reading counts as very stale (minutes)
pub const VERY_STALE_AFTER_MINUTES: i64 = 60;

/// Readings younger than this are fresh (minutes)
pub const FRESH_WITHIN_MINUTES: i64 = 5;

// ===== LABELS =====

/// Lowest score labelled Excellent
pub const LABEL_EXCELLENT: f64 = 0.9;

/// Lowest score labelled Good
pub const LABEL_GOOD: f64 = 0.7;

/// Lowest score labelled Fair
pub const LABEL_FAIR: f64 = 0.5;

/// Lowest score labelled Poor; anything below is Critical
pub const LABEL_POOR: f64 = 0.3;
