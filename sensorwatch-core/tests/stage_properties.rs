//! Property tests for the per-reading stages
//!
//! Cleaning must keep every value of a known type inside its clamp range,
//! leave unknown types alone, and be stable when applied twice. Cleaning
//! followed by enrichment may only change the value and the metadata.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use sensorwatch_core::cleaning::clean_value;
use sensorwatch_core::constants::clamp_range;
use sensorwatch_core::time::FixedClock;
use sensorwatch_core::{CleaningStage, EnrichmentStage, Reading};

fn known_type() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("temperature"),
        Just("humidity"),
        Just("pressure"),
        Just("ph"),
        Just("voltage"),
        Just("current"),
    ]
}

fn any_value() -> impl Strategy<Value = f64> {
    prop_oneof![
        8 => -1.0e6f64..1.0e6,
        1 => Just(f64::NAN),
        1 => Just(f64::INFINITY),
        1 => Just(f64::NEG_INFINITY),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn cleaned_value_lies_in_clamp_range(sensor_type in known_type(), value in any_value()) {
        let range = clamp_range(sensor_type).unwrap();
        let cleaned = clean_value(sensor_type, value);
        prop_assert!(cleaned.value.is_finite());
        prop_assert!(range.contains(cleaned.value), "{} -> {}", value, cleaned.value);
    }

    #[test]
    fn unknown_types_keep_their_value(sensor_type in "[a-z]{3,8}_x", value in -1.0e9f64..1.0e9) {
        let cleaned = clean_value(&sensor_type, value);
        prop_assert_eq!(cleaned.value, value);
        prop_assert!(!cleaned.clamped);
    }

    #[test]
    fn cleaning_is_idempotent(sensor_type in known_type(), value in any_value()) {
        let once = clean_value(sensor_type, value).value;
        let twice = clean_value(sensor_type, once);
        prop_assert_eq!(once, twice.value);
        prop_assert!(!twice.clamped);
    }

    #[test]
    fn stages_preserve_identity_fields(
        sensor_type in known_type(),
        value in any_value(),
        age_minutes in 0i64..600,
    ) {
        let now = Utc.with_ymd_and_hms(2024, 9, 2, 8, 0, 0).unwrap();
        let original = Reading::builder("device-042", sensor_type)
            .raw_value(value)
            .timestamp(now - Duration::minutes(age_minutes))
            .build();

        let cleaned = CleaningStage::new().clean(original.clone());
        let enriched = EnrichmentStage::with_clock(FixedClock::new(now)).enrich(cleaned.clone());

        prop_assert_eq!(&enriched.device_id, &original.device_id);
        prop_assert_eq!(&enriched.sensor_type, &original.sensor_type);
        prop_assert_eq!(enriched.timestamp, original.timestamp);
        prop_assert_eq!(&enriched.unit, &original.unit);
        prop_assert_eq!(enriched.quality, original.quality);
        prop_assert_eq!(enriched.location, original.location);
        prop_assert_eq!(enriched.value, cleaned.value);

        let score = enriched.metric("quality_score").unwrap();
        prop_assert!((0.0..=1.0).contains(&score));
    }
}
