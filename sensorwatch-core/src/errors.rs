//! Error Types for Reading Validation and Configuration
//!
//! ## Error Categories
//!
//! ### Reading Validation
//! - `MissingField`: a reading arrived without an identity field the pipeline
//!   keys on (device id, sensor type). The reading is dropped and logged; the
//!   stream continues with the next item.
//!
//! ### Configuration
//! - `UnknownKey`: a key/value pair named a setting that does not exist
//! - `InvalidValue`: a setting could not be parsed or failed a bound check
//!
//! Anything that can go wrong *numerically* (non-finite values, missing
//! history) is not an error here: cleaning repairs values, and detection
//! reports "could not evaluate" as a result status rather than a failure.

use thiserror::Error;

/// Result type for reading validation
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Reading rejected before processing
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// A required identity field was empty
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

/// Configuration rejected while parsing or validating
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Key is not a known setting
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Value could not be used for the key
    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        /// Setting that was rejected
        key: String,
        /// Raw value as supplied
        value: String,
        /// Why the value was rejected
        reason: &'static str,
    },
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, value: impl ToString, reason: &'static str) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason,
        }
    }
}
