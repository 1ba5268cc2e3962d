//! Utility helpers shared by the rotation pipeline.
//!
//! This module contains:
//! - Time helpers
//! - Progress label formatting
//!
//! IMPORTANT:
//! - No catalog-specific logic should live here.
//! - This module must remain lightweight and deterministic
//!   (apart from reading the clock).
//!

use chrono::{SecondsFormat, Utc};

/// Current wall-clock time as an RFC 3339 string, logged at run start.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Human readable 1-based range of a chunk within a bulk operation.
///
/// Examples:
/// - (0, 100, 237)   -> "1-100 of 237"
/// - (200, 37, 237)  -> "201-237 of 237"
///
pub fn batch_range(start: usize, len: usize, total: usize) -> String {
    format!("{}-{} of {}", start + 1, start + len, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_range_is_one_based_and_inclusive() {
        assert_eq!(batch_range(0, 100, 237), "1-100 of 237");
        assert_eq!(batch_range(200, 37, 237), "201-237 of 237");
    }

    #[test]
    fn timestamp_is_utc() {
        assert!(now_rfc3339().ends_with('Z'));
    }
}
