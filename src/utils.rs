//! Utility functions for the matchmaking engine

use chrono::{DateTime, Utc};

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Check a player/party id for a sane shape: non-empty, at most 64 chars,
/// limited to alphanumerics plus `_` and `-`
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Rounded integer mean of a set of elo values, 0 for an empty set
pub fn rounded_mean(values: &[i32]) -> i32 {
    if values.is_empty() {
        return 0;
    }
    let total: i64 = values.iter().map(|&v| v as i64).sum();
    let count = values.len() as i64;
    // Round half away from zero, matching Math.round on non-negative elo
    ((total as f64) / (count as f64)).round() as i32
}
