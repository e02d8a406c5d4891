//! Recency reranking for search hits.
//!
//! Older reports are down-weighted with a step function of their age. The
//! raw similarity is kept so callers can see both numbers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `(max age in seconds, factor)` steps, checked in order. Ages beyond the
/// last step get [`STALE_FACTOR`].
pub const DECAY_STEPS: [(i64, f64); 3] = [(3_600, 1.0), (21_600, 0.8), (86_400, 0.5)];

/// Factor applied to reports older than a day.
pub const STALE_FACTOR: f64 = 0.2;

/// Outcome of reranking one hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decay {
    pub decay_factor: f64,
    /// `raw_score * decay_factor`.
    pub final_score: f64,
    pub age_seconds: i64,
}

/// Step factor for an age in seconds.
pub fn decay_factor(age_seconds: i64) -> f64 {
    DECAY_STEPS
        .iter()
        .find(|(max_age, _)| age_seconds <= *max_age)
        .map_or(STALE_FACTOR, |(_, factor)| *factor)
}

/// Rerank `raw_score` against the current wall clock.
pub fn decay(raw_score: f64, timestamp_unix: Option<i64>) -> Decay {
    decay_at(raw_score, timestamp_unix, Utc::now())
}

/// Rerank `raw_score` as of `now`. A missing timestamp counts as fresh, and
/// timestamps in the future are treated as age 0.
pub fn decay_at(raw_score: f64, timestamp_unix: Option<i64>, now: DateTime<Utc>) -> Decay {
    let Some(ts) = timestamp_unix else {
        return Decay {
            decay_factor: 1.0,
            final_score: raw_score,
            age_seconds: 0,
        };
    };

    let age_seconds = (now.timestamp() - ts).max(0);
    let decay_factor = decay_factor(age_seconds);
    Decay {
        decay_factor,
        final_score: raw_score * decay_factor,
        age_seconds,
    }
}
