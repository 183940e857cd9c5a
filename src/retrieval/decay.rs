//! Recency decay.
//!
//! ```text
//! score = exp(-rate * age_days) * distance
//! ```
//!
//! Negative ages (dates in the future) count as zero, so the factor stays
//! in `(0, 1]` for any non-negative rate.

/// `exp(-rate * age_days)` with negative ages clamped to zero.
pub fn decay_factor(age_days: f64, rate: f64) -> f64 {
    (-rate * age_days.max(0.0)).exp()
}
