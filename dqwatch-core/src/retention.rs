//! Day-based retention windows.

use chrono::{DateTime, TimeDelta, Utc};

/// Start of the trailing window of `days` that ends at `now`.
///
/// Saturates at the earliest representable instant, so a window longer
/// than the calendar covers everything.
pub fn window_start(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    TimeDelta::try_days(i64::from(days))
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
