//! Debounce window arithmetic.
//!
//! Three window shapes:
//! - calendar day: from local midnight of the event's date up to the event
//! - rolling period: a fixed duration ending at the event
//! - eternity: no period configured, approximated by [`eternity()`]

use chrono::{DateTime, Duration, FixedOffset, NaiveTime};

use crate::types::NotificationRule;

/// Days in the "ever" lookback. Storage queries take a bounded duration,
/// so an unbounded debounce counts over 100 years.
pub const ETERNITY_DAYS: i64 = 36_500;

/// Lookback used when a rule has a limit but no period.
pub fn eternity() -> Duration {
    Duration::days(ETERNITY_DAYS)
}

/// Compute how far back to count past notifications for `rule` at `now`.
///
/// Calendar-day rules reset at local midnight: at `00:00:01` the window is
/// one second long, at `23:59:59` it is just under a day.
pub fn lookback(rule: &NotificationRule, now: DateTime<FixedOffset>) -> Duration {
    if rule.debounce_calendar_day {
        let local = now.naive_local();
        let midnight = local.date().and_time(NaiveTime::MIN);
        return local - midnight;
    }

    rule.debounce_period.unwrap_or_else(eternity)
}

/// Reason to suppress a match, if the historical `count` reached the limit.
///
/// Rules without a limit are never suppressed.
pub fn suppression_reason(rule: &NotificationRule, count: u64) -> Option<String> {
    let limit = rule.debounce_limit?;
    if count >= u64::from(limit) {
        Some(format!(
            "Notification {} has occured {} times which is GTE than {}",
            rule.notification_type, count, limit
        ))
    } else {
        None
    }
}
