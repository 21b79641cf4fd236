use chrono::{DateTime, NaiveDate, Utc};

/// How close a deadline is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Normal,
    /// Due within 24 hours.
    Warning,
    /// Due within the hour, or already past due.
    Urgent,
}

/// Classify a deadline's urgency relative to `now`.
pub fn classify_deadline(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Urgency {
    let remaining = deadline - now;
    if remaining <= chrono::Duration::hours(1) {
        Urgency::Urgent
    } else if remaining <= chrono::Duration::hours(24) {
        Urgency::Warning
    } else {
        Urgency::Normal
    }
}

/// Whether a completed item has aged past the retention window.
/// Compares full elapsed days, not fractions.
pub fn archive_eligible(completed_at: DateTime<Utc>, now: DateTime<Utc>, archive_days: u32) -> bool {
    (now - completed_at).num_days() >= i64::from(archive_days)
}

/// Parse a user-supplied deadline: RFC 3339, or a bare date meaning the
/// end of that day (UTC).
pub fn parse_deadline(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d").ok()?;
    Some(DateTime::from_naive_utc_and_offset(
        date.and_hms_opt(23, 59, 59)?,
        Utc,
    ))
}
