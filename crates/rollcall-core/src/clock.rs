//! Organization clock: fixed UTC+8 with the display formats the
//! attendance records use.

use chrono::{DateTime, FixedOffset, NaiveTime, Utc};

const UTC_OFFSET_HOURS: i32 = 8;

/// The organization runs on a fixed UTC+8 offset (no DST).
pub fn org_offset() -> FixedOffset {
    FixedOffset::east_opt(UTC_OFFSET_HOURS * 3600).expect("UTC+8 is a valid offset")
}

/// Current wall-clock time at the organization.
pub fn org_now() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&org_offset())
}

/// Check-ins at or before this local time count as on time.
pub fn on_time_cutoff() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 30, 0).expect("12:30 is a valid time")
}

/// "On Time" / "Late" for a check-in instant. The cutoff is inclusive.
pub fn time_status(now: DateTime<FixedOffset>) -> &'static str {
    if now.time() <= on_time_cutoff() {
        "On Time"
    } else {
        "Late"
    }
}

/// 12-hour clock in lowercase, e.g. "03:38 pm" — the checkIn/checkOut form.
pub fn clock_12h_lower(now: DateTime<FixedOffset>) -> String {
    now.format("%I:%M %p").to_string().to_lowercase()
}

/// 12-hour clock, e.g. "03:38 PM" — the record's display `time` field.
pub fn clock_12h(now: DateTime<FixedOffset>) -> String {
    now.format("%I:%M %p").to_string()
}

/// Calendar day in the day-key form, e.g. "2025-11-24".
pub fn date_iso(now: DateTime<FixedOffset>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// Calendar day in the record's display form, e.g. "24/11/2025".
pub fn date_display(now: DateTime<FixedOffset>) -> String {
    now.format("%d/%m/%Y").to_string()
}

/// Full instant in the response's display form, e.g. "2025-11-24 15:38:02".
pub fn datetime_display(now: DateTime<FixedOffset>) -> String {
    now.format("%Y-%m-%d %H:%M:%S").to_string()
}
