//! Time utilities: calendar window boundaries and countdown formatting.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, TimeZone, Utc};

/// Half-open `[start, end)` interval in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    #[must_use]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }
}

/// Calendar windows around a wall-clock instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarWindows {
    pub today: Window,
    pub week: Window,
    pub month: Window,
}

impl CalendarWindows {
    /// Compute local day, ISO week (Monday start) and calendar month around `now`.
    #[must_use]
    pub fn around<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let date = now.date_naive();

        let day_start = date;
        let day_end = date + Days::new(1);

        let week_start =
            date - Days::new(u64::from(date.weekday().num_days_from_monday()));
        let week_end = week_start + Days::new(7);

        let month_start = date.with_day(1).unwrap_or(date);
        let month_end = month_start + Months::new(1);

        Self {
            today: window(&tz, day_start, day_end),
            week: window(&tz, week_start, week_end),
            month: window(&tz, month_start, month_end),
        }
    }

    /// Earliest instant any window covers; log scans start here.
    #[must_use]
    pub fn earliest_start(&self) -> DateTime<Utc> {
        self.week.start.min(self.month.start)
    }
}

fn window<Tz: TimeZone>(tz: &Tz, start: NaiveDate, end: NaiveDate) -> Window {
    Window {
        start: local_midnight(tz, start),
        end: local_midnight(tz, end),
    }
}

/// Midnight of `date` in `tz`, as UTC.
///
/// On DST gaps midnight may not exist; the earliest valid instant of the day
/// is used instead.
fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let mut naive = date.and_time(chrono::NaiveTime::MIN);
    for _ in 0..4 {
        if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
            return dt.with_timezone(&Utc);
        }
        naive += chrono::Duration::minutes(30);
    }
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

/// Parse an ISO-8601 timestamp with optional fractional seconds.
#[must_use]
pub fn parse_iso8601(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Compact countdown (`now`, `45m`, `3h 12m`, `2d 4h`).
#[must_use]
pub fn format_time_left(target: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = target.signed_duration_since(now).num_seconds();
    if secs <= 0 {
        return "now".to_string();
    }

    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let mins = (secs % 3_600) / 60;

    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {mins}m")
    } else {
        format!("{mins}m")
    }
}

/// Format a relative time (past or future).
#[must_use]
pub fn format_relative_time(target: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let duration = now.signed_duration_since(target);

    if duration.num_seconds().abs() < 60 {
        return "just now".to_string();
    }

    let minutes = duration.num_minutes().abs();
    let hours = duration.num_hours().abs();
    let days = duration.num_days().abs();

    let suffix = if duration.num_seconds() > 0 {
        "ago"
    } else {
        "from now"
    };

    if days > 0 {
        format!("{days} day{} {suffix}", if days == 1 { "" } else { "s" })
    } else if hours > 0 {
        format!("{hours} hour{} {suffix}", if hours == 1 { "" } else { "s" })
    } else {
        format!(
            "{minutes} minute{} {suffix}",
            if minutes == 1 { "" } else { "s" }
        )
    }
}
