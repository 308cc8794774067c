//! Accounting-day boundaries.
//!
//! An accounting day runs from one cutoff (a fixed local time of day, 01:00
//! by default) to the next, so a late snack eaten before the cutoff still
//! counts toward the day the user was living in.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone};

pub const DEFAULT_CUTOFF_HOUR: u32 = 1;

// Outgoing totals land on the date where most of the accounting day
// [cutoff - 1 day, cutoff) was spent.
const ATTRIBUTION_LEAD_SECS: i64 = 12 * 60 * 60 + 1;

pub fn default_cutoff() -> NaiveTime {
    NaiveTime::from_hms_opt(DEFAULT_CUTOFF_HOUR, 0, 0).unwrap_or(NaiveTime::MIN)
}

pub fn parse_cutoff(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

/// Resolves a local wall-clock time on `date` to an instant. Times skipped
/// by a DST jump resolve to the first valid moment after the gap.
pub fn local_instant<Tz: TimeZone>(tz: &Tz, date: NaiveDate, time: NaiveTime) -> DateTime<Tz> {
    let naive = date.and_time(time);
    if let Some(instant) = tz.from_local_datetime(&naive).earliest() {
        return instant;
    }

    let shifted = naive + Duration::hours(1);
    tz.from_local_datetime(&shifted)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}

/// Latest cutoff at or before `now`.
pub fn most_recent_cutoff<Tz: TimeZone>(now: &DateTime<Tz>, cutoff: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let today = now.date_naive();
    let candidate = local_instant(&tz, today, cutoff);
    if *now < candidate {
        local_instant(&tz, today - Duration::days(1), cutoff)
    } else {
        candidate
    }
}

/// Soonest cutoff strictly after `now`.
pub fn next_cutoff<Tz: TimeZone>(now: &DateTime<Tz>, cutoff: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let today = now.date_naive();
    let candidate = local_instant(&tz, today, cutoff);
    if *now >= candidate {
        local_instant(&tz, today + Duration::days(1), cutoff)
    } else {
        candidate
    }
}

/// Calendar date credited with the accounting day that ends at `cutoff_instant`.
pub fn accounting_date<Tz: TimeZone>(cutoff_instant: &DateTime<Tz>) -> NaiveDate {
    (cutoff_instant.clone() - Duration::seconds(ATTRIBUTION_LEAD_SECS)).date_naive()
}

/// Calendar date the live (not yet folded) accounting day will be archived under.
pub fn current_accounting_date<Tz: TimeZone>(now: &DateTime<Tz>, cutoff: NaiveTime) -> NaiveDate {
    accounting_date(&next_cutoff(now, cutoff))
}

pub fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    local_instant(&now.timezone(), now.date_naive(), NaiveTime::MIN)
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 3, day, hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn most_recent_cutoff_uses_yesterday_before_cutoff_time() {
        let cutoff = default_cutoff();
        assert_eq!(most_recent_cutoff(&at(10, 0, 50), cutoff), at(9, 1, 0));
        assert_eq!(most_recent_cutoff(&at(10, 1, 0), cutoff), at(10, 1, 0));
        assert_eq!(most_recent_cutoff(&at(10, 23, 59), cutoff), at(10, 1, 0));
    }

    #[test]
    fn next_cutoff_is_strictly_after_now() {
        let cutoff = default_cutoff();
        assert_eq!(next_cutoff(&at(10, 0, 50), cutoff), at(10, 1, 0));
        assert_eq!(next_cutoff(&at(10, 1, 0), cutoff), at(11, 1, 0));
        assert_eq!(next_cutoff(&at(10, 18, 0), cutoff), at(11, 1, 0));
    }

    #[test]
    fn month_boundary_rolls_back_to_previous_month() {
        let now = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2026, 4, 1, 0, 30, 0)
            .unwrap();
        let cutoff = most_recent_cutoff(&now, default_cutoff());
        assert_eq!(date_key(cutoff.date_naive()), "2026-03-31");
    }

    #[test]
    fn fold_at_cutoff_is_credited_to_previous_day() {
        assert_eq!(date_key(accounting_date(&at(10, 1, 0))), "2026-03-09");
    }

    #[test]
    fn midnight_cutoff_credits_the_day_that_just_ended() {
        let midnight = NaiveTime::MIN;
        let cutoff = most_recent_cutoff(&at(10, 9, 0), midnight);
        assert_eq!(cutoff, at(10, 0, 0));
        assert_eq!(date_key(accounting_date(&cutoff)), "2026-03-09");
    }

    #[test]
    fn late_snack_belongs_to_previous_accounting_day() {
        let cutoff = default_cutoff();
        assert_eq!(date_key(current_accounting_date(&at(10, 0, 50), cutoff)), "2026-03-09");
        assert_eq!(date_key(current_accounting_date(&at(10, 1, 5), cutoff)), "2026-03-10");
    }

    #[test]
    fn parses_cutoff_strings() {
        assert_eq!(parse_cutoff("01:00"), Some(default_cutoff()));
        assert_eq!(parse_cutoff(" 23:30 "), NaiveTime::from_hms_opt(23, 30, 0));
        assert_eq!(parse_cutoff("25:00"), None);
        assert_eq!(parse_cutoff("soon"), None);
    }
}
