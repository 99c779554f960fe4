//! Relative date tokens offered by date inputs
//!
//! Tokens are stored verbatim as condition values (`"30_days_ago"`); they are
//! only turned into instants when something evaluates the filter.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
pub enum RelativeDate {
    #[strum(serialize = "now")]
    #[serde(rename = "now")]
    Now,
    #[strum(serialize = "today")]
    #[serde(rename = "today")]
    Today,
    #[strum(serialize = "yesterday")]
    #[serde(rename = "yesterday")]
    Yesterday,
    #[strum(serialize = "tomorrow")]
    #[serde(rename = "tomorrow")]
    Tomorrow,
    #[strum(serialize = "7_days_ago")]
    #[serde(rename = "7_days_ago")]
    SevenDaysAgo,
    #[strum(serialize = "14_days_ago")]
    #[serde(rename = "14_days_ago")]
    FourteenDaysAgo,
    #[strum(serialize = "30_days_ago")]
    #[serde(rename = "30_days_ago")]
    ThirtyDaysAgo,
    #[strum(serialize = "90_days_ago")]
    #[serde(rename = "90_days_ago")]
    NinetyDaysAgo,
    #[strum(serialize = "start_of_week")]
    #[serde(rename = "start_of_week")]
    StartOfWeek,
    #[strum(serialize = "end_of_week")]
    #[serde(rename = "end_of_week")]
    EndOfWeek,
    #[strum(serialize = "start_of_month")]
    #[serde(rename = "start_of_month")]
    StartOfMonth,
    #[strum(serialize = "end_of_month")]
    #[serde(rename = "end_of_month")]
    EndOfMonth,
    #[strum(serialize = "start_of_year")]
    #[serde(rename = "start_of_year")]
    StartOfYear,
    #[strum(serialize = "end_of_year")]
    #[serde(rename = "end_of_year")]
    EndOfYear,
}

impl RelativeDate {
    pub fn label(&self) -> &'static str {
        match self {
            RelativeDate::Now => "Now",
            RelativeDate::Today => "Today",
            RelativeDate::Yesterday => "Yesterday",
            RelativeDate::Tomorrow => "Tomorrow",
            RelativeDate::SevenDaysAgo => "7 days ago",
            RelativeDate::FourteenDaysAgo => "14 days ago",
            RelativeDate::ThirtyDaysAgo => "30 days ago",
            RelativeDate::NinetyDaysAgo => "90 days ago",
            RelativeDate::StartOfWeek => "Start of week",
            RelativeDate::EndOfWeek => "End of week",
            RelativeDate::StartOfMonth => "Start of month",
            RelativeDate::EndOfMonth => "End of month",
            RelativeDate::StartOfYear => "Start of year",
            RelativeDate::EndOfYear => "End of year",
        }
    }

    /// Catalogue in display order
    pub fn all() -> Vec<RelativeDate> {
        RelativeDate::iter().collect()
    }

    pub fn parse_token(token: &str) -> Option<RelativeDate> {
        token.trim().parse().ok()
    }

    /// Instant the token denotes relative to `now`
    ///
    /// Day tokens resolve to midnight; `end_of_*` tokens resolve to the last
    /// second of their period. Weeks start on Monday.
    pub fn resolve(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date();
        match self {
            RelativeDate::Now => now,
            RelativeDate::Today => start_of_day(today),
            RelativeDate::Yesterday => start_of_day(days_back(today, 1)),
            RelativeDate::Tomorrow => start_of_day(today.checked_add_days(Days::new(1)).unwrap_or(today)),
            RelativeDate::SevenDaysAgo => start_of_day(days_back(today, 7)),
            RelativeDate::FourteenDaysAgo => start_of_day(days_back(today, 14)),
            RelativeDate::ThirtyDaysAgo => start_of_day(days_back(today, 30)),
            RelativeDate::NinetyDaysAgo => start_of_day(days_back(today, 90)),
            RelativeDate::StartOfWeek => start_of_day(week_start(today)),
            RelativeDate::EndOfWeek => {
                end_of_day(week_start(today).checked_add_days(Days::new(6)).unwrap_or(today))
            }
            RelativeDate::StartOfMonth => start_of_day(month_start(today)),
            RelativeDate::EndOfMonth => end_of_day(period_end(month_start(today), 1)),
            RelativeDate::StartOfYear => start_of_day(year_start(today)),
            RelativeDate::EndOfYear => end_of_day(period_end(year_start(today), 12)),
        }
    }
}

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(23, 59, 59).unwrap_or_else(|| start_of_day(date))
}

fn days_back(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days)).unwrap_or(date)
}

fn week_start(date: NaiveDate) -> NaiveDate {
    days_back(date, u64::from(date.weekday().num_days_from_monday()))
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn year_start(date: NaiveDate) -> NaiveDate {
    date.with_ordinal(1).unwrap_or(date)
}

// last day of the period of `months` months starting at `start`
fn period_end(start: NaiveDate, months: u32) -> NaiveDate {
    start
        .checked_add_months(Months::new(months))
        .and_then(|next| next.pred_opt())
        .unwrap_or(start)
}

/// Interpret a date value: a relative token, RFC 3339, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD`
pub fn resolve_date_value(raw: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Some(token) = RelativeDate::parse_token(raw) {
        return Some(token.resolve(now));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(start_of_day)
}
