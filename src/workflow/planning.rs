//! Weekly planning completion tracking.
//!
//! The work week is Monday to Friday. A Sunday belongs to the week that
//! starts the next day; a Saturday to the week that just ended.

use chrono::{Datelike, Duration, FixedOffset, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::planning::PlanningEntry;

pub const WORK_WEEK_DAYS: usize = 5;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReminderPolicy {
    None,
    /// Show a dismissible warning.
    SoftWarning,
    /// Send the user to the planning page with a reminder flag set.
    ForcedRedirect,
}

pub fn week_monday(reference: NaiveDate) -> NaiveDate {
    match reference.weekday() {
        Weekday::Sun => reference + Duration::days(1),
        day => reference - Duration::days(i64::from(day.num_days_from_monday())),
    }
}

/// Monday of the calendar week `day` falls in. Unlike [`week_monday`], a
/// Sunday stays with the week that is ending, which is the week a
/// weekend close run settles.
pub fn closing_week_monday(day: NaiveDate) -> NaiveDate {
    day - Duration::days(i64::from(day.weekday().num_days_from_monday()))
}

pub fn work_week(reference: NaiveDate) -> [NaiveDate; WORK_WEEK_DAYS] {
    let monday = week_monday(reference);
    std::array::from_fn(|i| monday + Duration::days(i as i64))
}

/// Weekdays of the reference week with no entry for `employee_id`, ascending.
pub fn missing_weekdays(
    employee_id: u64,
    reference: NaiveDate,
    entries: &[PlanningEntry],
) -> Vec<NaiveDate> {
    work_week(reference)
        .into_iter()
        .filter(|day| {
            !entries
                .iter()
                .any(|e| e.employee_id == employee_id && e.date == *day)
        })
        .collect()
}

pub fn reminder_policy(day: Weekday, entries_this_week: usize) -> ReminderPolicy {
    match day {
        Weekday::Wed if entries_this_week < WORK_WEEK_DAYS => ReminderPolicy::SoftWarning,
        Weekday::Thu | Weekday::Fri => ReminderPolicy::ForcedRedirect,
        _ => ReminderPolicy::None,
    }
}

/// Monday-to-Friday days in `start..=end`. Zero for an inverted range.
pub fn business_days(start: NaiveDate, end: NaiveDate) -> i64 {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .count() as i64
}

/// Calendar date right now at a fixed UTC offset.
pub fn local_today(offset: FixedOffset) -> NaiveDate {
    Utc::now().with_timezone(&offset).date_naive()
}
