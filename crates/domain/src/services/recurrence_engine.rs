//! Recurrence engine.
//!
//! Pure functions turning a recurrence description and an explicit reference
//! instant into the next execution instant. Nothing here reads the clock.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

use crate::models::recurrence::{
    MonthlyPattern, RecurrenceDescription, RecurrenceRule, WeekOrdinal,
};
use crate::models::schedule::{LegacyRecurrence, Schedule};
use crate::models::RecurrenceKind;

/// Next execution instant strictly after `reference`, or `None` when the
/// recurrence has no further occurrence.
pub fn next_run(desc: &RecurrenceDescription, reference: NaiveDateTime) -> Option<NaiveDateTime> {
    let start = desc.range.start_date;
    let time = desc.time_of_day;
    let effective = match start {
        Some(s) if s > reference.date() => s,
        _ => reference.date(),
    };
    let eligible =
        |c: NaiveDateTime| c > reference && start.map_or(true, |s| c.date() >= s);

    let candidate = match &desc.rule {
        RecurrenceRule::Once => start
            .map(|s| s.and_time(time))
            .filter(|c| *c > reference),
        RecurrenceRule::Daily { interval } => {
            let today = effective.and_time(time);
            if eligible(today) {
                Some(today)
            } else {
                effective
                    .checked_add_signed(Duration::days(i64::from(*interval)))
                    .map(|d| d.and_time(time))
            }
        }
        RecurrenceRule::Weekly { days } => next_weekly(days, effective, time, reference, eligible),
        RecurrenceRule::Monthly(pattern) => (0..3)
            .filter_map(|offset| month_candidate(pattern, effective, offset))
            .map(|d| d.and_time(time))
            .find(|c| eligible(*c)),
    };

    candidate.filter(|c| desc.range.end_date.map_or(true, |end| c.date() <= end))
}

/// The single instant of a `Once` recurrence, used to validate new schedules.
///
/// Returns `None` for any other kind or when no start date is set.
pub fn once_instant(desc: &RecurrenceDescription) -> Option<NaiveDateTime> {
    match desc.rule {
        RecurrenceRule::Once => desc.range.start_date.map(|d| d.and_time(desc.time_of_day)),
        _ => None,
    }
}

/// [`next_run`] over a stored document; malformed documents have no next run.
pub fn next_run_from_json(raw: &str, reference: NaiveDateTime) -> Option<NaiveDateTime> {
    RecurrenceDescription::parse(raw)
        .ok()
        .and_then(|desc| next_run(&desc, reference))
}

/// [`once_instant`] over a stored document.
pub fn once_instant_from_json(raw: &str) -> Option<NaiveDateTime> {
    RecurrenceDescription::parse(raw)
        .ok()
        .and_then(|desc| once_instant(&desc))
}

fn next_weekly(
    days: &[Weekday],
    effective: NaiveDate,
    time: NaiveTime,
    reference: NaiveDateTime,
    eligible: impl Fn(NaiveDateTime) -> bool,
) -> Option<NaiveDateTime> {
    let own_day = [reference.weekday()];
    let days = if days.is_empty() { &own_day[..] } else { days };
    let base = i64::from(effective.weekday().num_days_from_monday());

    days.iter()
        .filter_map(|day| {
            let offset = (i64::from(day.num_days_from_monday()) - base).rem_euclid(7);
            let date = effective.checked_add_signed(Duration::days(offset))?;
            let candidate = date.and_time(time);
            if eligible(candidate) {
                Some(candidate)
            } else {
                candidate.checked_add_signed(Duration::days(7))
            }
        })
        .min()
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = first.checked_add_months(Months::new(1))?;
    next.pred_opt().map(|d| d.day())
}

fn month_candidate(pattern: &MonthlyPattern, effective: NaiveDate, offset: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(effective.year(), effective.month(), 1)?
        .checked_add_months(Months::new(offset))?;
    let (year, month) = (first.year(), first.month());

    match *pattern {
        MonthlyPattern::DayOfMonth(day) => {
            let day = day.min(days_in_month(year, month)?);
            NaiveDate::from_ymd_opt(year, month, day)
        }
        MonthlyPattern::NthWeekday { ordinal, weekday } => match ordinal {
            WeekOrdinal::Last => {
                let last = NaiveDate::from_ymd_opt(year, month, days_in_month(year, month)?)?;
                let back = (i64::from(last.weekday().num_days_from_monday())
                    - i64::from(weekday.num_days_from_monday()))
                .rem_euclid(7);
                last.checked_sub_signed(Duration::days(back))
            }
            WeekOrdinal::First => NaiveDate::from_weekday_of_month_opt(year, month, weekday, 1),
            WeekOrdinal::Second => NaiveDate::from_weekday_of_month_opt(year, month, weekday, 2),
            WeekOrdinal::Third => NaiveDate::from_weekday_of_month_opt(year, month, weekday, 3),
            WeekOrdinal::Fourth => NaiveDate::from_weekday_of_month_opt(year, month, weekday, 4),
        },
    }
}

fn legacy_weekday(day: Option<i32>) -> Weekday {
    crate::models::recurrence::weekday_from_index(i64::from(day.unwrap_or(1)))
}

/// First run of a schedule that only carries the legacy simple recurrence.
pub fn legacy_initial_run(legacy: &LegacyRecurrence, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let time = legacy.schedule_time;
    let today = now.date().and_time(time);
    let today_or_tomorrow = if today > now {
        Some(today)
    } else {
        today.checked_add_signed(Duration::days(1))
    };

    match legacy.kind() {
        Some(RecurrenceKind::Once) | Some(RecurrenceKind::Daily) => today_or_tomorrow,
        Some(RecurrenceKind::Weekly) => {
            let target = legacy_weekday(legacy.recurrence_day);
            let mut days_until = (i64::from(target.num_days_from_sunday())
                - i64::from(now.weekday().num_days_from_sunday()))
            .rem_euclid(7);
            if days_until == 0 && now.time() >= time {
                days_until = 7;
            }
            now.date()
                .checked_add_signed(Duration::days(days_until))
                .map(|d| d.and_time(time))
        }
        Some(RecurrenceKind::Monthly) => {
            let wanted = u32::try_from(legacy.recurrence_day.unwrap_or(1).max(1)).unwrap_or(1);
            let (year, month) = (now.year(), now.month());
            let day = wanted.min(days_in_month(year, month)?);
            let candidate = NaiveDate::from_ymd_opt(year, month, day)?.and_time(time);
            if candidate <= now {
                candidate.checked_add_months(Months::new(1))
            } else {
                Some(candidate)
            }
        }
        None => today.checked_add_signed(Duration::days(1)),
    }
}

/// Next run of a legacy schedule after it executed at `now`.
pub fn legacy_next_run_after(legacy: &LegacyRecurrence, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let today = now.date().and_time(legacy.schedule_time);
    match legacy.kind() {
        Some(RecurrenceKind::Daily) if today > now => Some(today),
        Some(RecurrenceKind::Weekly) => today.checked_add_signed(Duration::days(7)),
        Some(RecurrenceKind::Monthly) => today.checked_add_months(Months::new(1)),
        _ => today.checked_add_signed(Duration::days(1)),
    }
}

/// State transition of a schedule after one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunAdvance {
    pub next_run_at: Option<NaiveDateTime>,
    /// The schedule becomes inactive.
    pub deactivate: bool,
}

impl RunAdvance {
    fn terminal() -> Self {
        Self {
            next_run_at: None,
            deactivate: true,
        }
    }

    fn next(at: Option<NaiveDateTime>) -> Self {
        Self {
            next_run_at: at,
            deactivate: at.is_none(),
        }
    }
}

/// Decides the next run of `schedule` after an execution at `now`.
///
/// Once schedules and exhausted ranges become terminal. A structured
/// description that yields nothing without an end bound falls back to the
/// legacy heuristic, as does a malformed description.
pub fn plan_after_run(schedule: &Schedule, now: NaiveDateTime) -> RunAdvance {
    if schedule.is_once() {
        return RunAdvance::terminal();
    }

    if let Some(desc) = schedule.structured_recurrence() {
        if let Some(max) = desc.range.max_occurrences {
            if i64::from(schedule.run_count) + 1 >= i64::from(max) {
                return RunAdvance::terminal();
            }
        }
        match next_run(&desc, now) {
            Some(next) => return RunAdvance::next(Some(next)),
            None if desc.range.end_date.is_some() => return RunAdvance::terminal(),
            None => {}
        }
    }

    RunAdvance::next(legacy_next_run_after(&schedule.legacy, now))
}
