//! Resolves relative report windows into concrete calendar bounds.

use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::Serialize;

use crate::models::date_range::{RelativeDateRange, DEFAULT_WINDOW_DAYS};
use crate::models::parse_calendar_date;

/// Inclusive calendar span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateSpan {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

fn days_back(today: NaiveDate, days: i64) -> NaiveDate {
    today
        .checked_sub_signed(Duration::days(days))
        .unwrap_or(NaiveDate::MIN)
}

fn last_n_days(n: i32, today: NaiveDate) -> DateSpan {
    let n = i64::from(n.max(1));
    DateSpan {
        from: days_back(today, n - 1),
        to: today,
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn jan_first(year: i32, fallback: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(fallback)
}

/// Resolves `range` against `today`; an absent range is the last 30 days.
pub fn resolve(range: Option<&RelativeDateRange>, today: NaiveDate) -> DateSpan {
    let Some(range) = range else {
        return last_n_days(DEFAULT_WINDOW_DAYS, today);
    };

    match range {
        RelativeDateRange::LastNDays { n } => last_n_days(*n, today),
        RelativeDateRange::Yesterday => {
            let yesterday = days_back(today, 1);
            DateSpan {
                from: yesterday,
                to: yesterday,
            }
        }
        RelativeDateRange::ThisWeek => DateSpan {
            from: days_back(today, i64::from(today.weekday().num_days_from_monday())),
            to: today,
        },
        RelativeDateRange::LastWeek => {
            let monday = days_back(today, i64::from(today.weekday().num_days_from_monday()));
            DateSpan {
                from: days_back(monday, 7),
                to: days_back(monday, 1),
            }
        }
        RelativeDateRange::ThisMonth => DateSpan {
            from: first_of_month(today),
            to: today,
        },
        RelativeDateRange::LastMonth => {
            let this_month = first_of_month(today);
            let from = this_month
                .checked_sub_months(Months::new(1))
                .unwrap_or(this_month);
            DateSpan {
                from,
                to: days_back(this_month, 1),
            }
        }
        RelativeDateRange::YearToDate => DateSpan {
            from: jan_first(today.year(), today),
            to: today,
        },
        RelativeDateRange::LastYear => {
            let year = today.year() - 1;
            DateSpan {
                from: jan_first(year, today),
                to: NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(today),
            }
        }
        RelativeDateRange::Custom { from, to } => {
            let fallback = last_n_days(DEFAULT_WINDOW_DAYS, today);
            DateSpan {
                from: from
                    .as_deref()
                    .and_then(parse_calendar_date)
                    .unwrap_or(fallback.from),
                to: to
                    .as_deref()
                    .and_then(parse_calendar_date)
                    .unwrap_or(fallback.to),
            }
        }
    }
}
