//! Recurrence description domain model.
//!
//! A recurrence description is persisted as a JSON document of the shape
//! `{type, pattern: {interval, daysOfWeek, dayOfMonth, weekOfMonth, dayOfWeek},
//! time: "HH:mm", range: {startDate, endDate, noEndDate, maxOccurrences}}`.

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared::validation::{default_time_of_day, parse_time_of_day};
use thiserror::Error;

use super::json_doc::{as_int, as_text, field, parse_calendar_date};

/// Recurrence kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecurrenceKind {
    Once,
    Daily,
    Weekly,
    Monthly,
}

impl RecurrenceKind {
    /// Parses a kind tag case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "once" => Some(Self::Once),
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Once => "Once",
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
        }
    }
}

impl std::fmt::Display for RecurrenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which occurrence of a weekday inside a month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekOrdinal {
    First,
    Second,
    Third,
    Fourth,
    /// The last occurrence, however many the month has.
    Last,
}

impl WeekOrdinal {
    /// Maps 1..=4 to the matching ordinal and 5 to [`WeekOrdinal::Last`].
    pub fn from_number(n: i64) -> Option<Self> {
        match n {
            1 => Some(Self::First),
            2 => Some(Self::Second),
            3 => Some(Self::Third),
            4 => Some(Self::Fourth),
            5 => Some(Self::Last),
            _ => None,
        }
    }
}

/// Monthly pattern: a fixed day or an (ordinal, weekday) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthlyPattern {
    /// Day of month, clamped to the month length when resolved.
    DayOfMonth(u32),
    NthWeekday {
        ordinal: WeekOrdinal,
        weekday: Weekday,
    },
}

/// Kind-specific repetition rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceRule {
    Once,
    Daily { interval: u32 },
    /// An empty set means "the reference instant's own weekday".
    Weekly { days: Vec<Weekday> },
    Monthly(MonthlyPattern),
}

impl RecurrenceRule {
    pub fn kind(&self) -> RecurrenceKind {
        match self {
            Self::Once => RecurrenceKind::Once,
            Self::Daily { .. } => RecurrenceKind::Daily,
            Self::Weekly { .. } => RecurrenceKind::Weekly,
            Self::Monthly(_) => RecurrenceKind::Monthly,
        }
    }
}

/// Bounds of a recurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecurrenceRange {
    pub start_date: Option<NaiveDate>,
    /// Last date an occurrence may fall on. Cleared when `noEndDate` is set.
    pub end_date: Option<NaiveDate>,
    pub max_occurrences: Option<u32>,
}

/// Declarative repetition rule of a schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceDescription {
    pub rule: RecurrenceRule,
    pub time_of_day: NaiveTime,
    pub range: RecurrenceRange,
}

/// Structural problems in a stored recurrence document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecurrenceParseError {
    #[error("Recurrence document is empty")]
    Empty,

    #[error("Recurrence document is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Recurrence document must be a JSON object")]
    NotAnObject,

    #[error("Invalid day of month: {0}")]
    InvalidDayOfMonth(i64),

    #[error("Invalid week of month: {0}")]
    InvalidWeekOfMonth(i64),
}

/// Maps a weekday index to a [`Weekday`], with 0 and 7 both meaning Sunday.
pub fn weekday_from_index(index: i64) -> Weekday {
    match index.rem_euclid(7) {
        0 => Weekday::Sun,
        1 => Weekday::Mon,
        2 => Weekday::Tue,
        3 => Weekday::Wed,
        4 => Weekday::Thu,
        5 => Weekday::Fri,
        _ => Weekday::Sat,
    }
}

impl RecurrenceDescription {
    pub fn kind(&self) -> RecurrenceKind {
        self.rule.kind()
    }

    /// Parses a stored recurrence document.
    ///
    /// An unknown or missing `type` reads as daily with interval 1. A missing or
    /// unparsable `time` reads as 08:00.
    pub fn parse(raw: &str) -> Result<Self, RecurrenceParseError> {
        if raw.trim().is_empty() {
            return Err(RecurrenceParseError::Empty);
        }
        let doc: Value = serde_json::from_str(raw)
            .map_err(|e| RecurrenceParseError::InvalidJson(e.to_string()))?;
        let obj = doc.as_object().ok_or(RecurrenceParseError::NotAnObject)?;
        Self::from_object(obj)
    }

    fn from_object(obj: &Map<String, Value>) -> Result<Self, RecurrenceParseError> {
        let empty = Map::new();
        let pattern = field(obj, &["pattern"])
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        let kind = field(obj, &["type", "kind"])
            .and_then(as_text)
            .and_then(RecurrenceKind::parse);

        let rule = match kind {
            Some(RecurrenceKind::Once) => RecurrenceRule::Once,
            Some(RecurrenceKind::Weekly) => RecurrenceRule::Weekly {
                days: parse_weekly_days(pattern),
            },
            Some(RecurrenceKind::Monthly) => RecurrenceRule::Monthly(parse_monthly(pattern)?),
            Some(RecurrenceKind::Daily) => RecurrenceRule::Daily {
                interval: field(pattern, &["interval"])
                    .and_then(as_int)
                    .filter(|n| *n >= 1)
                    .map(|n| n.min(i64::from(u32::MAX)) as u32)
                    .unwrap_or(1),
            },
            None => RecurrenceRule::Daily { interval: 1 },
        };

        let time_of_day = field(obj, &["time"])
            .and_then(as_text)
            .and_then(parse_time_of_day)
            .unwrap_or_else(default_time_of_day);

        let range = field(obj, &["range"])
            .and_then(Value::as_object)
            .map(parse_range)
            .unwrap_or_default();

        Ok(Self {
            rule,
            time_of_day,
            range,
        })
    }
}

fn parse_weekly_days(pattern: &Map<String, Value>) -> Vec<Weekday> {
    let mut days: Vec<Weekday> = Vec::new();
    if let Some(Value::Array(items)) = field(pattern, &["daysOfWeek"]) {
        for day in items.iter().filter_map(as_int).map(weekday_from_index) {
            if !days.contains(&day) {
                days.push(day);
            }
        }
    }
    days
}

fn parse_monthly(pattern: &Map<String, Value>) -> Result<MonthlyPattern, RecurrenceParseError> {
    let week_of_month = field(pattern, &["weekOfMonth"]).and_then(as_int);
    let day_of_week = field(pattern, &["dayOfWeek"]).and_then(as_int);

    if let (Some(ordinal), Some(weekday)) = (week_of_month, day_of_week) {
        let ordinal = WeekOrdinal::from_number(ordinal)
            .ok_or(RecurrenceParseError::InvalidWeekOfMonth(ordinal))?;
        return Ok(MonthlyPattern::NthWeekday {
            ordinal,
            weekday: weekday_from_index(weekday),
        });
    }

    match field(pattern, &["dayOfMonth"]).and_then(as_int) {
        None => Ok(MonthlyPattern::DayOfMonth(1)),
        Some(day) if (1..=31).contains(&day) => Ok(MonthlyPattern::DayOfMonth(day as u32)),
        Some(day) => Err(RecurrenceParseError::InvalidDayOfMonth(day)),
    }
}

fn parse_range(range: &Map<String, Value>) -> RecurrenceRange {
    let date = |names: &[&str]| {
        field(range, names)
            .and_then(as_text)
            .and_then(parse_calendar_date)
    };

    let no_end_date = matches!(field(range, &["noEndDate"]), Some(Value::Bool(true)));

    RecurrenceRange {
        start_date: date(&["startDate"]),
        end_date: if no_end_date { None } else { date(&["endDate"]) },
        max_occurrences: if no_end_date {
            None
        } else {
            field(range, &["maxOccurrences"])
                .and_then(as_int)
                .filter(|n| *n > 0)
                .map(|n| n.min(i64::from(u32::MAX)) as u32)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_weekly() {
        let desc = RecurrenceDescription::parse(
            r#"{"type":"Weekly","pattern":{"daysOfWeek":[1,3,3]},"time":"07:15",
                "range":{"startDate":"2024-03-01","noEndDate":true}}"#,
        )
        .unwrap();
        assert_eq!(
            desc.rule,
            RecurrenceRule::Weekly {
                days: vec![Weekday::Mon, Weekday::Wed]
            }
        );
        assert_eq!(desc.time_of_day, NaiveTime::from_hms_opt(7, 15, 0).unwrap());
        assert_eq!(desc.range.start_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(desc.range.end_date, None);
    }

    #[test]
    fn test_parse_keys_case_insensitive() {
        let desc = RecurrenceDescription::parse(
            r#"{"TYPE":"daily","Pattern":{"Interval":"3"},"Time":"18:00"}"#,
        )
        .unwrap();
        assert_eq!(desc.rule, RecurrenceRule::Daily { interval: 3 });
        assert_eq!(desc.time_of_day, NaiveTime::from_hms_opt(18, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_defaults() {
        let desc = RecurrenceDescription::parse(r#"{"type":"Fortnightly","time":"soon"}"#).unwrap();
        assert_eq!(desc.rule, RecurrenceRule::Daily { interval: 1 });
        assert_eq!(desc.time_of_day, default_time_of_day());
        assert_eq!(desc.range, RecurrenceRange::default());
    }

    #[test]
    fn test_parse_daily_interval_below_one() {
        let desc = RecurrenceDescription::parse(r#"{"type":"Daily","pattern":{"interval":0}}"#)
            .unwrap();
        assert_eq!(desc.rule, RecurrenceRule::Daily { interval: 1 });
    }

    #[test]
    fn test_parse_monthly_nth_weekday_wins() {
        let desc = RecurrenceDescription::parse(
            r#"{"type":"Monthly","pattern":{"dayOfMonth":15,"weekOfMonth":5,"dayOfWeek":5}}"#,
        )
        .unwrap();
        assert_eq!(
            desc.rule,
            RecurrenceRule::Monthly(MonthlyPattern::NthWeekday {
                ordinal: WeekOrdinal::Last,
                weekday: Weekday::Fri
            })
        );
    }

    #[test]
    fn test_parse_monthly_day_of_month_default() {
        let desc = RecurrenceDescription::parse(r#"{"type":"Monthly"}"#).unwrap();
        assert_eq!(
            desc.rule,
            RecurrenceRule::Monthly(MonthlyPattern::DayOfMonth(1))
        );
    }

    #[test]
    fn test_parse_monthly_structural_errors() {
        assert_eq!(
            RecurrenceDescription::parse(r#"{"type":"Monthly","pattern":{"dayOfMonth":0}}"#),
            Err(RecurrenceParseError::InvalidDayOfMonth(0))
        );
        assert_eq!(
            RecurrenceDescription::parse(
                r#"{"type":"Monthly","pattern":{"weekOfMonth":6,"dayOfWeek":1}}"#
            ),
            Err(RecurrenceParseError::InvalidWeekOfMonth(6))
        );
    }

    #[test]
    fn test_parse_rejects_malformed_documents() {
        assert_eq!(
            RecurrenceDescription::parse("   "),
            Err(RecurrenceParseError::Empty)
        );
        assert!(matches!(
            RecurrenceDescription::parse("{not json"),
            Err(RecurrenceParseError::InvalidJson(_))
        ));
        assert_eq!(
            RecurrenceDescription::parse("[1,2]"),
            Err(RecurrenceParseError::NotAnObject)
        );
    }

    #[test]
    fn test_parse_range_bounds() {
        let desc = RecurrenceDescription::parse(
            r#"{"type":"Daily","range":{"startDate":"2024-01-01T00:00:00",
                "endDate":"2024-02-01","noEndDate":false,"maxOccurrences":4}}"#,
        )
        .unwrap();
        assert_eq!(desc.range.start_date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(desc.range.end_date, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(desc.range.max_occurrences, Some(4));
    }

    #[test]
    fn test_weekday_from_index() {
        assert_eq!(weekday_from_index(0), Weekday::Sun);
        assert_eq!(weekday_from_index(7), Weekday::Sun);
        assert_eq!(weekday_from_index(1), Weekday::Mon);
        assert_eq!(weekday_from_index(6), Weekday::Sat);
        assert_eq!(weekday_from_index(-1), Weekday::Sat);
    }

    #[test]
    fn test_kind_parse_and_display() {
        assert_eq!(RecurrenceKind::parse(" ONCE "), Some(RecurrenceKind::Once));
        assert_eq!(RecurrenceKind::parse("yearly"), None);
        assert_eq!(RecurrenceKind::Monthly.to_string(), "Monthly");
    }
}
