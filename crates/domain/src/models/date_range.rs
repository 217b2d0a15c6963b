//! Relative report window domain model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::json_doc::{as_text, field};

/// Number of days used by the default window and by the custom-range fallback.
pub const DEFAULT_WINDOW_DAYS: i32 = 30;

/// Value used when a stored `LastNDays` window carries no count.
pub const MISSING_WINDOW_DAYS: i32 = 1;

/// Value used when a stored `LastNDays` window carries a non-integer count.
pub const MALFORMED_WINDOW_DAYS: i32 = 7;

/// Declarative report window, resolved against the run date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RelativeDateRange {
    LastNDays { n: i32 },
    Yesterday,
    ThisWeek,
    LastWeek,
    ThisMonth,
    LastMonth,
    YearToDate,
    LastYear,
    /// ISO date strings; each unparsable bound falls back on its own.
    Custom {
        from: Option<String>,
        to: Option<String>,
    },
}

impl Default for RelativeDateRange {
    fn default() -> Self {
        Self::LastNDays {
            n: DEFAULT_WINDOW_DAYS,
        }
    }
}

impl RelativeDateRange {
    /// Reads the stored `{type, value, dateFrom, dateTo}` shape.
    ///
    /// Returns `None` when the value is not an object. An unknown `type` reads as
    /// `LastNDays`, whose count defaults to one day when `value` is absent.
    pub fn from_document(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let kind = field(obj, &["type"])
            .and_then(as_text)
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_default();

        let range = match kind.as_str() {
            "yesterday" => Self::Yesterday,
            "thisweek" => Self::ThisWeek,
            "lastweek" => Self::LastWeek,
            "thismonth" => Self::ThisMonth,
            "lastmonth" => Self::LastMonth,
            "yeartodate" => Self::YearToDate,
            "lastyear" => Self::LastYear,
            "custom" => Self::Custom {
                from: field(obj, &["dateFrom"]).and_then(as_text).map(str::to_string),
                to: field(obj, &["dateTo"]).and_then(as_text).map(str::to_string),
            },
            _ => Self::LastNDays {
                n: match field(obj, &["value"]) {
                    None | Some(Value::Null) => MISSING_WINDOW_DAYS,
                    Some(v) => v
                        .as_i64()
                        .and_then(|n| i32::try_from(n).ok())
                        .unwrap_or(MALFORMED_WINDOW_DAYS),
                },
            },
        };
        Some(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_document_named_kinds() {
        let cases = [
            ("Yesterday", RelativeDateRange::Yesterday),
            ("thisWeek", RelativeDateRange::ThisWeek),
            ("LASTWEEK", RelativeDateRange::LastWeek),
            ("ThisMonth", RelativeDateRange::ThisMonth),
            ("LastMonth", RelativeDateRange::LastMonth),
            ("YearToDate", RelativeDateRange::YearToDate),
            ("LastYear", RelativeDateRange::LastYear),
        ];
        for (tag, expected) in cases {
            let parsed = RelativeDateRange::from_document(&json!({ "type": tag }));
            assert_eq!(parsed, Some(expected), "tag {}", tag);
        }
    }

    #[test]
    fn test_from_document_last_n_days() {
        assert_eq!(
            RelativeDateRange::from_document(&json!({"type": "LastNDays", "value": 14})),
            Some(RelativeDateRange::LastNDays { n: 14 })
        );
        assert_eq!(
            RelativeDateRange::from_document(&json!({"Type": "LastNDays"})),
            Some(RelativeDateRange::LastNDays { n: 1 })
        );
        assert_eq!(
            RelativeDateRange::from_document(&json!({"type": "LastNDays", "value": null})),
            Some(RelativeDateRange::LastNDays { n: 1 })
        );
        assert_eq!(
            RelativeDateRange::from_document(&json!({"type": "LastNDays", "value": "ten"})),
            Some(RelativeDateRange::LastNDays { n: 7 })
        );
    }

    #[test]
    fn test_from_document_unknown_type_reads_as_last_n_days() {
        assert_eq!(
            RelativeDateRange::from_document(&json!({"type": "Fortnight", "value": 3})),
            Some(RelativeDateRange::LastNDays { n: 3 })
        );
    }

    #[test]
    fn test_from_document_custom() {
        assert_eq!(
            RelativeDateRange::from_document(
                &json!({"type": "Custom", "DateFrom": "2024-01-01", "dateTo": ""})
            ),
            Some(RelativeDateRange::Custom {
                from: Some("2024-01-01".to_string()),
                to: None
            })
        );
    }

    #[test]
    fn test_from_document_rejects_non_objects() {
        assert_eq!(RelativeDateRange::from_document(&json!("LastMonth")), None);
        assert_eq!(RelativeDateRange::from_document(&json!(null)), None);
    }

    #[test]
    fn test_default_window() {
        assert_eq!(
            RelativeDateRange::default(),
            RelativeDateRange::LastNDays { n: 30 }
        );
    }
}
