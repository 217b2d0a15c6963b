//! Lenient accessors for stored JSON documents.
//!
//! Stored recurrence and parameter documents were written by several front-end
//! generations, so keys are matched case-insensitively and scalar values are
//! accepted either as JSON numbers or as numeric strings.

use chrono::NaiveDate;
use serde_json::{Map, Value};

/// Looks up the first of `names` present in `obj`, ignoring ASCII case.
pub(crate) fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| {
        obj.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}

/// Reads an integer given as a JSON number or a numeric string.
pub(crate) fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Reads a non-blank string.
pub(crate) fn as_text(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

/// Parses `YYYY-MM-DD`, also accepting a date-time whose date part comes first.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    let head = trimmed.get(..10)?;
    match trimmed.as_bytes().get(10) {
        Some(b'T') | Some(b' ') => NaiveDate::parse_from_str(head, "%Y-%m-%d").ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_is_case_insensitive() {
        let doc = json!({ "Breakdown": 1, "groupby": "Store" });
        let obj = doc.as_object().unwrap();
        assert_eq!(field(obj, &["breakdown"]), Some(&json!(1)));
        assert_eq!(field(obj, &["groupBy"]), Some(&json!("Store")));
        assert_eq!(field(obj, &["missing"]), None);
    }

    #[test]
    fn test_field_prefers_first_alias() {
        let doc = json!({ "dateRange": 1, "reportDateRange": 2 });
        let obj = doc.as_object().unwrap();
        assert_eq!(field(obj, &["reportDateRange", "dateRange"]), Some(&json!(2)));
    }

    #[test]
    fn test_as_int() {
        assert_eq!(as_int(&json!(7)), Some(7));
        assert_eq!(as_int(&json!(" 12 ")), Some(12));
        assert_eq!(as_int(&json!("x")), None);
        assert_eq!(as_int(&json!(1.5)), None);
        assert_eq!(as_int(&json!(null)), None);
    }

    #[test]
    fn test_parse_calendar_date() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 10);
        assert_eq!(parse_calendar_date("2024-01-10"), expected);
        assert_eq!(parse_calendar_date("2024-01-10T08:00:00"), expected);
        assert_eq!(parse_calendar_date("2024-01-10 08:00"), expected);
        assert_eq!(parse_calendar_date("2024-02-30"), None);
        assert_eq!(parse_calendar_date("not-a-date"), None);
        assert_eq!(parse_calendar_date("2024-01-10X"), None);
    }
}
