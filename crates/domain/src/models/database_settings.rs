//! Per-tenant scheduler settings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::schedule::ExportFormat;

/// Settings module the scheduler keys live under.
pub const SETTINGS_MODULE: &str = "REPORTENGINE";
pub const SETTINGS_HEADER: &str = "DBSETTINGS";
pub const SETTINGS_USER: &str = "ALL";

pub const KEY_MAX_SCHEDULES: &str = "MAX_SCHEDULES_PER_REPORT";
pub const KEY_DEFAULT_EXPORT_FORMAT: &str = "DEFAULT_EXPORT_FORMAT";
pub const KEY_SCHEDULER_ENABLED: &str = "SCHEDULER_ENABLED";
pub const KEY_RETENTION_DAYS: &str = "RETENTION_DAYS";

fn default_max_schedules() -> i32 {
    5
}

fn default_retention_days() -> i32 {
    90
}

fn default_enabled() -> bool {
    true
}

/// Operational knobs read at the start of each tenant pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseSettings {
    #[serde(default = "default_max_schedules")]
    #[validate(range(min = 1, max = 1000, message = "Max schedules must be between 1 and 1000"))]
    pub max_schedules_per_report: i32,

    #[serde(default)]
    pub default_export_format: ExportFormat,

    #[serde(default = "default_enabled")]
    pub scheduler_enabled: bool,

    #[serde(default = "default_retention_days")]
    #[validate(range(min = 1, max = 3650, message = "Retention must be between 1 and 3650 days"))]
    pub retention_days: i32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            max_schedules_per_report: default_max_schedules(),
            default_export_format: ExportFormat::default(),
            scheduler_enabled: default_enabled(),
            retention_days: default_retention_days(),
        }
    }
}

fn positive_int(values: &HashMap<String, String>, key: &str) -> Option<i32> {
    values
        .get(key)
        .and_then(|v| v.trim().parse::<i32>().ok())
        .filter(|n| *n > 0)
}

impl DatabaseSettings {
    /// Builds settings from stored key/value pairs; absent or invalid keys keep defaults.
    pub fn from_ini(values: &HashMap<String, String>) -> Self {
        let defaults = Self::default();
        Self {
            max_schedules_per_report: positive_int(values, KEY_MAX_SCHEDULES)
                .unwrap_or(defaults.max_schedules_per_report),
            default_export_format: values
                .get(KEY_DEFAULT_EXPORT_FORMAT)
                .and_then(|v| ExportFormat::parse(v))
                .unwrap_or(defaults.default_export_format),
            scheduler_enabled: values
                .get(KEY_SCHEDULER_ENABLED)
                .map(|v| {
                    let v = v.trim();
                    !(v == "0" || v.eq_ignore_ascii_case("false"))
                })
                .unwrap_or(defaults.scheduler_enabled),
            retention_days: positive_int(values, KEY_RETENTION_DAYS)
                .unwrap_or(defaults.retention_days),
        }
    }

    /// Stored key/value form; the flag is written as `1`/`0`.
    pub fn to_ini(&self) -> Vec<(&'static str, String)> {
        vec![
            (KEY_MAX_SCHEDULES, self.max_schedules_per_report.to_string()),
            (
                KEY_DEFAULT_EXPORT_FORMAT,
                self.default_export_format.as_str().to_string(),
            ),
            (
                KEY_SCHEDULER_ENABLED,
                if self.scheduler_enabled { "1" } else { "0" }.to_string(),
            ),
            (KEY_RETENTION_DAYS, self.retention_days.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ini(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_when_empty() {
        assert_eq!(DatabaseSettings::from_ini(&HashMap::new()), DatabaseSettings::default());
        let defaults = DatabaseSettings::default();
        assert_eq!(defaults.max_schedules_per_report, 5);
        assert!(defaults.scheduler_enabled);
        assert_eq!(defaults.default_export_format, ExportFormat::Excel);
        assert_eq!(defaults.retention_days, 90);
    }

    #[test]
    fn test_from_ini_overrides() {
        let settings = DatabaseSettings::from_ini(&ini(&[
            (KEY_MAX_SCHEDULES, "12"),
            (KEY_DEFAULT_EXPORT_FORMAT, "pdf"),
            (KEY_SCHEDULER_ENABLED, "False"),
            (KEY_RETENTION_DAYS, "30"),
        ]));
        assert_eq!(settings.max_schedules_per_report, 12);
        assert_eq!(settings.default_export_format, ExportFormat::Pdf);
        assert!(!settings.scheduler_enabled);
        assert_eq!(settings.retention_days, 30);
    }

    #[test]
    fn test_from_ini_ignores_invalid_values() {
        let settings = DatabaseSettings::from_ini(&ini(&[
            (KEY_MAX_SCHEDULES, "0"),
            (KEY_DEFAULT_EXPORT_FORMAT, "csv"),
            (KEY_SCHEDULER_ENABLED, "yes"),
            (KEY_RETENTION_DAYS, "-1"),
        ]));
        assert_eq!(settings, DatabaseSettings::default());
    }

    #[test]
    fn test_scheduler_disabled_by_zero() {
        let settings = DatabaseSettings::from_ini(&ini(&[(KEY_SCHEDULER_ENABLED, "0")]));
        assert!(!settings.scheduler_enabled);
    }

    #[test]
    fn test_to_ini_round_trip() {
        let settings = DatabaseSettings {
            max_schedules_per_report: 3,
            default_export_format: ExportFormat::Pdf,
            scheduler_enabled: false,
            retention_days: 14,
        };
        let stored: HashMap<String, String> = settings
            .to_ini()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(stored.get(KEY_SCHEDULER_ENABLED).map(String::as_str), Some("0"));
        assert_eq!(DatabaseSettings::from_ini(&stored), settings);
    }
}
