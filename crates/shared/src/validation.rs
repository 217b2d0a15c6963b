//! Common validation utilities.

use chrono::NaiveTime;
use validator::{ValidateEmail, ValidationError};

/// Maximum number of recipients a single schedule may address.
pub const MAX_RECIPIENTS: usize = 50;

/// Time of day used when a stored or submitted value cannot be parsed.
pub fn default_time_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default()
}

/// Parses a time of day written as `HH:mm` or `HH:mm:ss`.
pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .ok()
}

/// Splits a recipient field on `;` or `,`, trimming entries and dropping empties.
pub fn split_recipient_list(raw: &str) -> Vec<String> {
    raw.split([';', ','])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Validates a recipient field: at least one address, each a valid e-mail.
pub fn validate_recipient_list(raw: &str) -> Result<(), ValidationError> {
    let recipients = split_recipient_list(raw);

    if recipients.is_empty() {
        let mut err = ValidationError::new("recipients_required");
        err.message = Some("At least one recipient is required".into());
        return Err(err);
    }

    if recipients.len() > MAX_RECIPIENTS {
        let mut err = ValidationError::new("recipients_limit");
        err.message = Some(format!("At most {} recipients are allowed", MAX_RECIPIENTS).into());
        return Err(err);
    }

    if let Some(bad) = recipients.iter().find(|r| !r.validate_email()) {
        let mut err = ValidationError::new("recipient_email");
        err.message = Some(format!("Invalid recipient address: {}", bad).into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a submitted time of day parses as `HH:mm` or `HH:mm:ss`.
pub fn validate_time_of_day(value: &str) -> Result<(), ValidationError> {
    if parse_time_of_day(value).is_some() {
        Ok(())
    } else {
        let mut err = ValidationError::new("time_of_day");
        err.message = Some("Time must be formatted as HH:mm".into());
        Err(err)
    }
}
