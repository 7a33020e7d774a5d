//! Common validation utilities.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    /// Digits with an optional leading `+`, as sent by WhatsApp gateways.
    static ref PHONE_NUMBER_REGEX: Regex = Regex::new(r"^\+?[0-9]{8,19}$").unwrap();
}

/// Validates a WhatsApp phone number (8 to 20 characters, digits and optional `+`).
pub fn validate_phone_number(number: &str) -> Result<(), ValidationError> {
    if PHONE_NUMBER_REGEX.is_match(number) {
        Ok(())
    } else {
        let mut err = ValidationError::new("phone_number");
        err.message = Some("WhatsApp number must contain 8 to 19 digits".into());
        Err(err)
    }
}

/// Strips everything but digits and a leading `+` from a phone number.
pub fn normalize_phone_number(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut out = String::with_capacity(trimmed.len());
    for (i, c) in trimmed.chars().enumerate() {
        if c.is_ascii_digit() || (i == 0 && c == '+') {
            out.push(c);
        }
    }
    out
}

/// Rejects strings that are empty after trimming.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Field must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Validates that a manually supplied resolution time is not negative.
pub fn validate_non_negative_minutes(minutes: i32) -> Result<(), ValidationError> {
    if minutes >= 0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("minutes_range");
        err.message = Some("Resolution time must be zero or more minutes".into());
        Err(err)
    }
}
