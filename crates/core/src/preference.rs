use serde_json::Value;
use thiserror::Error;

use crate::advisor::{matches_email_shape, trim_input, utf16_len};

/// Longest address the store accepts, in UTF-16 code units after trimming.
pub const MAX_EMAIL_LEN: usize = 254;

/// Reasons an address is refused before it is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PreferenceError {
    #[error("Email must be a non-empty string")]
    NotText,
    #[error("Email cannot be empty")]
    Blank,
    #[error("Invalid email format")]
    InvalidFormat,
    #[error("Email is too long")]
    TooLong,
}

/// Validates a submitted value and returns the form in which it is stored:
/// trimmed and lowercased.
pub fn normalize_for_storage(value: &Value) -> Result<String, PreferenceError> {
    let raw = match value {
        Value::String(raw) if !raw.is_empty() => raw,
        _ => return Err(PreferenceError::NotText),
    };

    let trimmed = trim_input(raw);
    if trimmed.is_empty() {
        return Err(PreferenceError::Blank);
    }

    if !matches_email_shape(trimmed) {
        return Err(PreferenceError::InvalidFormat);
    }

    if utf16_len(trimmed) > MAX_EMAIL_LEN {
        return Err(PreferenceError::TooLong);
    }

    Ok(trimmed.to_lowercase())
}
