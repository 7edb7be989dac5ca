use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::tables::ReferenceTables;

pub const MSG_NOT_TEXT: &str = "Invalid input: email must be a non-empty string";
pub const MSG_BLANK: &str = "Email cannot be empty";
pub const MSG_MALFORMED: &str = "Please enter a valid email address format (user@domain.com)";
pub const MSG_TYPO_WARNING: &str = "Possible typo detected in domain name";
pub const MSG_DISPOSABLE: &str = "This appears to be a temporary email address. Consider using a permanent email for important communications.";
pub const MSG_UNPROFESSIONAL: &str =
    "Consider using a more professional email address for business communications";
pub const MSG_GMAIL_CONCISE: &str =
    "Gmail addresses work best when they are concise and memorable";
pub const MSG_LOCAL_TOO_LONG: &str =
    "Local part of email is very long, which may cause delivery issues";
pub const MSG_DOMAIN_TOO_LONG: &str = "Domain name is very long, which may cause delivery issues";
pub const MSG_PLUS_ALIAS: &str =
    "Gmail supports + aliases (e.g., user+tag@gmail.com) for organization";
pub const MSG_LOOKS_GOOD: &str = "Email looks good!";

pub const SUMMARY_FAILED: &str = "Email validation failed";
pub const SUMMARY_PERFECT: &str = "Email is perfect!";

const BASE_CONFIDENCE: f64 = 0.9;
const WARNING_PENALTY: f64 = 0.1;
const ERROR_PENALTY: f64 = 0.3;

const MIN_LOCAL_LEN: usize = 3;
const GMAIL_CONCISE_LEN: usize = 20;
const MAX_LOCAL_LEN: usize = 64;
const MAX_DOMAIN_LEN: usize = 253;

// U+FEFF counts as whitespace for browser clients but not for Unicode White_Space.
static EMAIL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[^\s\x{FEFF}@]+@[^\s\x{FEFF}@]+\.[^\s\x{FEFF}@]+$")
        .expect("email shape pattern compiles")
});

/// Returns `true` when `value` has the `local@domain.tld` shape.
pub fn matches_email_shape(value: &str) -> bool {
    EMAIL_SHAPE.is_match(value)
}

/// Strips surrounding whitespace, byte-order marks included.
pub fn trim_input(raw: &str) -> &str {
    raw.trim_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}')
}

/// Length in UTF-16 code units, the unit browser clients measure addresses in.
pub fn utf16_len(value: &str) -> usize {
    value.encode_utf16().count()
}

/// Outcome of a single advisor evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub suggestions: Vec<String>,
    pub warnings: Vec<String>,
    pub confidence: f64,
    pub errors: Vec<String>,
}

/// Reasons an input never reaches the advisory rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("{detail}")]
    EmptyInput { detail: &'static str },
    #[error("Please enter a valid email address format (user@domain.com)")]
    MalformedFormat,
}

/// Faults raised while the rules run on a structurally valid address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdvisorError {
    #[error("address has no '@' separator")]
    MissingSeparator,
}

/// An address split at its first `@`, case preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmailParts<'a> {
    pub local_part: &'a str,
    pub domain: &'a str,
}

impl<'a> EmailParts<'a> {
    pub fn split(address: &'a str) -> Result<Self, AdvisorError> {
        let (local_part, domain) = address
            .split_once('@')
            .ok_or(AdvisorError::MissingSeparator)?;
        Ok(Self { local_part, domain })
    }
}

/// Trims `raw` and checks it has the `local@domain.tld` shape.
pub fn check_structure(raw: &str) -> Result<&str, StructuralError> {
    if raw.is_empty() {
        return Err(StructuralError::EmptyInput {
            detail: MSG_NOT_TEXT,
        });
    }

    let trimmed = trim_input(raw);
    if trimmed.is_empty() {
        return Err(StructuralError::EmptyInput { detail: MSG_BLANK });
    }

    if !matches_email_shape(trimmed) {
        return Err(StructuralError::MalformedFormat);
    }

    Ok(trimmed)
}

/// Heuristic email advisor: structural checks followed by advisory rules.
///
/// The advisor is cheap to clone; the reference tables are shared.
#[derive(Debug, Clone, Default)]
pub struct EmailAdvisor {
    tables: Arc<ReferenceTables>,
}

impl EmailAdvisor {
    pub fn new(tables: ReferenceTables) -> Self {
        Self {
            tables: Arc::new(tables),
        }
    }

    /// Evaluates an arbitrary JSON value. Anything but a string is reported as empty input.
    pub fn validate_value(&self, value: &Value) -> ValidationResult {
        match value {
            Value::String(candidate) => self.validate(candidate),
            _ => {
                let mut result = ValidationResult::default();
                record_structural_failure(&mut result, StructuralError::EmptyInput {
                    detail: MSG_NOT_TEXT,
                });
                result
            }
        }
    }

    /// Evaluates a candidate address. Never fails; problems are reported in the result.
    pub fn validate(&self, email: &str) -> ValidationResult {
        let mut result = ValidationResult::default();

        let trimmed = match check_structure(email) {
            Ok(trimmed) => trimmed,
            Err(err) => {
                record_structural_failure(&mut result, err);
                debug!(stage = "advisor", outcome = "rejected", reason = %err, "email evaluated");
                return result;
            }
        };

        if let Err(err) = self.apply_rules(trimmed, &mut result) {
            result.errors.push(format!("Validation error: {err}"));
            result.confidence = 0.0;
        }

        debug!(
            stage = "advisor",
            outcome = if result.is_valid { "valid" } else { "faulted" },
            suggestions = result.suggestions.len(),
            warnings = result.warnings.len(),
            confidence = result.confidence,
            "email evaluated"
        );
        result
    }

    fn apply_rules(&self, address: &str, result: &mut ValidationResult) -> Result<(), AdvisorError> {
        let EmailParts { local_part, domain } = EmailParts::split(address)?;
        let local_len = utf16_len(local_part);

        if let Some(corrected) = self.tables.correction_for(domain) {
            result
                .suggestions
                .push(format!("Did you mean {local_part}@{corrected}?"));
            result.warnings.push(MSG_TYPO_WARNING.to_string());
        }

        if self.tables.is_disposable(domain) {
            result.warnings.push(MSG_DISPOSABLE.to_string());
        }

        let lowered = local_part.to_lowercase();
        let unprofessional = self
            .tables
            .keywords()
            .any(|keyword| lowered.contains(keyword));
        if unprofessional || local_len < MIN_LOCAL_LEN {
            result.suggestions.push(MSG_UNPROFESSIONAL.to_string());
        }

        if domain == "gmail.com" && local_len > GMAIL_CONCISE_LEN {
            result.suggestions.push(MSG_GMAIL_CONCISE.to_string());
        }

        if local_len > MAX_LOCAL_LEN {
            result.warnings.push(MSG_LOCAL_TOO_LONG.to_string());
        }

        if utf16_len(domain) > MAX_DOMAIN_LEN {
            result.warnings.push(MSG_DOMAIN_TOO_LONG.to_string());
        }

        // Only a single `+` counts as an alias; two or more never trigger the hint.
        if local_part.matches('+').count() == 1 {
            result.suggestions.push(MSG_PLUS_ALIAS.to_string());
        }

        result.is_valid = true;
        result.confidence = confidence_for(result);

        if result.suggestions.is_empty() && result.warnings.is_empty() {
            result.suggestions.push(MSG_LOOKS_GOOD.to_string());
        }

        Ok(())
    }
}

fn record_structural_failure(result: &mut ValidationResult, err: StructuralError) {
    match err {
        StructuralError::EmptyInput { detail } => result.errors.push(detail.to_string()),
        StructuralError::MalformedFormat => result.suggestions.push(MSG_MALFORMED.to_string()),
    }
}

/// Scores a result: 0.9, minus 0.1 per warning, minus 0.3 when errors exist, clamped to [0, 1].
pub fn confidence_for(result: &ValidationResult) -> f64 {
    let mut confidence = BASE_CONFIDENCE - WARNING_PENALTY * result.warnings.len() as f64;
    if !result.errors.is_empty() {
        confidence -= ERROR_PENALTY;
    }
    confidence.clamp(0.0, 1.0)
}

/// Human readable count of suggestions and warnings.
pub fn summarize(result: &ValidationResult) -> String {
    if !result.is_valid {
        return SUMMARY_FAILED.to_string();
    }

    let mut parts = Vec::with_capacity(2);
    if !result.suggestions.is_empty() {
        parts.push(pluralize(result.suggestions.len(), "suggestion"));
    }
    if !result.warnings.is_empty() {
        parts.push(pluralize(result.warnings.len(), "warning"));
    }

    if parts.is_empty() {
        SUMMARY_PERFECT.to_string()
    } else {
        parts.join(", ")
    }
}

fn pluralize(count: usize, noun: &str) -> String {
    if count > 1 {
        format!("{count} {noun}s")
    } else {
        format!("{count} {noun}")
    }
}
