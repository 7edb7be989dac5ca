use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version tag written alongside every stored preference.
pub const RECORD_VERSION: &str = "1.0";

/// Domain bucket used when a stored address has no `@`.
pub const UNKNOWN_DOMAIN: &str = "unknown";

/// Remembered email preference as persisted by the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRecord {
    pub email: String,
    pub timestamp: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub version: String,
}

impl EmailRecord {
    /// Returns the text after the first `@`, if any.
    pub fn domain(&self) -> Option<&str> {
        self.email.split_once('@').map(|(_, domain)| domain)
    }
}

/// Aggregate counts over every stored preference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailStats {
    pub total_emails: u64,
    pub domains: BTreeMap<String, u64>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl EmailStats {
    /// Folds records into stats. Empty emails count towards the total only.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a EmailRecord>,
    {
        records.into_iter().fold(Self::default(), |mut stats, record| {
            stats.total_emails += 1;
            if !record.email.is_empty() {
                let domain = record.domain().unwrap_or(UNKNOWN_DOMAIN);
                *stats.domains.entry(domain.to_string()).or_insert(0) += 1;
            }
            stats.last_updated = match stats.last_updated {
                Some(latest) if latest >= record.last_updated => Some(latest),
                _ => Some(record.last_updated),
            };
            stats
        })
    }
}

/// Uniform response body returned by every preference endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiEnvelope<T> {
    pub fn success<S: Into<String>>(message: S, data: Option<T>, now: DateTime<Utc>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            timestamp: now,
        }
    }

    pub fn failure<S: Into<String>>(message: S, now: DateTime<Utc>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            timestamp: now,
        }
    }
}
