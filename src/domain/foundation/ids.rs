//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{Timestamp, ValidationError};

/// Identifier of a data pipeline, as assigned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineId(i64);

impl PipelineId {
    /// Creates a PipelineId from a raw backend id.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Reads a pipeline id out of a JSON value.
    ///
    /// Producers are not consistent: some send `7`, others `"7"`.
    /// Both are accepted; anything else yields `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for PipelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PipelineId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>()
            .map(Self)
            .map_err(|e| ValidationError::invalid_format("pipeline_id", e.to_string()))
    }
}

impl From<i64> for PipelineId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Locally generated identifier for a received notification.
///
/// Format: `{unix_millis}-{9 random hex chars}`. Uniqueness is best effort;
/// it only has to distinguish entries within one notification list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    const SUFFIX_LEN: usize = 9;

    /// Generates a new id for a notification received at `received_at`.
    pub fn generate(received_at: &Timestamp) -> Self {
        let random = Uuid::new_v4().simple().to_string();
        Self(format!(
            "{}-{}",
            received_at.as_unix_millis(),
            &random[..Self::SUFFIX_LEN]
        ))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NotificationId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ValidationError::empty_field("notification_id"));
        }
        Ok(Self(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pipeline_id_reads_numbers_and_numeric_strings() {
        assert_eq!(PipelineId::from_json(&json!(7)), Some(PipelineId::new(7)));
        assert_eq!(PipelineId::from_json(&json!("9")), Some(PipelineId::new(9)));
        assert_eq!(PipelineId::from_json(&json!("nine")), None);
        assert_eq!(PipelineId::from_json(&json!(null)), None);
        assert_eq!(PipelineId::from_json(&json!(1.5)), None);
    }

    #[test]
    fn pipeline_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&PipelineId::new(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn pipeline_id_parses_from_str() {
        assert_eq!("12".parse::<PipelineId>().unwrap(), PipelineId::new(12));
        assert!("abc".parse::<PipelineId>().is_err());
    }

    #[test]
    fn notification_id_has_time_prefix_and_random_suffix() {
        let ts = Timestamp::from_unix_millis(1_705_276_800_123);
        let id = NotificationId::generate(&ts);

        let (prefix, suffix) = id.as_str().split_once('-').unwrap();
        assert_eq!(prefix, "1705276800123");
        assert_eq!(suffix.len(), 9);
    }

    #[test]
    fn notification_ids_generated_at_same_instant_differ() {
        let ts = Timestamp::now();
        let a = NotificationId::generate(&ts);
        let b = NotificationId::generate(&ts);
        assert_ne!(a, b);
    }

    #[test]
    fn notification_id_rejects_blank_string() {
        assert!("  ".parse::<NotificationId>().is_err());
        assert!("123-abc".parse::<NotificationId>().is_ok());
    }
}
