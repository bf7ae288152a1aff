//! Inbound frame parsing and payload normalisation.
//!
//! Producers on the backend are not uniform about message shape. Some nest
//! the payload under `data`:
//!
//! ```json
//! {"type": "pipeline_progress", "data": {"pipeline_id": 7, "progress": 40}}
//! ```
//!
//! others flatten the fields next to `type`:
//!
//! ```json
//! {"type": "system_metrics", "cpu": {"percent": 42.5}, "timestamp": "..."}
//! ```
//!
//! [`InboundMessage::parse`] is the single place where both shapes are
//! reduced to `{message_type, payload}`:
//!
//! - the `type` field is the routing key and must be a non-empty string;
//! - if an object-valued `data` field exists, it becomes the payload and any
//!   other top-level fields are copied in where `data` does not define them;
//! - otherwise the payload is the object without `type`.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::foundation::Timestamp;

/// Inbound message types pushed by the dashboard backend.
pub mod message_types {
    pub const SYSTEM_METRICS: &str = "system_metrics";
    pub const SYSTEM_ALERT: &str = "system_alert";
    pub const PIPELINE_STATUS: &str = "pipeline_status";
    pub const PIPELINE_PROGRESS: &str = "pipeline_progress";
    pub const PIPELINE_LOG: &str = "pipeline_log";
    pub const PIPELINE_ERROR: &str = "pipeline_error";

    /// Pipeline message types, all carrying a `pipeline_id`.
    pub const PIPELINE_TYPES: &[&str] = &[
        PIPELINE_STATUS,
        PIPELINE_PROGRESS,
        PIPELINE_LOG,
        PIPELINE_ERROR,
    ];
}

/// Why an inbound frame could not be routed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("frame is not a JSON object")]
    NotAnObject,

    #[error("frame has no string 'type' field")]
    MissingType,
}

/// A parsed, routable inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub message_type: String,
    pub payload: Value,
}

impl InboundMessage {
    /// Parses one text frame.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` for non-JSON text, non-object JSON, or a
    /// missing/blank/non-string `type`.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;
        Self::from_value(value)
    }

    /// Normalises an already-decoded JSON value.
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let Value::Object(mut fields) = value else {
            return Err(ProtocolError::NotAnObject);
        };

        let message_type = match fields.remove("type") {
            Some(Value::String(t)) if !t.trim().is_empty() => t,
            _ => return Err(ProtocolError::MissingType),
        };

        let payload = match fields.remove("data") {
            Some(Value::Object(data)) => Value::Object(lift_siblings(data, fields)),
            Some(other) => {
                fields.insert("data".to_string(), other);
                Value::Object(fields)
            }
            None => Value::Object(fields),
        };

        Ok(Self {
            message_type,
            payload,
        })
    }

    /// Producer timestamp, if present and well-formed.
    pub fn timestamp(&self) -> Option<Timestamp> {
        self.payload
            .get("timestamp")
            .and_then(Value::as_str)
            .and_then(Timestamp::parse_rfc3339)
    }

    /// Decodes the payload into a typed struct.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }
}

fn lift_siblings(mut data: Map<String, Value>, siblings: Map<String, Value>) -> Map<String, Value> {
    for (key, value) in siblings {
        data.entry(key).or_insert(value);
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn parses_flat_message() {
        let msg =
            InboundMessage::parse(r#"{"type":"system_metrics","cpu":{"percent":42.5}}"#).unwrap();

        assert_eq!(msg.message_type, "system_metrics");
        assert_eq!(msg.payload, json!({"cpu": {"percent": 42.5}}));
    }

    #[test]
    fn parses_nested_data_message() {
        let msg = InboundMessage::parse(
            r#"{"type":"pipeline_progress","data":{"pipeline_id":7,"progress":40}}"#,
        )
        .unwrap();

        assert_eq!(msg.payload, json!({"pipeline_id": 7, "progress": 40}));
    }

    #[test]
    fn nested_data_takes_precedence_over_siblings() {
        let msg = InboundMessage::parse(
            r#"{"type":"pipeline_log","pipeline_id":1,"timestamp":"t0","data":{"pipeline_id":2,"message":"hi"}}"#,
        )
        .unwrap();

        assert_eq!(
            msg.payload,
            json!({"pipeline_id": 2, "message": "hi", "timestamp": "t0"})
        );
    }

    #[test]
    fn non_object_data_is_kept_as_a_field() {
        let msg = InboundMessage::parse(r#"{"type":"echo","data":"hello"}"#).unwrap();
        assert_eq!(msg.payload, json!({"data": "hello"}));
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(matches!(
            InboundMessage::parse("not json"),
            Err(ProtocolError::InvalidJson(_))
        ));
    }

    #[test]
    fn rejects_non_objects() {
        assert_eq!(
            InboundMessage::parse("[1,2,3]"),
            Err(ProtocolError::NotAnObject)
        );
        assert_eq!(InboundMessage::parse("42"), Err(ProtocolError::NotAnObject));
    }

    #[test]
    fn rejects_missing_or_non_string_type() {
        assert_eq!(
            InboundMessage::parse(r#"{"data":{}}"#),
            Err(ProtocolError::MissingType)
        );
        assert_eq!(
            InboundMessage::parse(r#"{"type":5}"#),
            Err(ProtocolError::MissingType)
        );
        assert_eq!(
            InboundMessage::parse(r#"{"type":"  "}"#),
            Err(ProtocolError::MissingType)
        );
    }

    #[test]
    fn timestamp_is_read_from_payload() {
        let msg = InboundMessage::parse(
            r#"{"type":"system_alert","timestamp":"2024-01-15T10:30:00Z"}"#,
        )
        .unwrap();
        assert!(msg.timestamp().is_some());

        let msg = InboundMessage::parse(r#"{"type":"system_alert"}"#).unwrap();
        assert!(msg.timestamp().is_none());
    }

    #[test]
    fn payload_decodes_into_typed_struct() {
        #[derive(Deserialize)]
        struct Progress {
            pipeline_id: i64,
            progress: f64,
        }

        let msg = InboundMessage::parse(
            r#"{"type":"pipeline_progress","data":{"pipeline_id":7,"progress":40.0}}"#,
        )
        .unwrap();
        let progress: Progress = msg.payload_as().unwrap();

        assert_eq!(progress.pipeline_id, 7);
        assert_eq!(progress.progress, 40.0);
    }
}
