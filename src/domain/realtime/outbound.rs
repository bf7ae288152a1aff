//! Outbound frames sent from the dashboard to the backend.

use serde::Serialize;
use serde_json::Value;

use crate::domain::foundation::PipelineId;

use super::RealtimeError;

/// Control frames understood by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Ask the backend to start pushing updates for one pipeline.
    SubscribePipeline { pipeline_id: PipelineId },

    /// Stop pushing updates for one pipeline.
    UnsubscribePipeline { pipeline_id: PipelineId },
}

/// Generic `{"type": ..., "data": ...}` envelope for ad hoc sends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub data: Value,
}

impl OutboundMessage {
    pub fn new(message_type: impl Into<String>, data: Value) -> Self {
        Self {
            message_type: message_type.into(),
            data,
        }
    }

    /// Envelope around any serialisable payload.
    pub fn from_data<T: Serialize>(
        message_type: impl Into<String>,
        data: &T,
    ) -> Result<Self, RealtimeError> {
        Ok(Self::new(message_type, serde_json::to_value(data)?))
    }
}
