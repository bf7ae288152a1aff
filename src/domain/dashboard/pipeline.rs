//! Pipeline execution updates: status, progress, logs and errors.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::domain::foundation::{BoundedLog, PipelineId};

/// Number of log lines kept per consumer.
pub const PIPELINE_LOG_CAPACITY: usize = 100;

/// Number of errors kept per consumer.
pub const PIPELINE_ERROR_CAPACITY: usize = 50;

fn lenient_pipeline_id<'de, D>(deserializer: D) -> Result<Option<PipelineId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(PipelineId::from_json))
}

/// Payload of `pipeline_status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineStatus {
    #[serde(default, deserialize_with = "lenient_pipeline_id")]
    pub pipeline_id: Option<PipelineId>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload of `pipeline_progress`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineProgress {
    #[serde(default, deserialize_with = "lenient_pipeline_id")]
    pub pipeline_id: Option<PipelineId>,
    /// Completion percentage, 0-100.
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub current_step: Option<String>,
    #[serde(default)]
    pub completed_steps: Option<u64>,
    #[serde(default)]
    pub total_steps: Option<u64>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload of `pipeline_log`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineLogEntry {
    #[serde(default, deserialize_with = "lenient_pipeline_id")]
    pub pipeline_id: Option<PipelineId>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload of `pipeline_error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineErrorEntry {
    #[serde(default, deserialize_with = "lenient_pipeline_id")]
    pub pipeline_id: Option<PipelineId>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PipelineErrorEntry {
    /// Best human-readable description of the error.
    pub fn description(&self) -> &str {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .unwrap_or("unknown error")
    }
}

/// Any pipeline message; exposes the id used for scoping.
pub trait PipelineUpdate {
    fn pipeline_id(&self) -> Option<PipelineId>;
}

macro_rules! impl_pipeline_update {
    ($($ty:ty),+) => {
        $(impl PipelineUpdate for $ty {
            fn pipeline_id(&self) -> Option<PipelineId> {
                self.pipeline_id
            }
        })+
    };
}

impl_pipeline_update!(PipelineStatus, PipelineProgress, PipelineLogEntry, PipelineErrorEntry);

/// Which pipelines a consumer cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineScope {
    /// Accept updates for every pipeline.
    #[default]
    All,
    /// Accept only updates carrying this id.
    Only(PipelineId),
}

impl PipelineScope {
    pub fn from_option(pipeline_id: Option<PipelineId>) -> Self {
        pipeline_id.map_or(PipelineScope::All, PipelineScope::Only)
    }

    /// Scoped consumers drop messages whose id differs or is missing.
    pub fn accepts(&self, pipeline_id: Option<PipelineId>) -> bool {
        match self {
            PipelineScope::All => true,
            PipelineScope::Only(wanted) => pipeline_id == Some(*wanted),
        }
    }

    pub fn pipeline_id(&self) -> Option<PipelineId> {
        match self {
            PipelineScope::All => None,
            PipelineScope::Only(id) => Some(*id),
        }
    }
}

/// Everything a pipeline view shows.
///
/// Status and progress are latest-wins; logs and errors are bounded
/// histories.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineActivity {
    pub status: Option<PipelineStatus>,
    pub progress: Option<PipelineProgress>,
    pub logs: BoundedLog<PipelineLogEntry>,
    pub errors: BoundedLog<PipelineErrorEntry>,
}

impl PipelineActivity {
    pub fn new() -> Self {
        Self {
            status: None,
            progress: None,
            logs: BoundedLog::with_capacity(PIPELINE_LOG_CAPACITY),
            errors: BoundedLog::with_capacity(PIPELINE_ERROR_CAPACITY),
        }
    }

    pub fn apply_status(&mut self, status: PipelineStatus) {
        self.status = Some(status);
    }

    pub fn apply_progress(&mut self, progress: PipelineProgress) {
        self.progress = Some(progress);
    }

    pub fn append_log(&mut self, entry: PipelineLogEntry) {
        self.logs.push(entry);
    }

    pub fn append_error(&mut self, entry: PipelineErrorEntry) {
        self.errors.push(entry);
    }
}

impl Default for PipelineActivity {
    fn default() -> Self {
        Self::new()
    }
}
