//! Feature state slices fed by the real-time layer.
//!
//! These types are owned by consumers; the transport never inspects them.

pub mod metrics;
pub mod notifications;
pub mod pipeline;

pub use metrics::{
    CpuMetrics, DiskMetrics, MemoryMetrics, MetricsSnapshot, NetworkMetrics, SystemMetrics,
};
pub use notifications::{Notification, NotificationLog, Severity, SystemAlert, NOTIFICATION_CAPACITY};
pub use pipeline::{
    PipelineActivity, PipelineErrorEntry, PipelineLogEntry, PipelineProgress, PipelineScope,
    PipelineStatus, PipelineUpdate, PIPELINE_ERROR_CAPACITY, PIPELINE_LOG_CAPACITY,
};
