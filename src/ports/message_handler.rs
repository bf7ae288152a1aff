//! MessageHandler port - receives normalised payloads of one message type.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::domain::foundation::DomainError;

/// Handler for inbound real-time messages.
///
/// Handlers run on the connection's driver task, one frame at a time, so
/// they must be quick and must not block. Each handler owns its state; the
/// router never shares anything between handlers.
///
/// # Example
///
/// ```ignore
/// struct MetricsUpdater { state: Arc<watch::Sender<Option<MetricsSnapshot>>> }
///
/// impl MessageHandler for MetricsUpdater {
///     fn handle(&self, payload: &Value) -> Result<(), DomainError> {
///         let metrics: SystemMetrics = serde_json::from_value(payload.clone())
///             .map_err(|e| DomainError::invalid_payload("system_metrics", e))?;
///         self.state.send_replace(Some(MetricsSnapshot::new(metrics, Timestamp::now())));
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "MetricsUpdater"
///     }
/// }
/// ```
pub trait MessageHandler: Send + Sync {
    /// Process one payload.
    ///
    /// An error is logged by the router and does not affect other handlers.
    fn handle(&self, payload: &Value) -> Result<(), DomainError>;

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}

/// Wraps a closure as a named handler.
pub fn handler_fn<F>(name: &'static str, f: F) -> Arc<dyn MessageHandler>
where
    F: Fn(&Value) -> Result<(), DomainError> + Send + Sync + 'static,
{
    Arc::new(FnHandler { name, f })
}

struct FnHandler<F> {
    name: &'static str,
    f: F,
}

impl<F> MessageHandler for FnHandler<F>
where
    F: Fn(&Value) -> Result<(), DomainError> + Send + Sync + 'static,
{
    fn handle(&self, payload: &Value) -> Result<(), DomainError> {
        (self.f)(payload)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").field("name", &self.name).finish()
    }
}
