//! Consumers: typed views over the real-time feeds.
//!
//! Each consumer attaches to a pooled connection through a lease, subscribes
//! to the message types it cares about, and keeps its own state behind a
//! `watch` channel. Dropping or closing a consumer releases everything it
//! registered.

mod attachment;
mod metrics;
mod notifications;
mod pipeline_status;

pub use metrics::MetricsConsumer;
pub use notifications::NotificationsConsumer;
pub use pipeline_status::PipelineStatusConsumer;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::adapters::auth::StaticTokenProvider;
    use crate::adapters::websocket::{ConnectionPool, InMemoryConnector, ReconnectPolicy};

    /// Pool backed by a scripted connector, with a credential configured.
    pub(crate) fn test_pool() -> (ConnectionPool, InMemoryConnector) {
        let connector = InMemoryConnector::new();
        let pool = ConnectionPool::new(
            "ws://localhost:8000",
            Arc::new(StaticTokenProvider::from_option(Some("t"))),
            Arc::new(connector.clone()),
            ReconnectPolicy::default(),
        );
        (pool, connector)
    }

    /// Yields to the runtime until `condition` holds.
    ///
    /// # Panics
    ///
    /// Panics if the condition is still false after ten (virtual) seconds.
    pub(crate) async fn wait_until(condition: impl Fn() -> bool) {
        for _ in 0..10_000 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("condition not met in time");
    }
}
