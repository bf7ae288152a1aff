//! Latest system metrics sample.

use std::sync::Arc;

use tokio::sync::watch;

use crate::adapters::websocket::ConnectionLease;
use crate::domain::dashboard::{MetricsSnapshot, SystemMetrics};
use crate::domain::foundation::Timestamp;
use crate::domain::realtime::{message_types, ConnectionState};
use crate::ports::handler_fn;

use super::attachment::{decode, Attachment};

/// Keeps the most recent `system_metrics` sample.
///
/// A new sample replaces the previous one; a lost connection leaves the
/// last sample in place.
pub struct MetricsConsumer {
    state: Arc<watch::Sender<Option<MetricsSnapshot>>>,
    attachment: Attachment,
}

impl MetricsConsumer {
    pub fn attach(lease: ConnectionLease) -> Self {
        let (state, _) = watch::channel(None);
        let state = Arc::new(state);
        let mut attachment = Attachment::new(lease);

        let sink = state.clone();
        attachment.subscribe(
            message_types::SYSTEM_METRICS,
            handler_fn("MetricsConsumer", move |payload| {
                let metrics: SystemMetrics = decode(message_types::SYSTEM_METRICS, payload)?;
                sink.send_replace(Some(MetricsSnapshot::new(metrics, Timestamp::now())));
                Ok(())
            }),
        );

        Self { state, attachment }
    }

    pub fn snapshot(&self) -> Option<MetricsSnapshot> {
        self.state.borrow().clone()
    }

    pub fn metrics(&self) -> Option<SystemMetrics> {
        self.state.borrow().as_ref().map(|s| s.metrics.clone())
    }

    /// Local time the latest sample arrived.
    pub fn last_updated(&self) -> Option<Timestamp> {
        self.state.borrow().as_ref().map(|s| s.received_at)
    }

    pub fn watch_state(&self) -> watch::Receiver<Option<MetricsSnapshot>> {
        self.state.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.attachment.is_connected()
    }

    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.attachment.watch_connection()
    }

    /// Unsubscribes right away; a connection left without consumers closes
    /// in the background.
    pub fn detach(self) {
        drop(self);
    }

    /// Unsubscribes and releases the connection, waiting for it to close if
    /// nobody else uses it.
    pub async fn close(self) {
        self.attachment.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::consumers::test_support::{test_pool, wait_until};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn metrics_sample_becomes_snapshot() {
        let (pool, connector) = test_pool();
        let consumer = MetricsConsumer::attach(pool.acquire("/ws").unwrap());
        wait_until(|| consumer.is_connected()).await;
        assert!(consumer.snapshot().is_none());

        connector.push_frame(
            r#"{"type":"system_metrics","cpu":{"percent":42.5},"memory":{"percent":60.0},"timestamp":"2024-01-15T10:30:00Z"}"#,
        );
        let mut rx = consumer.watch_state();
        rx.wait_for(Option::is_some).await.unwrap();

        let metrics = consumer.metrics().unwrap();
        assert_eq!(metrics.cpu_percent(), Some(42.5));
        assert_eq!(metrics.memory_percent(), Some(60.0));
        assert!(consumer.last_updated().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn later_sample_replaces_earlier_one() {
        let (pool, connector) = test_pool();
        let consumer = MetricsConsumer::attach(pool.acquire("/ws").unwrap());
        wait_until(|| consumer.is_connected()).await;

        connector.push_frame(r#"{"type":"system_metrics","cpu":{"percent":1.0}}"#);
        connector.push_frame(r#"{"type":"system_metrics","data":{"cpu":{"percent":2.0}}}"#);
        wait_until(|| consumer.metrics().and_then(|m| m.cpu_percent()) == Some(2.0)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_payload_keeps_previous_sample() {
        let (pool, connector) = test_pool();
        let consumer = MetricsConsumer::attach(pool.acquire("/ws").unwrap());
        wait_until(|| consumer.is_connected()).await;

        connector.push_frame(r#"{"type":"system_metrics","cpu":{"percent":5.0}}"#);
        connector.push_frame(r#"{"type":"system_metrics","cpu":"not an object"}"#);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(consumer.metrics().unwrap().cpu_percent(), Some(5.0));
    }

    #[tokio::test(start_paused = true)]
    async fn connection_loss_keeps_state_and_clears_flag() {
        let (pool, connector) = test_pool();
        let consumer = MetricsConsumer::attach(pool.acquire("/ws").unwrap());
        wait_until(|| consumer.is_connected()).await;
        connector.push_frame(r#"{"type":"system_metrics","cpu":{"percent":9.0}}"#);
        wait_until(|| consumer.snapshot().is_some()).await;

        connector.refuse_connections(true);
        connector.drop_connection(crate::domain::realtime::DisconnectReason::new("down"));
        wait_until(|| !consumer.is_connected()).await;

        assert_eq!(consumer.metrics().unwrap().cpu_percent(), Some(9.0));
    }

    #[tokio::test(start_paused = true)]
    async fn detach_removes_handler_immediately() {
        let (pool, _connector) = test_pool();
        let consumer = MetricsConsumer::attach(pool.acquire("/ws").unwrap());
        let other = MetricsConsumer::attach(pool.acquire("/ws").unwrap());
        let router = pool.acquire("/ws").unwrap().connection().router().clone();
        assert_eq!(router.handler_count(message_types::SYSTEM_METRICS), 2);

        consumer.detach();

        assert_eq!(router.handler_count(message_types::SYSTEM_METRICS), 1);
        drop(other);
        assert_eq!(router.handler_count(message_types::SYSTEM_METRICS), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn close_unsubscribes_and_releases_connection() {
        let (pool, connector) = test_pool();
        let consumer = MetricsConsumer::attach(pool.acquire("/ws").unwrap());
        wait_until(|| consumer.is_connected()).await;

        consumer.close().await;

        assert_eq!(pool.connection_count(), 0);
        assert_eq!(connector.close_count(), 1);
    }
}
