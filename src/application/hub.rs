//! Composition root for the real-time layer.

use std::sync::Arc;

use crate::adapters::websocket::{CatchAll, ConnectionPool, ReconnectPolicy, TungsteniteConnector};
use crate::config::RealtimeConfig;
use crate::domain::foundation::PipelineId;
use crate::domain::realtime::{InboundMessage, RealtimeError};
use crate::ports::{SocketConnector, TokenProvider};

use super::consumers::{MetricsConsumer, NotificationsConsumer, PipelineStatusConsumer};

/// Owns the connection pool and hands out consumers.
///
/// Consumers for the same endpoint path share one connection. Every
/// message that reaches any connection is also traced at `trace` level,
/// which is handy when debugging what the backend actually sends.
pub struct RealtimeHub {
    pool: ConnectionPool,
    metrics_path: String,
    notifications_path: String,
    pipelines_path: String,
}

impl RealtimeHub {
    pub fn new(
        config: &RealtimeConfig,
        tokens: Arc<dyn TokenProvider>,
        connector: Arc<dyn SocketConnector>,
    ) -> Self {
        let catch_all: CatchAll = Arc::new(|message: &InboundMessage| {
            tracing::trace!(message_type = %message.message_type, "Real-time message received");
        });
        let pool = ConnectionPool::with_catch_all(
            config.base_url.clone(),
            tokens,
            connector,
            ReconnectPolicy::from(&config.reconnect),
            catch_all,
        );

        Self {
            pool,
            metrics_path: config.metrics_path.clone(),
            notifications_path: config.notifications_path.clone(),
            pipelines_path: config.pipelines_path.clone(),
        }
    }

    /// Hub over real sockets.
    pub fn from_config(config: &RealtimeConfig, tokens: Arc<dyn TokenProvider>) -> Self {
        let connector = Arc::new(TungsteniteConnector::new(config.connect_timeout()));
        Self::new(config, tokens, connector)
    }

    /// # Errors
    ///
    /// `MissingCredential` when no token is available, `InvalidEndpoint`
    /// when the configured URL or path is malformed.
    pub fn metrics(&self) -> Result<MetricsConsumer, RealtimeError> {
        let lease = self.pool.acquire(&self.metrics_path)?;
        Ok(MetricsConsumer::attach(lease))
    }

    pub fn notifications(&self) -> Result<NotificationsConsumer, RealtimeError> {
        let lease = self.pool.acquire(&self.notifications_path)?;
        Ok(NotificationsConsumer::attach(lease))
    }

    /// Pipeline consumer, scoped to one pipeline when `pipeline_id` is set.
    pub fn pipelines(
        &self,
        pipeline_id: Option<PipelineId>,
    ) -> Result<PipelineStatusConsumer, RealtimeError> {
        let lease = self.pool.acquire(&self.pipelines_path)?;
        Ok(PipelineStatusConsumer::attach(lease, pipeline_id))
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Closes every pooled connection, whether or not consumers still hold
    /// leases on them.
    pub async fn shutdown(&self) {
        tracing::info!(
            connections = self.pool.connection_count(),
            "Shutting down real-time connections"
        );
        self.pool.close_all().await;
    }
}
