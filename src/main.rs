//! Dashboard real-time monitor.
//!
//! Connects to the backend with the configured credential, attaches the
//! metrics and notifications consumers (plus a pipeline consumer when
//! `DASHBOARD_REALTIME__REALTIME__WATCH_PIPELINE` is set) and logs every
//! update until Ctrl-C.
//!
//! # Usage
//!
//! ```bash
//! DASHBOARD_REALTIME__REALTIME__BASE_URL=wss://dash.example.com \
//! DASHBOARD_REALTIME__REALTIME__TOKEN=... \
//! cargo run --bin dashboard-realtime
//! ```

use std::sync::Arc;

use tokio::sync::watch;

use dashboard_realtime::adapters::auth::StaticTokenProvider;
use dashboard_realtime::config::{AppConfig, LogFormat, LoggingConfig};
use dashboard_realtime::domain::foundation::PipelineId;
use dashboard_realtime::RealtimeHub;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config.logging);

    let token = config.realtime.require_token()?.clone();
    let hub = RealtimeHub::from_config(&config.realtime, Arc::new(StaticTokenProvider::new(token)));

    tracing::info!(base_url = %config.realtime.base_url, "Starting dashboard real-time monitor");

    let metrics = hub.metrics()?;
    let notifications = hub.notifications()?;
    let pipelines = match config.realtime.watch_pipeline {
        Some(id) => Some(hub.pipelines(Some(PipelineId::new(id)))?),
        None => None,
    };

    let mut metrics_rx = metrics.watch_state();
    let mut alerts_rx = notifications.watch_state();
    let mut connection_rx = metrics.watch_connection();
    let mut pipeline_rx = pipelines.as_ref().map(|p| p.watch_state());

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                }
                break;
            }
            Ok(()) = connection_rx.changed() => {
                let state = *connection_rx.borrow_and_update();
                tracing::info!(state = ?state, "Connection state changed");
            }
            Ok(()) = metrics_rx.changed() => {
                if let Some(snapshot) = metrics_rx.borrow_and_update().as_ref() {
                    tracing::info!(
                        cpu = ?snapshot.metrics.cpu_percent(),
                        memory = ?snapshot.metrics.memory_percent(),
                        disk = ?snapshot.metrics.disk_percent(),
                        "System metrics"
                    );
                }
            }
            Ok(()) = alerts_rx.changed() => {
                let log = alerts_rx.borrow_and_update();
                if let Some(latest) = log.iter().next() {
                    tracing::info!(
                        severity = ?latest.severity,
                        title = %latest.title,
                        unread = log.unread_count(),
                        "System alert"
                    );
                }
            }
            Ok(()) = changed(&mut pipeline_rx) => {
                if let Some(rx) = pipeline_rx.as_mut() {
                    let activity = rx.borrow_and_update();
                    tracing::info!(
                        status = ?activity.status.as_ref().map(|s| s.status.as_str()),
                        progress = ?activity.progress.as_ref().and_then(|p| p.progress),
                        logs = activity.logs.len(),
                        errors = activity.errors.len(),
                        "Pipeline activity"
                    );
                }
            }
        }
    }

    tracing::info!("Shutting down");
    if let Some(pipelines) = pipelines {
        pipelines.close().await;
    }
    metrics.close().await;
    notifications.close().await;
    hub.shutdown().await;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let builder = tracing_subscriber::fmt().with_env_filter(logging.env_filter());
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// Waits for the next change of an optional receiver; never resolves when
/// there is none.
async fn changed<T>(rx: &mut Option<watch::Receiver<T>>) -> Result<(), watch::error::RecvError> {
    match rx {
        Some(rx) => rx.changed().await,
        None => std::future::pending().await,
    }
}
