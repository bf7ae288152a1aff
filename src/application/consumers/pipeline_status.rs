//! Pipeline status, progress, logs and errors.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde::de::DeserializeOwned;
use tokio::sync::watch;

use crate::adapters::websocket::{ConnectionLease, TransportConnection};
use crate::domain::dashboard::{
    PipelineActivity, PipelineErrorEntry, PipelineLogEntry, PipelineProgress, PipelineScope,
    PipelineStatus, PipelineUpdate,
};
use crate::domain::foundation::PipelineId;
use crate::domain::realtime::{message_types, ConnectionState, ControlMessage};
use crate::ports::handler_fn;

use super::attachment::{decode, Attachment};

type ActivityCell = Arc<watch::Sender<PipelineActivity>>;

/// Tracks pipeline execution, optionally for a single pipeline.
///
/// A scoped consumer asks the backend for its pipeline with
/// `subscribe_pipeline` when created (if connected) and again after every
/// reconnect, and sends `unsubscribe_pipeline` when it goes away. Updates
/// for other pipeline ids, or without an id, are ignored.
pub struct PipelineStatusConsumer {
    scope: PipelineScope,
    state: ActivityCell,
    attachment: Attachment,
}

impl PipelineStatusConsumer {
    pub fn attach(lease: ConnectionLease, pipeline_id: Option<PipelineId>) -> Self {
        let scope = PipelineScope::from_option(pipeline_id);
        let (state, _) = watch::channel(PipelineActivity::new());
        let state = Arc::new(state);
        let mut attachment = Attachment::new(lease);

        subscribe_update::<PipelineStatus, _>(
            &mut attachment,
            message_types::PIPELINE_STATUS,
            scope,
            &state,
            PipelineActivity::apply_status,
        );
        subscribe_update::<PipelineProgress, _>(
            &mut attachment,
            message_types::PIPELINE_PROGRESS,
            scope,
            &state,
            PipelineActivity::apply_progress,
        );
        subscribe_update::<PipelineLogEntry, _>(
            &mut attachment,
            message_types::PIPELINE_LOG,
            scope,
            &state,
            PipelineActivity::append_log,
        );
        subscribe_update::<PipelineErrorEntry, _>(
            &mut attachment,
            message_types::PIPELINE_ERROR,
            scope,
            &state,
            PipelineActivity::append_error,
        );

        if let PipelineScope::Only(pipeline_id) = scope {
            let interest = Arc::new(PipelineInterest::new(
                pipeline_id,
                Arc::downgrade(attachment.connection()),
            ));

            let on_open = interest.clone();
            let handle = attachment.connection().on_connect(move || {
                on_open.announce();
            });
            attachment.keep_observer(handle);

            let on_close = interest.clone();
            let handle = attachment.connection().on_disconnect(move |_| on_close.forget());
            attachment.keep_observer(handle);

            attachment.set_farewell(ControlMessage::UnsubscribePipeline { pipeline_id });
            interest.announce();
        }

        Self {
            scope,
            state,
            attachment,
        }
    }

    pub fn scope(&self) -> PipelineScope {
        self.scope
    }

    pub fn activity(&self) -> PipelineActivity {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> Option<PipelineStatus> {
        self.state.borrow().status.clone()
    }

    pub fn progress(&self) -> Option<PipelineProgress> {
        self.state.borrow().progress.clone()
    }

    /// Retained log lines, oldest first.
    pub fn logs(&self) -> Vec<PipelineLogEntry> {
        self.state.borrow().logs.to_vec()
    }

    /// Retained errors, oldest first.
    pub fn errors(&self) -> Vec<PipelineErrorEntry> {
        self.state.borrow().errors.to_vec()
    }

    pub fn clear_logs(&self) {
        self.state.send_modify(|activity| activity.logs.clear());
    }

    pub fn clear_errors(&self) {
        self.state.send_modify(|activity| activity.errors.clear());
    }

    pub fn watch_state(&self) -> watch::Receiver<PipelineActivity> {
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

    /// Sends `unsubscribe_pipeline` (when scoped and connected), detaches,
    /// and waits for the connection to close if nobody else uses it.
    pub async fn close(self) {
        self.attachment.close().await;
    }
}

/// Tracks whether `subscribe_pipeline` went out on the current socket.
///
/// The attach path and the on-connect observer both call `announce`; only
/// the first one to see an open socket sends. `forget` re-arms it once the
/// socket is gone.
struct PipelineInterest {
    pipeline_id: PipelineId,
    connection: Weak<TransportConnection>,
    sent: Mutex<bool>,
}

impl PipelineInterest {
    fn new(pipeline_id: PipelineId, connection: Weak<TransportConnection>) -> Self {
        Self {
            pipeline_id,
            connection,
            sent: Mutex::new(false),
        }
    }

    /// Sends `subscribe_pipeline` unless already sent on this socket.
    /// Returns whether a frame was handed to the socket.
    fn announce(&self) -> bool {
        let Some(connection) = self.connection.upgrade() else {
            return false;
        };
        let mut sent = self.sent.lock().unwrap_or_else(PoisonError::into_inner);
        if *sent || !connection.is_connected() {
            return false;
        }

        tracing::debug!(pipeline_id = %self.pipeline_id, "Subscribing to pipeline");
        *sent = connection.send(&ControlMessage::SubscribePipeline {
            pipeline_id: self.pipeline_id,
        });
        *sent
    }

    fn forget(&self) {
        *self.sent.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }
}

fn subscribe_update<T, F>(
    attachment: &mut Attachment,
    message_type: &'static str,
    scope: PipelineScope,
    state: &ActivityCell,
    apply: F,
) where
    T: DeserializeOwned + PipelineUpdate + 'static,
    F: Fn(&mut PipelineActivity, T) + Send + Sync + 'static,
{
    let sink = state.clone();
    attachment.subscribe(
        message_type,
        handler_fn("PipelineStatusConsumer", move |payload| {
            let update: T = decode(message_type, payload)?;
            if !scope.accepts(update.pipeline_id()) {
                tracing::trace!(message_type, "Ignoring update for another pipeline");
                return Ok(());
            }
            sink.send_modify(|activity| apply(activity, update));
            Ok(())
        }),
    );
}

#[cfg(test)]
#[path = "pipeline_status_test.rs"]
mod pipeline_status_test;
