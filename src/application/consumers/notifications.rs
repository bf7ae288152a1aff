//! Notification list fed by `system_alert` messages.

use std::sync::Arc;

use tokio::sync::watch;

use crate::adapters::websocket::ConnectionLease;
use crate::domain::dashboard::{Notification, NotificationLog, SystemAlert};
use crate::domain::foundation::{NotificationId, Timestamp};
use crate::domain::realtime::{message_types, ConnectionState};
use crate::ports::handler_fn;

use super::attachment::{decode, Attachment};

/// Newest-first list of the last 100 alerts with an unread counter.
pub struct NotificationsConsumer {
    state: Arc<watch::Sender<NotificationLog>>,
    attachment: Attachment,
}

impl NotificationsConsumer {
    pub fn attach(lease: ConnectionLease) -> Self {
        let (state, _) = watch::channel(NotificationLog::new());
        let state = Arc::new(state);
        let mut attachment = Attachment::new(lease);

        let sink = state.clone();
        attachment.subscribe(
            message_types::SYSTEM_ALERT,
            handler_fn("NotificationsConsumer", move |payload| {
                let alert: SystemAlert = decode(message_types::SYSTEM_ALERT, payload)?;
                let notification = Notification::from_alert(alert, Timestamp::now());
                tracing::debug!(
                    id = %notification.id,
                    severity = ?notification.severity,
                    "Notification received"
                );
                sink.send_modify(|log| {
                    log.push(notification);
                });
                Ok(())
            }),
        );

        Self { state, attachment }
    }

    /// Notifications, newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.state.borrow().to_vec()
    }

    pub fn get(&self, id: &NotificationId) -> Option<Notification> {
        self.state.borrow().get(id).cloned()
    }

    pub fn unread_count(&self) -> usize {
        self.state.borrow().unread_count()
    }

    /// Returns `false` for unknown or already-read ids.
    pub fn mark_as_read(&self, id: &NotificationId) -> bool {
        self.state.send_if_modified(|log| log.mark_read(id))
    }

    /// Returns how many notifications changed.
    pub fn mark_all_as_read(&self) -> usize {
        let mut changed = 0;
        self.state.send_if_modified(|log| {
            changed = log.mark_all_read();
            changed > 0
        });
        changed
    }

    /// Returns `false` for unknown ids.
    pub fn delete(&self, id: &NotificationId) -> bool {
        self.state.send_if_modified(|log| log.remove(id).is_some())
    }

    pub fn clear_all(&self) {
        self.state.send_modify(NotificationLog::clear);
    }

    pub fn watch_state(&self) -> watch::Receiver<NotificationLog> {
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

    pub async fn close(self) {
        self.attachment.close().await;
    }
}
