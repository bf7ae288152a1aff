//! System alerts turned into a bounded, newest-first notification list.

use std::collections::vec_deque::{self, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::foundation::{NotificationId, Timestamp};

/// Maximum number of notifications kept in memory.
pub const NOTIFICATION_CAPACITY: usize = 100;

/// Severity attached to a system alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Success,
    Warning,
    Error,
    Critical,
    #[serde(other)]
    Other,
}

/// Payload of a `system_alert` message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemAlert {
    #[serde(default)]
    pub severity: Option<Severity>,
    /// Some producers say `level` instead of `severity`.
    #[serde(default)]
    pub level: Option<Severity>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of the notification list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    /// Producer timestamp, as sent.
    pub timestamp: Option<String>,
    pub received_at: Timestamp,
    pub read: bool,
    pub details: Map<String, Value>,
}

impl Notification {
    /// Builds an unread notification from an alert, assigning it a fresh id.
    pub fn from_alert(alert: SystemAlert, received_at: Timestamp) -> Self {
        let severity = alert.severity.or(alert.level).unwrap_or_default();
        let title = alert.title.unwrap_or_else(|| "System alert".to_string());
        Self {
            id: NotificationId::generate(&received_at),
            severity,
            title,
            message: alert.message.unwrap_or_default(),
            timestamp: alert.timestamp,
            received_at,
            read: false,
            details: alert.extra,
        }
    }
}

/// Newest-first, bounded notification list with an unread counter.
///
/// The unread counter always equals the number of unread entries held: it
/// rises on arrival, falls on mark-read, on delete of an unread entry and
/// when an unread entry is evicted by overflow.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationLog {
    entries: VecDeque<Notification>,
    unread: usize,
    capacity: usize,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::with_capacity(NOTIFICATION_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            unread: 0,
            capacity,
        }
    }

    /// Prepends a notification, evicting the oldest one if the list is full.
    pub fn push(&mut self, notification: Notification) -> Option<Notification> {
        if !notification.read {
            self.unread += 1;
        }
        self.entries.push_front(notification);

        if self.entries.len() > self.capacity {
            let evicted = self.entries.pop_back();
            if let Some(old) = &evicted {
                if !old.read {
                    self.unread = self.unread.saturating_sub(1);
                }
            }
            return evicted;
        }
        None
    }

    /// Marks one notification read. Returns `false` if it was unknown or
    /// already read.
    pub fn mark_read(&mut self, id: &NotificationId) -> bool {
        match self.entries.iter_mut().find(|n| &n.id == id) {
            Some(n) if !n.read => {
                n.read = true;
                self.unread = self.unread.saturating_sub(1);
                true
            }
            _ => false,
        }
    }

    /// Marks everything read, returning how many entries changed.
    pub fn mark_all_read(&mut self) -> usize {
        let mut changed = 0;
        for n in self.entries.iter_mut().filter(|n| !n.read) {
            n.read = true;
            changed += 1;
        }
        self.unread = 0;
        changed
    }

    /// Deletes one notification.
    pub fn remove(&mut self, id: &NotificationId) -> Option<Notification> {
        let index = self.entries.iter().position(|n| &n.id == id)?;
        let removed = self.entries.remove(index)?;
        if !removed.read {
            self.unread = self.unread.saturating_sub(1);
        }
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.unread = 0;
    }

    pub fn unread_count(&self) -> usize {
        self.unread
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &NotificationId) -> Option<&Notification> {
        self.entries.iter().find(|n| &n.id == id)
    }

    /// Iterates newest first.
    pub fn iter(&self) -> vec_deque::Iter<'_, Notification> {
        self.entries.iter()
    }

    /// Copies the entries out, newest first.
    pub fn to_vec(&self) -> Vec<Notification> {
        self.entries.iter().cloned().collect()
    }
}

impl Default for NotificationLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "notifications_test.rs"]
mod notifications_test;
