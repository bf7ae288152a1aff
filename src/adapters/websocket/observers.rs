//! Connection lifecycle observers.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::domain::realtime::DisconnectReason;

pub type ConnectObserver = Arc<dyn Fn() + Send + Sync>;
pub type DisconnectObserver = Arc<dyn Fn(&DisconnectReason) + Send + Sync>;

#[derive(Default)]
pub(crate) struct ObserverRegistry {
    next_id: AtomicU64,
    on_connect: Mutex<Vec<(u64, ConnectObserver)>>,
    on_disconnect: Mutex<Vec<(u64, DisconnectObserver)>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObserverKind {
    Connect,
    Disconnect,
}

impl ObserverRegistry {
    pub(crate) fn add_connect(self: &Arc<Self>, observer: ConnectObserver) -> ObserverHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.on_connect
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, observer));
        self.handle(ObserverKind::Connect, id)
    }

    pub(crate) fn add_disconnect(self: &Arc<Self>, observer: DisconnectObserver) -> ObserverHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.on_disconnect
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, observer));
        self.handle(ObserverKind::Disconnect, id)
    }

    fn handle(self: &Arc<Self>, kind: ObserverKind, id: u64) -> ObserverHandle {
        ObserverHandle {
            registry: Arc::downgrade(self),
            kind,
            id,
        }
    }

    fn remove(&self, kind: ObserverKind, id: u64) {
        match kind {
            ObserverKind::Connect => self
                .on_connect
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(i, _)| *i != id),
            ObserverKind::Disconnect => self
                .on_disconnect
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(i, _)| *i != id),
        }
    }

    pub(crate) fn notify_connect(&self) {
        let observers: Vec<ConnectObserver> = self
            .on_connect
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, o)| o.clone())
            .collect();

        for observer in observers {
            if catch_unwind(AssertUnwindSafe(|| observer())).is_err() {
                tracing::error!("on_connect observer panicked");
            }
        }
    }

    pub(crate) fn notify_disconnect(&self, reason: &DisconnectReason) {
        let observers: Vec<DisconnectObserver> = self
            .on_disconnect
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, o)| o.clone())
            .collect();

        for observer in observers {
            if catch_unwind(AssertUnwindSafe(|| observer(reason))).is_err() {
                tracing::error!("on_disconnect observer panicked");
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.on_connect.lock().unwrap().len() + self.on_disconnect.lock().unwrap().len()
    }
}

/// Registration of a lifecycle observer. Dropping it unregisters.
#[must_use = "dropping an ObserverHandle unregisters the observer"]
pub struct ObserverHandle {
    registry: Weak<ObserverRegistry>,
    kind: ObserverKind,
    id: u64,
}

impl Drop for ObserverHandle {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.kind, self.id);
        }
    }
}

impl fmt::Debug for ObserverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverHandle")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .finish()
    }
}
