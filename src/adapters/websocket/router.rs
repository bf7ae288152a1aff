//! Message routing by inbound `type`.
//!
//! ```text
//! frame ──parse──▶ InboundMessage ──▶ catch-all (optional)
//!                                  └─▶ registry[type] ──▶ handler 1, handler 2, ...
//! ```
//!
//! Registrations are additive and identified individually, so two consumers
//! registering for the same type never interfere, and removing one leaves
//! the other in place. Handlers are invoked in registration order; a failing
//! or panicking handler is logged and skipped.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use serde_json::Value;

use crate::domain::realtime::InboundMessage;
use crate::ports::MessageHandler;

/// Observer that sees every parsed message, whatever its type.
pub type CatchAll = Arc<dyn Fn(&InboundMessage) + Send + Sync>;

/// Identifies one registration within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(u64);

struct Registration {
    id: RegistrationId,
    handler: Arc<dyn MessageHandler>,
    /// Cleared on removal so an in-flight dispatch skips the handler.
    live: Arc<AtomicBool>,
}

/// Type → ordered handler list.
#[derive(Default)]
pub struct SubscriptionRegistry {
    next_id: AtomicU64,
    handlers: RwLock<HashMap<String, Vec<Registration>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(
        &self,
        message_type: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> (RegistrationId, Arc<AtomicBool>) {
        let id = RegistrationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let live = Arc::new(AtomicBool::new(true));
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(message_type.to_string())
            .or_default()
            .push(Registration {
                id,
                handler,
                live: live.clone(),
            });
        (id, live)
    }

    fn remove_where<F>(&self, message_type: &str, mut predicate: F) -> usize
    where
        F: FnMut(&Registration) -> bool,
    {
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(list) = handlers.get_mut(message_type) else {
            return 0;
        };

        let before = list.len();
        list.retain(|registration| {
            if predicate(registration) {
                registration.live.store(false, Ordering::SeqCst);
                false
            } else {
                true
            }
        });
        let removed = before - list.len();

        if list.is_empty() {
            handlers.remove(message_type);
        }
        removed
    }

    fn remove(&self, message_type: &str, id: RegistrationId) -> bool {
        self.remove_where(message_type, |r| r.id == id) > 0
    }

    /// Live handlers for a type, in registration order.
    fn snapshot(&self, message_type: &str) -> Vec<(Arc<dyn MessageHandler>, Arc<AtomicBool>)> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(message_type)
            .map(|list| {
                list.iter()
                    .map(|r| (r.handler.clone(), r.live.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn handler_count(&self, message_type: &str) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(message_type)
            .map_or(0, Vec::len)
    }

    /// Types with at least one handler, sorted.
    pub fn subscribed_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        types.sort();
        types
    }
}

/// Handle for one registration. Dropping it unregisters the handler.
#[must_use = "dropping a Subscription unregisters the handler"]
pub struct Subscription {
    registry: Weak<SubscriptionRegistry>,
    message_type: String,
    id: RegistrationId,
    live: Arc<AtomicBool>,
}

impl Subscription {
    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    pub fn id(&self) -> RegistrationId {
        self.id
    }

    /// False once unregistered, by this handle or by
    /// [`MessageRouter::unsubscribe`].
    pub fn is_active(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    pub fn unsubscribe(self) {
        // Drop does the work
    }

    fn release(&self) {
        if !self.live.load(Ordering::SeqCst) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.message_type, self.id);
        }
        self.live.store(false, Ordering::SeqCst);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("message_type", &self.message_type)
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Demultiplexes inbound frames to registered handlers.
pub struct MessageRouter {
    registry: Arc<SubscriptionRegistry>,
    catch_all: Option<CatchAll>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(SubscriptionRegistry::new()),
            catch_all: None,
        }
    }

    /// Router with an observer that sees every parsed message before the
    /// per-type handlers.
    pub fn with_catch_all(catch_all: CatchAll) -> Self {
        Self {
            catch_all: Some(catch_all),
            ..Self::new()
        }
    }

    pub fn subscribe(&self, message_type: &str, handler: Arc<dyn MessageHandler>) -> Subscription {
        let name = handler.name();
        let (id, live) = self.registry.insert(message_type, handler);
        tracing::debug!(message_type, handler = name, "Handler registered");
        Subscription {
            registry: Arc::downgrade(&self.registry),
            message_type: message_type.to_string(),
            id,
            live,
        }
    }

    /// Removes every registration of `handler` (by identity) for the type.
    ///
    /// Returns how many registrations were removed; unknown handlers are a
    /// no-op.
    pub fn unsubscribe(&self, message_type: &str, handler: &Arc<dyn MessageHandler>) -> usize {
        self.registry.remove_where(message_type, |r| {
            std::ptr::addr_eq(Arc::as_ptr(&r.handler), Arc::as_ptr(handler))
        })
    }

    /// Invokes every live handler for the type, in registration order.
    ///
    /// Returns the number of handlers invoked, failures included.
    pub fn dispatch(&self, message_type: &str, payload: &Value) -> usize {
        let mut invoked = 0;
        for (handler, live) in self.registry.snapshot(message_type) {
            // Unregistered by an earlier handler of this same dispatch
            if !live.load(Ordering::SeqCst) {
                continue;
            }
            invoked += 1;

            match catch_unwind(AssertUnwindSafe(|| handler.handle(payload))) {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    tracing::error!(
                        message_type,
                        handler = handler.name(),
                        error = %error,
                        "Handler failed"
                    );
                }
                Err(panic) => {
                    tracing::error!(
                        message_type,
                        handler = handler.name(),
                        panic = %panic_message(panic.as_ref()),
                        "Handler panicked"
                    );
                }
            }
        }

        if invoked == 0 {
            tracing::trace!(message_type, "No handler for message type");
        }
        invoked
    }

    /// Parses a text frame and dispatches it.
    ///
    /// Malformed frames are logged and dropped; returns 0 for them.
    pub fn route_frame(&self, text: &str) -> usize {
        let message = match InboundMessage::parse(text) {
            Ok(message) => message,
            Err(error) => {
                tracing::warn!(error = %error, frame_len = text.len(), "Dropping malformed frame");
                return 0;
            }
        };

        if let Some(catch_all) = &self.catch_all {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| catch_all(&message))) {
                tracing::error!(
                    message_type = %message.message_type,
                    panic = %panic_message(panic.as_ref()),
                    "Catch-all observer panicked"
                );
            }
        }

        self.dispatch(&message.message_type, &message.payload)
    }

    pub fn handler_count(&self, message_type: &str) -> usize {
        self.registry.handler_count(message_type)
    }

    pub fn subscribed_types(&self) -> Vec<String> {
        self.registry.subscribed_types()
    }
}

impl Default for MessageRouter {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
#[path = "router_test.rs"]
mod router_test;
