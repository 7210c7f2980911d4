//! Publish/subscribe channel for origin-tagged patches.
//!
//! One [`PatchChannel`] exists per document session. Delivery is synchronous
//! and in subscription order. The subscriber list is snapshotted when a
//! publish starts, and the registry lock is never held while a handler runs,
//! so handlers may subscribe, unsubscribe or publish from inside a callback.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError, Weak};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};

use crate::patch::{Origin, OriginPatch};
use crate::patch_event::PatchEvent;

pub mod connection;
pub mod mirror;

pub use connection::{ConnectionState, DocumentConnection, DocumentEvent, MutationOrigin};
pub use mirror::{scope_message, SubtreeMirror};

/// One publish: the patches of a single mutation plus, when the transport
/// supplied one, the resulting document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub patches: Vec<OriginPatch>,
    #[serde(default)]
    pub snapshot: Option<Value>,
}

impl ChannelMessage {
    pub fn new(patches: Vec<OriginPatch>, snapshot: Option<Value>) -> Self {
        Self { patches, snapshot }
    }

    /// Tag every patch of `event` with `origin`, all sharing one timestamp.
    pub fn from_event(event: PatchEvent, origin: Origin, snapshot: Option<Value>) -> Self {
        let now = Utc::now();
        let patches = event
            .into_iter()
            .map(|patch| OriginPatch::at(patch, origin, now))
            .collect();
        Self { patches, snapshot }
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }
}

pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;
pub type HandlerResult = Result<(), HandlerError>;

type Handler = Box<dyn FnMut(&ChannelMessage) -> HandlerResult + Send>;
type SharedHandler = Arc<Mutex<Handler>>;

/// Outcome of one [`PatchChannel::publish`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Handlers that returned `Ok`.
    pub delivered: usize,
    /// Handlers that returned `Err` or panicked.
    pub failed: usize,
    /// Handlers unsubscribed mid-pass, or busy in an outer publish.
    pub skipped: usize,
}

#[derive(Default)]
struct Registry {
    next_subscriber_id: u64,
    subscribers: BTreeMap<u64, SharedHandler>,
    closed: bool,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to a per-document patch channel. Clones share the same channel.
#[derive(Clone, Default)]
pub struct PatchChannel {
    registry: Arc<Mutex<Registry>>,
}

impl std::fmt::Debug for PatchChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = lock(&self.registry);
        f.debug_struct("PatchChannel")
            .field("subscribers", &registry.subscribers.len())
            .field("closed", &registry.closed)
            .finish()
    }
}

impl PatchChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every later publish.
    ///
    /// On a closed channel the returned subscription is inert. Dropping the
    /// [`Subscription`] does not unsubscribe.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: FnMut(&ChannelMessage) -> HandlerResult + Send + 'static,
    {
        let mut registry = lock(&self.registry);
        if registry.closed {
            return Subscription {
                id: 0,
                registry: Weak::new(),
            };
        }
        registry.next_subscriber_id = registry.next_subscriber_id.saturating_add(1);
        let id = registry.next_subscriber_id;
        let handler: Handler = Box::new(handler);
        registry.subscribers.insert(id, Arc::new(Mutex::new(handler)));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver `message` to every current subscriber, in subscription order.
    ///
    /// Subscribers added during the pass first see the next publish. A
    /// handler's error or panic is logged and does not stop delivery.
    pub fn publish(&self, message: &ChannelMessage) -> DeliveryReport {
        let snapshot: Vec<(u64, SharedHandler)> = {
            let registry = lock(&self.registry);
            if registry.closed {
                return DeliveryReport::default();
            }
            registry
                .subscribers
                .iter()
                .map(|(id, handler)| (*id, Arc::clone(handler)))
                .collect()
        };

        let mut report = DeliveryReport::default();
        for (id, handler) in snapshot {
            if !self.is_subscribed(id) {
                report.skipped += 1;
                continue;
            }
            let mut handler = match handler.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => {
                    warn!(subscriber = id, "handler re-entered by nested publish, skipping");
                    report.skipped += 1;
                    continue;
                }
            };
            match catch_unwind(AssertUnwindSafe(|| (*handler)(message))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(err)) => {
                    error!(subscriber = id, error = %err, "patch handler failed");
                    report.failed += 1;
                }
                Err(payload) => {
                    let reason = payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_default();
                    error!(subscriber = id, panic = %reason, "patch handler panicked");
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Dispose of the channel. Subscribers are dropped, and later publishes
    /// and subscriptions do nothing.
    pub fn close(&self) {
        let mut registry = lock(&self.registry);
        registry.closed = true;
        registry.subscribers.clear();
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.registry).closed
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).subscribers.len()
    }

    fn is_subscribed(&self, id: u64) -> bool {
        lock(&self.registry).subscribers.contains_key(&id)
    }
}

/// Returned by [`PatchChannel::subscribe`].
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Stop receiving messages. Safe to call more than once, and from inside
    /// a handler.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).subscribers.remove(&self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| {
                let registry = lock(&registry);
                registry.subscribers.contains_key(&self.id)
            })
    }
}
