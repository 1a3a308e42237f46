//! Fan-out of "policy values changed" events to registered listeners

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::catalog::PolicyId;

pub trait PolicyListener: Send + Sync {
    fn on_policy_changed(&self, policy: PolicyId);
}

impl<F> PolicyListener for F
where
    F: Fn(PolicyId) + Send + Sync,
{
    fn on_policy_changed(&self, policy: PolicyId) {
        self(policy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

struct Registration {
    id: ListenerId,
    listener: Arc<dyn PolicyListener>,
}

#[derive(Default)]
struct Registry {
    // Keyed by the Arc's data pointer so one listener is registered once
    listeners: BTreeMap<usize, Registration>,
}

/// Shared listener set. Clones share the same registry.
#[derive(Clone, Default)]
pub struct ChangeNotifier {
    registry: Arc<Mutex<Registry>>,
    next_id: Arc<AtomicU64>,
}

fn identity(listener: &Arc<dyn PolicyListener>) -> usize {
    Arc::as_ptr(listener) as *const () as usize
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        // A listener that panicked mid-notify leaves the set itself intact
        self.registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn subscribe(&self, listener: Arc<dyn PolicyListener>) -> ListenerId {
        let mut registry = self.registry();
        let slot = identity(&listener);
        if let Some(existing) = registry.listeners.get(&slot) {
            return existing.id;
        }
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        registry.listeners.insert(slot, Registration { id, listener });
        debug!(listener = id.0, "listener subscribed");
        id
    }

    /// Returns false if `id` was not subscribed
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut registry = self.registry();
        let slot = registry
            .listeners
            .iter()
            .find(|(_, registration)| registration.id == id)
            .map(|(&slot, _)| slot);
        match slot {
            Some(slot) => {
                registry.listeners.remove(&slot);
                debug!(listener = id.0, "listener unsubscribed");
                true
            }
            None => false,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.registry().listeners.len()
    }

    /// Call every current listener synchronously
    pub fn notify_all(&self, policy: PolicyId) {
        // Listeners run outside the lock so they may (un)subscribe
        let listeners: Vec<Arc<dyn PolicyListener>> = self
            .registry()
            .listeners
            .values()
            .map(|registration| registration.listener.clone())
            .collect();
        debug!(policy = ?policy, listeners = listeners.len(), "notifying listeners");
        for listener in listeners {
            listener.on_policy_changed(policy);
        }
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
