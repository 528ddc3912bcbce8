use super::RegistryInner;
use crate::codec::MessageType;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Weak;

/// Identifier of one registration, unique per registry
pub type SubscriptionId = u64;

/// Handle to a registered handler
///
/// Dropping the handle unsubscribes. `unsubscribe()` may be called any
/// number of times, from anywhere, including from inside a handler while a
/// dispatch is running. A dispatch already in flight still delivers to the
/// handler; later dispatches do not.
#[must_use = "dropping a Subscription unsubscribes its handler immediately"]
pub struct Subscription {
    id: SubscriptionId,
    kinds: Vec<MessageType>,
    registry: Weak<RegistryInner>,
    active: AtomicBool,
    detached: bool,
}

impl Subscription {
    pub(super) fn new(
        id: SubscriptionId,
        kinds: Vec<MessageType>,
        registry: Weak<RegistryInner>,
    ) -> Self {
        Self {
            id,
            kinds,
            registry,
            active: AtomicBool::new(true),
            detached: false,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn kinds(&self) -> &[MessageType] {
        &self.kinds
    }

    /// Still registered (and the registry still alive)
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire) && self.registry.strong_count() > 0
    }

    /// Remove the handler from future dispatches. Idempotent.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id, &self.kinds);
        }
    }

    /// Keep the handler registered for the lifetime of the registry
    pub fn detach(mut self) {
        self.detached = true;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.detached {
            self.unsubscribe();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("kinds", &self.kinds)
            .field("active", &self.is_active())
            .finish()
    }
}
