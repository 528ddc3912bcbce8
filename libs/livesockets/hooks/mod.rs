//! Domain hooks
//!
//! A hook subscribes to a fixed set of message types, drops everything
//! whose correlation id does not match, and folds the rest into a local
//! aggregate:
//!
//! ```text
//! Registry ──▶ Correlation filter ──▶ Fold::apply ──▶ shared state ──▶ callback
//!                   │
//!                   └── mismatch: dropped, state and callback untouched
//! ```
//!
//! Aggregates are counters or fixed-size recent windows; nothing grows
//! without bound.

pub mod analytics;
pub mod event_stats;
pub mod filter;
pub mod notifications;

pub use analytics::{AnalyticsHook, AnalyticsSnapshot, MetricValue};
pub use event_stats::{EventStats, EventStatsHook, RecentCheckIn};
pub use filter::Correlation;
pub use notifications::{FeedItem, NotificationFeed, NotificationFeedHook};

use crate::codec::{Message, MessageType};
use crate::registry::{Subscription, SubscriptionRegistry};
use crate::traits::Result;
use parking_lot::RwLock;
use std::sync::Arc;

/// Default size of recent-item windows
pub const DEFAULT_WINDOW: usize = 10;

/// Aggregate state maintained by a hook
pub trait Fold: Clone + Send + Sync + 'static {
    /// Message types this aggregate consumes
    const KINDS: &'static [MessageType];

    /// Fold one matching message into the aggregate
    ///
    /// Returns `false` when the message left the aggregate unchanged.
    fn apply(&mut self, message: &Message) -> bool;
}

type Callback<S> = Box<dyn FnMut(&S, &Message) + Send>;

/// Subscription + correlation filter + aggregate
///
/// Dropping the hook releases its subscription.
pub struct LiveHook<S: Fold> {
    filter: Correlation,
    state: Arc<RwLock<S>>,
    subscription: Subscription,
}

impl<S: Fold> LiveHook<S> {
    /// Attach with an initial aggregate and no callback
    pub fn attach(registry: &SubscriptionRegistry, filter: Correlation, initial: S) -> Self {
        Self::attach_inner(registry, filter, initial, None)
    }

    /// Attach and invoke `callback` after each matching message that changed the aggregate
    pub fn attach_with_callback<F>(
        registry: &SubscriptionRegistry,
        filter: Correlation,
        initial: S,
        callback: F,
    ) -> Self
    where
        F: FnMut(&S, &Message) + Send + 'static,
    {
        Self::attach_inner(registry, filter, initial, Some(Box::new(callback)))
    }

    fn attach_inner(
        registry: &SubscriptionRegistry,
        filter: Correlation,
        initial: S,
        mut callback: Option<Callback<S>>,
    ) -> Self {
        let state = Arc::new(RwLock::new(initial));

        let handler_state = Arc::clone(&state);
        let handler_filter = filter.clone();
        let subscription = registry.subscribe_all(S::KINDS, move |message: &Message| -> Result<()> {
            if !handler_filter.matches(message) {
                return Ok(());
            }

            let mut state = handler_state.write();
            if !state.apply(message) {
                return Ok(());
            }

            // Call back on a copy so the callback may read the hook
            if let Some(callback) = callback.as_mut() {
                let snapshot = state.clone();
                drop(state);
                callback(&snapshot, message);
            }
            Ok(())
        });

        Self {
            filter,
            state,
            subscription,
        }
    }

    /// Copy of the current aggregate
    pub fn snapshot(&self) -> S {
        self.state.read().clone()
    }

    /// Read the aggregate without cloning it
    pub fn with<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.state.read())
    }

    pub fn filter(&self) -> &Correlation {
        &self.filter
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_active()
    }

    /// Stop receiving messages; the aggregate stays readable
    pub fn detach(&self) {
        self.subscription.unsubscribe();
    }
}
