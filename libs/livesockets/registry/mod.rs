//! Subscription registry
//!
//! Per-message-type fan-out:
//!
//! ```text
//!                        ┌─▶ handler #1 (registered first)
//! Message(check_in) ─────┼─▶ handler #4
//!                        └─▶ handler #7 (registered last)
//! ```
//!
//! Each type maps to a copy-on-write handler list. Dispatch clones the
//! `Arc` of the current list and releases the lock before invoking
//! anything, so handlers may subscribe or unsubscribe (themselves or
//! others) without corrupting the iteration. Changes apply to the next
//! dispatch.
//!
//! `dispatch` may run on several threads at once: a handler busy on one
//! thread makes the other wait for it. Only a handler already running on
//! the *same* thread (a handler that dispatches into its own type) is
//! skipped.

pub mod subscription;

pub use subscription::{Subscription, SubscriptionId};

use crate::codec::{Message, MessageType};
use crate::traits::MessageHandler;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, warn};

type SharedHandler = Arc<Mutex<Box<dyn MessageHandler>>>;

thread_local! {
    /// Subscriptions whose handler is running on this thread
    static RUNNING: RefCell<Vec<SubscriptionId>> = const { RefCell::new(Vec::new()) };
}

#[derive(Clone)]
struct Entry {
    id: SubscriptionId,
    handler: SharedHandler,
}

pub(crate) struct RegistryInner {
    next_id: AtomicU64,
    table: RwLock<HashMap<MessageType, Arc<Vec<Entry>>>>,
}

impl RegistryInner {
    pub(crate) fn remove(&self, id: SubscriptionId, kinds: &[MessageType]) {
        let mut table = self.table.write();
        for kind in kinds {
            if let Some(entries) = table.get_mut(kind) {
                if entries.iter().any(|entry| entry.id == id) {
                    Arc::make_mut(entries).retain(|entry| entry.id != id);
                }
                if entries.is_empty() {
                    table.remove(kind);
                }
            }
        }
    }
}

/// Outcome of one dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers that returned `Ok`
    pub delivered: usize,
    /// Handlers that returned `Err` or panicked
    pub failed: usize,
    /// Handlers skipped because they were already running on this thread (re-entrant dispatch)
    pub skipped: usize,
}

/// Registry of message handlers, cheap to clone and share
#[derive(Clone)]
pub struct SubscriptionRegistry {
    inner: Arc<RegistryInner>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                next_id: AtomicU64::new(1),
                table: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Register `handler` for messages of `kind`
    pub fn subscribe<H>(&self, kind: MessageType, handler: H) -> Subscription
    where
        H: MessageHandler,
    {
        self.subscribe_all(&[kind], handler)
    }

    /// Register one handler for several message types
    ///
    /// A message is still delivered at most once per dispatch since it has
    /// exactly one type.
    pub fn subscribe_all<H>(&self, kinds: &[MessageType], handler: H) -> Subscription
    where
        H: MessageHandler,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let handler: SharedHandler = Arc::new(Mutex::new(Box::new(handler)));

        let mut unique: Vec<MessageType> = Vec::with_capacity(kinds.len());
        for kind in kinds {
            if !unique.contains(kind) {
                unique.push(*kind);
            }
        }

        {
            let mut table = self.inner.table.write();
            for kind in &unique {
                let entries = table.entry(*kind).or_default();
                Arc::make_mut(entries).push(Entry {
                    id,
                    handler: Arc::clone(&handler),
                });
            }
        }

        Subscription::new(id, unique, Arc::downgrade(&self.inner))
    }

    /// Invoke every handler registered for the message's type
    ///
    /// Handlers run synchronously, in registration order, each isolated:
    /// an `Err` or a panic is logged and counted, and delivery continues.
    pub fn dispatch(&self, message: &Message) -> DispatchReport {
        let kind = message.kind();
        let snapshot = match self.inner.table.read().get(&kind) {
            Some(entries) => Arc::clone(entries),
            None => return DispatchReport::default(),
        };

        let mut report = DispatchReport::default();
        for entry in snapshot.iter() {
            if RUNNING.with(|running| running.borrow().contains(&entry.id)) {
                warn!(
                    kind = %kind,
                    subscription = entry.id,
                    "Handler already running, skipping re-entrant dispatch"
                );
                report.skipped += 1;
                continue;
            }

            let mut handler = entry.handler.lock();
            RUNNING.with(|running| running.borrow_mut().push(entry.id));
            let outcome = catch_unwind(AssertUnwindSafe(|| handler.handle(message)));
            RUNNING.with(|running| {
                running.borrow_mut().pop();
            });
            drop(handler);

            match outcome {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    warn!(kind = %kind, subscription = entry.id, error = %e, "Handler failed");
                    report.failed += 1;
                }
                Err(panic) => {
                    error!(
                        kind = %kind,
                        subscription = entry.id,
                        reason = panic_reason(panic.as_ref()),
                        "Handler panicked"
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Number of handlers currently registered for `kind`
    pub fn handler_count(&self, kind: MessageType) -> usize {
        self.inner
            .table
            .read()
            .get(&kind)
            .map_or(0, |entries| entries.len())
    }

    /// Number of live registrations across all types
    pub fn subscription_count(&self) -> usize {
        let table = self.inner.table.read();
        let mut ids: Vec<SubscriptionId> = table
            .values()
            .flat_map(|entries| entries.iter().map(|entry| entry.id))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_reason(panic: &(dyn Any + Send)) -> &str {
    if let Some(reason) = panic.downcast_ref::<&'static str>() {
        reason
    } else if let Some(reason) = panic.downcast_ref::<String>() {
        reason.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CheckInPayload, Payload};
    use crate::traits::LiveError;

    fn check_in() -> Message {
        Message::new(Payload::CheckIn(CheckInPayload {
            attendee_id: "A1".into(),
            attendee_name: None,
            ticket_type: None,
            gate: None,
        }))
        .with_event_id("E1")
    }

    fn recorder(log: &Arc<Mutex<Vec<u32>>>, tag: u32) -> impl MessageHandler {
        let log = Arc::clone(log);
        move |_: &Message| -> crate::Result<()> {
            log.lock().push(tag);
            Ok(())
        }
    }

    #[test]
    fn test_dispatch_in_subscription_order() {
        let registry = SubscriptionRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let subs: Vec<Subscription> = (0..5)
            .map(|tag| registry.subscribe(MessageType::CheckIn, recorder(&log, tag)))
            .collect();

        let report = registry.dispatch(&check_in());

        assert_eq!(*log.lock(), vec![0, 1, 2, 3, 4]);
        assert_eq!(report.delivered, 5);
        assert_eq!(subs.len(), 5);
    }

    #[test]
    fn test_dispatch_only_reaches_matching_type() {
        let registry = SubscriptionRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let _sub = registry.subscribe(MessageType::TicketUpdate, recorder(&log, 1));

        let report = registry.dispatch(&check_in());

        assert!(log.lock().is_empty());
        assert_eq!(report, DispatchReport::default());
    }

    #[test]
    fn test_unsubscribe_before_dispatch_and_twice() {
        let registry = SubscriptionRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = registry.subscribe(MessageType::CheckIn, recorder(&log, 1));
        let _second = registry.subscribe(MessageType::CheckIn, recorder(&log, 2));

        first.unsubscribe();
        first.unsubscribe();
        assert!(!first.is_active());

        registry.dispatch(&check_in());
        registry.dispatch(&check_in());

        assert_eq!(*log.lock(), vec![2, 2]);
        assert_eq!(registry.handler_count(MessageType::CheckIn), 1);
    }

    #[test]
    fn test_drop_unsubscribes_and_detach_keeps() {
        let registry = SubscriptionRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        drop(registry.subscribe(MessageType::CheckIn, recorder(&log, 1)));
        registry
            .subscribe(MessageType::CheckIn, recorder(&log, 2))
            .detach();

        registry.dispatch(&check_in());

        assert_eq!(*log.lock(), vec![2]);
    }

    #[test]
    fn test_failing_handlers_are_isolated() {
        let registry = SubscriptionRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let _erroring = registry.subscribe(MessageType::CheckIn, |_: &Message| -> crate::Result<()> {
            Err(LiveError::Handler("first handler refuses".into()))
        });
        let _panicking = registry.subscribe(MessageType::CheckIn, |_: &Message| -> crate::Result<()> {
            panic!("second handler explodes")
        });
        let _third = registry.subscribe(MessageType::CheckIn, recorder(&log, 3));

        let report = registry.dispatch(&check_in());

        assert_eq!(*log.lock(), vec![3]);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 2);

        // Panicking handler stays registered and usable
        let report = registry.dispatch(&check_in());
        assert_eq!(report.failed, 2);
        assert_eq!(*log.lock(), vec![3, 3]);
    }

    #[test]
    fn test_unsubscribe_during_dispatch_uses_snapshot() {
        let registry = SubscriptionRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let slot = Arc::clone(&victim);
        let first_log = Arc::clone(&log);
        let _first = registry.subscribe(MessageType::CheckIn, move |_: &Message| -> crate::Result<()> {
            first_log.lock().push(1);
            if let Some(sub) = slot.lock().take() {
                sub.unsubscribe();
            }
            Ok(())
        });
        let second = registry.subscribe(MessageType::CheckIn, recorder(&log, 2));
        *victim.lock() = Some(second);

        // In-flight dispatch still reaches the handler removed mid-loop
        registry.dispatch(&check_in());
        assert_eq!(*log.lock(), vec![1, 2]);

        registry.dispatch(&check_in());
        assert_eq!(*log.lock(), vec![1, 2, 1]);
    }

    #[test]
    fn test_handler_can_unsubscribe_itself() {
        let registry = SubscriptionRegistry::new();
        let calls = Arc::new(Mutex::new(0u32));
        let own: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let slot = Arc::clone(&own);
        let counter = Arc::clone(&calls);
        let sub = registry.subscribe(MessageType::CheckIn, move |_: &Message| -> crate::Result<()> {
            *counter.lock() += 1;
            if let Some(sub) = slot.lock().as_ref() {
                sub.unsubscribe();
            }
            Ok(())
        });
        *own.lock() = Some(sub);

        registry.dispatch(&check_in());
        registry.dispatch(&check_in());

        assert_eq!(*calls.lock(), 1);
        assert_eq!(registry.handler_count(MessageType::CheckIn), 0);
    }

    #[test]
    fn test_subscribe_during_dispatch_applies_next_time() {
        let registry = SubscriptionRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let added: Arc<Mutex<Vec<Subscription>>> = Arc::new(Mutex::new(Vec::new()));

        let inner_registry = registry.clone();
        let inner_log = Arc::clone(&log);
        let holder = Arc::clone(&added);
        let _sub = registry.subscribe(MessageType::CheckIn, move |_: &Message| -> crate::Result<()> {
            let mut holder = holder.lock();
            if holder.is_empty() {
                holder.push(inner_registry.subscribe(MessageType::CheckIn, recorder(&inner_log, 9)));
            }
            Ok(())
        });

        registry.dispatch(&check_in());
        assert!(log.lock().is_empty());

        registry.dispatch(&check_in());
        assert_eq!(*log.lock(), vec![9]);
    }

    #[test]
    fn test_subscribe_all_deduplicates_kinds() {
        let registry = SubscriptionRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let sub = registry.subscribe_all(
            &[MessageType::CheckIn, MessageType::TicketUpdate, MessageType::CheckIn],
            recorder(&log, 1),
        );

        assert_eq!(sub.kinds(), &[MessageType::CheckIn, MessageType::TicketUpdate]);
        assert_eq!(registry.subscription_count(), 1);

        registry.dispatch(&check_in());
        assert_eq!(*log.lock(), vec![1]);

        drop(sub);
        assert_eq!(registry.handler_count(MessageType::TicketUpdate), 0);
        assert_eq!(registry.subscription_count(), 0);
    }

    #[test]
    fn test_reentrant_dispatch_skips_running_handler() {
        let registry = SubscriptionRegistry::new();
        let calls = Arc::new(Mutex::new(0u32));
        let inner_reports = Arc::new(Mutex::new(Vec::new()));

        let inner_registry = registry.clone();
        let counter = Arc::clone(&calls);
        let reports = Arc::clone(&inner_reports);
        let _sub = registry.subscribe(MessageType::CheckIn, move |message: &Message| -> crate::Result<()> {
            let first = {
                let mut calls = counter.lock();
                *calls += 1;
                *calls == 1
            };
            if first {
                reports.lock().push(inner_registry.dispatch(message));
            }
            Ok(())
        });

        let report = registry.dispatch(&check_in());

        assert_eq!(report.delivered, 1);
        assert_eq!(*calls.lock(), 1);
        assert_eq!(inner_reports.lock()[0].skipped, 1);
        assert_eq!(inner_reports.lock()[0].delivered, 0);
    }

    #[test]
    fn test_concurrent_dispatch_waits_instead_of_skipping() {
        let registry = SubscriptionRegistry::new();
        let calls = Arc::new(Mutex::new(0u32));

        let counter = Arc::clone(&calls);
        let _slow = registry.subscribe(MessageType::CheckIn, move |_: &Message| -> crate::Result<()> {
            std::thread::sleep(std::time::Duration::from_millis(50));
            *counter.lock() += 1;
            Ok(())
        });

        let barrier = Arc::new(std::sync::Barrier::new(2));
        let workers: Vec<_> = (0..2)
            .map(|_| {
                let registry = registry.clone();
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    registry.dispatch(&check_in())
                })
            })
            .collect();

        for worker in workers {
            let report = worker.join().unwrap();
            assert_eq!(report.delivered, 1);
            assert_eq!(report.skipped, 0);
        }
        assert_eq!(*calls.lock(), 2);
    }

    #[test]
    fn test_subscription_outliving_registry() {
        let registry = SubscriptionRegistry::new();
        let sub = registry.subscribe(MessageType::Pong, |_: &Message| -> crate::Result<()> { Ok(()) });
        drop(registry);

        assert!(!sub.is_active());
        sub.unsubscribe();
    }
}
