//! Notification inbox
//!
//! Derived store of undismissed `notification` messages, newest first.
//! Presence in the inbox is the "unread" signal; records leave only via
//! [`NotificationInbox::clear_notification`] or
//! [`NotificationInbox::clear_all_notifications`].
//!
//! Transient presentation (toasts) is a separate stream: every arriving
//! record is also broadcast to [`NotificationInbox::presentations`]
//! receivers, whether or not anyone later clears it.

use crate::codec::{Message, MessageType, NotificationLevel, Payload};
use crate::registry::{Subscription, SubscriptionRegistry};
use crate::traits::Result;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// A notification retained until cleared
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRecord {
    pub id: String,
    pub title: String,
    pub message: String,
    pub level: NotificationLevel,
    pub action_url: Option<String>,
    pub event_id: Option<String>,
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Shared, cloneable inbox
#[derive(Clone)]
pub struct NotificationInbox {
    records: Arc<RwLock<VecDeque<NotificationRecord>>>,
    presentations: broadcast::Sender<NotificationRecord>,
    generated_ids: Arc<AtomicU64>,
}

impl NotificationInbox {
    /// # Arguments
    /// * `presentation_capacity` - Buffer of the toast broadcast; slow receivers lag, the inbox is unaffected
    pub fn new(presentation_capacity: usize) -> Self {
        let (presentations, _) = broadcast::channel(presentation_capacity.max(1));
        Self {
            records: Arc::new(RwLock::new(VecDeque::new())),
            presentations,
            generated_ids: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Subscribe the inbox to `notification` messages on `registry`
    pub fn attach(&self, registry: &SubscriptionRegistry) -> Subscription {
        let inbox = self.clone();
        registry.subscribe(
            MessageType::Notification,
            move |message: &Message| -> Result<()> {
                inbox.record(message);
                Ok(())
            },
        )
    }

    /// Add a notification message to the front of the inbox
    ///
    /// Returns `None` for any other message type. A record whose id is
    /// already present replaces the older one.
    pub fn record(&self, message: &Message) -> Option<NotificationRecord> {
        let Payload::Notification(ref notification) = message.payload else {
            return None;
        };

        let id = notification.id.clone().unwrap_or_else(|| {
            format!(
                "local-{}",
                self.generated_ids.fetch_add(1, Ordering::Relaxed)
            )
        });

        let record = NotificationRecord {
            id,
            title: notification.title.clone(),
            message: notification.message.clone(),
            level: notification.level,
            action_url: notification.action_url.clone(),
            event_id: message.event_id.clone(),
            user_id: message.user_id.clone(),
            timestamp: message.timestamp,
        };

        {
            let mut records = self.records.write();
            records.retain(|existing| existing.id != record.id);
            records.push_front(record.clone());
        }

        debug!(id = %record.id, level = ?record.level, "Notification added to inbox");
        // No receivers is fine: presentation is optional
        let _ = self.presentations.send(record.clone());

        Some(record)
    }

    /// Snapshot, newest first
    pub fn notifications(&self) -> Vec<NotificationRecord> {
        self.records.read().iter().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<NotificationRecord> {
        self.records.read().iter().find(|record| record.id == id).cloned()
    }

    /// Remove one record; `false` if no record had that id
    pub fn clear_notification(&self, id: &str) -> bool {
        let mut records = self.records.write();
        match records.iter().position(|record| record.id == id) {
            Some(index) => {
                records.remove(index);
                true
            }
            None => false,
        }
    }

    /// Empty the inbox, returning how many records were removed
    pub fn clear_all_notifications(&self) -> usize {
        let mut records = self.records.write();
        let cleared = records.len();
        records.clear();
        cleared
    }

    #[inline]
    pub fn unread_count(&self) -> usize {
        self.records.read().len()
    }

    /// Receive every arriving record for transient display
    pub fn presentations(&self) -> broadcast::Receiver<NotificationRecord> {
        self.presentations.subscribe()
    }
}

impl Default for NotificationInbox {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{NotificationPayload, PaymentUpdatePayload};

    fn notification(id: Option<&str>, title: &str) -> Message {
        Message::new(Payload::Notification(NotificationPayload {
            id: id.map(str::to_string),
            title: title.to_string(),
            message: format!("{} body", title),
            level: NotificationLevel::Info,
            action_url: None,
        }))
    }

    #[test]
    fn test_clear_middle_preserves_order() {
        let registry = SubscriptionRegistry::new();
        let inbox = NotificationInbox::default();
        let _sub = inbox.attach(&registry);

        registry.dispatch(&notification(Some("a"), "first"));
        registry.dispatch(&notification(Some("b"), "second"));
        registry.dispatch(&notification(Some("c"), "third"));
        assert_eq!(inbox.unread_count(), 3);

        assert!(inbox.clear_notification("b"));

        let ids: Vec<String> = inbox.notifications().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["c", "a"]);
        assert_eq!(inbox.unread_count(), 2);
    }

    #[test]
    fn test_clear_unknown_and_clear_all() {
        let inbox = NotificationInbox::default();
        inbox.record(&notification(Some("a"), "first"));
        inbox.record(&notification(Some("b"), "second"));

        assert!(!inbox.clear_notification("zzz"));
        assert_eq!(inbox.clear_all_notifications(), 2);
        assert_eq!(inbox.unread_count(), 0);
        assert!(inbox.notifications().is_empty());
    }

    #[test]
    fn test_missing_ids_are_generated() {
        let inbox = NotificationInbox::default();
        let first = inbox.record(&notification(None, "one")).unwrap();
        let second = inbox.record(&notification(None, "two")).unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(inbox.unread_count(), 2);
        assert!(inbox.get(&first.id).is_some());
    }

    #[test]
    fn test_duplicate_id_moves_to_front() {
        let inbox = NotificationInbox::default();
        inbox.record(&notification(Some("a"), "old"));
        inbox.record(&notification(Some("b"), "other"));
        inbox.record(&notification(Some("a"), "new"));

        let records = inbox.notifications();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "a");
        assert_eq!(records[0].title, "new");
    }

    #[test]
    fn test_other_types_ignored() {
        let inbox = NotificationInbox::default();
        let payment = Message::new(Payload::PaymentUpdate(PaymentUpdatePayload {
            payment_id: "p1".into(),
            status: "succeeded".into(),
            amount: Some(10.0),
            currency: None,
        }));
        assert!(inbox.record(&payment).is_none());
        assert_eq!(inbox.unread_count(), 0);
    }

    #[test]
    fn test_presentation_independent_of_retention() {
        let inbox = NotificationInbox::default();
        let mut toasts = inbox.presentations();

        inbox.record(&notification(Some("a"), "first"));
        inbox.clear_all_notifications();

        let toast = toasts.try_recv().unwrap();
        assert_eq!(toast.id, "a");
        assert_eq!(inbox.unread_count(), 0);
    }
}
