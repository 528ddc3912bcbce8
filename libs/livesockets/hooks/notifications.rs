use super::{Correlation, Fold, LiveHook, DEFAULT_WINDOW};
use crate::codec::{Message, MessageType, NotificationLevel, Payload};
use crate::registry::SubscriptionRegistry;
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub message: String,
    pub level: NotificationLevel,
}

/// Recent notifications for one user or event
///
/// Unlike the inbox this is a rolling window: old items fall off and
/// nothing is ever cleared explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationFeed {
    pub items: VecDeque<FeedItem>,
    pub total: u64,
    pub errors: u64,
    window: usize,
}

impl NotificationFeed {
    pub fn with_window(window: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(window),
            total: 0,
            errors: 0,
            window,
        }
    }
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }
}

impl Fold for NotificationFeed {
    const KINDS: &'static [MessageType] = &[MessageType::Notification];

    fn apply(&mut self, message: &Message) -> bool {
        let Payload::Notification(ref notification) = message.payload else {
            return false;
        };

        self.total += 1;
        if notification.level == NotificationLevel::Error {
            self.errors += 1;
        }
        if self.window > 0 {
            self.items.push_front(FeedItem {
                title: notification.title.clone(),
                message: notification.message.clone(),
                level: notification.level,
            });
            self.items.truncate(self.window);
        }
        true
    }
}

pub type NotificationFeedHook = LiveHook<NotificationFeed>;

impl LiveHook<NotificationFeed> {
    pub fn for_user(registry: &SubscriptionRegistry, user_id: impl Into<String>) -> Self {
        Self::attach(
            registry,
            Correlation::user(user_id),
            NotificationFeed::default(),
        )
    }
}
