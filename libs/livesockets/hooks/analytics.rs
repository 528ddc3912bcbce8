use super::{Correlation, Fold, LiveHook, DEFAULT_WINDOW};
use crate::codec::{Message, MessageType, Payload};
use crate::registry::SubscriptionRegistry;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, VecDeque};

/// Latest reading of one named metric
#[derive(Debug, Clone, PartialEq)]
pub struct MetricValue {
    pub value: f64,
    pub delta_total: f64,
    pub updates: u64,
    pub updated_at: DateTime<Utc>,
}

/// Per-metric latest values plus a window of recent updates
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsSnapshot {
    pub metrics: BTreeMap<String, MetricValue>,
    /// `(metric, value)` newest first
    pub recent: VecDeque<(String, f64)>,
    window: usize,
}

impl AnalyticsSnapshot {
    pub fn with_window(window: usize) -> Self {
        Self {
            metrics: BTreeMap::new(),
            recent: VecDeque::with_capacity(window),
            window,
        }
    }

    pub fn value(&self, metric: &str) -> Option<f64> {
        self.metrics.get(metric).map(|m| m.value)
    }
}

impl Default for AnalyticsSnapshot {
    fn default() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }
}

impl Fold for AnalyticsSnapshot {
    const KINDS: &'static [MessageType] = &[MessageType::AnalyticsUpdate];

    fn apply(&mut self, message: &Message) -> bool {
        let Payload::AnalyticsUpdate(ref update) = message.payload else {
            return false;
        };

        let entry = self
            .metrics
            .entry(update.metric.clone())
            .or_insert(MetricValue {
                value: update.value,
                delta_total: 0.0,
                updates: 0,
                updated_at: message.timestamp,
            });
        entry.value = update.value;
        entry.delta_total += update.delta.unwrap_or(0.0);
        entry.updates += 1;
        entry.updated_at = message.timestamp;

        if self.window > 0 {
            self.recent.push_front((update.metric.clone(), update.value));
            self.recent.truncate(self.window);
        }
        true
    }
}

pub type AnalyticsHook = LiveHook<AnalyticsSnapshot>;

impl LiveHook<AnalyticsSnapshot> {
    pub fn for_event(registry: &SubscriptionRegistry, event_id: impl Into<String>) -> Self {
        Self::attach(
            registry,
            Correlation::event(event_id),
            AnalyticsSnapshot::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::AnalyticsUpdatePayload;

    fn update(event_id: &str, metric: &str, value: f64, delta: Option<f64>) -> Message {
        Message::new(Payload::AnalyticsUpdate(AnalyticsUpdatePayload {
            metric: metric.to_string(),
            value,
            delta,
        }))
        .with_event_id(event_id)
    }

    #[test]
    fn test_latest_value_and_delta_total() {
        let registry = SubscriptionRegistry::new();
        let hook = AnalyticsHook::for_event(&registry, "E1");

        registry.dispatch(&update("E1", "page_views", 10.0, Some(10.0)));
        registry.dispatch(&update("E1", "page_views", 14.0, Some(4.0)));
        registry.dispatch(&update("E1", "conversions", 2.0, None));
        registry.dispatch(&update("E2", "page_views", 999.0, Some(999.0)));

        let snapshot = hook.snapshot();
        let views = &snapshot.metrics["page_views"];
        assert_eq!(views.value, 14.0);
        assert_eq!(views.delta_total, 14.0);
        assert_eq!(views.updates, 2);
        assert_eq!(snapshot.value("conversions"), Some(2.0));
        assert_eq!(snapshot.value("missing"), None);
    }

    #[test]
    fn test_recent_window_bounded() {
        let mut snapshot = AnalyticsSnapshot::with_window(2);
        for n in 0..4 {
            snapshot.apply(&update("E1", "m", n as f64, None));
        }
        let recent: Vec<f64> = snapshot.recent.iter().map(|(_, v)| *v).collect();
        assert_eq!(recent, vec![3.0, 2.0]);
    }
}
