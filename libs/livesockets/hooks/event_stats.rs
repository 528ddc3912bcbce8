//! Live event dashboard counters

use super::{Correlation, Fold, LiveHook, DEFAULT_WINDOW};
use crate::codec::{AttendeeAction, Message, MessageType, Payload};
use crate::registry::SubscriptionRegistry;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq)]
pub struct RecentCheckIn {
    pub attendee_id: String,
    pub attendee_name: Option<String>,
    pub ticket_type: Option<String>,
    pub at: DateTime<Utc>,
}

/// Running totals for one event
///
/// "Today" is the UTC date of the newest ticket message seen; a ticket
/// message dated later rolls the daily counters over.
#[derive(Debug, Clone, PartialEq)]
pub struct EventStats {
    pub tickets_sold_today: u64,
    pub revenue_today: f64,
    pub tickets_sold_total: u64,
    pub check_ins: u64,
    pub live_attendees: u64,
    pub recent_check_ins: VecDeque<RecentCheckIn>,
    pub day: Option<NaiveDate>,
    pub last_updated: Option<DateTime<Utc>>,
    window: usize,
}

impl EventStats {
    pub fn with_window(window: usize) -> Self {
        Self {
            tickets_sold_today: 0,
            revenue_today: 0.0,
            tickets_sold_total: 0,
            check_ins: 0,
            live_attendees: 0,
            recent_check_ins: VecDeque::with_capacity(window),
            day: None,
            last_updated: None,
            window,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl Default for EventStats {
    fn default() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }
}

impl Fold for EventStats {
    const KINDS: &'static [MessageType] = &[
        MessageType::TicketUpdate,
        MessageType::CheckIn,
        MessageType::AttendeeUpdate,
    ];

    fn apply(&mut self, message: &Message) -> bool {
        let changed = match &message.payload {
            Payload::TicketUpdate(ticket) => {
                let quantity = u64::from(ticket.quantity);
                self.tickets_sold_total += quantity;

                let date = message.timestamp.date_naive();
                match self.day {
                    Some(day) if date < day => {}
                    Some(day) if date == day => {
                        self.tickets_sold_today += quantity;
                        self.revenue_today += ticket.amount;
                    }
                    _ => {
                        self.day = Some(date);
                        self.tickets_sold_today = quantity;
                        self.revenue_today = ticket.amount;
                    }
                }
                true
            }
            Payload::CheckIn(check_in) => {
                self.check_ins += 1;
                if self.window > 0 {
                    self.recent_check_ins.push_front(RecentCheckIn {
                        attendee_id: check_in.attendee_id.clone(),
                        attendee_name: check_in.attendee_name.clone(),
                        ticket_type: check_in.ticket_type.clone(),
                        at: message.timestamp,
                    });
                    self.recent_check_ins.truncate(self.window);
                }
                true
            }
            Payload::AttendeeUpdate(update) => match update.action {
                AttendeeAction::Registered => {
                    self.live_attendees += 1;
                    true
                }
                AttendeeAction::Cancelled => {
                    self.live_attendees = self.live_attendees.saturating_sub(1);
                    true
                }
                AttendeeAction::Updated | AttendeeAction::Other => false,
            },
            _ => false,
        };

        if changed {
            self.last_updated = Some(message.timestamp);
        }
        changed
    }
}

/// Event dashboard hook
pub type EventStatsHook = LiveHook<EventStats>;

impl LiveHook<EventStats> {
    /// Track `event_id` with the default recent window
    pub fn for_event(registry: &SubscriptionRegistry, event_id: impl Into<String>) -> Self {
        Self::attach(registry, Correlation::event(event_id), EventStats::default())
    }

    pub fn stats(&self) -> EventStats {
        self.snapshot()
    }
}
