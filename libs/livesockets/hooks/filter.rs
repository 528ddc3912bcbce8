use crate::codec::Message;

/// Correlation filter applied before a hook sees a message
///
/// Strict string equality on the chosen field. A message without that
/// field never matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Correlation {
    Event(String),
    User(String),
}

impl Correlation {
    pub fn event(id: impl Into<String>) -> Self {
        Correlation::Event(id.into())
    }

    pub fn user(id: impl Into<String>) -> Self {
        Correlation::User(id.into())
    }

    pub fn id(&self) -> &str {
        match self {
            Correlation::Event(id) | Correlation::User(id) => id,
        }
    }

    pub fn matches(&self, message: &Message) -> bool {
        match self {
            Correlation::Event(id) => message.event_id() == Some(id.as_str()),
            Correlation::User(id) => message.user_id() == Some(id.as_str()),
        }
    }
}
