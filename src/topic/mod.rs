//! Signal categories a target can subscribe to, and their compact string form.

mod filtered;
mod selector;

use std::fmt;

pub use filtered::{encode, FilteredTopic, FilteredTopicBuilder, TopicParseError};
pub use selector::{FieldSelector, FieldSelectorError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Topic {
    TwinEvents,
    LiveEvents,
    LiveCommands,
    LiveMessages,
    PolicyAnnouncements,
    ConnectionAnnouncements,
}

impl Topic {
    pub const ALL: [Topic; 6] = [
        Topic::TwinEvents,
        Topic::LiveEvents,
        Topic::LiveCommands,
        Topic::LiveMessages,
        Topic::PolicyAnnouncements,
        Topic::ConnectionAnnouncements,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Topic::TwinEvents => "_/_/things/twin/events",
            Topic::LiveEvents => "_/_/things/live/events",
            Topic::LiveCommands => "_/_/things/live/commands",
            Topic::LiveMessages => "_/_/things/live/messages",
            Topic::PolicyAnnouncements => "_/_/policies/announcements",
            Topic::ConnectionAnnouncements => "_/_/connections/announcements",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|topic| topic.name() == name)
    }

    pub fn supports_namespaces(self) -> bool {
        !matches!(self, Topic::ConnectionAnnouncements)
    }

    pub fn supports_filter(self) -> bool {
        !matches!(
            self,
            Topic::PolicyAnnouncements | Topic::ConnectionAnnouncements
        )
    }

    pub fn supports_extra_fields(self) -> bool {
        self.supports_filter()
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
