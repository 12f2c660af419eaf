use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn is_user(self) -> bool {
        self == Role::User
    }

    pub fn is_assistant(self) -> bool {
        self == Role::Assistant
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            _ => Err(format!("invalid message role: {value}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_string()
    }
}

/// Identifier of a message within one conversation.
///
/// Server ids come from the backend; local ids are minted by the client for
/// messages that have not been persisted (user sends, the provisional
/// assistant slot, synthetic error messages). The two spaces never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageId {
    Server(i64),
    Local(u64),
}

static NEXT_LOCAL_ID: AtomicU64 = AtomicU64::new(1);

impl MessageId {
    pub fn next_local() -> Self {
        MessageId::Local(NEXT_LOCAL_ID.fetch_add(1, AtomicOrdering::Relaxed))
    }

    pub fn is_local(self) -> bool {
        matches!(self, MessageId::Local(_))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Server(id) => write!(f, "{id}"),
            MessageId::Local(id) => write!(f, "local-{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Set only on the in-flight assistant slot of an active stream.
    pub provisional: bool,
}

impl Message {
    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::next_local(),
            role: Role::User,
            content: content.into(),
            timestamp,
            provisional: false,
        }
    }

    pub fn provisional_assistant(timestamp: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::next_local(),
            role: Role::Assistant,
            content: String::new(),
            timestamp,
            provisional: true,
        }
    }

    pub fn assistant(id: MessageId, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            role: Role::Assistant,
            content: content.into(),
            timestamp,
            provisional: false,
        }
    }

    /// Synthetic assistant-role message used to surface a failure in the transcript.
    pub fn error(content: impl Into<String>) -> Self {
        Self::assistant(MessageId::next_local(), content, Utc::now())
    }

    /// Display order: ascending timestamp, ties broken by id.
    pub fn display_cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| self.id.cmp(&other.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn role_round_trips_through_strings() {
        assert_eq!(Role::try_from("user"), Ok(Role::User));
        assert_eq!(Role::try_from("assistant"), Ok(Role::Assistant));
        assert!(Role::try_from("system").is_err());
        assert_eq!(String::from(Role::Assistant), "assistant");
    }

    #[test]
    fn local_ids_are_unique_and_increasing() {
        let first = MessageId::next_local();
        let second = MessageId::next_local();
        assert!(first < second);
        assert!(first.is_local());
        assert!(!MessageId::Server(7).is_local());
    }

    #[test]
    fn display_order_breaks_timestamp_ties_by_id() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let a = Message::assistant(MessageId::Server(2), "a", ts);
        let b = Message::assistant(MessageId::Server(1), "b", ts);
        assert_eq!(a.display_cmp(&b), Ordering::Greater);

        let later = Message::assistant(MessageId::Server(1), "c", ts + chrono::Duration::seconds(1));
        assert_eq!(a.display_cmp(&later), Ordering::Less);
    }

    #[test]
    fn message_ids_render_for_logs() {
        assert_eq!(MessageId::Server(42).to_string(), "42");
        assert_eq!(MessageId::Local(3).to_string(), "local-3");
    }
}
