//! Backend collaborator interface.
//!
//! [`ChatBackend`] is the seam between the reconciliation engine and the
//! chat service. [`http::HttpBackend`] talks to the REST + event-stream API;
//! tests substitute the scripted fake in `utils::test_utils`.

use std::error::Error as StdError;
use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::core::conversation::{Conversation, ConversationPatch};
use crate::core::message::Message;

pub mod http;
pub mod models;

/// Raw response body chunks of a message stream. Chunk boundaries are
/// arbitrary and need not line up with event frames.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, ApiError>> + Send>>;

/// One page of the conversation list, most recently updated first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationPage {
    pub items: Vec<Conversation>,
    pub has_more: bool,
    pub page: u32,
    pub total: u64,
}

/// One page of a conversation's messages. Page 1 holds the oldest messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePage {
    pub items: Vec<Message>,
    pub total: u64,
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn list_conversations(&self, page: u32, per_page: u32)
        -> Result<ConversationPage, ApiError>;

    async fn list_messages(
        &self,
        conversation_id: i64,
        page: u32,
        per_page: u32,
    ) -> Result<MessagePage, ApiError>;

    async fn create_conversation(&self, title: &str) -> Result<Conversation, ApiError>;

    async fn update_conversation(
        &self,
        id: i64,
        patch: &ConversationPatch,
    ) -> Result<Conversation, ApiError>;

    async fn delete_conversation(&self, id: i64) -> Result<(), ApiError>;

    /// Fails with [`ApiError::NotFound`] when the conversation does not exist.
    async fn fetch_conversation(&self, id: i64) -> Result<Conversation, ApiError>;

    /// Submits `text` as a user message and returns the reply body as it arrives.
    async fn open_message_stream(
        &self,
        conversation_id: i64,
        text: &str,
    ) -> Result<ByteStream, ApiError>;
}

#[derive(Debug)]
pub enum ApiError {
    Transport(reqwest::Error),
    Status { status: u16, body: String },
    NotFound { what: String },
    Decode(serde_json::Error),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Transport(err) => write!(f, "request failed: {err}"),
            ApiError::Status { status, body } => {
                if body.trim().is_empty() {
                    write!(f, "server responded with status {status}")
                } else {
                    write!(f, "server responded with status {status}: {}", body.trim())
                }
            }
            ApiError::NotFound { what } => write!(f, "{what} not found"),
            ApiError::Decode(err) => write!(f, "unexpected response body: {err}"),
        }
    }
}

impl StdError for ApiError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ApiError::Transport(err) => Some(err),
            ApiError::Decode(err) => Some(err),
            ApiError::Status { .. } | ApiError::NotFound { .. } => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err)
    }
}

/// Serde helper for backend timestamps.
///
/// The backend emits naive ISO-8601 strings (`2024-03-01T10:05:30.250000`)
/// which are UTC; offsets are accepted as well.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }
}
