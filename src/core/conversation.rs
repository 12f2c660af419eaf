use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::timestamp;

/// Title the backend assigns to fresh conversations; eligible for auto-titling.
pub const DEFAULT_TITLE: &str = "New Chat";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Conversation {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title,
            _ => DEFAULT_TITLE,
        }
    }

    /// True while the conversation still carries no title or the sentinel default.
    pub fn has_default_title(&self) -> bool {
        is_default_title(self.title.as_deref())
    }
}

pub fn is_default_title(title: Option<&str>) -> bool {
    match title {
        None => true,
        Some(title) => title.trim().is_empty() || title == DEFAULT_TITLE,
    }
}

/// Fields a rename or title refresh may change.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ConversationPatch {
    pub title: Option<String>,
}

impl ConversationPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
        }
    }

    pub fn apply(&self, conversation: &mut Conversation) {
        if let Some(title) = &self.title {
            conversation.title = Some(title.clone());
        }
    }
}
