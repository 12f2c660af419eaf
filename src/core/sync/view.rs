use chrono::{DateTime, Utc};

use super::{SyncController, SyncState};
use crate::core::conversation::Conversation;
use crate::core::markdown_repair::repair_for_display;
use crate::core::message::{MessageId, Role};

/// A message as the front-end should draw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewMessage {
    pub id: MessageId,
    pub role: Role,
    /// Content with partial Markdown closed; carries the cursor while streaming.
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub provisional: bool,
}

/// Snapshot of everything the front-end renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewModel {
    pub messages: Vec<ViewMessage>,
    pub conversations: Vec<Conversation>,
    pub active_conversation: Option<Conversation>,
    pub is_streaming: bool,
    pub has_more_messages: bool,
    pub has_more_conversations: bool,
    pub state: SyncState,
}

impl SyncController {
    pub fn view_model(&self) -> ViewModel {
        let messages = self
            .store
            .messages()
            .iter()
            .map(|message| ViewMessage {
                id: message.id,
                role: message.role,
                text: repair_for_display(&message.content, message.provisional),
                timestamp: message.timestamp,
                provisional: message.provisional,
            })
            .collect();

        ViewModel {
            messages,
            conversations: self.conversations.items().to_vec(),
            active_conversation: self.active.clone(),
            is_streaming: self.state == SyncState::Streaming,
            has_more_messages: self.store.has_more_older(),
            has_more_conversations: self.conversations.has_more(),
            state: self.state,
        }
    }
}
