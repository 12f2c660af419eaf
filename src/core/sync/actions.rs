use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{navigation, pagination, streaming, SyncController};
use crate::api::{ApiError, ConversationPage, MessagePage};
use crate::core::chat_stream::StreamTag;
use crate::core::conversation::{Conversation, ConversationPatch};
use crate::core::message_store::InitialLoad;
use crate::core::title_poll::TitlePollPolicy;

/// What to do with a freshly loaded page of conversations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationLoadMode {
    /// Startup: replace the list, then open `open` or the most recent one.
    Initial { open: Option<i64> },
    /// Replace the list with the first page.
    Refresh,
    /// Append the next page.
    Append,
}

#[derive(Debug)]
pub enum SyncAction {
    Bootstrap {
        open: Option<i64>,
    },
    SelectConversation {
        id: i64,
    },
    OpenConversation {
        id: i64,
    },
    CreateNewChat,
    Send {
        text: String,
    },
    Rename {
        id: i64,
        title: String,
    },
    Delete {
        id: i64,
    },
    LoadOlderMessages,
    LoadMoreConversations,

    ConversationsLoaded {
        mode: ConversationLoadMode,
        result: Result<ConversationPage, ApiError>,
    },
    MessagesLoaded {
        epoch: u64,
        token: u64,
        result: Result<InitialLoad, ApiError>,
    },
    SettleElapsed {
        epoch: u64,
        token: u64,
    },
    DebounceReleased {
        token: u64,
    },
    OlderMessagesLoaded {
        epoch: u64,
        token: u64,
        page: u32,
        result: Result<MessagePage, ApiError>,
    },
    StreamProgress {
        tag: StreamTag,
        content: String,
    },
    StreamCompleted {
        tag: StreamTag,
        content: String,
    },
    StreamFailed {
        tag: StreamTag,
        message: String,
    },
    ConversationCreated {
        epoch: u64,
        token: u64,
        result: Result<Conversation, ApiError>,
        /// First page reloaded after the create; absent if that reload failed.
        first_page: Option<ConversationPage>,
    },
    ConversationUpdated {
        id: i64,
        result: Result<Conversation, ApiError>,
    },
    ConversationDeleted {
        id: i64,
        result: Result<(), ApiError>,
    },
    ConversationFetched {
        epoch: u64,
        id: i64,
        result: Result<Conversation, ApiError>,
    },
    TitlePolled {
        epoch: u64,
        conversation_id: i64,
        conversation: Option<Conversation>,
    },
}

#[derive(Debug)]
pub struct StreamRequest {
    pub conversation_id: i64,
    pub text: String,
    pub tag: StreamTag,
    pub throttle: Duration,
    pub cancel_token: CancellationToken,
}

#[derive(Debug)]
pub enum SyncCommand {
    LoadConversations {
        mode: ConversationLoadMode,
        page: u32,
        per_page: u32,
    },
    LoadMessages {
        epoch: u64,
        token: u64,
        conversation_id: i64,
        per_page: u32,
    },
    LoadMessagePage {
        epoch: u64,
        token: u64,
        conversation_id: i64,
        page: u32,
        per_page: u32,
    },
    OpenStream(StreamRequest),
    CreateConversation {
        epoch: u64,
        token: u64,
        title: String,
        per_page: u32,
    },
    UpdateConversation {
        id: i64,
        patch: ConversationPatch,
    },
    DeleteConversation {
        id: i64,
    },
    FetchConversation {
        epoch: u64,
        id: i64,
    },
    /// Re-save the title unchanged so the backend moves the conversation to
    /// the top, then reload the first page.
    TouchConversation {
        id: i64,
        title: String,
        per_page: u32,
    },
    PollTitle {
        epoch: u64,
        conversation_id: i64,
        policy: TitlePollPolicy,
    },
    ScheduleSettle {
        epoch: u64,
        token: u64,
        delay: Duration,
    },
    ScheduleDebounceRelease {
        token: u64,
        delay: Duration,
    },
}

#[derive(Clone)]
pub struct SyncDispatcher {
    tx: mpsc::UnboundedSender<SyncAction>,
}

impl SyncDispatcher {
    pub fn new(tx: mpsc::UnboundedSender<SyncAction>) -> Self {
        Self { tx }
    }

    pub fn dispatch(&self, action: SyncAction) {
        let _ = self.tx.send(action);
    }

    pub fn dispatch_many<I>(&self, actions: I)
    where
        I: IntoIterator<Item = SyncAction>,
    {
        for action in actions {
            self.dispatch(action);
        }
    }
}

pub fn apply_actions(
    controller: &mut SyncController,
    actions: impl IntoIterator<Item = SyncAction>,
) -> Vec<SyncCommand> {
    let mut commands = Vec::new();
    for action in actions {
        commands.extend(controller.apply_action(action));
    }
    commands
}

impl SyncController {
    pub fn apply_action(&mut self, action: SyncAction) -> Vec<SyncCommand> {
        match action {
            SyncAction::Bootstrap { .. }
            | SyncAction::SelectConversation { .. }
            | SyncAction::OpenConversation { .. }
            | SyncAction::CreateNewChat
            | SyncAction::Rename { .. }
            | SyncAction::Delete { .. }
            | SyncAction::ConversationsLoaded { .. }
            | SyncAction::MessagesLoaded { .. }
            | SyncAction::SettleElapsed { .. }
            | SyncAction::DebounceReleased { .. }
            | SyncAction::ConversationCreated { .. }
            | SyncAction::ConversationUpdated { .. }
            | SyncAction::ConversationDeleted { .. }
            | SyncAction::ConversationFetched { .. } => {
                navigation::handle_navigation_action(self, action)
            }

            SyncAction::Send { .. }
            | SyncAction::StreamProgress { .. }
            | SyncAction::StreamCompleted { .. }
            | SyncAction::StreamFailed { .. }
            | SyncAction::TitlePolled { .. } => streaming::handle_streaming_action(self, action),

            SyncAction::LoadOlderMessages
            | SyncAction::LoadMoreConversations
            | SyncAction::OlderMessagesLoaded { .. } => {
                pagination::handle_pagination_action(self, action)
            }
        }
    }
}
