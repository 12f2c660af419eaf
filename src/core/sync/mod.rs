//! Conversation synchronisation state machine.
//!
//! [`SyncController`] is a synchronous reducer: intents from the front-end
//! and results from background work arrive as [`SyncAction`]s, and every
//! side effect leaves as a [`SyncCommand`] for the executor. Results carry
//! the epoch that was current when their work started; the epoch moves on
//! every conversation switch, so anything that arrives late is dropped
//! instead of landing in the wrong transcript.

mod actions;
mod navigation;
mod pagination;
mod streaming;
mod view;


use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::chat_stream::StreamTag;
use crate::core::conversation::Conversation;
use crate::core::conversation_list::ConversationList;
use crate::core::message::MessageId;
use crate::core::message_store::MessageStore;
use crate::core::title_poll::TitlePollPolicy;

pub use actions::{
    apply_actions, ConversationLoadMode, StreamRequest, SyncAction, SyncCommand, SyncDispatcher,
};
pub use view::{ViewMessage, ViewModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    SwitchingConversation,
    Streaming,
    CreatingConversation,
}

impl SyncState {
    pub fn label(self) -> &'static str {
        match self {
            SyncState::Idle => "idle",
            SyncState::SwitchingConversation => "loading",
            SyncState::Streaming => "streaming",
            SyncState::CreatingConversation => "creating",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub messages_per_page: u32,
    pub conversations_per_page: u32,
    pub stream_throttle: Duration,
    pub switch_debounce: Duration,
    pub settle_delay: Duration,
    pub title_poll: TitlePollPolicy,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            messages_per_page: 10,
            conversations_per_page: 10,
            stream_throttle: Duration::from_millis(50),
            switch_debounce: Duration::from_millis(300),
            settle_delay: Duration::from_millis(100),
            title_poll: TitlePollPolicy::default(),
        }
    }
}

/// Intents the controller refuses in its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    EmptyInput,
    Busy,
    NoConversation,
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::EmptyInput => write!(f, "Nothing to send"),
            SyncError::Busy => write!(f, "Please wait for the current reply to finish"),
            SyncError::NoConversation => write!(f, "Start or pick a conversation first"),
        }
    }
}

impl std::error::Error for SyncError {}

/// Notifications for the front-end that are not part of the view model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    TitleRevealed { conversation_id: i64, title: String },
    Notice(String),
}

#[derive(Debug)]
struct ActiveStream {
    stream_id: u64,
    temp_id: MessageId,
    conversation_id: i64,
    cancel: CancellationToken,
}

pub struct SyncController {
    settings: SyncSettings,
    state: SyncState,
    epoch: u64,
    next_stream_id: u64,
    next_token: u64,
    /// Token of the switch whose debounce window is still open.
    debounce: Option<u64>,
    store: MessageStore,
    conversations: ConversationList,
    active: Option<Conversation>,
    /// Conversation to return to when creating a new one fails.
    creating_from: Option<Conversation>,
    stream: Option<ActiveStream>,
    older_page_request: Option<u64>,
    conversation_page_in_flight: bool,
    title_polled: HashSet<i64>,
    events: Vec<SyncEvent>,
}

impl SyncController {
    pub fn new(settings: SyncSettings) -> Self {
        Self {
            settings,
            state: SyncState::Idle,
            epoch: 0,
            next_stream_id: 0,
            next_token: 0,
            debounce: None,
            store: MessageStore::new(),
            conversations: ConversationList::new(),
            active: None,
            creating_from: None,
            stream: None,
            older_page_request: None,
            conversation_page_in_flight: false,
            title_polled: HashSet::new(),
            events: Vec::new(),
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn conversations(&self) -> &ConversationList {
        &self.conversations
    }

    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.active.as_ref()
    }

    pub fn active_id(&self) -> Option<i64> {
        self.active.as_ref().map(|conversation| conversation.id)
    }

    pub fn is_debounced(&self) -> bool {
        self.debounce.is_some()
    }

    pub fn drain_events(&mut self) -> Vec<SyncEvent> {
        std::mem::take(&mut self.events)
    }

    fn notice(&mut self, text: impl Into<String>) {
        self.events.push(SyncEvent::Notice(text.into()));
    }

    fn reject(&mut self, error: SyncError) {
        debug!(%error, state = ?self.state, "intent rejected");
        self.notice(error.to_string());
    }

    fn next_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    /// Invalidate every in-flight result and detach from the current stream.
    /// The stream keeps draining in the background so the reply is persisted.
    fn bump_epoch(&mut self) {
        self.epoch += 1;
        self.older_page_request = None;
        if let Some(stream) = self.stream.take() {
            debug!(
                stream_id = stream.stream_id,
                conversation_id = stream.conversation_id,
                "detaching reply stream"
            );
            stream.cancel.cancel();
        }
    }

    fn is_current_epoch(&self, epoch: u64, what: &str) -> bool {
        if epoch == self.epoch {
            return true;
        }
        debug!(epoch, current = self.epoch, what, "dropping stale result");
        false
    }

    fn is_current_stream(&self, tag: StreamTag) -> bool {
        tag.epoch == self.epoch
            && self
                .stream
                .as_ref()
                .is_some_and(|stream| stream.stream_id == tag.stream_id)
    }
}
