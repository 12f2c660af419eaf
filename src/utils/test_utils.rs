use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::mpsc;

use crate::api::{ApiError, ByteStream, ChatBackend, ConversationPage, MessagePage};
use crate::core::conversation::{Conversation, ConversationPatch, DEFAULT_TITLE};
use crate::core::message::{Message, MessageId, Role};

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

pub fn create_test_conversation(id: i64, title: Option<&str>, minutes: i64) -> Conversation {
    Conversation {
        id,
        title: title.map(str::to_string),
        updated_at: base_time() + Duration::minutes(minutes),
    }
}

/// Server message `id` with a timestamp `id` seconds after [`base_time`].
pub fn create_test_message(id: i64, role: Role, content: &str) -> Message {
    Message {
        id: MessageId::Server(id),
        role,
        content: content.to_string(),
        timestamp: base_time() + Duration::seconds(id),
        provisional: false,
    }
}

pub fn byte_stream(chunks: &[&str]) -> ByteStream {
    let chunks: Vec<Result<Vec<u8>, ApiError>> = chunks
        .iter()
        .map(|chunk| Ok(chunk.as_bytes().to_vec()))
        .collect();
    Box::pin(futures_util::stream::iter(chunks))
}

fn channel_stream(rx: mpsc::UnboundedReceiver<Result<Vec<u8>, ApiError>>) -> ByteStream {
    Box::pin(futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeOp {
    ListConversations,
    ListMessages,
    Create,
    Update,
    Delete,
    Fetch,
    Stream,
}

enum ScriptedStream {
    Chunks(Vec<String>),
    Channel(mpsc::UnboundedReceiver<Result<Vec<u8>, ApiError>>),
}

#[derive(Default)]
struct FakeState {
    conversations: Vec<Conversation>,
    messages: HashMap<i64, Vec<Message>>,
    streams: HashMap<i64, VecDeque<ScriptedStream>>,
    failures: HashMap<FakeOp, VecDeque<ApiError>>,
    pending_titles: HashMap<i64, (usize, String)>,
    sent: Vec<(i64, String)>,
    message_requests: Vec<(i64, u32)>,
    fetches: Vec<i64>,
    updates: Vec<(i64, Option<String>)>,
    next_conversation_id: i64,
}

/// In-memory [`ChatBackend`] with scripted replies.
///
/// Conversations are listed most recently updated first; messages are paged
/// oldest first, as the real service does.
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_conversation_id: 1000,
                ..FakeState::default()
            }),
        }
    }

    pub fn add_conversation(&self, conversation: Conversation) {
        let mut state = self.state.lock().unwrap();
        state.messages.entry(conversation.id).or_default();
        state.conversations.push(conversation);
    }

    /// Seed `count` alternating user/assistant messages with ids
    /// `first_id..first_id + count`.
    pub fn seed_messages(&self, conversation_id: i64, first_id: i64, count: i64) {
        let mut state = self.state.lock().unwrap();
        let messages = state.messages.entry(conversation_id).or_default();
        for id in first_id..first_id + count {
            let role = if (id - first_id) % 2 == 0 {
                Role::User
            } else {
                Role::Assistant
            };
            messages.push(create_test_message(id, role, &format!("message {id}")));
        }
    }

    pub fn script_stream(&self, conversation_id: i64, chunks: &[&str]) {
        let chunks = chunks.iter().map(|chunk| chunk.to_string()).collect();
        self.state
            .lock()
            .unwrap()
            .streams
            .entry(conversation_id)
            .or_default()
            .push_back(ScriptedStream::Chunks(chunks));
    }

    /// Script a stream whose chunks the test feeds by hand.
    pub fn stream_channel(
        &self,
        conversation_id: i64,
    ) -> mpsc::UnboundedSender<Result<Vec<u8>, ApiError>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state
            .lock()
            .unwrap()
            .streams
            .entry(conversation_id)
            .or_default()
            .push_back(ScriptedStream::Channel(rx));
        tx
    }

    pub fn fail_next(&self, op: FakeOp, error: ApiError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// `fetch_conversation` keeps returning the default title for `fetches`
    /// calls, then reports `title`.
    pub fn title_after(&self, conversation_id: i64, fetches: usize, title: &str) {
        self.state
            .lock()
            .unwrap()
            .pending_titles
            .insert(conversation_id, (fetches, title.to_string()));
    }

    pub fn sent_messages(&self) -> Vec<(i64, String)> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn message_requests(&self) -> Vec<(i64, u32)> {
        self.state.lock().unwrap().message_requests.clone()
    }

    pub fn fetch_count(&self, conversation_id: i64) -> usize {
        let state = self.state.lock().unwrap();
        state.fetches.iter().filter(|id| **id == conversation_id).count()
    }

    pub fn updates(&self) -> Vec<(i64, Option<String>)> {
        self.state.lock().unwrap().updates.clone()
    }

    pub fn conversation_ids(&self) -> Vec<i64> {
        let mut state = self.state.lock().unwrap();
        sort_recent_first(&mut state.conversations);
        state.conversations.iter().map(|conversation| conversation.id).collect()
    }

    fn take_failure(state: &mut FakeState, op: FakeOp) -> Result<(), ApiError> {
        match state.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn sort_recent_first(conversations: &mut [Conversation]) {
    conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
}

fn not_found(id: i64) -> ApiError {
    ApiError::NotFound {
        what: format!("conversation {id}"),
    }
}

fn page_bounds(page: u32, per_page: u32, len: usize) -> (usize, usize) {
    let start = ((page.max(1) - 1) as usize).saturating_mul(per_page as usize);
    let start = start.min(len);
    let end = start.saturating_add(per_page as usize).min(len);
    (start, end)
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn list_conversations(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<ConversationPage, ApiError> {
        let mut state = self.state.lock().unwrap();
        Self::take_failure(&mut state, FakeOp::ListConversations)?;
        sort_recent_first(&mut state.conversations);

        let total = state.conversations.len();
        let (start, end) = page_bounds(page, per_page, total);
        let total_pages = total.div_ceil(per_page.max(1) as usize);
        Ok(ConversationPage {
            items: state.conversations[start..end].to_vec(),
            has_more: (page as usize) < total_pages,
            page,
            total: total as u64,
        })
    }

    async fn list_messages(
        &self,
        conversation_id: i64,
        page: u32,
        per_page: u32,
    ) -> Result<MessagePage, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.message_requests.push((conversation_id, page));
        Self::take_failure(&mut state, FakeOp::ListMessages)?;

        let messages = state
            .messages
            .get(&conversation_id)
            .ok_or_else(|| not_found(conversation_id))?;
        let (start, end) = page_bounds(page, per_page, messages.len());
        Ok(MessagePage {
            items: messages[start..end].to_vec(),
            total: messages.len() as u64,
        })
    }

    async fn create_conversation(&self, title: &str) -> Result<Conversation, ApiError> {
        let mut state = self.state.lock().unwrap();
        Self::take_failure(&mut state, FakeOp::Create)?;

        state.next_conversation_id += 1;
        let id = state.next_conversation_id;
        let newest = state
            .conversations
            .iter()
            .map(|conversation| conversation.updated_at)
            .max()
            .unwrap_or_else(base_time);
        let conversation = Conversation {
            id,
            title: Some(title.to_string()),
            updated_at: newest + Duration::seconds(1),
        };
        state.messages.insert(id, Vec::new());
        state.conversations.push(conversation.clone());
        Ok(conversation)
    }

    async fn update_conversation(
        &self,
        id: i64,
        patch: &ConversationPatch,
    ) -> Result<Conversation, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.updates.push((id, patch.title.clone()));
        Self::take_failure(&mut state, FakeOp::Update)?;

        let newest = state
            .conversations
            .iter()
            .map(|conversation| conversation.updated_at)
            .max()
            .unwrap_or_else(base_time);
        let conversation = state
            .conversations
            .iter_mut()
            .find(|conversation| conversation.id == id)
            .ok_or_else(|| not_found(id))?;
        if patch.title.is_some() {
            patch.apply(conversation);
            conversation.updated_at = newest + Duration::seconds(1);
        }
        Ok(conversation.clone())
    }

    async fn delete_conversation(&self, id: i64) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        Self::take_failure(&mut state, FakeOp::Delete)?;

        let before = state.conversations.len();
        state.conversations.retain(|conversation| conversation.id != id);
        if state.conversations.len() == before {
            return Err(not_found(id));
        }
        state.messages.remove(&id);
        Ok(())
    }

    async fn fetch_conversation(&self, id: i64) -> Result<Conversation, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.fetches.push(id);
        Self::take_failure(&mut state, FakeOp::Fetch)?;

        let revealed = match state.pending_titles.get_mut(&id) {
            Some((0, title)) => Some(title.clone()),
            Some((remaining, _)) => {
                *remaining -= 1;
                None
            }
            None => None,
        };
        let conversation = state
            .conversations
            .iter_mut()
            .find(|conversation| conversation.id == id)
            .ok_or_else(|| not_found(id))?;
        if let Some(title) = revealed {
            conversation.title = Some(title);
        } else if conversation.title.is_none() {
            conversation.title = Some(DEFAULT_TITLE.to_string());
        }
        Ok(conversation.clone())
    }

    async fn open_message_stream(
        &self,
        conversation_id: i64,
        text: &str,
    ) -> Result<ByteStream, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.sent.push((conversation_id, text.to_string()));
        Self::take_failure(&mut state, FakeOp::Stream)?;

        let scripted = state
            .streams
            .get_mut(&conversation_id)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| not_found(conversation_id))?;
        Ok(match scripted {
            ScriptedStream::Chunks(chunks) => {
                let chunks: Vec<&str> = chunks.iter().map(String::as_str).collect();
                byte_stream(&chunks)
            }
            ScriptedStream::Channel(rx) => channel_stream(rx),
        })
    }
}
