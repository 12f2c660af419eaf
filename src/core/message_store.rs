use std::collections::HashSet;

use tracing::debug;

use crate::api::{ApiError, ChatBackend};
use crate::core::message::{Message, MessageId};

/// Messages of the active conversation in display order, unique by id.
///
/// `page` is the backward cursor: every message on pages `page..` is held,
/// so the next older load requests `page - 1`.
#[derive(Debug, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
    ids: HashSet<MessageId>,
    page: u32,
}

/// Result of the newest-first initial load of a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialLoad {
    pub messages: Vec<Message>,
    pub page: u32,
    pub has_more: bool,
}

impl MessageStore {
    pub fn new() -> Self {
        Self {
            page: 1,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|message| message.id == id)
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.ids.contains(&id)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn has_more_older(&self) -> bool {
        self.page > 1
    }

    /// Insert messages not already held and restore display order. Returns
    /// how many were new.
    pub fn merge(&mut self, page: Vec<Message>) -> usize {
        let mut inserted = 0;
        for message in page {
            if self.ids.insert(message.id) {
                self.messages.push(message);
                inserted += 1;
            }
        }
        if inserted > 0 {
            self.messages.sort_by(Message::display_cmp);
        }
        inserted
    }

    /// Merge an older page and move the cursor back to it.
    pub fn merge_older_page(&mut self, page: u32, items: Vec<Message>) -> usize {
        let inserted = self.merge(items);
        self.page = self.page.min(page.max(1));
        debug!(page, inserted, held = self.messages.len(), "merged older messages");
        inserted
    }

    pub fn append(&mut self, message: Message) -> bool {
        if !self.ids.insert(message.id) {
            return false;
        }
        let out_of_order = self
            .messages
            .last()
            .is_some_and(|last| last.display_cmp(&message).is_gt());
        self.messages.push(message);
        if out_of_order {
            self.messages.sort_by(Message::display_cmp);
        }
        true
    }

    pub fn update_content(&mut self, id: MessageId, content: &str) -> bool {
        match self.messages.iter_mut().find(|message| message.id == id) {
            Some(message) => {
                message.content.clear();
                message.content.push_str(content);
                true
            }
            None => false,
        }
    }

    /// Swap the message `temp_id` for `message` in one step.
    pub fn replace(&mut self, temp_id: MessageId, message: Message) -> bool {
        if temp_id != message.id && self.ids.contains(&message.id) {
            return false;
        }
        let Some(index) = self.messages.iter().position(|held| held.id == temp_id) else {
            return false;
        };
        self.ids.remove(&temp_id);
        self.ids.insert(message.id);
        self.messages[index] = message;
        self.messages.sort_by(Message::display_cmp);
        true
    }

    pub fn remove(&mut self, id: MessageId) -> Option<Message> {
        if !self.ids.remove(&id) {
            return None;
        }
        let index = self.messages.iter().position(|message| message.id == id)?;
        Some(self.messages.remove(index))
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.ids.clear();
        self.page = 1;
    }

    pub fn apply_initial(&mut self, load: InitialLoad) {
        self.clear();
        self.merge(load.messages);
        self.page = load.page.max(1);
    }
}

/// Load the `per_page` most recent messages of a conversation.
///
/// Pages are numbered oldest first, so the walk starts at the last page and
/// moves down until a full screen of messages is held.
pub async fn load_initial(
    backend: &dyn ChatBackend,
    conversation_id: i64,
    per_page: u32,
) -> Result<InitialLoad, ApiError> {
    let per_page = per_page.max(1);
    let first_page = backend.list_messages(conversation_id, 1, per_page).await?;
    let last_page = u32::try_from(first_page.total.div_ceil(u64::from(per_page)))
        .unwrap_or(u32::MAX)
        .max(1);

    let mut collected = MessageStore::new();
    let mut first_page_items = Some(first_page.items);
    let mut page = last_page;
    loop {
        let cached = if page == 1 { first_page_items.take() } else { None };
        let items = match cached {
            Some(items) => items,
            None => {
                backend
                    .list_messages(conversation_id, page, per_page)
                    .await?
                    .items
            }
        };
        collected.merge(items);
        if collected.len() >= per_page as usize || page == 1 {
            break;
        }
        page -= 1;
    }

    let mut messages = collected.messages;
    let excess = messages.len().saturating_sub(per_page as usize);
    messages.drain(..excess);
    // Trimming only ever cuts into the lowest page walked; that page must be
    // fetched again before anything older.
    let cursor = if excess > 0 { page + 1 } else { page };

    debug!(
        conversation_id,
        last_page,
        cursor,
        loaded = messages.len(),
        "initial messages loaded"
    );
    Ok(InitialLoad {
        messages,
        page: cursor,
        has_more: cursor > 1,
    })
}
