use crate::api::ConversationPage;
use crate::core::conversation::{Conversation, ConversationPatch};

/// Conversations loaded so far, in backend order (most recently updated first).
#[derive(Debug, Default)]
pub struct ConversationList {
    items: Vec<Conversation>,
    page: u32,
    has_more: bool,
}

impl ConversationList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[Conversation] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Last page merged; 0 before anything was loaded.
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn get(&self, id: i64) -> Option<&Conversation> {
        self.items.iter().find(|conversation| conversation.id == id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.get(id).is_some()
    }

    pub fn first(&self) -> Option<&Conversation> {
        self.items.first()
    }

    /// Replace everything with the first page.
    pub fn load_first_page(&mut self, page: ConversationPage) {
        self.items = page.items;
        self.page = page.page;
        self.has_more = page.has_more;
    }

    /// Append a later page, skipping conversations already held. Returns how
    /// many were new.
    pub fn append_page(&mut self, page: ConversationPage) -> usize {
        let before = self.items.len();
        for conversation in page.items {
            if !self.contains(conversation.id) {
                self.items.push(conversation);
            }
        }
        self.page = self.page.max(page.page);
        self.has_more = page.has_more;
        self.items.len() - before
    }

    /// Put a conversation at the top, dropping any older copy of it.
    pub fn prepend(&mut self, conversation: Conversation) {
        self.remove(conversation.id);
        self.items.insert(0, conversation);
    }

    pub fn patch(&mut self, id: i64, patch: &ConversationPatch) -> bool {
        match self.items.iter_mut().find(|conversation| conversation.id == id) {
            Some(conversation) => {
                patch.apply(conversation);
                true
            }
            None => false,
        }
    }

    /// Overwrite a held conversation with a fresher copy, keeping its position.
    pub fn update(&mut self, conversation: Conversation) -> bool {
        match self.items.iter_mut().find(|held| held.id == conversation.id) {
            Some(held) => {
                *held = conversation;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: i64) -> Option<Conversation> {
        let index = self.items.iter().position(|conversation| conversation.id == id)?;
        Some(self.items.remove(index))
    }

    /// Whether `id` sits within the first `per_page` entries.
    pub fn is_on_first_page(&self, id: i64, per_page: u32) -> bool {
        self.items
            .iter()
            .take(per_page as usize)
            .any(|conversation| conversation.id == id)
    }
}
