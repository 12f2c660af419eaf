//! Front-end-only state: focus, the input line, selection, and transient
//! notices. Everything about conversations lives in the
//! [`ViewModel`](crate::core::sync::ViewModel).

use std::time::{Duration, Instant};

use crate::core::sync::{SyncEvent, ViewModel};
use crate::core::title_reveal::RevealTiming;
use crate::ui::title::RevealPlayback;

const NOTICE_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Sidebar,
    Input,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub text: String,
    pub shown_at: Instant,
}

#[derive(Debug)]
pub struct UiState {
    pub focus: Focus,
    pub input: String,
    /// Index into the conversation list.
    pub selected: usize,
    /// Conversation whose title the input line is editing.
    pub renaming: Option<i64>,
    /// Conversation waiting for a second `d` before it is deleted.
    pub confirm_delete: Option<i64>,
    /// Lines scrolled up from the bottom of the transcript.
    pub scroll_from_bottom: u16,
    pub notice: Option<Notice>,
    pub reveal: Option<RevealPlayback>,
    pub reveal_timing: RevealTiming,
    pub exit_requested: bool,
}

impl UiState {
    pub fn new(reveal_timing: RevealTiming) -> Self {
        Self {
            focus: Focus::Input,
            input: String::new(),
            selected: 0,
            renaming: None,
            confirm_delete: None,
            scroll_from_bottom: 0,
            notice: None,
            reveal: None,
            reveal_timing,
            exit_requested: false,
        }
    }

    pub fn show_notice(&mut self, text: impl Into<String>, now: Instant) {
        self.notice = Some(Notice {
            text: text.into(),
            shown_at: now,
        });
    }

    pub fn handle_event(&mut self, event: SyncEvent, now: Instant) {
        match event {
            SyncEvent::Notice(text) => self.show_notice(text, now),
            SyncEvent::TitleRevealed {
                conversation_id,
                title,
            } => {
                self.reveal = Some(RevealPlayback::start(
                    conversation_id,
                    &title,
                    self.reveal_timing,
                    now,
                ));
            }
        }
    }

    /// Drop expired notices and finished reveals. Returns true when the
    /// screen changed or a reveal is still animating.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = false;
        if self
            .notice
            .as_ref()
            .is_some_and(|notice| now.duration_since(notice.shown_at) >= NOTICE_TTL)
        {
            self.notice = None;
            changed = true;
        }
        if self.reveal.as_ref().is_some_and(|reveal| reveal.is_finished(now)) {
            self.reveal = None;
            changed = true;
        }
        changed || self.reveal.is_some()
    }

    /// Keep the selection on the active conversation after the list changes.
    pub fn sync_selection(&mut self, view: &ViewModel) {
        if self.focus == Focus::Sidebar && self.selected < view.conversations.len() {
            return;
        }
        let active = view.active_conversation.as_ref().map(|c| c.id);
        self.selected = active
            .and_then(|id| view.conversations.iter().position(|c| c.id == id))
            .unwrap_or(0)
            .min(view.conversations.len().saturating_sub(1));
    }

    pub fn selected_id(&self, view: &ViewModel) -> Option<i64> {
        view.conversations.get(self.selected).map(|c| c.id)
    }
}
