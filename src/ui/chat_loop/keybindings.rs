//! Key handling for the chat screen.
//!
//! Keys mutate [`UiState`] directly and return the [`SyncAction`] they ask
//! the controller for, if any.

use std::time::Instant;

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::core::sync::{SyncAction, ViewModel};
use crate::ui::state::{Focus, UiState};

const PAGE_LINES: u16 = 10;

pub fn handle_key(
    state: &mut UiState,
    view: &ViewModel,
    key: KeyEvent,
    now: Instant,
) -> Option<SyncAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => {
            state.exit_requested = true;
            None
        }
        KeyCode::Char('n') if ctrl => {
            state.focus = Focus::Input;
            state.scroll_from_bottom = 0;
            Some(SyncAction::CreateNewChat)
        }
        KeyCode::Tab => {
            state.focus = match state.focus {
                Focus::Input => Focus::Sidebar,
                Focus::Sidebar => Focus::Input,
            };
            None
        }
        KeyCode::PageUp => {
            state.scroll_from_bottom = state.scroll_from_bottom.saturating_add(PAGE_LINES);
            view.has_more_messages.then_some(SyncAction::LoadOlderMessages)
        }
        KeyCode::PageDown => {
            state.scroll_from_bottom = state.scroll_from_bottom.saturating_sub(PAGE_LINES);
            None
        }
        KeyCode::Esc => {
            if state.renaming.take().is_some() {
                state.input.clear();
            }
            state.confirm_delete = None;
            None
        }
        _ => match state.focus {
            Focus::Input => handle_input_key(state, view, key),
            Focus::Sidebar => handle_sidebar_key(state, view, key, now),
        },
    }
}

fn handle_input_key(state: &mut UiState, view: &ViewModel, key: KeyEvent) -> Option<SyncAction> {
    match key.code {
        KeyCode::Enter => {
            if let Some(id) = state.renaming.take() {
                let title = std::mem::take(&mut state.input);
                return Some(SyncAction::Rename { id, title });
            }
            if state.input.trim().is_empty() {
                return None;
            }
            state.scroll_from_bottom = 0;
            // Keep the draft when the send will be refused.
            let text = if view.is_streaming {
                state.input.clone()
            } else {
                std::mem::take(&mut state.input)
            };
            Some(SyncAction::Send { text })
        }
        KeyCode::Backspace => {
            state.input.pop();
            None
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            state.input.push(ch);
            None
        }
        _ => None,
    }
}

fn handle_sidebar_key(
    state: &mut UiState,
    view: &ViewModel,
    key: KeyEvent,
    now: Instant,
) -> Option<SyncAction> {
    let count = view.conversations.len();
    match key.code {
        KeyCode::Up => {
            state.selected = state.selected.saturating_sub(1);
            state.confirm_delete = None;
            None
        }
        KeyCode::Down => {
            state.confirm_delete = None;
            if state.selected + 1 < count {
                state.selected += 1;
                None
            } else {
                view.has_more_conversations
                    .then_some(SyncAction::LoadMoreConversations)
            }
        }
        KeyCode::Enter => {
            let id = state.selected_id(view)?;
            state.scroll_from_bottom = 0;
            state.focus = Focus::Input;
            Some(SyncAction::SelectConversation { id })
        }
        KeyCode::Char('r') => {
            let conversation = view.conversations.get(state.selected)?;
            state.renaming = Some(conversation.id);
            state.input = conversation.display_title().to_string();
            state.focus = Focus::Input;
            None
        }
        KeyCode::Char('d') => {
            let id = state.selected_id(view)?;
            if state.confirm_delete == Some(id) {
                state.confirm_delete = None;
                return Some(SyncAction::Delete { id });
            }
            state.confirm_delete = Some(id);
            state.show_notice("Press d again to delete this conversation", now);
            None
        }
        _ => None,
    }
}
