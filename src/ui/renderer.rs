use std::time::Instant;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::core::message::Role;
use crate::core::sync::{SyncState, ViewModel};
use crate::ui::state::{Focus, UiState};
use crate::ui::theme::Theme;
use crate::ui::title::truncate_to_width;

const SIDEBAR_WIDTH: u16 = 32;
const OLDER_HINT: &str = "↑ PageUp for older messages";

pub fn ui(f: &mut Frame, view: &ViewModel, state: &UiState, theme: &Theme, now: Instant) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
        .split(f.area());
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(columns[1]);

    let border_style = |focus: Focus| {
        if state.focus == focus {
            theme.focused_border_style
        } else {
            theme.sidebar_border_style
        }
    };

    let inner_sidebar_width = SIDEBAR_WIDTH.saturating_sub(2) as usize;
    let sidebar = Paragraph::new(sidebar_lines(view, state, theme, inner_sidebar_width, now)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style(Focus::Sidebar))
            .title("Conversations"),
    );
    f.render_widget(sidebar, columns[0]);

    let transcript_area = rows[0];
    let lines = transcript_lines(view, theme);
    let height = transcript_area.height.saturating_sub(1);
    let total = wrapped_line_count(&lines, transcript_area.width as usize);
    let max_offset = total.saturating_sub(height);
    let offset = max_offset.saturating_sub(state.scroll_from_bottom);
    let title = view
        .active_conversation
        .as_ref()
        .map(|conversation| conversation.display_title().to_string())
        .unwrap_or_else(|| "No conversation".to_string());
    let transcript = Paragraph::new(lines)
        .block(Block::default().title(title))
        .wrap(Wrap { trim: false })
        .scroll((offset, 0));
    f.render_widget(transcript, transcript_area);

    let input_title = if state.renaming.is_some() {
        "Rename (Enter to save, Esc to cancel)"
    } else {
        "Message (Enter to send, Ctrl+N new chat, Tab sidebar, Ctrl+C quit)"
    };
    let input = Paragraph::new(state.input.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(if state.focus == Focus::Input {
                theme.focused_border_style
            } else {
                theme.input_border_style
            })
            .title(input_title),
    );
    f.render_widget(input, rows[1]);
    if state.focus == Focus::Input {
        let cursor_x = rows[1].x + 1 + UnicodeWidthStr::width(state.input.as_str()) as u16;
        f.set_cursor_position((cursor_x.min(rows[1].right().saturating_sub(2)), rows[1].y + 1));
    }

    f.render_widget(Paragraph::new(status_line(view, state, theme)), rows[2]);
}

fn sidebar_lines(
    view: &ViewModel,
    state: &UiState,
    theme: &Theme,
    width: usize,
    now: Instant,
) -> Vec<Line<'static>> {
    let active = view.active_conversation.as_ref().map(|c| c.id);
    let mut lines: Vec<Line<'static>> = view
        .conversations
        .iter()
        .enumerate()
        .map(|(index, conversation)| {
            let revealing = state
                .reveal
                .as_ref()
                .filter(|reveal| reveal.conversation_id() == conversation.id)
                .and_then(|reveal| reveal.frame_at(now));
            let marker = if active == Some(conversation.id) { "▸ " } else { "  " };
            let title = revealing.unwrap_or_else(|| conversation.display_title());
            let text = truncate_to_width(&format!("{marker}{title}"), width);

            let mut style = if revealing.is_some() {
                theme.reveal_style
            } else if active == Some(conversation.id) {
                theme.active_conversation_style
            } else {
                ratatui::style::Style::default()
            };
            if state.focus == Focus::Sidebar && state.selected == index {
                style = style.patch(theme.selection_style);
            }
            Line::from(Span::styled(text, style))
        })
        .collect();

    if view.has_more_conversations {
        lines.push(Line::from(Span::styled("  more…", theme.hint_style)));
    }
    lines
}

/// Transcript lines: a role header per message followed by its text.
pub fn transcript_lines(view: &ViewModel, theme: &Theme) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    if view.has_more_messages {
        lines.push(Line::from(Span::styled(OLDER_HINT, theme.hint_style)));
        lines.push(Line::default());
    }
    for message in &view.messages {
        let (label, prefix_style, text_style) = match message.role {
            Role::User => ("You", theme.user_prefix_style, theme.user_text_style),
            Role::Assistant => (
                "Assistant",
                theme.assistant_prefix_style,
                theme.assistant_text_style,
            ),
        };
        lines.push(Line::from(vec![
            Span::styled(label, prefix_style),
            Span::styled(
                format!("  {}", message.timestamp.format("%H:%M")),
                theme.hint_style,
            ),
        ]));
        for text in message.text.lines() {
            lines.push(Line::from(Span::styled(text.to_string(), text_style)));
        }
        lines.push(Line::default());
    }
    lines
}

/// Rows the lines occupy once wrapped at `width` columns.
pub fn wrapped_line_count(lines: &[Line<'_>], width: usize) -> u16 {
    if width == 0 {
        return 0;
    }
    let rows: usize = lines
        .iter()
        .map(|line| line.width().max(1).div_ceil(width))
        .sum();
    u16::try_from(rows).unwrap_or(u16::MAX)
}

fn status_line(view: &ViewModel, state: &UiState, theme: &Theme) -> Line<'static> {
    if let Some(notice) = &state.notice {
        return Line::from(Span::styled(notice.text.clone(), theme.notice_style));
    }
    let text = match view.state {
        SyncState::Idle => String::new(),
        SyncState::Streaming => "Assistant is replying…".to_string(),
        other => format!("{}…", capitalize(other.label())),
    };
    Line::from(Span::styled(text, theme.status_style))
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
