use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone)]
pub struct Theme {
    // Transcript
    pub user_prefix_style: Style,
    pub user_text_style: Style,
    pub assistant_prefix_style: Style,
    pub assistant_text_style: Style,
    pub hint_style: Style,

    // Sidebar
    pub sidebar_border_style: Style,
    pub active_conversation_style: Style,
    pub selection_style: Style,
    pub reveal_style: Style,

    // Chrome
    pub focused_border_style: Style,
    pub input_border_style: Style,
    pub status_style: Style,
    pub notice_style: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark_default()
    }
}

impl Theme {
    pub fn dark_default() -> Self {
        Theme {
            user_prefix_style: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            user_text_style: Style::default().fg(Color::Cyan),
            assistant_prefix_style: Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
            assistant_text_style: Style::default().fg(Color::White),
            hint_style: Style::default().fg(Color::DarkGray),

            sidebar_border_style: Style::default().fg(Color::Gray),
            active_conversation_style: Style::default().add_modifier(Modifier::BOLD),
            selection_style: Style::default().add_modifier(Modifier::REVERSED),
            reveal_style: Style::default().fg(Color::Yellow),

            focused_border_style: Style::default().fg(Color::Cyan),
            input_border_style: Style::default().fg(Color::Gray),
            status_style: Style::default().fg(Color::DarkGray),
            notice_style: Style::default().fg(Color::Yellow),
        }
    }
}
