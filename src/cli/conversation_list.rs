use std::error::Error;

use unicode_width::UnicodeWidthStr;

use crate::api::{ChatBackend, ConversationPage};

const TITLE_WIDTH: usize = 40;

pub async fn list_conversations(
    backend: &dyn ChatBackend,
    page: u32,
    per_page: u32,
) -> Result<(), Box<dyn Error>> {
    let page = backend.list_conversations(page.max(1), per_page).await?;
    print!("{}", format_conversation_table(&page));
    Ok(())
}

fn fit_title(title: &str) -> String {
    if title.width() <= TITLE_WIDTH {
        return title.to_string();
    }
    let mut fitted = String::new();
    for ch in title.chars() {
        if fitted.width() + ch.to_string().width() >= TITLE_WIDTH {
            break;
        }
        fitted.push(ch);
    }
    fitted.push('…');
    fitted
}

pub fn format_conversation_table(page: &ConversationPage) -> String {
    if page.items.is_empty() {
        return "No conversations.\n".to_string();
    }

    let mut content = String::new();
    content.push_str(&format!("{:>8}  {:<16}  Title\n", "ID", "Updated"));
    for conversation in &page.items {
        content.push_str(&format!(
            "{:>8}  {:<16}  {}\n",
            conversation.id,
            conversation.updated_at.format("%Y-%m-%d %H:%M").to_string(),
            fit_title(conversation.display_title())
        ));
    }
    content.push_str(&format!(
        "\nPage {} ({} conversations total)",
        page.page, page.total
    ));
    if page.has_more {
        content.push_str(&format!(", next: --page {}", page.page + 1));
    }
    content.push('\n');
    content
}
