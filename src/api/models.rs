//! Wire shapes of the chat REST API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{timestamp, ConversationPage, MessagePage};
use crate::core::conversation::Conversation;
use crate::core::message::{Message, MessageId, Role};

#[derive(Deserialize)]
pub struct ConversationPageResponse {
    pub conversations: Vec<Conversation>,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
    pub page: u32,
    pub total: u64,
}

impl From<ConversationPageResponse> for ConversationPage {
    fn from(response: ConversationPageResponse) -> Self {
        ConversationPage {
            items: response.conversations,
            has_more: response.has_more,
            page: response.page,
            total: response.total,
        }
    }
}

#[derive(Deserialize)]
pub struct MessageRecord {
    pub id: i64,
    pub role: Role,
    pub content: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub timestamp: DateTime<Utc>,
}

impl From<MessageRecord> for Message {
    fn from(record: MessageRecord) -> Self {
        Message {
            id: MessageId::Server(record.id),
            role: record.role,
            content: record.content,
            timestamp: record.timestamp,
            provisional: false,
        }
    }
}

#[derive(Deserialize)]
pub struct MessagePageResponse {
    pub messages: Vec<MessageRecord>,
    pub total: u64,
}

impl From<MessagePageResponse> for MessagePage {
    fn from(response: MessagePageResponse) -> Self {
        MessagePage {
            items: response.messages.into_iter().map(Message::from).collect(),
            total: response.total,
        }
    }
}

#[derive(Serialize)]
pub struct CreateConversationRequest<'a> {
    pub title: &'a str,
}

#[derive(Serialize)]
pub struct SendMessageRequest<'a> {
    pub conversation_id: i64,
    pub content: &'a str,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_page_maps_server_ids_and_roles() {
        let raw = r#"{
            "messages": [
                {"id": 11, "conversation_id": 4, "user_id": 1, "role": "user", "content": "hi", "timestamp": "2024-05-01T09:00:00"},
                {"id": 12, "conversation_id": 4, "user_id": 1, "role": "assistant", "content": "hello", "timestamp": "2024-05-01T09:00:02.125"}
            ],
            "hasMore": false, "page": 1, "total": 2, "totalPages": 1
        }"#;
        let response: MessagePageResponse = serde_json::from_str(raw).expect("page");
        let page = MessagePage::from(response);

        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].id, MessageId::Server(11));
        assert_eq!(page.items[1].role, Role::Assistant);
        assert!(page.items.iter().all(|message| !message.provisional));
    }

    #[test]
    fn conversation_page_keeps_backend_cursor() {
        let raw = r#"{
            "conversations": [
                {"id": 3, "user_id": 1, "title": "Plans", "created_at": "2024-05-01T09:00:00", "updated_at": "2024-05-02T09:00:00"}
            ],
            "hasMore": true, "page": 2, "total": 11, "totalPages": 2
        }"#;
        let response: ConversationPageResponse = serde_json::from_str(raw).expect("page");
        let page = ConversationPage::from(response);

        assert!(page.has_more);
        assert_eq!(page.page, 2);
        assert_eq!(page.items[0].display_title(), "Plans");
    }

    #[test]
    fn send_request_serializes_user_role() {
        let body = SendMessageRequest {
            conversation_id: 42,
            content: "Hello",
            role: Role::User,
        };
        let json = serde_json::to_value(&body).expect("json");
        assert_eq!(
            json,
            serde_json::json!({"conversation_id": 42, "content": "Hello", "role": "user"})
        );
    }
}
