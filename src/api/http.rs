use async_trait::async_trait;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api::models::{
    ConversationPageResponse, CreateConversationRequest, MessagePageResponse, SendMessageRequest,
};
use crate::api::{ApiError, ByteStream, ChatBackend, ConversationPage, MessagePage};
use crate::core::conversation::{Conversation, ConversationPatch};
use crate::core::message::Role;
use crate::utils::auth::add_auth_headers;
use crate::utils::url::{construct_api_url, normalize_base_url};

/// [`ChatBackend`] over the chat REST API.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, token)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str, token: Option<String>) -> Self {
        Self {
            client,
            base_url: normalize_base_url(base_url),
            token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: reqwest::Method, endpoint: &str) -> reqwest::RequestBuilder {
        let url = construct_api_url(&self.base_url, endpoint);
        debug!(%method, %url, "backend request");
        add_auth_headers(self.client.request(method, url), self.token.as_deref())
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        what: impl FnOnce() -> String,
    ) -> Result<reqwest::Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound { what: what() });
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn list_conversations(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<ConversationPage, ApiError> {
        let request = self
            .request(reqwest::Method::GET, "conversations")
            .query(&[("page", page), ("limit", per_page)]);
        let response = self.send(request, || "conversation list".to_string()).await?;
        let body: ConversationPageResponse = Self::decode(response).await?;
        Ok(body.into())
    }

    async fn list_messages(
        &self,
        conversation_id: i64,
        page: u32,
        per_page: u32,
    ) -> Result<MessagePage, ApiError> {
        let request = self
            .request(
                reqwest::Method::GET,
                &format!("conversations/{conversation_id}/messages"),
            )
            .query(&[("page", page), ("limit", per_page)]);
        let response = self
            .send(request, || format!("conversation {conversation_id}"))
            .await?;
        let body: MessagePageResponse = Self::decode(response).await?;
        Ok(body.into())
    }

    async fn create_conversation(&self, title: &str) -> Result<Conversation, ApiError> {
        let request = self
            .request(reqwest::Method::POST, "conversations")
            .json(&CreateConversationRequest { title });
        let response = self.send(request, || "conversations".to_string()).await?;
        Self::decode(response).await
    }

    async fn update_conversation(
        &self,
        id: i64,
        patch: &ConversationPatch,
    ) -> Result<Conversation, ApiError> {
        let request = self
            .request(reqwest::Method::PUT, &format!("conversations/{id}"))
            .json(patch);
        let response = self.send(request, || format!("conversation {id}")).await?;
        Self::decode(response).await
    }

    async fn delete_conversation(&self, id: i64) -> Result<(), ApiError> {
        let request = self.request(reqwest::Method::DELETE, &format!("conversations/{id}"));
        self.send(request, || format!("conversation {id}")).await?;
        Ok(())
    }

    async fn fetch_conversation(&self, id: i64) -> Result<Conversation, ApiError> {
        let request = self.request(reqwest::Method::GET, &format!("conversations/{id}"));
        let response = self.send(request, || format!("conversation {id}")).await?;
        Self::decode(response).await
    }

    async fn open_message_stream(
        &self,
        conversation_id: i64,
        text: &str,
    ) -> Result<ByteStream, ApiError> {
        let request = self
            .request(reqwest::Method::POST, "send_stream")
            .json(&SendMessageRequest {
                conversation_id,
                content: text,
                role: Role::User,
            });
        let response = self
            .send(request, || format!("conversation {conversation_id}"))
            .await?;
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(ApiError::from));
        Ok(Box::pin(stream))
    }
}
