// Transport Client: HTTP exchange with the assistant service
//
// The trait is the seam the pipeline depends on; HttpTransport is the real
// implementation over reqwest. Response-shape validation lives in
// types::parse_chat_reply so every implementation classifies bodies the same
// way.

mod http;
mod retry;
mod types;

pub use http::HttpTransport;
pub use retry::RetryPolicy;
pub use types::{parse_chat_reply, ChatReply, ChatRequest, ConversationSummary, RawMessage};

use crate::error::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

/// Requests the chat core makes against the assistant service
///
/// Usage:
///     let transport: Arc<dyn ChatTransport> = Arc::new(HttpTransport::from_config(&config)?);
///     let reply = transport.send_message(&ChatRequest::new("Show revenue")).await?;
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// `POST /chat/message`
    ///
    /// # Errors
    /// - `Validation` when the query is blank
    /// - `Network` after retries (and the 404 fallback) are exhausted
    /// - `Status` for other non-success responses
    /// - `MalformedResponse` when the body is unusable
    async fn send_message(&self, request: &ChatRequest) -> Result<ChatReply>;

    /// `GET /chat/conversations?user_id=&limit=`
    async fn list_conversations(&self, user_id: i64, limit: u32)
        -> Result<Vec<ConversationSummary>>;

    /// `GET /chat/conversations/{id}/messages`
    async fn conversation_messages(&self, conversation_id: i64) -> Result<Vec<RawMessage>>;
}
