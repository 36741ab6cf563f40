use super::retry::RetryPolicy;
use super::types::{parse_chat_reply, ChatReply, ChatRequest, ConversationList, ConversationSummary, MessageList, RawMessage};
use super::ChatTransport;
use crate::error::{ChatError, Result};
use crate::services::ChatConfig;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// reqwest-backed transport with retry and a single 404 fallback
pub struct HttpTransport {
    client: Client,
    base_url: String,
    fallback_url: Option<String>,
    retry: RetryPolicy,
}

impl HttpTransport {
    pub fn new(
        base_url: impl Into<String>,
        fallback_url: Option<String>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: trim_base(base_url.into()),
            fallback_url: fallback_url.map(trim_base).filter(|url| !url.is_empty()),
            retry,
        })
    }

    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        Self::new(
            config.api_url.clone(),
            config.fallback_url.clone(),
            config.retry_policy(),
            config.timeout,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn fallback_url(&self) -> Option<&str> {
        self.fallback_url.as_deref()
    }

    /// Send a request, retrying only when no response came back at all
    async fn execute<F>(&self, what: &str, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            match build().send().await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.retry.max_retries => {
                    attempt += 1;
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        "{} failed ({}), retry {}/{} in {:?}",
                        what,
                        e,
                        attempt,
                        self.retry.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return Err(ChatError::Network(format!(
                        "{} failed after {} attempt(s): {}",
                        what,
                        attempt + 1,
                        e
                    )))
                }
            }
        }
    }

    /// One shot at the fallback endpoint; every failure here is a network error
    async fn send_to_fallback(&self, request: &ChatRequest) -> Result<Response> {
        let Some(fallback) = &self.fallback_url else {
            return Err(ChatError::Network(format!(
                "{}/chat/message returned 404",
                self.base_url
            )));
        };

        let url = format!("{}/chat/message", fallback);
        tracing::warn!("Primary endpoint returned 404, trying fallback {}", url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ChatError::Network(format!("Fallback {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(ChatError::Network(format!(
                "Fallback {} returned {}",
                url,
                response.status()
            )));
        }
        Ok(response)
    }
}

fn trim_base(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

async fn read_body(response: Response) -> Result<String> {
    response
        .text()
        .await
        .map_err(|e| ChatError::Network(format!("Failed to read response body: {}", e)))
}

/// Turn a non-success response into `ChatError::Status`
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ChatError::Status {
        status: status.as_u16(),
        message: error_detail(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        }),
    })
}

/// Pull a human-readable message out of an error body
fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let detail = value.get("detail").or_else(|| value.get("error"))?;
    match detail {
        Value::String(text) => Some(text.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| ChatError::MalformedResponse(e.to_string()))
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send_message(&self, request: &ChatRequest) -> Result<ChatReply> {
        if request.query.trim().is_empty() {
            return Err(ChatError::Validation("query must not be empty".to_string()));
        }

        let url = format!("{}/chat/message", self.base_url);
        tracing::debug!("POST {}", url);

        let response = self
            .execute("POST /chat/message", || self.client.post(&url).json(request))
            .await?;

        let response = if response.status() == StatusCode::NOT_FOUND {
            self.send_to_fallback(request).await?
        } else {
            check_status(response).await?
        };

        let body = read_body(response).await?;
        parse_chat_reply(&body)
    }

    async fn list_conversations(
        &self,
        user_id: i64,
        limit: u32,
    ) -> Result<Vec<ConversationSummary>> {
        let url = format!("{}/chat/conversations", self.base_url);
        tracing::debug!("GET {} (user_id={}, limit={})", url, user_id, limit);

        let response = self
            .execute("GET /chat/conversations", || {
                self.client
                    .get(&url)
                    .query(&[("user_id", user_id.to_string()), ("limit", limit.to_string())])
            })
            .await?;
        let body = read_body(check_status(response).await?).await?;

        Ok(parse_json::<ConversationList>(&body)?.conversations)
    }

    async fn conversation_messages(&self, conversation_id: i64) -> Result<Vec<RawMessage>> {
        let url = format!(
            "{}/chat/conversations/{}/messages",
            self.base_url, conversation_id
        );
        tracing::debug!("GET {}", url);

        let response = self
            .execute("GET conversation messages", || self.client.get(&url))
            .await?;
        let body = read_body(check_status(response).await?).await?;

        Ok(parse_json::<MessageList>(&body)?.messages)
    }
}
