use crate::artifacts::Artifact;
use crate::error::{ChatError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /chat/message`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
}

impl ChatRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            conversation_id: None,
            persona: None,
        }
    }

    pub fn with_conversation(mut self, conversation_id: Option<i64>) -> Self {
        self.conversation_id = conversation_id;
        self
    }

    pub fn with_persona(mut self, persona: Option<String>) -> Self {
        self.persona = persona;
        self
    }
}

/// Parsed reply of `POST /chat/message`
///
/// Fields are kept loosely typed; the accessors below apply the tolerant
/// interpretation the pipeline relies on.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub conversation_id: Option<Value>,
    #[serde(default)]
    pub message: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub artifacts: Option<Value>,
    #[serde(default)]
    pub insights: Option<Value>,
    #[serde(default)]
    pub analysis: Option<Value>,
}

impl ChatReply {
    /// Reply text, when the server sent a non-empty string `message`
    pub fn message_text(&self) -> Option<&str> {
        match &self.message {
            Some(Value::String(text)) if !text.is_empty() => Some(text.as_str()),
            _ => None,
        }
    }

    /// Server-reported error, rendered as text
    pub fn error_text(&self) -> Option<String> {
        match &self.error {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(text.clone()),
            Some(Value::Object(obj)) => match obj.get("message").and_then(Value::as_str) {
                Some(text) => Some(text.to_string()),
                None => Some(Value::Object(obj.clone()).to_string()),
            },
            Some(other) => Some(other.to_string()),
        }
    }

    /// Artifacts carried by the reply; string entries are refs only
    pub fn artifacts(&self) -> Vec<Artifact> {
        let Some(Value::Array(entries)) = &self.artifacts else {
            return Vec::new();
        };
        entries.iter().filter_map(Artifact::from_wire).collect()
    }

    /// Titles of the reply's artifacts, in order
    pub fn artifact_refs(&self) -> Vec<String> {
        titles_of(self.artifacts.as_ref())
    }

    /// Insight lines, falling back to `analysis`
    pub fn insights(&self) -> Vec<String> {
        let lines = string_list(self.insights.as_ref());
        if lines.is_empty() {
            string_list(self.analysis.as_ref())
        } else {
            lines
        }
    }

    pub fn conversation_id(&self) -> Option<i64> {
        as_id(self.conversation_id.as_ref())
    }
}

/// Classify a response body
///
/// Anything that is not a JSON object carrying `message` or `error` is a
/// `MalformedResponse`.
pub fn parse_chat_reply(body: &str) -> Result<ChatReply> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ChatError::MalformedResponse(format!("body is not JSON: {}", e)))?;

    let Value::Object(object) = &value else {
        return Err(ChatError::MalformedResponse(
            "body is not a JSON object".to_string(),
        ));
    };
    if !object.contains_key("message") && !object.contains_key("error") {
        return Err(ChatError::MalformedResponse(
            "reply has neither message nor error".to_string(),
        ));
    }

    serde_json::from_value(value).map_err(|e| ChatError::MalformedResponse(e.to_string()))
}

/// One entry of `GET /chat/conversations`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message_count: Option<u32>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConversationList {
    #[serde(default)]
    pub conversations: Vec<ConversationSummary>,
}

/// One entry of `GET /chat/conversations/{id}/messages`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl RawMessage {
    fn metadata_field(&self, key: &str) -> Option<&Value> {
        self.metadata.as_ref().and_then(|meta| meta.get(key))
    }

    /// `metadata.insights`, empty when absent or not a list
    pub fn insights(&self) -> Vec<String> {
        string_list(self.metadata_field("insights"))
    }

    /// Titles of `metadata.artifacts`
    pub fn artifact_titles(&self) -> Vec<String> {
        titles_of(self.metadata_field("artifacts"))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageList {
    #[serde(default)]
    pub messages: Vec<RawMessage>,
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        })
        .collect()
}

fn titles_of(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(title) => Some(title.clone()),
            Value::Object(obj) => obj.get("title").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .collect()
}

fn as_id(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
