use crate::markdown;
use crate::transport::RawMessage;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

static MESSAGE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Who authored a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
    System,
}

impl Role {
    /// Map a role name from the wire; `assistant` is the agent
    pub fn from_wire(role: &str) -> Self {
        match role.trim().to_ascii_lowercase().as_str() {
            "user" => Role::User,
            "assistant" | "agent" => Role::Agent,
            _ => Role::System,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Agent => "agent",
            Role::System => "system",
        }
    }
}

/// One immutable transcript entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: String,
    role: Role,
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    html: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    artifact_refs: Vec<String>,
}

impl Message {
    fn build(role: Role, content: String, artifact_refs: Vec<String>) -> Self {
        let created_at = Utc::now();
        let html = match role {
            Role::Agent => snapshot(&content),
            _ => None,
        };
        Self {
            id: next_message_id(role, &created_at),
            role,
            content,
            html,
            created_at,
            artifact_refs,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::build(Role::User, content.into(), Vec::new())
    }

    pub fn agent(content: impl Into<String>, artifact_refs: Vec<String>) -> Self {
        Self::build(Role::Agent, content.into(), artifact_refs)
    }

    /// Rebuild a transcript entry from conversation history
    ///
    /// Every field is optional on the wire; nothing here fails.
    pub fn from_history(raw: &RawMessage) -> Self {
        let role = raw.role.as_deref().map(Role::from_wire).unwrap_or(Role::System);
        let mut content = raw.content.clone().unwrap_or_default();
        if role == Role::Agent {
            content = with_insights(&content, &raw.insights());
        }

        let created_at = raw
            .created_at
            .as_deref()
            .or(raw.timestamp.as_deref())
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now);

        let id = match &raw.id {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => next_message_id(role, &created_at),
        };

        let html = match role {
            Role::Agent => snapshot(&content),
            _ => None,
        };

        Self {
            id,
            role,
            content,
            html,
            created_at,
            artifact_refs: raw.artifact_titles(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Sanitized HTML rendering of the content (agent messages only)
    pub fn html(&self) -> Option<&str> {
        self.html.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn artifact_refs(&self) -> &[String] {
        &self.artifact_refs
    }
}

fn snapshot(content: &str) -> Option<String> {
    let html = markdown::render_html(content);
    if markdown::is_blank_html(&html) {
        None
    } else {
        Some(html)
    }
}

fn next_message_id(role: Role, at: &DateTime<Utc>) -> String {
    let seq = MESSAGE_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}-{}", at.timestamp_millis(), role.as_str(), seq)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    // Naive timestamps from the history endpoint are UTC
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Append a numbered "Key Insights" section, keeping the received order
pub fn with_insights(content: &str, insights: &[String]) -> String {
    if insights.is_empty() {
        return content.to_string();
    }

    let numbered: Vec<String> = insights
        .iter()
        .enumerate()
        .map(|(idx, insight)| format!("{}. {}", idx + 1, insight))
        .collect();

    format!("{}\n\n**Key Insights:**\n{}", content, numbered.join("\n"))
}

/// Append-only ordered sequence of messages
///
/// The only removal is trimming a trailing user message so a retry can
/// re-append it.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Remove and return the last message if it was written by the user
    pub fn take_trailing_user(&mut self) -> Option<Message> {
        match self.messages.last() {
            Some(last) if last.role() == Role::User => self.messages.pop(),
            _ => None,
        }
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl FromIterator<Message> for Transcript {
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Self {
        Self {
            messages: iter.into_iter().collect(),
        }
    }
}
