use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Closed set of artifact types the canvas knows how to handle
///
/// The boundary accepts any string; unknown tags land in `Other` so new
/// server-side types degrade to a placeholder instead of failing to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactKind {
    Chart,
    Table,
    Report,
    Document,
    Other(String),
}

impl ArtifactKind {
    /// Parse a type tag, ignoring case and surrounding whitespace
    pub fn parse(tag: &str) -> Self {
        let normalized = tag.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "CHART" => ArtifactKind::Chart,
            "TABLE" => ArtifactKind::Table,
            "REPORT" => ArtifactKind::Report,
            "DOCUMENT" => ArtifactKind::Document,
            _ => ArtifactKind::Other(normalized),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ArtifactKind::Chart => "CHART",
            ArtifactKind::Table => "TABLE",
            ArtifactKind::Report => "REPORT",
            ArtifactKind::Document => "DOCUMENT",
            ArtifactKind::Other(tag) => tag,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chart, table, report or document produced by an assistant reply
///
/// Never mutated after creation; the store only adds and clears.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    /// Type tag exactly as received
    pub artifact_type: String,
    pub title: String,
    /// Shape depends on the artifact type
    pub content: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    /// Create an artifact with a fresh id and the current time
    pub fn new(artifact_type: impl Into<String>, title: impl Into<String>, content: Value) -> Self {
        Self {
            id: generate_artifact_id(),
            artifact_type: artifact_type.into(),
            title: title.into(),
            content,
            description: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn kind(&self) -> ArtifactKind {
        ArtifactKind::parse(&self.artifact_type)
    }

    /// Build an artifact from one entry of a reply's `artifacts` array
    ///
    /// Returns None for entries that are not objects. Missing fields get
    /// defaults; a missing id gets a freshly generated one.
    pub fn from_wire(value: &Value) -> Option<Self> {
        let object = value.as_object()?;

        let artifact_type = ["artifact_type", "artifactType", "type"]
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_str))
            .unwrap_or("UNKNOWN")
            .to_string();

        let title = object
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("Untitled")
            .to_string();

        let id = match object.get("id") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => generate_artifact_id(),
        };

        let created_at = object
            .get("created_at")
            .or_else(|| object.get("createdAt"))
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|ts| ts.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        Some(Self {
            id,
            artifact_type,
            title,
            content: object
                .get("content")
                .cloned()
                .unwrap_or_else(|| Value::Object(Default::default())),
            description: object
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
            created_at,
        })
    }
}

/// Unique artifact id: millisecond timestamp plus a random suffix
pub fn generate_artifact_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect();
    format!("{}{}", Utc::now().timestamp_millis(), suffix)
}
