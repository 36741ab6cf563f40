// Centralized error handling using thiserror for type-safe error management
//
// Every failure the chat core can hit maps onto one variant here. The
// variants are grouped by how they reach the user:
// - Network / Status / MalformedResponse / Service: retryable error banner
// - Validation: swallowed locally, never shown
// - Render: placeholder inside the canvas, never reaches the chat
// - Storage / Config / Io / Serde: infrastructure, logged by the caller

use thiserror::Error;

/// Main error type for the chat core
///
/// Usage:
///     fn parse_reply(body: &str) -> Result<ChatReply> {
///         let value: serde_json::Value = serde_json::from_str(body)
///             .map_err(|e| ChatError::MalformedResponse(e.to_string()))?;
///         ...
///     }
#[derive(Debug, Error)]
pub enum ChatError {
    /// No usable HTTP exchange happened, even after retries and fallback
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-success status
    ///
    /// The message is taken from a `{"detail": ...}` body when present.
    #[error("Server error {status}: {message}")]
    Status { status: u16, message: String },

    /// The exchange succeeded but the payload is unusable
    ///
    /// Body was not JSON, not an object, or had neither `message` nor `error`.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The assistant service reported an error in the reply body
    #[error("Assistant error: {0}")]
    Service(String),

    /// Input rejected before anything was sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// A specific artifact could not be rendered
    #[error("Render error: {0}")]
    Render(String),

    /// Persistence of session state failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// How an error is presented in the chat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Network,
    Malformed,
    Service,
}

impl ChatError {
    /// Banner category for errors surfaced to the user, `None` otherwise
    pub fn banner_kind(&self) -> Option<BannerKind> {
        match self {
            ChatError::Network(_) | ChatError::Status { .. } => Some(BannerKind::Network),
            ChatError::MalformedResponse(_) => Some(BannerKind::Malformed),
            ChatError::Service(_) => Some(BannerKind::Service),
            _ => None,
        }
    }
}

/// Type alias for Result with ChatError
pub type Result<T> = std::result::Result<T, ChatError>;
