// Port traits for the infrastructure the chat core touches
//
// The pipeline only ever needs to remember which conversation was active, so
// storage is a single domain-specific service over a filesystem port. Both
// are Send + Sync so they can be shared across tokio tasks, and both get a
// mockall mock in test builds.

use crate::error::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Filesystem abstraction for file I/O operations
///
/// All operations use tokio::fs in the real implementation.
///
/// Usage:
///     let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
///     let content = fs.read_to_string(Path::new("session.json")).await?;
#[cfg_attr(test, automock)]
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Read entire file contents as a UTF-8 string
    async fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Write string content to a file (creates or overwrites)
    async fn write(&self, path: &Path, content: &str) -> Result<()>;

    /// Check if a path exists (file or directory)
    ///
    /// Returns false on permission errors (cannot distinguish from non-existence)
    async fn exists(&self, path: &Path) -> bool;

    /// Create directory and all parent directories (like mkdir -p)
    async fn create_dir_all(&self, path: &Path) -> Result<()>;
}

/// Session state that survives a restart
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Conversation the user was in when the session was last saved
    #[serde(default)]
    pub conversation_id: Option<i64>,
}

/// Key-value persistence for the chat session
///
/// Usage:
///     let storage: Arc<dyn StorageService> = Arc::new(FileStorageService::new(fs, dir));
///     let session = storage.load_session().await?;
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Load the saved session, or the default when nothing was saved yet
    async fn load_session(&self) -> Result<SessionState>;

    /// Replace the saved session
    async fn save_session(&self, session: &SessionState) -> Result<()>;
}
