// File-based session storage
//
// The session is one small JSON document (session.json) in the data
// directory. A missing file is a first run, not an error.

use super::traits::{FileSystem, SessionState, StorageService};
use crate::error::{ChatError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

const SESSION_FILE: &str = "session.json";

/// Session storage backed by a JSON file
///
/// Usage:
///     let fs = Arc::new(RealFileSystem);
///     let storage = FileStorageService::new(fs, config.data_dir.clone());
///     let session = storage.load_session().await?;
pub struct FileStorageService {
    fs: Arc<dyn FileSystem>,
    base_path: PathBuf,
}

impl FileStorageService {
    /// The base directory is created on first write.
    pub fn new(fs: Arc<dyn FileSystem>, base_path: PathBuf) -> Self {
        Self { fs, base_path }
    }

    fn session_path(&self) -> PathBuf {
        self.base_path.join(SESSION_FILE)
    }

    async fn ensure_base_dir(&self) -> Result<()> {
        if !self.fs.exists(&self.base_path).await {
            self.fs.create_dir_all(&self.base_path).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageService for FileStorageService {
    async fn load_session(&self) -> Result<SessionState> {
        let path = self.session_path();
        if !self.fs.exists(&path).await {
            return Ok(SessionState::default());
        }

        let content = self.fs.read_to_string(&path).await?;
        serde_json::from_str(&content).map_err(|e| {
            ChatError::Storage(format!("Failed to deserialize session: {}", e))
        })
    }

    async fn save_session(&self, session: &SessionState) -> Result<()> {
        self.ensure_base_dir().await?;

        let content = serde_json::to_string_pretty(session)?;
        self.fs.write(&self.session_path(), &content).await?;

        tracing::debug!("Saved session to {}", self.session_path().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::RealFileSystem;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_session_default() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorageService::new(Arc::new(RealFileSystem), temp_dir.path().to_path_buf());

        let session = storage.load_session().await.unwrap();
        assert_eq!(session.conversation_id, None);
    }

    #[tokio::test]
    async fn test_save_and_load_session() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorageService::new(Arc::new(RealFileSystem), temp_dir.path().to_path_buf());

        storage
            .save_session(&SessionState {
                conversation_id: Some(42),
            })
            .await
            .unwrap();

        let loaded = storage.load_session().await.unwrap();
        assert_eq!(loaded.conversation_id, Some(42));
    }

    #[tokio::test]
    async fn test_save_creates_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("data").join("chatcanvas");
        let storage = FileStorageService::new(Arc::new(RealFileSystem), nested.clone());

        storage.save_session(&SessionState::default()).await.unwrap();
        assert!(nested.join(SESSION_FILE).exists());
    }

    #[tokio::test]
    async fn test_corrupt_session_is_storage_error() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(SESSION_FILE), "{not json").unwrap();
        let storage = FileStorageService::new(Arc::new(RealFileSystem), temp_dir.path().to_path_buf());

        let result = storage.load_session().await;
        assert!(matches!(result, Err(ChatError::Storage(_))));
    }
}
