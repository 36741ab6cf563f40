// Real filesystem adapter: thin wrapper around tokio::fs
//
// Tests of higher layers use MockFileSystem instead.

use super::traits::FileSystem;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Real filesystem implementation using tokio::fs
///
/// Usage:
///     let fs = RealFileSystem;
///     let content = fs.read_to_string(Path::new("session.json")).await?;
pub struct RealFileSystem;

#[async_trait]
impl FileSystem for RealFileSystem {
    async fn read_to_string(&self, path: &Path) -> Result<String> {
        Ok(tokio::fs::read_to_string(path).await?)
    }

    async fn write(&self, path: &Path, content: &str) -> Result<()> {
        Ok(tokio::fs::write(path, content).await?)
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        Ok(tokio::fs::create_dir_all(path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatError;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_real_filesystem_write_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("session.json");

        let fs = RealFileSystem;
        fs.write(&test_file, "{\"conversation_id\":4}")
            .await
            .expect("Failed to write file");

        let content = fs
            .read_to_string(&test_file)
            .await
            .expect("Failed to read file");
        assert_eq!(content, "{\"conversation_id\":4}");
    }

    #[tokio::test]
    async fn test_real_filesystem_exists() {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("test.txt");

        let fs = RealFileSystem;
        assert!(!fs.exists(&test_file).await);

        fs.write(&test_file, "test").await.unwrap();
        assert!(fs.exists(&test_file).await);
    }

    #[tokio::test]
    async fn test_real_filesystem_create_dir_all() {
        let temp_dir = TempDir::new().unwrap();
        let nested_dir = temp_dir.path().join("a").join("b");

        let fs = RealFileSystem;
        fs.create_dir_all(&nested_dir)
            .await
            .expect("Failed to create directories");
        assert!(fs.exists(&nested_dir).await);
    }

    #[tokio::test]
    async fn test_read_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let fs = RealFileSystem;

        let result = fs.read_to_string(&temp_dir.path().join("missing")).await;
        assert!(matches!(result, Err(ChatError::Io(_))));
    }
}
