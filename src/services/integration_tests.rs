// Integration tests for the service layer
//
// Real implementations against temporary directories, plus the storage
// adapter driven through a mocked filesystem.
//
// Usage:
//     cargo test --lib services::integration_tests

#[cfg(test)]
mod integration {
    use crate::services::mocks::test_helpers::*;
    use crate::services::traits::*;
    use crate::services::*;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_session_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let base_path = temp_dir.path().to_path_buf();

        {
            let storage = FileStorageService::new(Arc::new(RealFileSystem), base_path.clone());
            storage
                .save_session(&SessionState {
                    conversation_id: Some(9),
                })
                .await
                .unwrap();
        }

        {
            let storage = FileStorageService::new(Arc::new(RealFileSystem), base_path);
            let loaded = storage.load_session().await.unwrap();
            assert_eq!(loaded.conversation_id, Some(9));
        }
    }

    #[tokio::test]
    async fn test_clearing_the_session() {
        let temp_dir = TempDir::new().unwrap();
        let storage =
            FileStorageService::new(Arc::new(RealFileSystem), temp_dir.path().to_path_buf());

        storage
            .save_session(&SessionState {
                conversation_id: Some(3),
            })
            .await
            .unwrap();
        storage.save_session(&SessionState::default()).await.unwrap();

        assert_eq!(storage.load_session().await.unwrap(), SessionState::default());
    }

    #[tokio::test]
    async fn test_storage_over_mock_filesystem_reads_session() {
        let fs = create_existing_filesystem(r#"{"conversation_id": 21}"#);
        let storage = FileStorageService::new(Arc::new(fs), PathBuf::from("/virtual"));

        let session = storage.load_session().await.unwrap();
        assert_eq!(session.conversation_id, Some(21));
    }

    #[tokio::test]
    async fn test_storage_over_mock_filesystem_creates_dir_and_writes() {
        let mut fs = MockFileSystem::new();
        fs.expect_exists().returning(|_| false);
        fs.expect_create_dir_all()
            .withf(|path| path == std::path::Path::new("/virtual"))
            .times(1)
            .returning(|_| Ok(()));
        fs.expect_write()
            .withf(|path, content| {
                path.ends_with("session.json") && content.contains("\"conversation_id\": 5")
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let storage = FileStorageService::new(Arc::new(fs), PathBuf::from("/virtual"));
        storage
            .save_session(&SessionState {
                conversation_id: Some(5),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_missing_session_file_skips_read() {
        // create_mock_filesystem has no read_to_string expectation; a read
        // would panic
        let storage = FileStorageService::new(
            Arc::new(create_mock_filesystem()),
            PathBuf::from("/virtual"),
        );
        assert_eq!(storage.load_session().await.unwrap(), SessionState::default());
    }
}
