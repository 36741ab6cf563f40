// Mock constructors with sensible defaults
//
// Tests override specific behaviors while inheriting the baseline setup.
//
// Usage:
//     use crate::services::mocks::test_helpers::*;
//     let mut storage = create_mock_storage();
//     let transport = create_replying_transport(reply_with_message("hi"));

#[cfg(test)]
pub mod test_helpers {
    use super::super::traits::*;
    use crate::transport::{ChatReply, MockChatTransport};
    use serde_json::{json, Value};

    /// Mock filesystem with nothing on disk
    ///
    /// Default behavior:
    /// - exists() returns false
    /// - write() succeeds
    /// - create_dir_all() succeeds
    pub fn create_mock_filesystem() -> MockFileSystem {
        let mut mock = MockFileSystem::new();
        mock.expect_exists().returning(|_| false);
        mock.expect_write().returning(|_, _| Ok(()));
        mock.expect_create_dir_all().returning(|_| Ok(()));
        mock
    }

    /// Mock filesystem whose session file holds `content`
    pub fn create_existing_filesystem(content: &str) -> MockFileSystem {
        let content = content.to_string();
        let mut mock = MockFileSystem::new();
        mock.expect_exists().returning(|_| true);
        mock.expect_read_to_string()
            .returning(move |_| Ok(content.clone()));
        mock.expect_write().returning(|_, _| Ok(()));
        mock.expect_create_dir_all().returning(|_| Ok(()));
        mock
    }

    /// Mock storage with no saved session; saves succeed
    pub fn create_mock_storage() -> MockStorageService {
        let mut mock = MockStorageService::new();
        mock.expect_load_session()
            .returning(|| Ok(SessionState::default()));
        mock.expect_save_session().returning(|_| Ok(()));
        mock
    }

    /// Mock storage that remembers a conversation
    pub fn create_mock_storage_with(conversation_id: i64) -> MockStorageService {
        let mut mock = MockStorageService::new();
        mock.expect_load_session().returning(move || {
            Ok(SessionState {
                conversation_id: Some(conversation_id),
            })
        });
        mock.expect_save_session().returning(|_| Ok(()));
        mock
    }

    /// Mock transport answering every send with `reply`
    pub fn create_replying_transport(reply: ChatReply) -> MockChatTransport {
        let mut mock = MockChatTransport::new();
        mock.expect_send_message()
            .returning(move |_| Ok(reply.clone()));
        mock
    }

    /// Reply carrying a message and nothing else
    pub fn reply_with_message(text: &str) -> ChatReply {
        ChatReply {
            message: Some(Value::String(text.to_string())),
            ..Default::default()
        }
    }

    /// Reply carrying a message, a conversation id and one chart artifact
    pub fn reply_with_chart(text: &str, conversation_id: i64, artifact_id: &str) -> ChatReply {
        ChatReply {
            conversation_id: Some(json!(conversation_id)),
            message: Some(Value::String(text.to_string())),
            artifacts: Some(json!([{
                "id": artifact_id,
                "artifact_type": "CHART",
                "title": "Revenue trend",
                "content": {
                    "type": "line",
                    "categories": ["Q1", "Q2"],
                    "series": [{"name": "Revenue", "data": [1, 2]}]
                }
            }])),
            ..Default::default()
        }
    }
}
