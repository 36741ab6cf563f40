// Service layer: configuration and the ports the chat core persists through
//
// Traits define the ports (FileSystem, StorageService); RealFileSystem and
// FileStorageService are the adapters used in production. Tests swap in the
// mockall mocks from traits.rs or the helpers in mocks.rs.
//
// Usage Example:
//     let fs = Arc::new(RealFileSystem);
//     let storage = Arc::new(FileStorageService::new(fs, config.data_dir.clone()));
//     let session = storage.load_session().await?;

pub mod config;
pub mod filesystem;
#[cfg(test)]
pub mod integration_tests;
#[cfg(test)]
pub mod mocks;
pub mod storage;
pub mod traits;

pub use config::ChatConfig;
pub use filesystem::RealFileSystem;
pub use storage::FileStorageService;
pub use traits::{FileSystem, SessionState, StorageService};
