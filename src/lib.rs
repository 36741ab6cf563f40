// Library interface for chatcanvas
//
// The sync core of a chat client with an artifact canvas: transport, event
// bus, message pipeline, artifact store, canvas state machine and render
// dispatch. A front end mounts it through AppBuilder and talks to it through
// the bus.

pub mod app_builder;
pub mod artifacts;
pub mod canvas;
pub mod conversation;
pub mod error;
pub mod events;
pub mod markdown;
pub mod render;
pub mod services;
pub mod transport;
pub mod version;

// Re-export commonly used types for convenience
pub use app_builder::{AppBuilder, ChatApp};
pub use artifacts::{Artifact, ArtifactKind, ArtifactStore};
pub use canvas::{CanvasController, CanvasMode};
pub use conversation::{
    ChatPipeline, ConversationContext, ErrorBanner, Message, PipelineSettings, PipelineState, Role,
    SendOutcome,
};
pub use error::{BannerKind, ChatError, Result};
pub use events::{Event, EventBus, EventKind, Subscription, Topic};
pub use render::{ChartBackend, RenderDispatcher, RenderResult, TextChartBackend};
pub use services::{ChatConfig, FileStorageService, FileSystem, RealFileSystem, SessionState, StorageService};
pub use transport::{ChatReply, ChatRequest, ChatTransport, ConversationSummary, HttpTransport, RetryPolicy};
