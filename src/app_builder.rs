// AppBuilder: constructs and wires the chat core
//
// The builder owns dependency choice (real HTTP transport and file storage,
// or mocks in tests). build() mounts the components on one shared bus in a
// fixed order: artifact store, canvas, pipeline. The store is subscribed
// first, so by the time the canvas reacts to artifacts-received the batch is
// already stored.
//
// Usage Example:
//     // Production
//     let app = AppBuilder::new()
//         .with_config(ChatConfig::load()?)
//         .with_production_deps()?
//         .build()?;
//
//     // Testing
//     let app = AppBuilder::new()
//         .with_test_deps()
//         .with_transport(Arc::new(mock_transport))
//         .build()?;

use crate::artifacts::ArtifactStore;
use crate::canvas::CanvasController;
use crate::conversation::{ChatPipeline, PipelineSettings};
use crate::error::{ChatError, Result};
use crate::events::{EventBus, EventKind};
use crate::render::{ChartBackend, RenderDispatcher, RenderResult, TextChartBackend};
use crate::services::{ChatConfig, FileStorageService, FileSystem, RealFileSystem, StorageService};
use crate::transport::{ChatTransport, HttpTransport};
use std::sync::Arc;

const SOURCE: &str = "app";

/// Builder for constructing a ChatApp with dependency injection
///
/// # Examples
///
/// ```no_run
/// use chatcanvas::{AppBuilder, ChatConfig};
///
/// #[tokio::main]
/// async fn main() -> chatcanvas::Result<()> {
///     let app = AppBuilder::new()
///         .with_config(ChatConfig::load()?)
///         .with_production_deps()?
///         .build()?;
///
///     app.pipeline.send("Show headcount by unit").await;
///     Ok(())
/// }
/// ```
pub struct AppBuilder {
    config: Option<ChatConfig>,
    transport: Option<Arc<dyn ChatTransport>>,
    storage: Option<Arc<dyn StorageService>>,
    event_bus: Option<Arc<EventBus>>,
    chart_backend: Option<Arc<dyn ChartBackend>>,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            transport: None,
            storage: None,
            event_bus: None,
            chart_backend: None,
        }
    }

    pub fn with_config(mut self, config: ChatConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use the HTTP transport, file-backed session storage and the text
    /// chart backend
    ///
    /// # Errors
    /// The HTTP client cannot be built.
    pub fn with_production_deps(mut self) -> Result<Self> {
        let config = self.config.get_or_insert_with(ChatConfig::default).clone();

        let transport = Arc::new(HttpTransport::from_config(&config)?) as Arc<dyn ChatTransport>;
        let filesystem = Arc::new(RealFileSystem) as Arc<dyn FileSystem>;
        let storage = Arc::new(FileStorageService::new(filesystem, config.data_dir.clone()))
            as Arc<dyn StorageService>;

        self.transport = Some(transport);
        self.storage = Some(storage);
        self.chart_backend = Some(Arc::new(TextChartBackend::default()));
        if self.event_bus.is_none() {
            self.event_bus = Some(Arc::new(EventBus::new()));
        }

        Ok(self)
    }

    /// Use mock storage and a mock transport that answers "ok"
    #[cfg(test)]
    pub fn with_test_deps(mut self) -> Self {
        use crate::services::mocks::test_helpers::*;

        self.transport = Some(Arc::new(create_replying_transport(reply_with_message("ok"))));
        self.storage = Some(Arc::new(create_mock_storage()));
        self.chart_backend = Some(Arc::new(TextChartBackend::default()));
        self.event_bus = Some(Arc::new(EventBus::new()));
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn ChatTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_storage(mut self, storage: Arc<dyn StorageService>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn with_chart_backend(mut self, backend: Arc<dyn ChartBackend>) -> Self {
        self.chart_backend = Some(backend);
        self
    }

    /// Mount every component on the bus
    ///
    /// # Errors
    /// Transport or storage missing.
    pub fn build(self) -> Result<ChatApp> {
        let transport = self
            .transport
            .ok_or_else(|| ChatError::Config("Transport not configured".to_string()))?;
        let storage = self
            .storage
            .ok_or_else(|| ChatError::Config("Storage not configured".to_string()))?;
        let config = self.config.unwrap_or_default();
        let bus = self.event_bus.unwrap_or_else(|| Arc::new(EventBus::new()));

        let store = ArtifactStore::mount(&bus);
        let canvas = CanvasController::mount(Arc::clone(&bus), Arc::clone(&store));
        let pipeline = ChatPipeline::mount(
            transport,
            storage,
            Arc::clone(&bus),
            PipelineSettings::from(&config),
        );
        let dispatcher = RenderDispatcher::new(self.chart_backend);

        tracing::debug!("Chat app assembled against {}", config.api_url);
        Ok(ChatApp {
            config,
            bus,
            store,
            canvas,
            pipeline,
            dispatcher,
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The mounted chat core
///
/// Components never hold references to each other; the helpers here only
/// publish on the bus, exactly as an outer UI would.
pub struct ChatApp {
    pub config: ChatConfig,
    pub bus: Arc<EventBus>,
    pub store: Arc<ArtifactStore>,
    pub canvas: Arc<CanvasController>,
    pub pipeline: Arc<ChatPipeline>,
    pub dispatcher: RenderDispatcher,
}

impl ChatApp {
    /// Publish `new-conversation`
    pub fn new_conversation(&self) {
        self.bus.emit(SOURCE, EventKind::NewConversation);
    }

    /// Publish `toggle-canvas`
    pub fn toggle_canvas(&self) {
        self.bus.emit(SOURCE, EventKind::ToggleCanvas);
    }

    /// Publish `conversation-selected`; the pipeline loads it in the background
    pub fn select_conversation(&self, conversation_id: i64) {
        self.bus
            .emit(SOURCE, EventKind::ConversationSelected { conversation_id });
    }

    /// Render whatever the canvas has selected
    pub fn render_active(&self) -> Option<RenderResult> {
        self.canvas
            .active_artifact()
            .map(|artifact| self.dispatcher.render(&artifact))
    }

    /// Detach every component from the bus
    pub fn shutdown(&self) {
        self.pipeline.unmount();
        self.canvas.unmount();
        self.store.unmount();
    }
}
