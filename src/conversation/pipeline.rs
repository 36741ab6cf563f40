// Message Pipeline: send/retry state machine over one conversation
//
// States are Idle -> Sending -> AwaitingResponse -> Idle. The user message is
// appended before the transport is called, so the transcript always shows
// what was asked even when the exchange fails. Only one request is in flight
// at a time; a send while busy is ignored, not queued.
//
// Every await is followed by a liveness and generation check. Unmounting or
// switching conversation while a request is in flight makes its result stale;
// stale results are dropped without touching state. Session writes carry the
// generation that produced them and a write older than the last one is
// skipped, so a background clear cannot overwrite a newer conversation id.

use super::message::{with_insights, Message, Transcript};
use crate::artifacts::Artifact;
use crate::error::{BannerKind, ChatError, Result};
use crate::events::{EventBus, EventKind, Subscription, Topic};
use crate::services::{ChatConfig, SessionState, StorageService};
use crate::transport::{ChatReply, ChatRequest, ChatTransport, ConversationSummary};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const SOURCE: &str = "chat";

/// Where the pipeline is in the send cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Sending,
    AwaitingResponse,
}

/// Retryable error shown above the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorBanner {
    pub kind: BannerKind,
    pub text: String,
}

impl ErrorBanner {
    fn for_send(err: &ChatError) -> Self {
        let kind = err.banner_kind().unwrap_or(BannerKind::Network);
        let text = match (kind, err) {
            (BannerKind::Service, ChatError::Service(detail)) => detail.clone(),
            (BannerKind::Malformed, _) => {
                "Connection error: the assistant sent an unreadable reply.".to_string()
            }
            _ => "Connection failed. Please try again.".to_string(),
        };
        Self { kind, text }
    }

    fn for_load(err: &ChatError) -> Self {
        Self {
            kind: err.banner_kind().unwrap_or(BannerKind::Network),
            text: "Failed to load conversation messages".to_string(),
        }
    }
}

/// What a send or retry call ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input, busy pipeline, or nothing to retry
    Ignored,
    /// An agent message was appended
    Delivered,
    /// The exchange failed and a banner is up
    Failed(BannerKind),
    /// The result arrived after an unmount or conversation switch
    Discarded,
}

/// The active conversation: its server id and local transcript
#[derive(Debug, Clone, Default)]
pub struct ConversationContext {
    pub conversation_id: Option<i64>,
    pub transcript: Transcript,
}

/// Request settings that do not change during a session
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub persona: Option<String>,
    pub user_id: i64,
    pub history_limit: u32,
}

impl From<&ChatConfig> for PipelineSettings {
    fn from(config: &ChatConfig) -> Self {
        Self {
            persona: config.persona.clone(),
            user_id: config.user_id,
            history_limit: config.history_limit,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&ChatConfig::default())
    }
}

struct Inner {
    state: PipelineState,
    context: ConversationContext,
    banner: Option<ErrorBanner>,
    /// The banner came from a failed send, so retry has something to resend
    failed_send: bool,
    generation: u64,
}

/// Owns the transcript and turns user input into transport requests
///
/// Usage:
///     let pipeline = ChatPipeline::mount(transport, storage, bus, settings);
///     pipeline.send("Show revenue by quarter").await;
///     if pipeline.banner().is_some() {
///         pipeline.retry().await;
///     }
pub struct ChatPipeline {
    transport: Arc<dyn ChatTransport>,
    storage: Arc<dyn StorageService>,
    bus: Arc<EventBus>,
    settings: PipelineSettings,
    inner: Mutex<Inner>,
    alive: AtomicBool,
    subscriptions: Mutex<Vec<Subscription>>,
    /// Generation of the last session write
    session_writes: Arc<tokio::sync::Mutex<u64>>,
}

impl ChatPipeline {
    /// Create a pipeline and subscribe it to `new-conversation` and
    /// `conversation-selected`
    pub fn mount(
        transport: Arc<dyn ChatTransport>,
        storage: Arc<dyn StorageService>,
        bus: Arc<EventBus>,
        settings: PipelineSettings,
    ) -> Arc<Self> {
        let pipeline = Arc::new(Self {
            transport,
            storage,
            bus: Arc::clone(&bus),
            settings,
            inner: Mutex::new(Inner {
                state: PipelineState::Idle,
                context: ConversationContext::default(),
                banner: None,
                failed_send: false,
                generation: 0,
            }),
            alive: AtomicBool::new(true),
            subscriptions: Mutex::new(Vec::new()),
            session_writes: Arc::new(tokio::sync::Mutex::new(0)),
        });

        let on_reset = {
            let pipeline = Arc::downgrade(&pipeline);
            bus.subscribe(Topic::NewConversation, move |_| {
                if let Some(pipeline) = pipeline.upgrade() {
                    pipeline.reset();
                }
            })
        };
        let on_select = {
            let pipeline = Arc::downgrade(&pipeline);
            bus.subscribe(Topic::ConversationSelected, move |event| {
                let (Some(pipeline), EventKind::ConversationSelected { conversation_id }) =
                    (pipeline.upgrade(), &event.kind)
                else {
                    return;
                };
                let conversation_id = *conversation_id;
                match tokio::runtime::Handle::try_current() {
                    Ok(handle) => {
                        handle.spawn(async move {
                            if let Err(e) = pipeline.load_conversation(conversation_id).await {
                                tracing::warn!(
                                    "Loading conversation {} failed: {}",
                                    conversation_id,
                                    e
                                );
                            }
                        });
                    }
                    Err(_) => tracing::warn!(
                        "No async runtime; cannot load conversation {}",
                        conversation_id
                    ),
                }
            })
        };

        pipeline.lock_subscriptions().extend([on_reset, on_select]);
        pipeline
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_subscriptions(&self) -> MutexGuard<'_, Vec<Subscription>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `text` as a user message and send it
    ///
    /// Ignored when the trimmed text is empty or another request is in
    /// flight.
    pub async fn send(&self, text: &str) -> SendOutcome {
        if text.trim().is_empty() {
            tracing::debug!("Ignoring blank message");
            return SendOutcome::Ignored;
        }

        let started = {
            let mut inner = self.lock();
            if inner.state != PipelineState::Idle {
                tracing::debug!("Ignoring send while {:?}", inner.state);
                None
            } else {
                Some(self.begin(&mut inner, Message::user(text)))
            }
        };

        match started {
            Some((request, generation)) => self.dispatch(request, generation).await,
            None => SendOutcome::Ignored,
        }
    }

    /// Resend the trailing user message after a failed send
    ///
    /// The message is trimmed and re-appended, so the transcript never holds
    /// the same question twice. A failed history load is not a send and is
    /// not retried here.
    pub async fn retry(&self) -> SendOutcome {
        let started = {
            let mut inner = self.lock();
            if inner.state != PipelineState::Idle || !inner.failed_send {
                None
            } else {
                match inner.context.transcript.take_trailing_user() {
                    Some(last) => Some(self.begin(&mut inner, last)),
                    None => None,
                }
            }
        };

        match started {
            Some((request, generation)) => {
                tracing::info!("Retrying last message");
                self.dispatch(request, generation).await
            }
            None => {
                tracing::debug!("Nothing to retry");
                SendOutcome::Ignored
            }
        }
    }

    fn begin(&self, inner: &mut Inner, message: Message) -> (ChatRequest, u64) {
        inner.state = PipelineState::Sending;
        inner.banner = None;
        inner.failed_send = false;

        let request = ChatRequest::new(message.content())
            .with_conversation(inner.context.conversation_id)
            .with_persona(self.settings.persona.clone());
        inner.context.transcript.push(message);

        (request, inner.generation)
    }

    async fn dispatch(&self, request: ChatRequest, generation: u64) -> SendOutcome {
        {
            let mut inner = self.lock();
            if inner.generation == generation {
                inner.state = PipelineState::AwaitingResponse;
            }
        }

        let result = self.transport.send_message(&request).await;

        let delivered = {
            let mut inner = self.lock();
            if !self.is_alive() || inner.generation != generation {
                tracing::debug!("Discarding stale reply");
                return SendOutcome::Discarded;
            }
            inner.state = PipelineState::Idle;

            match result.and_then(interpret_reply) {
                Ok(reply) => {
                    inner.context.transcript.push(reply.message.clone());
                    let adopted = reply
                        .conversation_id
                        .filter(|id| inner.context.conversation_id != Some(*id));
                    if adopted.is_some() {
                        inner.context.conversation_id = adopted;
                    }
                    Ok((reply, adopted))
                }
                Err(e) => {
                    let banner = ErrorBanner::for_send(&e);
                    tracing::warn!("Send failed: {}", e);
                    let kind = banner.kind;
                    inner.banner = Some(banner);
                    inner.failed_send = true;
                    Err(kind)
                }
            }
        };

        let (reply, adopted) = match delivered {
            Ok(delivered) => delivered,
            Err(kind) => return SendOutcome::Failed(kind),
        };

        self.bus.emit(
            SOURCE,
            EventKind::MessageReceived {
                message: reply.message,
            },
        );
        if !reply.artifacts.is_empty() {
            tracing::info!("Reply produced {} artifact(s)", reply.artifacts.len());
            self.bus.emit(
                SOURCE,
                EventKind::ArtifactsReceived {
                    artifacts: reply.artifacts,
                },
            );
        }

        if let Some(id) = adopted {
            tracing::info!("Now in conversation {}", id);
            self.persist(Some(id), generation).await;
        }
        SendOutcome::Delivered
    }

    /// Replace the transcript with a conversation's history
    ///
    /// # Errors
    /// Transport failures only; missing optional fields never fail.
    pub async fn load_conversation(&self, conversation_id: i64) -> Result<()> {
        let generation = {
            let mut inner = self.lock();
            inner.generation += 1;
            inner.state = PipelineState::AwaitingResponse;
            inner.banner = None;
            inner.failed_send = false;
            inner.generation
        };
        tracing::info!("Loading conversation {}", conversation_id);

        let result = self.transport.conversation_messages(conversation_id).await;

        {
            let mut inner = self.lock();
            if !self.is_alive() || inner.generation != generation {
                tracing::debug!("Discarding stale history for {}", conversation_id);
                return Ok(());
            }
            inner.state = PipelineState::Idle;

            match result {
                Ok(raw) => {
                    inner.context = ConversationContext {
                        conversation_id: Some(conversation_id),
                        transcript: raw.iter().map(Message::from_history).collect(),
                    };
                    tracing::info!(
                        "Loaded {} message(s) for conversation {}",
                        inner.context.transcript.len(),
                        conversation_id
                    );
                }
                Err(e) => {
                    inner.banner = Some(ErrorBanner::for_load(&e));
                    return Err(e);
                }
            }
        }

        self.persist(Some(conversation_id), generation).await;
        Ok(())
    }

    /// Reload the conversation saved by a previous session
    ///
    /// Returns the restored id, or None when nothing was saved. An
    /// unreadable session counts as nothing saved.
    pub async fn restore_session(&self) -> Result<Option<i64>> {
        let session = match self.storage.load_session().await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Could not read saved session: {}", e);
                return Ok(None);
            }
        };

        match session.conversation_id {
            Some(id) => {
                self.load_conversation(id).await?;
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }

    /// Conversations for the history list
    pub async fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        self.transport
            .list_conversations(self.settings.user_id, self.settings.history_limit)
            .await
    }

    /// Drop the transcript and conversation id; in-flight results go stale
    pub fn reset(&self) {
        let generation = {
            let mut inner = self.lock();
            inner.generation += 1;
            inner.state = PipelineState::Idle;
            inner.banner = None;
            inner.failed_send = false;
            inner.context = ConversationContext::default();
            inner.generation
        };
        tracing::info!("Started a new conversation");

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let storage = Arc::clone(&self.storage);
                let writes = Arc::clone(&self.session_writes);
                handle.spawn(async move {
                    write_session(storage.as_ref(), &writes, generation, SessionState::default())
                        .await;
                });
            }
            Err(_) => tracing::warn!("No async runtime; saved session not cleared"),
        }
    }

    /// Stop reacting to the bus and to in-flight results
    pub fn unmount(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.lock_subscriptions().clear();
        tracing::debug!("Chat pipeline unmounted");
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn dismiss_banner(&self) {
        let mut inner = self.lock();
        inner.banner = None;
        inner.failed_send = false;
    }

    pub fn state(&self) -> PipelineState {
        self.lock().state
    }

    pub fn banner(&self) -> Option<ErrorBanner> {
        self.lock().banner.clone()
    }

    pub fn conversation_id(&self) -> Option<i64> {
        self.lock().context.conversation_id
    }

    /// Snapshot of the transcript
    pub fn messages(&self) -> Vec<Message> {
        self.lock().context.transcript.messages().to_vec()
    }

    async fn persist(&self, conversation_id: Option<i64>, generation: u64) {
        let session = SessionState { conversation_id };
        write_session(self.storage.as_ref(), &self.session_writes, generation, session).await;
    }
}

/// Save the session unless a later generation already saved one
async fn write_session(
    storage: &dyn StorageService,
    writes: &tokio::sync::Mutex<u64>,
    generation: u64,
    session: SessionState,
) {
    let mut latest = writes.lock().await;
    if generation < *latest {
        tracing::debug!(
            "Skipping session write from generation {} (latest {})",
            generation,
            *latest
        );
        return;
    }
    if let Err(e) = storage.save_session(&session).await {
        tracing::warn!("Failed to save session: {}", e);
    }
    *latest = generation;
}

struct InterpretedReply {
    message: Message,
    artifacts: Vec<Artifact>,
    conversation_id: Option<i64>,
}

/// A string `message` wins; otherwise `error` is a service failure and
/// anything else is malformed.
fn interpret_reply(reply: ChatReply) -> Result<InterpretedReply> {
    if let Some(text) = reply.message_text() {
        let content = with_insights(text, &reply.insights());
        return Ok(InterpretedReply {
            message: Message::agent(content, reply.artifact_refs()),
            artifacts: reply.artifacts(),
            conversation_id: reply.conversation_id(),
        });
    }

    match reply.error_text() {
        Some(detail) => Err(ChatError::Service(detail)),
        None => Err(ChatError::MalformedResponse(
            "reply has no usable message".to_string(),
        )),
    }
}
