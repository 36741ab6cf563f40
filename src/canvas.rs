// Canvas Mode Controller
//
// hidden <-> collapsed via toggle; collapsed -> expanded -> fullscreen ->
// collapsed via cycle; anything -> hidden via close. Selecting an artifact
// opens it (collapsed becomes expanded), deselecting always drops back to the
// collapsed list.
//
// canvas-state-changed is published only when the hidden/visible boundary is
// crossed, after the state lock is released so listeners may query the
// controller.

use crate::artifacts::{Artifact, ArtifactStore};
use crate::events::{EventBus, EventKind, Subscription, Topic};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const SOURCE: &str = "canvas";

/// Visibility and size of the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CanvasMode {
    #[default]
    Hidden,
    Collapsed,
    Expanded,
    Fullscreen,
}

impl CanvasMode {
    pub fn is_open(self) -> bool {
        self != CanvasMode::Hidden
    }

    /// Next mode of the collapsed -> expanded -> fullscreen cycle
    fn cycled(self) -> Self {
        match self {
            CanvasMode::Hidden => CanvasMode::Hidden,
            CanvasMode::Collapsed => CanvasMode::Expanded,
            CanvasMode::Expanded => CanvasMode::Fullscreen,
            CanvasMode::Fullscreen => CanvasMode::Collapsed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CanvasMode::Hidden => "hidden",
            CanvasMode::Collapsed => "collapsed",
            CanvasMode::Expanded => "expanded",
            CanvasMode::Fullscreen => "fullscreen",
        }
    }
}

impl fmt::Display for CanvasMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
struct CanvasState {
    mode: CanvasMode,
    active: Option<String>,
}

/// Process-wide canvas state machine
///
/// Usage:
///     let canvas = CanvasController::mount(Arc::clone(&bus), Arc::clone(&store));
///     canvas.toggle();
///     if let Some(artifact) = canvas.open_artifact(&id) { ... }
pub struct CanvasController {
    bus: Arc<EventBus>,
    store: Arc<ArtifactStore>,
    state: Mutex<CanvasState>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl CanvasController {
    /// Create a hidden canvas driven by `artifacts-received`,
    /// `toggle-canvas` and `new-conversation`
    pub fn mount(bus: Arc<EventBus>, store: Arc<ArtifactStore>) -> Arc<Self> {
        let canvas = Arc::new(Self {
            bus: Arc::clone(&bus),
            store,
            state: Mutex::new(CanvasState::default()),
            subscriptions: Mutex::new(Vec::new()),
        });

        let on_artifacts = {
            let canvas = Arc::downgrade(&canvas);
            bus.subscribe(Topic::ArtifactsReceived, move |event| {
                if let (Some(canvas), EventKind::ArtifactsReceived { artifacts }) =
                    (canvas.upgrade(), &event.kind)
                {
                    if !artifacts.is_empty() {
                        canvas.reveal();
                    }
                }
            })
        };
        let on_toggle = {
            let canvas = Arc::downgrade(&canvas);
            bus.subscribe(Topic::ToggleCanvas, move |_| {
                if let Some(canvas) = canvas.upgrade() {
                    canvas.toggle();
                }
            })
        };
        let on_reset = {
            let canvas = Arc::downgrade(&canvas);
            bus.subscribe(Topic::NewConversation, move |_| {
                if let Some(canvas) = canvas.upgrade() {
                    canvas.close();
                }
            })
        };

        canvas
            .lock_subscriptions()
            .extend([on_artifacts, on_toggle, on_reset]);
        canvas
    }

    fn lock(&self) -> MutexGuard<'_, CanvasState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_subscriptions(&self) -> MutexGuard<'_, Vec<Subscription>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a change and announce a crossing of the hidden boundary
    fn transition<R>(&self, change: impl FnOnce(&mut CanvasState) -> R) -> R {
        let (before, after, result) = {
            let mut state = self.lock();
            let before = state.mode;
            let result = change(&mut state);
            (before, state.mode, result)
        };

        if before != after {
            tracing::debug!("Canvas {} -> {}", before, after);
        }
        if before.is_open() != after.is_open() {
            self.bus.emit(
                SOURCE,
                EventKind::CanvasStateChanged {
                    is_open: after.is_open(),
                },
            );
        }
        result
    }

    /// hidden -> collapsed, anything else -> hidden
    pub fn toggle(&self) {
        self.transition(|state| {
            if state.mode.is_open() {
                state.mode = CanvasMode::Hidden;
                state.active = None;
            } else {
                state.mode = CanvasMode::Collapsed;
            }
        });
    }

    /// Advance collapsed -> expanded -> fullscreen -> collapsed; no-op when hidden
    pub fn cycle(&self) {
        self.transition(|state| state.mode = state.mode.cycled());
    }

    /// Hide the canvas and clear the selection
    pub fn close(&self) {
        self.transition(|state| {
            state.mode = CanvasMode::Hidden;
            state.active = None;
        });
    }

    /// Open only a hidden canvas; arriving data never grabs more space
    fn reveal(&self) {
        self.transition(|state| {
            if state.mode == CanvasMode::Hidden {
                state.mode = CanvasMode::Collapsed;
            }
        });
    }

    /// Select an artifact for viewing
    ///
    /// Unknown ids change nothing. Hidden and collapsed canvases move to
    /// expanded; expanded and fullscreen stay as they are.
    pub fn open_artifact(&self, id: &str) -> Option<Artifact> {
        let Some(artifact) = self.store.find(id) else {
            tracing::debug!("Cannot open unknown artifact {}", id);
            return None;
        };

        self.transition(|state| {
            state.active = Some(artifact.id.clone());
            if matches!(state.mode, CanvasMode::Hidden | CanvasMode::Collapsed) {
                state.mode = CanvasMode::Expanded;
            }
        });
        Some(artifact)
    }

    /// Return to the list view, whatever the current mode
    pub fn close_artifact(&self) {
        self.transition(|state| {
            state.active = None;
            state.mode = CanvasMode::Collapsed;
        });
    }

    pub fn mode(&self) -> CanvasMode {
        self.lock().mode
    }

    pub fn is_open(&self) -> bool {
        self.mode().is_open()
    }

    pub fn active_artifact_id(&self) -> Option<String> {
        self.lock().active.clone()
    }

    /// The selected artifact, if it is still in the store
    pub fn active_artifact(&self) -> Option<Artifact> {
        let id = self.active_artifact_id()?;
        self.store.find(&id)
    }

    /// Stop reacting to the bus
    pub fn unmount(&self) {
        self.lock_subscriptions().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn chart(id: &str) -> Artifact {
        Artifact::new("CHART", "Revenue", json!({"series": []})).with_id(id)
    }

    fn setup() -> (Arc<EventBus>, Arc<ArtifactStore>, Arc<CanvasController>) {
        let bus = Arc::new(EventBus::new());
        let store = ArtifactStore::mount(&bus);
        let canvas = CanvasController::mount(Arc::clone(&bus), Arc::clone(&store));
        (bus, store, canvas)
    }

    fn receive(bus: &EventBus, artifacts: Vec<Artifact>) {
        bus.emit("chat", EventKind::ArtifactsReceived { artifacts });
    }

    fn record_state_changes(bus: &EventBus) -> (Arc<Mutex<Vec<bool>>>, Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sub = {
            let seen = Arc::clone(&seen);
            bus.subscribe(Topic::CanvasStateChanged, move |event| {
                if let EventKind::CanvasStateChanged { is_open } = event.kind {
                    seen.lock().unwrap().push(is_open);
                }
            })
        };
        (seen, sub)
    }

    #[test]
    fn test_starts_hidden() {
        let (_bus, _store, canvas) = setup();
        assert_eq!(canvas.mode(), CanvasMode::Hidden);
        assert!(!canvas.is_open());
    }

    #[test]
    fn test_toggle_twice_is_identity() {
        let (_bus, _store, canvas) = setup();
        canvas.toggle();
        assert_eq!(canvas.mode(), CanvasMode::Collapsed);
        canvas.toggle();
        assert_eq!(canvas.mode(), CanvasMode::Hidden);
    }

    #[test]
    fn test_cycle_wraps() {
        let (_bus, _store, canvas) = setup();
        canvas.cycle();
        assert_eq!(canvas.mode(), CanvasMode::Hidden);

        canvas.toggle();
        canvas.cycle();
        assert_eq!(canvas.mode(), CanvasMode::Expanded);
        canvas.cycle();
        assert_eq!(canvas.mode(), CanvasMode::Fullscreen);
        canvas.cycle();
        assert_eq!(canvas.mode(), CanvasMode::Collapsed);
    }

    #[test]
    fn test_artifacts_open_hidden_canvas_to_collapsed() {
        let (bus, _store, canvas) = setup();
        receive(&bus, vec![chart("c1")]);
        assert_eq!(canvas.mode(), CanvasMode::Collapsed);
    }

    #[test]
    fn test_artifacts_do_not_change_open_modes() {
        let (bus, _store, canvas) = setup();
        canvas.toggle();
        canvas.cycle();
        canvas.cycle();
        assert_eq!(canvas.mode(), CanvasMode::Fullscreen);

        receive(&bus, vec![chart("c1")]);
        assert_eq!(canvas.mode(), CanvasMode::Fullscreen);
    }

    #[test]
    fn test_open_and_close_artifact_scenario() {
        let (bus, _store, canvas) = setup();
        receive(&bus, vec![chart("c1")]);
        assert_eq!(canvas.mode(), CanvasMode::Collapsed);

        let opened = canvas.open_artifact("c1").unwrap();
        assert_eq!(opened.id, "c1");
        assert_eq!(canvas.mode(), CanvasMode::Expanded);
        assert_eq!(canvas.active_artifact().unwrap().id, "c1");

        canvas.close_artifact();
        assert_eq!(canvas.mode(), CanvasMode::Collapsed);
        assert!(canvas.active_artifact().is_none());
    }

    #[test]
    fn test_open_artifact_keeps_fullscreen() {
        let (bus, _store, canvas) = setup();
        receive(&bus, vec![chart("c1")]);
        canvas.cycle();
        canvas.cycle();

        canvas.open_artifact("c1");
        assert_eq!(canvas.mode(), CanvasMode::Fullscreen);

        canvas.close_artifact();
        assert_eq!(canvas.mode(), CanvasMode::Collapsed);
    }

    #[test]
    fn test_open_unknown_artifact_is_noop() {
        let (_bus, _store, canvas) = setup();
        assert!(canvas.open_artifact("missing").is_none());
        assert_eq!(canvas.mode(), CanvasMode::Hidden);
        assert!(canvas.active_artifact_id().is_none());
    }

    #[test]
    fn test_open_from_hidden_goes_to_expanded() {
        let (_bus, store, canvas) = setup();
        store.ingest(vec![chart("c1")]);
        canvas.open_artifact("c1");
        assert_eq!(canvas.mode(), CanvasMode::Expanded);
    }

    #[test]
    fn test_state_changed_only_on_hidden_boundary() {
        let (bus, _store, canvas) = setup();
        let (seen, _sub) = record_state_changes(&bus);

        canvas.toggle(); // hidden -> collapsed
        canvas.cycle(); // collapsed -> expanded
        canvas.cycle(); // expanded -> fullscreen
        canvas.close(); // fullscreen -> hidden
        canvas.close(); // already hidden

        assert_eq!(*seen.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn test_toggle_event_and_new_conversation() {
        let (bus, _store, canvas) = setup();
        let hits = Arc::new(AtomicUsize::new(0));
        let _sub = {
            let hits = Arc::clone(&hits);
            bus.subscribe(Topic::CanvasStateChanged, move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        };

        bus.emit("header", EventKind::ToggleCanvas);
        assert!(canvas.is_open());

        receive(&bus, vec![chart("c1")]);
        canvas.open_artifact("c1");

        bus.emit("header", EventKind::NewConversation);
        assert_eq!(canvas.mode(), CanvasMode::Hidden);
        assert!(canvas.active_artifact_id().is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_toggle_off_clears_selection() {
        let (bus, _store, canvas) = setup();
        receive(&bus, vec![chart("c1")]);
        canvas.open_artifact("c1");

        canvas.toggle();
        assert_eq!(canvas.mode(), CanvasMode::Hidden);
        assert!(canvas.active_artifact_id().is_none());

        canvas.toggle();
        assert_eq!(canvas.mode(), CanvasMode::Collapsed);
        assert!(canvas.active_artifact_id().is_none());
    }

    #[test]
    fn test_unmounted_canvas_ignores_bus() {
        let (bus, _store, canvas) = setup();
        canvas.unmount();
        bus.emit("header", EventKind::ToggleCanvas);
        assert_eq!(canvas.mode(), CanvasMode::Hidden);
    }
}
