// Ordered, deduplicated collection of artifacts shared by the canvas
//
// Newest batches go to the front; order inside a batch is kept. An id that
// is already present is skipped, so replaying the same artifacts-received
// event is harmless.

use super::types::{generate_artifact_id, Artifact};
use crate::events::{EventBus, EventKind, Subscription, Topic};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub struct ArtifactStore {
    items: Mutex<Vec<Artifact>>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl ArtifactStore {
    /// Create a detached store (not listening to the bus)
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Create a store that ingests `artifacts-received` and clears on
    /// `new-conversation`
    pub fn mount(bus: &EventBus) -> Arc<Self> {
        let store = Arc::new(Self::new());

        let on_artifacts = {
            let store = Arc::downgrade(&store);
            bus.subscribe(Topic::ArtifactsReceived, move |event| {
                if let (Some(store), EventKind::ArtifactsReceived { artifacts }) =
                    (store.upgrade(), &event.kind)
                {
                    store.ingest(artifacts.clone());
                }
            })
        };
        let on_reset = {
            let store = Arc::downgrade(&store);
            bus.subscribe(Topic::NewConversation, move |_| {
                if let Some(store) = store.upgrade() {
                    store.clear();
                }
            })
        };

        store.lock_subscriptions().extend([on_artifacts, on_reset]);
        store
    }

    fn lock_items(&self) -> MutexGuard<'_, Vec<Artifact>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_subscriptions(&self) -> MutexGuard<'_, Vec<Subscription>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Prepend a batch, skipping ids already stored
    ///
    /// Returns how many artifacts were actually added.
    pub fn ingest(&self, artifacts: Vec<Artifact>) -> usize {
        let mut items = self.lock_items();
        let mut seen: HashSet<String> = items.iter().map(|a| a.id.clone()).collect();

        let mut batch = Vec::with_capacity(artifacts.len());
        for mut artifact in artifacts {
            if artifact.id.is_empty() {
                artifact.id = generate_artifact_id();
            }
            if !seen.insert(artifact.id.clone()) {
                tracing::debug!("Skipping duplicate artifact {}", artifact.id);
                continue;
            }
            batch.push(artifact);
        }

        let added = batch.len();
        if added > 0 {
            batch.append(&mut items);
            *items = batch;
            tracing::info!("Stored {} new artifact(s), {} total", added, items.len());
        }
        added
    }

    /// Remove every artifact
    pub fn clear(&self) {
        let mut items = self.lock_items();
        if !items.is_empty() {
            tracing::debug!("Clearing {} artifact(s)", items.len());
        }
        items.clear();
    }

    pub fn find(&self, id: &str) -> Option<Artifact> {
        self.lock_items().iter().find(|a| a.id == id).cloned()
    }

    /// Snapshot in presentation order (newest first)
    pub fn list(&self) -> Vec<Artifact> {
        self.lock_items().clone()
    }

    pub fn len(&self) -> usize {
        self.lock_items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_items().is_empty()
    }

    /// Stop listening to the bus; stored artifacts stay readable
    pub fn unmount(&self) {
        self.lock_subscriptions().clear();
        tracing::debug!("Artifact store unmounted");
    }
}

impl Default for ArtifactStore {
    fn default() -> Self {
        Self::new()
    }
}
