mod store;
mod types;

pub use store::ArtifactStore;
pub use types::{generate_artifact_id, Artifact, ArtifactKind};
