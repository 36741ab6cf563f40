// Artifact Render Dispatcher
//
// Dispatch is a closed match over ArtifactKind. Unknown kinds are a normal
// outcome and get a placeholder; a chart the backend cannot draw also ends as
// a placeholder. Nothing here returns an error or unwinds into the caller.

mod chart;
mod table;

pub use chart::{
    normalize_kind, ChartBackend, ChartDescriptor, ChartSeries, TextChartBackend, SUPPORTED_KINDS,
};
pub use table::{cell_text, TableView};

use crate::artifacts::{Artifact, ArtifactKind};
use crate::error::ChatError;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Why an artifact shows a placeholder instead of content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderReason {
    NotImplemented,
    RenderFailed,
    NoBackend,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    pub message: String,
    pub reason: PlaceholderReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedChart {
    pub descriptor: ChartDescriptor,
    pub backend: String,
    pub visual: String,
}

/// Outcome of rendering one artifact
#[derive(Debug, Clone, PartialEq)]
pub enum RenderResult {
    Chart(RenderedChart),
    Table(TableView),
    Placeholder(Placeholder),
}

impl RenderResult {
    fn placeholder(reason: PlaceholderReason, message: impl Into<String>) -> Self {
        RenderResult::Placeholder(Placeholder {
            message: message.into(),
            reason,
        })
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, RenderResult::Placeholder(_))
    }
}

/// Picks a renderer by artifact type
///
/// Usage:
///     let dispatcher = RenderDispatcher::new(Some(Arc::new(TextChartBackend::default())));
///     match dispatcher.render(&artifact) {
///         RenderResult::Chart(chart) => println!("{}", chart.visual),
///         RenderResult::Table(table) => println!("{}", table.to_text()),
///         RenderResult::Placeholder(p) => println!("{}", p.message),
///     }
#[derive(Clone, Default)]
pub struct RenderDispatcher {
    chart_backend: Option<Arc<dyn ChartBackend>>,
}

impl RenderDispatcher {
    pub fn new(chart_backend: Option<Arc<dyn ChartBackend>>) -> Self {
        Self { chart_backend }
    }

    pub fn has_chart_backend(&self) -> bool {
        self.chart_backend.is_some()
    }

    pub fn render(&self, artifact: &Artifact) -> RenderResult {
        match artifact.kind() {
            ArtifactKind::Chart => self.render_chart(artifact),
            ArtifactKind::Table => RenderResult::Table(TableView::from_content(&artifact.content)),
            ArtifactKind::Report => RenderResult::placeholder(
                PlaceholderReason::NotImplemented,
                "Report rendering coming soon",
            ),
            ArtifactKind::Document => RenderResult::placeholder(
                PlaceholderReason::NotImplemented,
                "Document rendering coming soon",
            ),
            ArtifactKind::Other(_) => RenderResult::placeholder(
                PlaceholderReason::NotImplemented,
                format!("Renderer for {} not implemented", artifact.artifact_type),
            ),
        }
    }

    fn render_chart(&self, artifact: &Artifact) -> RenderResult {
        let descriptor = match ChartDescriptor::from_content(&artifact.content) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                tracing::warn!("Chart {} not renderable: {}", artifact.id, e);
                return RenderResult::placeholder(PlaceholderReason::RenderFailed, failure_text(&e));
            }
        };

        let Some(backend) = &self.chart_backend else {
            return RenderResult::placeholder(
                PlaceholderReason::NoBackend,
                "Chart rendering is not available",
            );
        };

        match panic::catch_unwind(AssertUnwindSafe(|| backend.plot(&descriptor))) {
            Ok(Ok(visual)) => RenderResult::Chart(RenderedChart {
                descriptor,
                backend: backend.name().to_string(),
                visual,
            }),
            Ok(Err(e)) => {
                tracing::warn!("Chart backend {} rejected {}: {}", backend.name(), artifact.id, e);
                RenderResult::placeholder(
                    PlaceholderReason::RenderFailed,
                    format!("Failed to render chart: {}", failure_text(&e)),
                )
            }
            Err(_) => {
                tracing::warn!("Chart backend {} panicked on {}", backend.name(), artifact.id);
                RenderResult::placeholder(
                    PlaceholderReason::RenderFailed,
                    "Failed to render chart: backend crashed",
                )
            }
        }
    }
}

fn failure_text(err: &ChatError) -> String {
    match err {
        ChatError::Render(message) => message.clone(),
        other => other.to_string(),
    }
}
