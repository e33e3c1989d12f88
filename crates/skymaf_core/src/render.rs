//! Contracts for plotting and persistence collaborators.
//!
//! The engine hands renderers fully computed, serializable plot requests and
//! never depends on a concrete plotting backend.

use std::path::Path;

use serde::Serialize;

use crate::bundle::{DisplayMeta, MaskedArray, MetricBundle, SummaryValue};
use crate::error::Result;
use crate::slicer::SliceGeometry;

/// One bundle's contribution to a plot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotLayer {
    pub bundle: String,
    pub metric_name: String,
    pub slicer: String,
    pub metadata: String,
    pub geometry: Option<SliceGeometry>,
    pub results: Option<MaskedArray>,
    pub summaries: Vec<SummaryValue>,
    pub display: DisplayMeta,
    pub color: Option<String>,
    pub label: String,
}

impl PlotLayer {
    #[must_use]
    pub fn from_bundle(bundle: &MetricBundle) -> Self {
        let merge = bundle.merge();
        Self {
            bundle: bundle.name().to_string(),
            metric_name: bundle.metric_name().to_string(),
            slicer: bundle.slicer().kind().to_string(),
            metadata: bundle.metadata().to_string(),
            geometry: bundle.slicer().geometry(),
            results: bundle.results().cloned(),
            summaries: bundle.summary_values().to_vec(),
            display: bundle.display().clone(),
            color: merge.and_then(|m| m.color.clone()),
            label: merge
                .and_then(|m| m.label.clone())
                .unwrap_or_else(|| bundle.metadata().to_string()),
        }
    }
}

/// A plot to produce: a standalone bundle has one layer, a merge group one
/// layer per member in declaration order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotRequest {
    pub name: String,
    pub layers: Vec<PlotLayer>,
}

pub trait Renderer: Sync {
    type Artifact;

    /// File extension for persisted artifacts
    fn extension(&self) -> &str;

    fn render(&self, request: &PlotRequest) -> Result<Self::Artifact>;
}

pub trait Persister<A>: Sync {
    fn persist(&self, artifact: &A, path: &Path) -> Result<()>;
}
