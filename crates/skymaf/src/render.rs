//! JSON plot artifacts and the YAML run summary

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use skymaf_core::{
    FailureStage, MafError, Persister, PlotRequest, Renderer, Result, RunReport, SummaryValue,
};

/// Renders each plot request as a pretty-printed JSON document holding the
/// slice geometry, masked values and display metadata of every layer
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    type Artifact = String;

    fn extension(&self) -> &str {
        "json"
    }

    fn render(&self, request: &PlotRequest) -> Result<String> {
        serde_json::to_string_pretty(request).map_err(|e| MafError::Render(e.to_string()))
    }
}

/// Write `content` through a temporary file and rename it into place
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FilePersister;

impl Persister<String> for FilePersister {
    fn persist(&self, artifact: &String, path: &Path) -> Result<()> {
        atomic_write(path, artifact.as_bytes())
            .map_err(|e| MafError::Persist(format!("{}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "artifact written");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct BundleSummary {
    pub name: String,
    pub metric: String,
    pub slicer: String,
    pub metadata: String,
    pub summaries: Vec<SummaryValue>,
}

#[derive(Debug, Serialize)]
pub struct FailureSummary {
    pub name: String,
    pub stage: FailureStage,
    pub error: String,
}

/// What a run produced, in a form suitable for the summary file
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub run_name: String,
    pub partition_setups: usize,
    pub bundles: Vec<BundleSummary>,
    pub failures: Vec<FailureSummary>,
    pub artifacts: Vec<PathBuf>,
}

impl RunSummary {
    #[must_use]
    pub fn from_report(run_name: &str, report: &RunReport) -> Self {
        Self {
            run_name: run_name.to_string(),
            partition_setups: report.partition_setups,
            bundles: report
                .bundles
                .iter()
                .map(|bundle| BundleSummary {
                    name: bundle.name().to_string(),
                    metric: bundle.metric_name().to_string(),
                    slicer: bundle.slicer().kind().to_string(),
                    metadata: bundle.metadata().to_string(),
                    summaries: bundle.summary_values().to_vec(),
                })
                .collect(),
            failures: report
                .failures
                .iter()
                .map(|failure| FailureSummary {
                    name: failure.name.clone(),
                    stage: failure.stage,
                    error: failure.error.to_string(),
                })
                .collect(),
            artifacts: report.artifacts.clone(),
        }
    }

    pub fn to_yaml(&self) -> std::result::Result<String, serde_saphyr::ser::Error> {
        serde_saphyr::to_string(self)
    }

    /// Write `summary.yaml` into `out_dir`
    pub fn write(&self, out_dir: &Path) -> color_eyre::Result<PathBuf> {
        let path = out_dir.join("summary.yaml");
        let yaml = self
            .to_yaml()
            .map_err(|e| color_eyre::eyre::eyre!("serializing run summary: {e}"))?;
        atomic_write(&path, yaml.as_bytes())?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_persist_creates_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("plot.json");
        FilePersister.persist(&"{}".to_string(), &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_render_is_json() {
        let request = PlotRequest {
            name: "opsim_plot".into(),
            layers: Vec::new(),
        };
        let json = JsonRenderer.render(&request).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["name"], "opsim_plot");
        assert_eq!(JsonRenderer.extension(), "json");
    }
}
