//! Run configuration files
//!
//! A run is described by a YAML document deserializing into
//! [`RunConfig`]. Unknown keys anywhere in the document are rejected.
//!
//! ```yaml
//! run_name: baseline
//! out_dir: plots
//! groups:
//!   - slicer:
//!       one_d:
//!         column: airmass
//!         binsize: 0.05
//!     constraints: ["filter = 'r'", "filter = 'g'"]
//!     metrics:
//!       - metric: { stat: count, column: airmass }
//!         summaries:
//!           - stat: sum
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{WrapErr, eyre};
use skymaf_core::RunConfig;

pub fn from_yaml(yaml: &str) -> Result<RunConfig, serde_saphyr::Error> {
    serde_saphyr::from_str(yaml)
}

/// Read and validate a run configuration file
pub fn load_run_config(path: &Path) -> color_eyre::Result<RunConfig> {
    let content = fs::read_to_string(path)
        .wrap_err_with(|| format!("reading run config {}", path.display()))?;
    let config =
        from_yaml(&content).map_err(|e| eyre!("parsing run config {}: {e}", path.display()))?;
    if config.groups.is_empty() {
        tracing::warn!(path = %path.display(), "run config declares no slice groups");
    }
    tracing::debug!(
        run = %config.run_name,
        groups = config.groups.len(),
        "run config loaded"
    );
    Ok(config)
}

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub run_name: Option<String>,
    pub out_dir: Option<PathBuf>,
}

impl Overrides {
    #[must_use]
    pub fn apply(self, mut config: RunConfig) -> RunConfig {
        if let Some(run_name) = self.run_name {
            config.run_name = run_name;
        }
        if let Some(out_dir) = self.out_dir {
            config.out_dir = out_dir;
        }
        config
    }
}
