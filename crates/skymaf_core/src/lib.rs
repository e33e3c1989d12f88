//! Slicing and metric engine for survey-simulation output
//!
//! Given a table of observation records, the engine partitions rows into
//! slices, computes a metric per slice and reduces the per-slice results with
//! summary metrics. It supports:
//! - Whole-dataset, 1-D histogram, N-D grid and HEALPix sky slicers
//! - A catalog of scalar, angular and photometric metrics
//! - Constraint strings selecting the rows each bundle sees
//! - Partition sharing between bundles with the same slicer and constraint
//! - Merge groups rendered together, through pluggable renderers
//!
//! # Example
//!
//! ```ignore
//! use skymaf_core::{Driver, RunConfig, SliceGroup, MetricEntry};
//! use skymaf_core::metrics::{MetricConfig, Statistic};
//! use skymaf_core::slicer::{OneDConfig, SlicerConfig};
//!
//! let config = RunConfig {
//!     run_name: "opsim".into(),
//!     out_dir: "out".into(),
//!     groups: vec![SliceGroup {
//!         slicer: SlicerConfig::OneD(OneDConfig::new("airmass").with_binsize(0.1)),
//!         metrics: vec![MetricEntry::new(MetricConfig::new(Statistic::Count, "airmass"))],
//!         constraints: vec!["filter = 'r'".into()],
//!         metadata: None,
//!     }],
//! };
//! let report = Driver::new(config).execute(&table);
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod bundle;
pub mod cache;
pub mod constraint;
pub mod driver;
pub mod error;
pub mod metrics;
pub mod presets;
pub mod registry;
pub mod render;
pub mod slicer;
pub mod stats;
pub mod table;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use bundle::{DisplayMeta, MaskedArray, MergeSpec, MetricBundle, SummaryValue};
pub use constraint::{ConstraintEvaluator, PredicateEvaluator};
pub use driver::{
    BundleFailure, Driver, FailureStage, MetricEntry, RunConfig, RunReport, SliceGroup,
};
pub use error::{MafError, Result};
pub use metrics::{Metric, MetricConfig, Statistic};
pub use presets::{FilterBand, filter_list};
pub use registry::{ParamValue, Params, Registry};
pub use render::{Persister, PlotLayer, PlotRequest, Renderer};
pub use slicer::{Slicer, SlicerConfig};
pub use table::{Column, DataSlice, Table};
