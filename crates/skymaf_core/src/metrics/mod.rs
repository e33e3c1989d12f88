//! Metrics reduce the rows of one slice to a single value.
//!
//! A metric is pure configuration (columns, display name, badval) and keeps no
//! state between slices, so one instance is shared across every slice of a
//! bundle and across threads. Undefined computations, including empty input,
//! yield the metric's badval instead of an error; errors are reserved for
//! misconfiguration such as a missing or mistyped column.
//!
//! Summary statistics are ordinary metrics run over a one-column table named
//! [`METRIC_DATA_COLUMN`], which is also the default column of a
//! [`MetricConfig`].

mod angular;
mod photometry;
mod simple;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MafError, Result};
use crate::registry::{Params, Registry};
use crate::slicer::SlicePoint;
use crate::table::DataSlice;

pub use angular::{AngularMetric, AngularStat};
pub use photometry::{CoaddM5Metric, DcrConfig, DcrPrecisionMetric, astrom_precision, m52snr};
pub use simple::{ColumnMetric, ColumnStat};

/// Column holding a bundle's unmasked results when summary metrics run
pub const METRIC_DATA_COLUMN: &str = "metricdata";

/// Fill value for undefined results unless a metric overrides it
pub const DEFAULT_BADVAL: f64 = -666.0;

/// Capability interface for all metrics
pub trait Metric: fmt::Debug + Send + Sync {
    /// Display name, used in output names
    fn name(&self) -> &str;

    /// Columns that must exist in the table before any slice is run
    fn required_columns(&self) -> Vec<&str>;

    /// Value returned when the result is undefined
    fn badval(&self) -> f64 {
        DEFAULT_BADVAL
    }

    /// Compute the metric over the rows of one slice
    fn run(&self, slice: &DataSlice<'_>, point: &SlicePoint) -> Result<f64>;
}

fn default_column() -> String {
    METRIC_DATA_COLUMN.to_string()
}

/// Built-in statistics plus registry-provided ones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    Mean,
    Median,
    Min,
    Max,
    Sum,
    Count,
    /// Population standard deviation
    Rms,
    /// The value of a single-row slice
    Identity,
    /// Linear-interpolated percentile in `[0, 100]`
    Percentile { percentile: f64 },
    /// Number of values beyond `mean + n_sigma * rms` (below it when negative)
    NoutliersNsigma { n_sigma: f64 },
    /// Circular mean of angles in degrees
    MeanAngle,
    /// Circular standard deviation of angles in degrees
    RmsAngle,
    /// Smallest arc in degrees covering all angles
    FullRangeAngle,
    /// Coadded five-sigma depth
    CoaddM5,
    DcrPrecision(DcrConfig),
    /// A metric provided by a registered factory
    Custom {
        name: String,
        #[serde(default)]
        params: Params,
    },
}

impl Statistic {
    /// Default display name for this statistic applied to `column`
    #[must_use]
    pub fn label(&self, column: &str) -> String {
        match self {
            Self::Mean => format!("Mean {column}"),
            Self::Median => format!("Median {column}"),
            Self::Min => format!("Min {column}"),
            Self::Max => format!("Max {column}"),
            Self::Sum => format!("Sum {column}"),
            Self::Count => format!("Count {column}"),
            Self::Rms => format!("Rms {column}"),
            Self::Identity => format!("Identity {column}"),
            Self::Percentile { percentile } => format!("{percentile}th%ile {column}"),
            Self::NoutliersNsigma { n_sigma } => format!("N({n_sigma:+}Sigma) {column}"),
            Self::MeanAngle => format!("MeanAngle {column}"),
            Self::RmsAngle => format!("RmsAngle {column}"),
            Self::FullRangeAngle => format!("FullRangeAngle {column}"),
            Self::CoaddM5 => format!("Coaddm5 {column}"),
            Self::DcrPrecision(_) => "DCRprecision".to_string(),
            Self::Custom { name, .. } => name.clone(),
        }
    }
}

/// Declarative metric configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricConfig {
    pub stat: Statistic,
    #[serde(default = "default_column")]
    pub column: String,
    /// Display name override
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub badval: Option<f64>,
}

impl MetricConfig {
    pub fn new(stat: Statistic, column: impl Into<String>) -> Self {
        Self {
            stat,
            column: column.into(),
            name: None,
            badval: None,
        }
    }

    /// A statistic over [`METRIC_DATA_COLUMN`], the usual shape of a summary
    #[must_use]
    pub fn summary(stat: Statistic) -> Self {
        Self::new(stat, METRIC_DATA_COLUMN)
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_badval(mut self, badval: f64) -> Self {
        self.badval = Some(badval);
        self
    }

    /// Name the built metric will report
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.stat.label(&self.column))
    }

    pub fn build(&self, registry: &Registry) -> Result<Box<dyn Metric>> {
        let name = self.display_name();
        let badval = self.badval.unwrap_or(DEFAULT_BADVAL);
        let column = self.column.clone();
        let metric: Box<dyn Metric> = match &self.stat {
            Statistic::Mean => ColumnMetric::boxed(ColumnStat::Mean, column, name, badval),
            Statistic::Median => ColumnMetric::boxed(ColumnStat::Median, column, name, badval),
            Statistic::Min => ColumnMetric::boxed(ColumnStat::Min, column, name, badval),
            Statistic::Max => ColumnMetric::boxed(ColumnStat::Max, column, name, badval),
            Statistic::Sum => ColumnMetric::boxed(ColumnStat::Sum, column, name, badval),
            Statistic::Count => ColumnMetric::boxed(ColumnStat::Count, column, name, badval),
            Statistic::Rms => ColumnMetric::boxed(ColumnStat::Rms, column, name, badval),
            Statistic::Identity => ColumnMetric::boxed(ColumnStat::Identity, column, name, badval),
            Statistic::Percentile { percentile } => {
                if !(0.0..=100.0).contains(percentile) {
                    return Err(MafError::config(format!(
                        "percentile must be within [0, 100], got {percentile}"
                    )));
                }
                ColumnMetric::boxed(ColumnStat::Percentile(*percentile), column, name, badval)
            }
            Statistic::NoutliersNsigma { n_sigma } => {
                if !n_sigma.is_finite() {
                    return Err(MafError::config("n_sigma must be finite"));
                }
                ColumnMetric::boxed(ColumnStat::NOutliers(*n_sigma), column, name, badval)
            }
            Statistic::MeanAngle => AngularMetric::boxed(AngularStat::Mean, column, name, badval),
            Statistic::RmsAngle => AngularMetric::boxed(AngularStat::Rms, column, name, badval),
            Statistic::FullRangeAngle => {
                AngularMetric::boxed(AngularStat::FullRange, column, name, badval)
            }
            Statistic::CoaddM5 => Box::new(CoaddM5Metric::new(column, name, badval)),
            Statistic::DcrPrecision(config) => {
                Box::new(DcrPrecisionMetric::new(config.clone(), name, badval)?)
            }
            Statistic::Custom {
                name: plugin,
                params,
            } => {
                if self.name.is_some() || self.badval.is_some() {
                    return Err(MafError::config(format!(
                        "custom metric `{plugin}` takes its name and badval from its own params"
                    )));
                }
                registry.build_metric(plugin, params)?
            }
        };
        Ok(metric)
    }
}
