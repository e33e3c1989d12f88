//! A metric applied to every slice of a set-up slicer.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::metrics::{METRIC_DATA_COLUMN, Metric};
use crate::slicer::{SlicePoint, Slicer};
use crate::table::{DataSlice, Table};

/// Per-slice results in slice order with a validity mask.
///
/// Masked entries hold the fill value and are excluded from every downstream
/// reduction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaskedArray {
    values: Vec<f64>,
    mask: Vec<bool>,
    fill: f64,
}

impl MaskedArray {
    #[must_use]
    pub fn new(fill: f64) -> Self {
        Self::with_capacity(fill, 0)
    }

    #[must_use]
    pub fn with_capacity(fill: f64, capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
            mask: Vec::with_capacity(capacity),
            fill,
        }
    }

    /// Append a metric value; it is masked when it equals the fill value or
    /// is not finite
    pub fn push(&mut self, value: f64) {
        if value == self.fill || !value.is_finite() {
            self.push_masked();
        } else {
            self.values.push(value);
            self.mask.push(false);
        }
    }

    pub fn push_masked(&mut self) {
        self.values.push(self.fill);
        self.mask.push(true);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn fill(&self) -> f64 {
        self.fill
    }

    /// All values, masked entries holding the fill value
    #[must_use]
    pub fn filled(&self) -> &[f64] {
        &self.values
    }

    /// `true` where the entry is masked
    #[must_use]
    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    #[must_use]
    pub fn is_masked(&self, index: usize) -> bool {
        self.mask.get(index).copied().unwrap_or(true)
    }

    /// The value at `index`, `None` if masked or out of range
    #[must_use]
    pub fn get(&self, index: usize) -> Option<f64> {
        (!self.is_masked(index)).then(|| self.values[index])
    }

    /// Unmasked values in slice order
    #[must_use]
    pub fn compressed(&self) -> Vec<f64> {
        self.values
            .iter()
            .zip(&self.mask)
            .filter_map(|(&v, &masked)| (!masked).then_some(v))
            .collect()
    }

    #[must_use]
    pub fn unmasked_count(&self) -> usize {
        self.mask.iter().filter(|m| !**m).count()
    }
}

/// Outcome of one summary metric; `None` when the summary was undefined
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryValue {
    pub name: String,
    pub value: Option<f64>,
}

/// Run a summary metric over the unmasked entries of `results`
pub fn summarize(metric: &dyn Metric, results: &MaskedArray) -> Result<SummaryValue> {
    let table = Table::new().with_f64(METRIC_DATA_COLUMN, results.compressed())?;
    table.require_columns(metric.required_columns())?;
    let value = metric.run(&table.full_slice(), &SlicePoint::Whole)?;
    let value = (value != metric.badval() && value.is_finite()).then_some(value);
    Ok(SummaryValue {
        name: metric.name().to_string(),
        value,
    })
}

/// Bundles sharing a `group` are rendered together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeSpec {
    pub group: String,
    #[serde(default)]
    pub color: Option<String>,
    /// Legend label; defaults to the bundle's metadata
    #[serde(default)]
    pub label: Option<String>,
}

/// Plot hints passed through to renderers untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisplayMeta {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub x_label: Option<String>,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub color_min: Option<f64>,
    #[serde(default)]
    pub color_max: Option<f64>,
}

/// A metric, a shared set-up slicer and their results
pub struct MetricBundle {
    name: String,
    metric: Box<dyn Metric>,
    slicer: Arc<dyn Slicer>,
    constraint: String,
    metadata: String,
    summaries: Vec<Box<dyn Metric>>,
    merge: Option<MergeSpec>,
    display: DisplayMeta,
    results: Option<MaskedArray>,
    summary_values: Vec<SummaryValue>,
}

impl fmt::Debug for MetricBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricBundle")
            .field("name", &self.name)
            .field("metric", &self.metric.name())
            .field("slicer", &self.slicer.kind())
            .field("constraint", &self.constraint)
            .field("metadata", &self.metadata)
            .field("ran", &self.results.is_some())
            .finish_non_exhaustive()
    }
}

impl MetricBundle {
    pub fn new(
        name: impl Into<String>,
        metric: Box<dyn Metric>,
        slicer: Arc<dyn Slicer>,
        constraint: impl Into<String>,
    ) -> Self {
        let constraint = constraint.into();
        let metadata = if constraint.trim().is_empty() {
            "all".to_string()
        } else {
            constraint.clone()
        };
        Self {
            name: name.into(),
            metric,
            slicer,
            constraint,
            metadata,
            summaries: Vec::new(),
            merge: None,
            display: DisplayMeta::default(),
            results: None,
            summary_values: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = metadata.into();
        self
    }

    #[must_use]
    pub fn with_summaries(mut self, summaries: Vec<Box<dyn Metric>>) -> Self {
        self.summaries = summaries;
        self
    }

    #[must_use]
    pub fn with_merge(mut self, merge: Option<MergeSpec>) -> Self {
        self.merge = merge;
        self
    }

    #[must_use]
    pub fn with_display(mut self, display: DisplayMeta) -> Self {
        self.display = display;
        self
    }

    /// Compute the metric on every slice, then the summaries.
    ///
    /// Slices are visited in slicer order. Empty slices are masked without
    /// calling the metric.
    pub fn run(&mut self, table: &Table) -> Result<()> {
        table.require_columns(self.metric.required_columns())?;

        let badval = self.metric.badval();
        let mut results = MaskedArray::with_capacity(badval, self.slicer.slice_count()?);
        for slice in self.slicer.slices()? {
            if slice.rows.is_empty() {
                results.push_masked();
                continue;
            }
            let view = DataSlice::borrowed(table, slice.rows);
            results.push(self.metric.run(&view, slice.point)?);
        }

        self.summary_values = self
            .summaries
            .iter()
            .map(|summary| summarize(summary.as_ref(), &results))
            .collect::<Result<_>>()?;
        tracing::debug!(
            bundle = %self.name,
            slices = results.len(),
            unmasked = results.unmasked_count(),
            "bundle computed"
        );
        self.results = Some(results);
        Ok(())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn metric(&self) -> &dyn Metric {
        self.metric.as_ref()
    }

    #[must_use]
    pub fn metric_name(&self) -> &str {
        self.metric.name()
    }

    /// Shared handle to the set-up slicer
    #[must_use]
    pub fn slicer(&self) -> &Arc<dyn Slicer> {
        &self.slicer
    }

    #[must_use]
    pub fn constraint(&self) -> &str {
        &self.constraint
    }

    #[must_use]
    pub fn metadata(&self) -> &str {
        &self.metadata
    }

    #[must_use]
    pub fn merge(&self) -> Option<&MergeSpec> {
        self.merge.as_ref()
    }

    #[must_use]
    pub fn display(&self) -> &DisplayMeta {
        &self.display
    }

    /// Per-slice results, `None` before [`run`](Self::run)
    #[must_use]
    pub fn results(&self) -> Option<&MaskedArray> {
        self.results.as_ref()
    }

    #[must_use]
    pub fn summary_values(&self) -> &[SummaryValue] {
        &self.summary_values
    }
}
