//! One-dimensional histogram slicer and the bin-resolution rules shared with
//! the N-dimensional slicer.

use serde::{Deserialize, Serialize};

use crate::error::{MafError, Result};
use crate::stats::{finite_range, percentile_sorted};
use crate::table::Table;

use super::{
    BinningWarning, Partition, SliceGeometry, SlicePoint, Slicer, assign_to_bins, sorted_finite,
};

/// Bin count used when the automatic rule cannot be applied, and the cap on it
pub const AUTO_BINS_MAX: usize = 200;

/// Upper bound on the number of bins any configuration may resolve to
pub const MAX_BINS: usize = 1_000_000;

/// Explicit bins: either a count of equal-width bins or the edges themselves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BinSpec {
    Count(usize),
    Edges(Vec<f64>),
}

/// Configuration for binning one numeric column.
///
/// Priority: explicit edges, then `binsize` (padded with one extra bin on each
/// side), then a bin count, then an automatic Freedman–Diaconis count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OneDConfig {
    pub column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bins: Option<BinSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binsize: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin_max: Option<f64>,
}

impl OneDConfig {
    /// Automatic binning over `column`
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            bins: None,
            binsize: None,
            bin_min: None,
            bin_max: None,
        }
    }

    #[must_use]
    pub fn with_bins(mut self, count: usize) -> Self {
        self.bins = Some(BinSpec::Count(count));
        self
    }

    #[must_use]
    pub fn with_edges(mut self, edges: Vec<f64>) -> Self {
        self.bins = Some(BinSpec::Edges(edges));
        self
    }

    #[must_use]
    pub fn with_binsize(mut self, binsize: f64) -> Self {
        self.binsize = Some(binsize);
        self
    }

    #[must_use]
    pub fn with_range(mut self, bin_min: f64, bin_max: f64) -> Self {
        self.bin_min = Some(bin_min);
        self.bin_max = Some(bin_max);
        self
    }

    /// Reject malformed parameters before any data is seen
    pub fn validate(&self) -> Result<()> {
        let col = &self.column;
        if let Some(binsize) = self.binsize
            && !(binsize.is_finite() && binsize > 0.0)
        {
            return Err(MafError::config(format!(
                "{col}: binsize must be positive, got {binsize}"
            )));
        }
        match &self.bins {
            Some(BinSpec::Count(0)) => {
                return Err(MafError::config(format!("{col}: bin count must be at least 1")));
            }
            Some(BinSpec::Count(count)) if *count > MAX_BINS => {
                return Err(MafError::config(format!(
                    "{col}: bin count {count} exceeds the limit of {MAX_BINS}"
                )));
            }
            Some(BinSpec::Edges(edges)) => {
                if self.binsize.is_some() {
                    return Err(MafError::config(format!(
                        "{col}: explicit bin edges and binsize are mutually exclusive"
                    )));
                }
                if edges.len() < 2 {
                    return Err(MafError::config(format!(
                        "{col}: at least two bin edges are required, got {}",
                        edges.len()
                    )));
                }
                if edges.iter().any(|e| !e.is_finite()) || edges.windows(2).any(|w| w[0] >= w[1])
                {
                    return Err(MafError::config(format!(
                        "{col}: bin edges must be finite and strictly increasing"
                    )));
                }
            }
            _ => {}
        }
        for bound in [self.bin_min, self.bin_max].into_iter().flatten() {
            if !bound.is_finite() {
                return Err(MafError::config(format!("{col}: bin limits must be finite")));
            }
        }
        if let (Some(lo), Some(hi)) = (self.bin_min, self.bin_max)
            && lo > hi
        {
            return Err(MafError::config(format!(
                "{col}: bin_min ({lo}) is greater than bin_max ({hi})"
            )));
        }
        Ok(())
    }
}

/// Resolved bin edges plus any warnings raised while computing them
#[derive(Debug, Clone, PartialEq)]
pub struct Binning {
    pub edges: Vec<f64>,
    pub warnings: Vec<BinningWarning>,
}

/// Resolve concrete bin edges from a configuration and the observed values
/// (non-finite values are ignored).
pub fn resolve_binning(config: &OneDConfig, values: &[f64]) -> Result<Binning> {
    config.validate()?;
    if let Some(BinSpec::Edges(edges)) = &config.bins {
        return Ok(Binning {
            edges: edges.clone(),
            warnings: Vec::new(),
        });
    }

    let observed = finite_range(values.iter().copied());
    let lo = config.bin_min.or(observed.map(|(lo, _)| lo));
    let hi = config.bin_max.or(observed.map(|(_, hi)| hi));
    let (Some(lo), Some(mut hi)) = (lo, hi) else {
        return Err(MafError::config(format!(
            "{}: cannot determine bin range, no finite data and no bin_min/bin_max",
            config.column
        )));
    };
    if lo > hi {
        return Err(MafError::config(format!(
            "{}: bin range is empty ({lo} > {hi})",
            config.column
        )));
    }

    let mut warnings = Vec::new();
    if lo == hi {
        hi += config.binsize.map_or(1.0, |binsize| 2.0 * binsize);
        warnings.push(BinningWarning::DegenerateRange {
            value: lo,
            widened_max: hi,
        });
    }

    let edges = if let Some(binsize) = config.binsize {
        if let Some(BinSpec::Count(bins)) = config.bins {
            warnings.push(BinningWarning::BinsizeOverridesCount { bins, binsize });
        }
        // Slack keeps float noise like 1.1 / 0.1 = 11.000000000000002 from adding a bin.
        let raw = ((hi - lo) / binsize - 1e-9).ceil().max(1.0);
        if !(raw <= MAX_BINS as f64) {
            return Err(MafError::config(format!(
                "{}: binsize {binsize} over [{lo}, {hi}] needs more than {MAX_BINS} bins",
                config.column
            )));
        }
        let count = raw as usize;
        (0..=count + 2)
            .map(|i| lo + (i as f64 - 1.0) * binsize)
            .collect()
    } else {
        let count = match config.bins {
            Some(BinSpec::Count(count)) => count,
            _ => {
                let (count, fallback) = optimal_bins(values, lo, hi);
                if fallback {
                    warnings.push(BinningWarning::AutoBinsFallback { bins: count });
                }
                count
            }
        };
        equal_width_edges(lo, hi, count)
    };

    for warning in &warnings {
        tracing::warn!(column = %config.column, "{warning}");
    }
    Ok(Binning { edges, warnings })
}

/// `count + 1` edges from `lo` to exactly `hi`
fn equal_width_edges(lo: f64, hi: f64, count: usize) -> Vec<f64> {
    let width = (hi - lo) / count as f64;
    let mut edges: Vec<f64> = (0..=count).map(|i| lo + width * i as f64).collect();
    if let Some(last) = edges.last_mut() {
        *last = hi;
    }
    edges
}

/// Freedman–Diaconis bin count for the values within `[lo, hi]`.
///
/// Returns the count and whether the fallback was used.
fn optimal_bins(values: &[f64], lo: f64, hi: f64) -> (usize, bool) {
    let mut inside: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| v.is_finite() && *v >= lo && *v <= hi)
        .collect();
    if inside.is_empty() {
        return (AUTO_BINS_MAX, true);
    }
    inside.sort_by(f64::total_cmp);
    let iqr = match (
        percentile_sorted(&inside, 75.0),
        percentile_sorted(&inside, 25.0),
    ) {
        (Some(q3), Some(q1)) => q3 - q1,
        _ => return (AUTO_BINS_MAX, true),
    };
    let width = 2.0 * iqr / (inside.len() as f64).cbrt();
    let nbins = (hi - lo) / width;
    if !nbins.is_finite() || width <= 0.0 {
        return (AUTO_BINS_MAX, true);
    }
    ((nbins.ceil() as usize).clamp(1, AUTO_BINS_MAX), false)
}

/// Histogram slicer over one numeric column
#[derive(Debug, Clone)]
pub struct OneDSlicer {
    config: OneDConfig,
    edges: Vec<f64>,
    warnings: Vec<BinningWarning>,
    partition: Option<Partition>,
}

impl OneDSlicer {
    pub fn new(config: OneDConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            edges: Vec::new(),
            warnings: Vec::new(),
            partition: None,
        })
    }

    #[must_use]
    pub fn config(&self) -> &OneDConfig {
        &self.config
    }

    /// Resolved bin edges
    pub fn edges(&self) -> Result<&[f64]> {
        self.partition()?;
        Ok(&self.edges)
    }
}

impl Slicer for OneDSlicer {
    fn kind(&self) -> &str {
        "OneDSlicer"
    }

    fn setup(&mut self, table: &Table, rows: &[usize]) -> Result<()> {
        let data = table.f64_column(&self.config.column)?;
        let sorted = sorted_finite(data, rows);
        let values: Vec<f64> = sorted.iter().map(|(v, _)| *v).collect();
        let Binning { edges, warnings } = resolve_binning(&self.config, &values)?;

        let members = assign_to_bins(&sorted, &edges);
        let points = edges
            .windows(2)
            .enumerate()
            .map(|(sid, w)| SlicePoint::Bin {
                sid,
                left: w[0],
                right: w[1],
            })
            .collect();
        tracing::debug!(
            column = %self.config.column,
            nslice = edges.len() - 1,
            "one-dimensional slicer set up"
        );
        self.partition = Some(Partition::new(points, members)?);
        self.edges = edges;
        self.warnings = warnings;
        Ok(())
    }

    fn partition(&self) -> Result<&Partition> {
        self.partition.as_ref().ok_or(MafError::NotConfigured)
    }

    fn geometry(&self) -> Option<SliceGeometry> {
        self.partition.as_ref().map(|_| SliceGeometry::Bins {
            column: self.config.column.clone(),
            edges: self.edges.clone(),
        })
    }

    fn warnings(&self) -> &[BinningWarning] {
        &self.warnings
    }
}
