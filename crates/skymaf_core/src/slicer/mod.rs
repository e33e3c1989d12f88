//! Slicers partition the (constraint-filtered) rows of a table into an ordered
//! sequence of slices.
//!
//! Every slicer follows the same two-phase protocol: it is built from an
//! explicit configuration struct, then [`Slicer::setup`] computes and freezes the
//! concrete boundaries from that configuration plus the observed data. After
//! setup the partition is read-only and can be shared between bundles.
//!
//! # Variants
//!
//! - [`UniSlicer`]: a single slice holding every row
//! - [`OneDSlicer`]: histogram bins over one numeric column
//! - [`HealpixSlicer`]: equal-area sky pixels (HEALPix RING scheme)
//! - [`NDSlicer`]: grid cells over several numeric columns
//!
//! New variants implement [`Slicer`] and register a factory with the
//! [`Registry`](crate::registry::Registry).

mod grid;
mod healpix;
mod ndim;
mod one_d;
mod uni;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MafError, Result};
use crate::registry::{Params, Registry};
use crate::stats::approx_eq_slice;
use crate::table::Table;

pub use grid::BinGrid;
pub use healpix::{HealpixConfig, HealpixSlicer, ang2pix_ring, pix2ang_ring};
pub use ndim::{NDSlicer, NDimConfig};
pub use one_d::{BinSpec, Binning, OneDConfig, OneDSlicer, resolve_binning};
pub use uni::UniSlicer;

/// Identifying metadata for one slice
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlicePoint {
    /// The single slice of a [`UniSlicer`]
    Whole,
    /// A histogram bin `[left, right)` (the last bin is closed)
    Bin { sid: usize, left: f64, right: f64 },
    /// A sky pixel; coordinates of the pixel center in degrees
    Pixel { sid: usize, lon: f64, lat: f64 },
    /// An N-dimensional grid cell, by the left edge on each dimension
    Cell { sid: usize, lefts: Vec<f64> },
}

impl SlicePoint {
    /// Slice index within its slicer
    #[must_use]
    pub fn sid(&self) -> usize {
        match self {
            Self::Whole => 0,
            Self::Bin { sid, .. } | Self::Pixel { sid, .. } | Self::Cell { sid, .. } => *sid,
        }
    }
}

/// One slice: its point and the (sorted) row indices it holds
#[derive(Debug, Clone, Copy)]
pub struct Slice<'a> {
    pub point: &'a SlicePoint,
    pub rows: &'a [usize],
}

/// Frozen result of a slicer setup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    points: Vec<SlicePoint>,
    members: Vec<Vec<usize>>,
}

impl Partition {
    pub fn new(points: Vec<SlicePoint>, members: Vec<Vec<usize>>) -> Result<Self> {
        if points.len() != members.len() {
            return Err(MafError::config(format!(
                "partition has {} slice points but {} member lists",
                points.len(),
                members.len()
            )));
        }
        Ok(Self { points, members })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn slice(&self, index: usize) -> Result<Slice<'_>> {
        match (self.points.get(index), self.members.get(index)) {
            (Some(point), Some(rows)) => Ok(Slice { point, rows }),
            _ => Err(MafError::SliceOutOfRange {
                index,
                count: self.len(),
            }),
        }
    }

    /// Restartable iterator over the slices in order
    #[must_use]
    pub fn iter(&self) -> Slices<'_> {
        Slices {
            partition: self,
            next: 0,
        }
    }

    /// Total number of row memberships across slices
    #[must_use]
    pub fn assigned_rows(&self) -> usize {
        self.members.iter().map(Vec::len).sum()
    }
}

/// Iterator over the slices of a [`Partition`]
#[derive(Debug, Clone)]
pub struct Slices<'a> {
    partition: &'a Partition,
    next: usize,
}

impl<'a> Iterator for Slices<'a> {
    type Item = Slice<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let slice = self.partition.slice(self.next).ok()?;
        self.next += 1;
        Some(slice)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.partition.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Slices<'_> {}

/// Shape of a set-up partition, handed to renderers and used for equivalence
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SliceGeometry {
    Whole,
    Bins {
        column: String,
        edges: Vec<f64>,
    },
    Healpix {
        nside: u32,
        lon_col: String,
        lat_col: String,
    },
    Grid {
        columns: Vec<String>,
        edges: Vec<Vec<f64>>,
    },
    /// Geometry of a registry-provided slicer
    Custom {
        kind: String,
        boundaries: Vec<f64>,
    },
}

impl SliceGeometry {
    /// Same variant and identical boundaries.
    ///
    /// Bin and grid column names are deliberately not compared; Healpix
    /// coordinate columns are.
    #[must_use]
    pub fn equivalent(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Whole, Self::Whole) => true,
            (Self::Bins { edges: a, .. }, Self::Bins { edges: b, .. }) => approx_eq_slice(a, b),
            (
                Self::Healpix {
                    nside: n1,
                    lon_col: lon1,
                    lat_col: lat1,
                },
                Self::Healpix {
                    nside: n2,
                    lon_col: lon2,
                    lat_col: lat2,
                },
            ) => n1 == n2 && lon1 == lon2 && lat1 == lat2,
            (Self::Grid { edges: a, .. }, Self::Grid { edges: b, .. }) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| approx_eq_slice(x, y))
            }
            (
                Self::Custom {
                    kind: k1,
                    boundaries: b1,
                },
                Self::Custom {
                    kind: k2,
                    boundaries: b2,
                },
            ) => k1 == k2 && approx_eq_slice(b1, b2),
            _ => false,
        }
    }
}

/// Non-fatal conditions noticed while resolving bins
#[derive(Debug, Clone, PartialEq)]
pub enum BinningWarning {
    /// The data (or the requested range) has zero spread; the upper edge was widened
    DegenerateRange { value: f64, widened_max: f64 },
    /// Both a bin count and a binsize were configured; the binsize is used
    BinsizeOverridesCount { bins: usize, binsize: f64 },
    /// The automatic bin count could not be computed from the data
    AutoBinsFallback { bins: usize },
}

impl fmt::Display for BinningWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DegenerateRange { value, widened_max } => write!(
                f,
                "bin min equals bin max ({value}), maybe the data is single-valued; increasing bin max to {widened_max}"
            ),
            Self::BinsizeOverridesCount { bins, binsize } => write!(
                f,
                "both bins ({bins}) and binsize ({binsize}) were set; using binsize only"
            ),
            Self::AutoBinsFallback { bins } => write!(
                f,
                "could not compute an optimal bin count from the data; using {bins} bins"
            ),
        }
    }
}

/// Capability interface shared by all slicer variants.
///
/// Query methods fail with [`MafError::NotConfigured`] until `setup` succeeds.
pub trait Slicer: fmt::Debug + Send + Sync {
    /// Variant name, used in output names (e.g. `OneDSlicer`)
    fn kind(&self) -> &str;

    /// Compute and freeze the partition of `rows` (indices into `table`).
    ///
    /// Calling it again recomputes from the original configuration.
    fn setup(&mut self, table: &Table, rows: &[usize]) -> Result<()>;

    /// The frozen partition
    fn partition(&self) -> Result<&Partition>;

    /// Boundaries of the partition, `None` before setup
    fn geometry(&self) -> Option<SliceGeometry>;

    /// Warnings recorded by the last setup
    fn warnings(&self) -> &[BinningWarning] {
        &[]
    }

    fn is_setup(&self) -> bool {
        self.partition().is_ok()
    }

    fn slice_count(&self) -> Result<usize> {
        Ok(self.partition()?.len())
    }

    fn slice(&self, index: usize) -> Result<Slice<'_>> {
        self.partition()?.slice(index)
    }

    fn slices(&self) -> Result<Slices<'_>> {
        Ok(self.partition()?.iter())
    }

    /// Equivalence: same variant and identical boundaries. Never errors;
    /// slicers that are not set up are never equivalent.
    fn same_partition(&self, other: &dyn Slicer) -> bool {
        match (self.geometry(), other.geometry()) {
            (Some(a), Some(b)) => a.equivalent(&b),
            _ => false,
        }
    }
}

/// Declarative slicer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlicerConfig {
    Uni,
    OneD(OneDConfig),
    Healpix(HealpixConfig),
    #[serde(rename = "ndim")]
    NDim(NDimConfig),
    /// A slicer provided by a registered factory
    Custom {
        name: String,
        #[serde(default)]
        params: Params,
    },
}

impl SlicerConfig {
    /// Build an un-set-up slicer
    pub fn build(&self, registry: &Registry) -> Result<Box<dyn Slicer>> {
        match self {
            Self::Uni => Ok(Box::new(UniSlicer::new())),
            Self::OneD(config) => Ok(Box::new(OneDSlicer::new(config.clone())?)),
            Self::Healpix(config) => Ok(Box::new(HealpixSlicer::new(config.clone())?)),
            Self::NDim(config) => Ok(Box::new(NDSlicer::new(config.clone())?)),
            Self::Custom { name, params } => registry.build_slicer(name, params),
        }
    }

    /// Short variant name used in bundle output names
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Uni => "UniSlicer",
            Self::OneD(_) => "OneDSlicer",
            Self::Healpix(_) => "HealpixSlicer",
            Self::NDim(_) => "NDSlicer",
            Self::Custom { name, .. } => name,
        }
    }

    /// Stable textual key for partition caching.
    ///
    /// Two configs with equal fingerprints produce identical partitions of the
    /// same rows. `Debug` output is used because float formatting round-trips.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        format!("{self:?}")
    }
}

/// Sort `(value, row)` pairs and drop non-finite values
pub(crate) fn sorted_finite(values: &[f64], rows: &[usize]) -> Vec<(f64, usize)> {
    let mut pairs: Vec<(f64, usize)> = rows
        .iter()
        .map(|&row| (values[row], row))
        .filter(|(v, _)| v.is_finite())
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    pairs
}

/// Assign sorted values to bins `[e[i], e[i+1])`, last bin closed.
/// Values outside `[e[0], e[last]]` are dropped. Rows in each bin are sorted.
pub(crate) fn assign_to_bins(sorted: &[(f64, usize)], edges: &[f64]) -> Vec<Vec<usize>> {
    let nbins = edges.len().saturating_sub(1);
    let mut members = Vec::with_capacity(nbins);
    for i in 0..nbins {
        let start = sorted.partition_point(|(v, _)| *v < edges[i]);
        let end = if i + 1 == nbins {
            sorted.partition_point(|(v, _)| *v <= edges[i + 1])
        } else {
            sorted.partition_point(|(v, _)| *v < edges[i + 1])
        };
        let mut rows: Vec<usize> = sorted[start..end.max(start)]
            .iter()
            .map(|&(_, row)| row)
            .collect();
        rows.sort_unstable();
        members.push(rows);
    }
    members
}

/// Index of the bin holding `value`, using the same rule as [`assign_to_bins`]
pub(crate) fn bin_index(edges: &[f64], value: f64) -> Option<usize> {
    let nbins = edges.len().checked_sub(1)?;
    if nbins == 0 || !value.is_finite() || value < edges[0] || value > edges[nbins] {
        return None;
    }
    let idx = edges.partition_point(|e| *e <= value);
    Some(idx.saturating_sub(1).min(nbins - 1))
}
