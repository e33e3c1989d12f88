use serde::{Deserialize, Serialize};

use crate::error::{MafError, Result};
use crate::table::Table;

use super::{
    BinGrid, Binning, BinningWarning, OneDConfig, Partition, SliceGeometry, SlicePoint, Slicer,
    bin_index, resolve_binning,
};

/// One binning configuration per dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NDimConfig {
    pub dimensions: Vec<OneDConfig>,
}

/// Grid-cell slicer over several numeric columns
#[derive(Debug, Clone)]
pub struct NDSlicer {
    config: NDimConfig,
    edges: Vec<Vec<f64>>,
    warnings: Vec<BinningWarning>,
    partition: Option<Partition>,
}

impl NDSlicer {
    pub fn new(config: NDimConfig) -> Result<Self> {
        if config.dimensions.is_empty() {
            return Err(MafError::config("ndim slicer needs at least one dimension"));
        }
        for dim in &config.dimensions {
            dim.validate()?;
        }
        Ok(Self {
            config,
            edges: Vec::new(),
            warnings: Vec::new(),
            partition: None,
        })
    }

    fn columns(&self) -> Vec<String> {
        self.config
            .dimensions
            .iter()
            .map(|d| d.column.clone())
            .collect()
    }
}

impl Slicer for NDSlicer {
    fn kind(&self) -> &str {
        "NDSlicer"
    }

    fn setup(&mut self, table: &Table, rows: &[usize]) -> Result<()> {
        let mut columns = Vec::with_capacity(self.config.dimensions.len());
        let mut edges = Vec::with_capacity(self.config.dimensions.len());
        let mut warnings = Vec::new();
        for dim in &self.config.dimensions {
            let data = table.f64_column(&dim.column)?;
            let values: Vec<f64> = rows.iter().map(|&row| data[row]).collect();
            let Binning {
                edges: dim_edges,
                warnings: dim_warnings,
            } = resolve_binning(dim, &values)?;
            columns.push(data);
            edges.push(dim_edges);
            warnings.extend(dim_warnings);
        }

        let grid = BinGrid::new(edges.iter().map(|e| e.len() - 1).collect());
        let mut members = vec![Vec::new(); grid.len()];
        let mut cell = vec![0; grid.ndim()];
        'rows: for &row in rows {
            for (dim, data) in columns.iter().enumerate() {
                match bin_index(&edges[dim], data[row]) {
                    Some(idx) => cell[dim] = idx,
                    None => continue 'rows,
                }
            }
            if let Some(flat) = grid.flat_index(&cell) {
                members[flat].push(row);
            }
        }
        for cell_rows in &mut members {
            cell_rows.sort_unstable();
        }

        let points = (0..grid.len())
            .map(|sid| {
                let lefts = grid
                    .multi_index(sid)
                    .unwrap_or_default()
                    .iter()
                    .zip(&edges)
                    .map(|(&idx, dim_edges)| dim_edges[idx])
                    .collect();
                SlicePoint::Cell { sid, lefts }
            })
            .collect();

        tracing::debug!(shape = ?grid.shape(), "n-dimensional slicer set up");
        self.partition = Some(Partition::new(points, members)?);
        self.edges = edges;
        self.warnings = warnings;
        Ok(())
    }

    fn partition(&self) -> Result<&Partition> {
        self.partition.as_ref().ok_or(MafError::NotConfigured)
    }

    fn geometry(&self) -> Option<SliceGeometry> {
        self.partition.as_ref().map(|_| SliceGeometry::Grid {
            columns: self.columns(),
            edges: self.edges.clone(),
        })
    }

    fn warnings(&self) -> &[BinningWarning] {
        &self.warnings
    }
}
