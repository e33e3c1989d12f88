use crate::error::Result;
use crate::slicer::SlicePoint;
use crate::stats;
use crate::table::DataSlice;

use super::Metric;

/// Reductions over the finite values of one numeric column
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnStat {
    Mean,
    Median,
    Min,
    Max,
    Sum,
    Count,
    Rms,
    Identity,
    Percentile(f64),
    NOutliers(f64),
}

impl ColumnStat {
    /// Reduce `values`; `None` when the statistic is undefined
    #[must_use]
    pub fn reduce(self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        match self {
            Self::Mean => stats::mean(values),
            Self::Median => stats::median(values),
            Self::Min => values.iter().copied().reduce(f64::min),
            Self::Max => values.iter().copied().reduce(f64::max),
            Self::Sum => Some(values.iter().sum()),
            Self::Count => Some(values.len() as f64),
            Self::Rms => stats::std_dev(values),
            Self::Identity => (values.len() == 1).then(|| values[0]),
            Self::Percentile(pct) => stats::percentile(values, pct),
            Self::NOutliers(n_sigma) => {
                let mu = stats::mean(values)?;
                let boundary = mu + n_sigma * stats::std_dev(values)?;
                let count = if n_sigma >= 0.0 {
                    values.iter().filter(|&&v| v > boundary).count()
                } else {
                    values.iter().filter(|&&v| v < boundary).count()
                };
                Some(count as f64)
            }
        }
    }
}

/// A [`ColumnStat`] bound to a column
#[derive(Debug, Clone)]
pub struct ColumnMetric {
    stat: ColumnStat,
    column: String,
    name: String,
    badval: f64,
}

impl ColumnMetric {
    pub fn new(
        stat: ColumnStat,
        column: impl Into<String>,
        name: impl Into<String>,
        badval: f64,
    ) -> Self {
        Self {
            stat,
            column: column.into(),
            name: name.into(),
            badval,
        }
    }

    pub(crate) fn boxed(
        stat: ColumnStat,
        column: String,
        name: String,
        badval: f64,
    ) -> Box<dyn Metric> {
        Box::new(Self::new(stat, column, name, badval))
    }

    #[must_use]
    pub fn stat(&self) -> ColumnStat {
        self.stat
    }
}

impl Metric for ColumnMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_columns(&self) -> Vec<&str> {
        vec![self.column.as_str()]
    }

    fn badval(&self) -> f64 {
        self.badval
    }

    fn run(&self, slice: &DataSlice<'_>, _point: &SlicePoint) -> Result<f64> {
        let values = slice.finite_values(&self.column)?;
        Ok(self
            .stat
            .reduce(&values)
            .filter(|v| v.is_finite())
            .unwrap_or(self.badval))
    }
}
