//! Statistics for angles in degrees, wrapping at 360.

use crate::error::Result;
use crate::slicer::SlicePoint;
use crate::table::DataSlice;

use super::Metric;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngularStat {
    /// Direction of the mean unit vector, in `[0, 360)`
    Mean,
    /// Circular standard deviation `sqrt(-2 ln R)`
    Rms,
    /// 360 minus the largest gap between neighboring angles
    FullRange,
}

/// Mean sine and cosine of angles in degrees
fn mean_components(degrees: &[f64]) -> Option<(f64, f64)> {
    if degrees.is_empty() {
        return None;
    }
    let n = degrees.len() as f64;
    let (s, c) = degrees.iter().fold((0.0, 0.0), |(s, c), d| {
        let (sin, cos) = d.to_radians().sin_cos();
        (s + sin, c + cos)
    });
    Some((s / n, c / n))
}

impl AngularStat {
    #[must_use]
    pub fn reduce(self, degrees: &[f64]) -> Option<f64> {
        match self {
            Self::Mean => {
                let (s, c) = mean_components(degrees)?;
                let mean = s.atan2(c).to_degrees().rem_euclid(360.0);
                Some(if mean >= 360.0 { 0.0 } else { mean })
            }
            Self::Rms => {
                let (s, c) = mean_components(degrees)?;
                let r = s.hypot(c).min(1.0);
                Some((-2.0 * r.ln()).sqrt().to_degrees())
            }
            Self::FullRange => {
                let mut wrapped: Vec<f64> = degrees.iter().map(|d| d.rem_euclid(360.0)).collect();
                if wrapped.is_empty() {
                    return None;
                }
                wrapped.sort_by(f64::total_cmp);
                let first = wrapped[0];
                let last = wrapped[wrapped.len() - 1];
                let largest_gap = wrapped
                    .windows(2)
                    .map(|w| w[1] - w[0])
                    .fold(first + 360.0 - last, f64::max);
                Some(360.0 - largest_gap)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct AngularMetric {
    stat: AngularStat,
    column: String,
    name: String,
    badval: f64,
}

impl AngularMetric {
    pub fn new(
        stat: AngularStat,
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
        stat: AngularStat,
        column: String,
        name: String,
        badval: f64,
    ) -> Box<dyn Metric> {
        Box::new(Self::new(stat, column, name, badval))
    }
}

impl Metric for AngularMetric {
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
