//! Depth and astrometric precision metrics.

use serde::{Deserialize, Serialize};

use crate::error::{MafError, Result};
use crate::slicer::SlicePoint;
use crate::table::DataSlice;

use super::Metric;

/// Signal-to-noise of a source of magnitude `mag` given a five-sigma depth
#[must_use]
pub fn m52snr(mag: f64, m5: f64) -> f64 {
    5.0 * 10f64.powf(-0.4 * (mag - m5))
}

/// Centroid precision from seeing FWHM and signal-to-noise (same units as `fwhm`)
#[must_use]
pub fn astrom_precision(fwhm: f64, snr: f64) -> f64 {
    fwhm / snr
}

/// Coadded depth `1.25 log10(sum 10^(0.8 m5))`
#[derive(Debug, Clone)]
pub struct CoaddM5Metric {
    column: String,
    name: String,
    badval: f64,
}

impl CoaddM5Metric {
    pub fn new(column: impl Into<String>, name: impl Into<String>, badval: f64) -> Self {
        Self {
            column: column.into(),
            name: name.into(),
            badval,
        }
    }

    /// Factored around the brightest depth so large magnitudes do not overflow
    #[must_use]
    pub fn coadd(m5: &[f64]) -> Option<f64> {
        let max = m5.iter().copied().reduce(f64::max)?;
        let sum: f64 = m5.iter().map(|m| 10f64.powf(0.8 * (m - max))).sum();
        Some(max + 1.25 * sum.log10())
    }
}

impl Metric for CoaddM5Metric {
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
        let m5 = slice.finite_values(&self.column)?;
        Ok(Self::coadd(&m5)
            .filter(|v| v.is_finite())
            .unwrap_or(self.badval))
    }
}

fn default_seeing_col() -> String {
    "seeingFwhmGeom".to_string()
}

fn default_m5_col() -> String {
    "fiveSigmaDepth".to_string()
}

fn default_pa_col() -> String {
    "paraAngle".to_string()
}

fn default_filter_col() -> String {
    "filter".to_string()
}

fn default_zd_col() -> String {
    "zenithDistance".to_string()
}

fn default_atm_err() -> f64 {
    0.01
}

fn default_rmag() -> f64 {
    20.0
}

fn default_filters() -> Vec<String> {
    ["u", "g", "r", "i", "z", "y"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Options of the DCR precision estimator.
///
/// Sources are given a flat SED: the same magnitude `rmag` in every listed
/// filter. Rows in other filters contribute nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DcrConfig {
    #[serde(default = "default_seeing_col")]
    pub seeing_col: String,
    #[serde(default = "default_m5_col")]
    pub m5_col: String,
    #[serde(default = "default_pa_col")]
    pub pa_col: String,
    #[serde(default = "default_filter_col")]
    pub filter_col: String,
    #[serde(default = "default_zd_col")]
    pub zd_col: String,
    /// Atmospheric floor on centroid error (arcseconds)
    #[serde(default = "default_atm_err")]
    pub atm_err: f64,
    #[serde(default = "default_rmag")]
    pub rmag: f64,
    #[serde(default = "default_filters")]
    pub filters: Vec<String>,
    /// Zenith distance and parallactic angle are in degrees (otherwise radians)
    #[serde(default)]
    pub angles_in_degrees: bool,
}

impl Default for DcrConfig {
    fn default() -> Self {
        Self {
            seeing_col: default_seeing_col(),
            m5_col: default_m5_col(),
            pa_col: default_pa_col(),
            filter_col: default_filter_col(),
            zd_col: default_zd_col(),
            atm_err: default_atm_err(),
            rmag: default_rmag(),
            filters: default_filters(),
            angles_in_degrees: false,
        }
    }
}

/// How precisely a differential chromatic refraction correction could be
/// fit, in arcseconds at unit `tan(zd) sin(pa)`
#[derive(Debug, Clone)]
pub struct DcrPrecisionMetric {
    config: DcrConfig,
    name: String,
    badval: f64,
}

impl DcrPrecisionMetric {
    pub fn new(config: DcrConfig, name: impl Into<String>, badval: f64) -> Result<Self> {
        if !config.atm_err.is_finite() || config.atm_err < 0.0 {
            return Err(MafError::config(format!(
                "atm_err must be a non-negative number, got {}",
                config.atm_err
            )));
        }
        if !config.rmag.is_finite() {
            return Err(MafError::config("rmag must be finite"));
        }
        Ok(Self {
            config,
            name: name.into(),
            badval,
        })
    }
}

impl Metric for DcrPrecisionMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_columns(&self) -> Vec<&str> {
        vec![
            self.config.seeing_col.as_str(),
            self.config.m5_col.as_str(),
            self.config.filter_col.as_str(),
            self.config.zd_col.as_str(),
            self.config.pa_col.as_str(),
        ]
    }

    fn badval(&self) -> f64 {
        self.badval
    }

    fn run(&self, slice: &DataSlice<'_>, _point: &SlicePoint) -> Result<f64> {
        let cfg = &self.config;
        let seeing = slice.values(&cfg.seeing_col)?;
        let m5 = slice.values(&cfg.m5_col)?;
        let filters = slice.labels(&cfg.filter_col)?;
        let zd = slice.values(&cfg.zd_col)?;
        let pa = slice.values(&cfg.pa_col)?;

        let mut weight = 0.0;
        for i in 0..slice.len() {
            if !cfg.filters.iter().any(|f| f == filters[i]) {
                continue;
            }
            let snr = m52snr(cfg.rmag, m5[i]);
            let pos_err = astrom_precision(seeing[i], snr).hypot(cfg.atm_err);
            let (zd, pa) = if cfg.angles_in_degrees {
                (zd[i].to_radians(), pa[i].to_radians())
            } else {
                (zd[i], pa[i])
            };
            let slope_err = pos_err / (zd.tan() * pa.sin());
            let w = slope_err.powi(-2);
            if w.is_finite() {
                weight += w;
            }
        }
        let result = 1.0 / weight.sqrt();
        Ok(if result.is_finite() { result } else { self.badval })
    }
}
