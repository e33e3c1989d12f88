//! Integration tests for the slicing and metric engine
//!
//! Tests are organized by topic:
//! - `one_d_slicer` - Histogram binning rules and row assignment
//! - `uni_slicer` - Whole-dataset slicing
//! - `healpix_slicer` - Sky pixelization
//! - `ndim_slicer` - Grid cells over several columns
//! - `metrics` - Metric catalog, masking and summaries
//! - `constraint` - Predicate language
//! - `presets` - Stock metric sets and per-filter groups
//! - `driver` - Bundle expansion, partition sharing, failures and merging

mod metrics;
mod ndim_slicer;
mod one_d_slicer;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::table::Table;

const FILTERS: [&str; 6] = ["u", "g", "r", "i", "z", "y"];

/// Random observation table with the columns the tests slice on
pub(crate) fn observations(n: usize, seed: u64) -> Table {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut airmass = Vec::with_capacity(n);
    let mut ra = Vec::with_capacity(n);
    let mut dec = Vec::with_capacity(n);
    let mut m5 = Vec::with_capacity(n);
    let mut night = Vec::with_capacity(n);
    let mut filter = Vec::with_capacity(n);
    for _ in 0..n {
        airmass.push(rng.random_range(1.0..2.5));
        ra.push(rng.random_range(0.0..360.0));
        // Uniform on the sphere
        let z: f64 = rng.random_range(-1.0..1.0);
        dec.push(z.asin().to_degrees());
        m5.push(rng.random_range(22.0..25.0));
        night.push(f64::from(rng.random_range(0..3650u32)));
        filter.push(FILTERS[rng.random_range(0..FILTERS.len())]);
    }
    Table::new()
        .with_f64("airmass", airmass)
        .and_then(|t| t.with_f64("fieldRA", ra))
        .and_then(|t| t.with_f64("fieldDec", dec))
        .and_then(|t| t.with_f64("fiveSigmaDepth", m5))
        .and_then(|t| t.with_f64("night", night))
        .and_then(|t| t.with_text("filter", filter))
        .expect("observation table")
}

/// `n` values uniform in `[0, 1)` under column `x`
pub(crate) fn uniform(n: usize, seed: u64) -> Table {
    let mut rng = StdRng::seed_from_u64(seed);
    let values = (0..n).map(|_| rng.random::<f64>()).collect();
    Table::new().with_f64("x", values).expect("uniform table")
}
