//! Tests for the histogram slicer
//!
//! These tests verify that:
//! - Explicit edges are used verbatim
//! - Bin counts produce equal-width bins matching a reference histogram
//! - Binsize mode pads one bin on each side
//! - Every filtered, in-range row lands in exactly one slice
//! - Equivalence compares boundaries, not column names

use crate::constraint::{ConstraintEvaluator, PredicateEvaluator};
use crate::error::MafError;
use crate::slicer::{OneDConfig, OneDSlicer, SlicePoint, Slicer, UniSlicer};
use crate::stats::approx_eq;
use crate::table::Table;

use super::{observations, uniform};

fn set_up(config: OneDConfig, table: &Table) -> OneDSlicer {
    let mut slicer = OneDSlicer::new(config).unwrap();
    slicer.setup(table, &table.all_rows()).unwrap();
    slicer
}

#[test]
fn test_explicit_edges_are_verbatim() {
    let table = uniform(200, 1);
    let edges = vec![0.0, 0.1, 0.5, 0.55, 1.0];
    let slicer = set_up(OneDConfig::new("x").with_edges(edges.clone()), &table);

    assert_eq!(slicer.slice_count().unwrap(), edges.len() - 1);
    assert_eq!(slicer.edges().unwrap(), edges.as_slice());
    for (i, slice) in slicer.slices().unwrap().enumerate() {
        assert_eq!(
            slice.point,
            &SlicePoint::Bin {
                sid: i,
                left: edges[i],
                right: edges[i + 1]
            }
        );
    }
}

#[test]
fn test_uniform_bins_of_width_one_tenth() {
    let table = uniform(1000, 7);
    let slicer = set_up(OneDConfig::new("x").with_bins(10).with_range(0.0, 1.0), &table);

    assert_eq!(slicer.slice_count().unwrap(), 10);
    for w in slicer.edges().unwrap().windows(2) {
        assert!(approx_eq(w[1] - w[0], 0.1), "bin width {}", w[1] - w[0]);
    }
    let total: usize = slicer.slices().unwrap().map(|s| s.rows.len()).sum();
    assert_eq!(total, 1000);
}

#[test]
fn test_automatic_bins_follow_freedman_diaconis() {
    let table = uniform(1000, 23);
    let slicer = set_up(OneDConfig::new("x"), &table);

    let mut x = table.f64_column("x").unwrap().to_vec();
    x.sort_by(f64::total_cmp);
    let n = x.len();
    // Linearly interpolated quartiles: positions 249.75 and 749.25
    let q1 = x[249] + (x[250] - x[249]) * 0.75;
    let q3 = x[749] + (x[750] - x[749]) * 0.25;
    let width = 2.0 * (q3 - q1) / (n as f64).cbrt();
    let expected = ((x[n - 1] - x[0]) / width).ceil() as usize;

    assert!(expected > 1 && expected < 200, "expected {expected}");
    assert_eq!(slicer.slice_count().unwrap(), expected);
    assert!(slicer.warnings().is_empty());
    let edges = slicer.edges().unwrap();
    assert_eq!(edges[0], x[0]);
    assert_eq!(edges[edges.len() - 1], x[n - 1]);
}

#[test]
fn test_counts_match_reference_histogram() {
    let table = observations(2000, 11);
    let nbins = 15;
    let slicer = set_up(OneDConfig::new("airmass").with_bins(nbins), &table);

    let values = table.f64_column("airmass").unwrap();
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = (hi - lo) / nbins as f64;
    let mut reference = vec![0usize; nbins];
    for v in values {
        let idx = (((v - lo) / width).floor() as usize).min(nbins - 1);
        reference[idx] += 1;
    }

    let counts: Vec<usize> = slicer.slices().unwrap().map(|s| s.rows.len()).collect();
    assert_eq!(counts, reference);
}

#[test]
fn test_binsize_pads_both_sides() {
    let values: Vec<f64> = (0..=10).map(f64::from).collect();
    let table = Table::new().with_f64("x", values).unwrap();
    let slicer = set_up(OneDConfig::new("x").with_binsize(2.5), &table);

    // ceil(10 / 2.5) + 2
    assert_eq!(slicer.slice_count().unwrap(), 6);
    assert_eq!(
        slicer.edges().unwrap(),
        &[-2.5, 0.0, 2.5, 5.0, 7.5, 10.0, 12.5]
    );
    // The lower pad is empty; the maximum falls on the upper pad's left edge
    assert!(slicer.slice(0).unwrap().rows.is_empty());
    assert_eq!(slicer.slice(5).unwrap().rows, &[10]);
    assert_eq!(slicer.slice(1).unwrap().rows, &[0, 1, 2]);
}

#[test]
fn test_binsize_overrides_count_with_warning() {
    let table = uniform(100, 3);
    let slicer = set_up(
        OneDConfig::new("x")
            .with_bins(50)
            .with_binsize(0.25)
            .with_range(0.0, 1.0),
        &table,
    );
    assert_eq!(slicer.slice_count().unwrap(), 6);
    assert_eq!(slicer.warnings().len(), 1);
}

#[test]
fn test_rows_partitioned_exactly_once() {
    let table = observations(3000, 5);
    let rows = PredicateEvaluator
        .select(&table, "filter = 'r' or filter = 'g'")
        .unwrap();
    let mut slicer = OneDSlicer::new(OneDConfig::new("airmass").with_bins(12)).unwrap();
    slicer.setup(&table, &rows).unwrap();

    let mut seen = vec![0u8; table.len()];
    for slice in slicer.slices().unwrap() {
        assert!(slice.rows.windows(2).all(|w| w[0] < w[1]), "rows not sorted");
        for &row in slice.rows {
            seen[row] += 1;
        }
    }
    for row in 0..table.len() {
        let expected = u8::from(rows.binary_search(&row).is_ok());
        assert_eq!(seen[row], expected, "row {row}");
    }
}

#[test]
fn test_rows_outside_range_excluded() {
    let table = uniform(500, 9);
    let slicer = set_up(OneDConfig::new("x").with_bins(4).with_range(0.25, 0.75), &table);
    let values = table.f64_column("x").unwrap();
    let inside = values.iter().filter(|v| (0.25..=0.75).contains(*v)).count();
    assert_eq!(slicer.partition().unwrap().assigned_rows(), inside);
}

#[test]
fn test_single_valued_data_widens_range() {
    let table = Table::new().with_f64("x", vec![3.0; 5]).unwrap();
    let slicer = set_up(OneDConfig::new("x").with_bins(2), &table);
    assert_eq!(slicer.edges().unwrap(), &[3.0, 3.5, 4.0]);
    assert_eq!(slicer.slice(0).unwrap().rows.len(), 5);
    assert!(!slicer.warnings().is_empty());
}

#[test]
fn test_equivalence() {
    let table = observations(500, 2);
    let shifted = Table::new()
        .with_f64(
            "airmass",
            table
                .f64_column("airmass")
                .unwrap()
                .iter()
                .map(|v| v + 0.5)
                .collect(),
        )
        .unwrap();

    let a = set_up(OneDConfig::new("airmass").with_bins(10), &table);
    let b = set_up(OneDConfig::new("airmass").with_bins(10), &table);
    let c = set_up(OneDConfig::new("airmass").with_bins(10), &shifted);
    assert!(a.same_partition(&b));
    assert!(!a.same_partition(&c));

    // Same edges on another column are still the same partition
    let d = set_up(
        OneDConfig::new("night").with_edges(a.edges().unwrap().to_vec()),
        &table,
    );
    assert!(a.same_partition(&d));

    let mut uni = UniSlicer::new();
    uni.setup(&table, &table.all_rows()).unwrap();
    assert!(!a.same_partition(&uni));
    assert!(!uni.same_partition(&a));
}

#[test]
fn test_queries_before_setup_fail() {
    let slicer = OneDSlicer::new(OneDConfig::new("x").with_bins(3)).unwrap();
    assert_eq!(slicer.slice_count().unwrap_err(), MafError::NotConfigured);
    assert!(slicer.slices().is_err());
    assert!(!slicer.is_setup());
    assert!(!slicer.same_partition(&slicer.clone()));
}

#[test]
fn test_setup_errors() {
    let table = observations(10, 4);
    let mut slicer = OneDSlicer::new(OneDConfig::new("nope").with_bins(3)).unwrap();
    assert_eq!(
        slicer.setup(&table, &table.all_rows()).unwrap_err(),
        MafError::UnknownColumn("nope".into())
    );

    let mut slicer = OneDSlicer::new(OneDConfig::new("filter").with_bins(3)).unwrap();
    assert!(matches!(
        slicer.setup(&table, &table.all_rows()),
        Err(MafError::ColumnType { .. })
    ));

    assert!(OneDSlicer::new(OneDConfig::new("x").with_binsize(-1.0)).is_err());
    assert!(OneDSlicer::new(OneDConfig::new("x").with_edges(vec![1.0, 0.0])).is_err());
}

#[test]
fn test_slice_index_out_of_range() {
    let table = uniform(10, 1);
    let slicer = set_up(OneDConfig::new("x").with_bins(3), &table);
    assert_eq!(
        slicer.slice(3).unwrap_err(),
        MafError::SliceOutOfRange { index: 3, count: 3 }
    );
}
