//! Tests for the metric catalog and bundle results
//!
//! These tests verify that:
//! - Default display names follow the `"<Stat> <column>"` convention
//! - Empty slices produce masked entries filled with the badval
//! - Summaries ignore masked entries and report undefined values as `None`
//! - Registered custom metrics run like built-ins

use std::sync::Arc;

use crate::bundle::{MaskedArray, MetricBundle, summarize};
use crate::error::{MafError, Result};
use crate::metrics::{DcrConfig, Metric, MetricConfig, Statistic};
use crate::registry::{ParamValue, Params, Registry};
use crate::slicer::{OneDConfig, OneDSlicer, SlicePoint, Slicer};
use crate::table::{DataSlice, Table};

use super::observations;

fn build(config: MetricConfig) -> Box<dyn Metric> {
    config.build(&Registry::new()).unwrap()
}

#[test]
fn test_default_names() {
    let names: Vec<String> = [
        MetricConfig::new(Statistic::Mean, "finSeeing"),
        MetricConfig::new(Statistic::Percentile { percentile: 25.0 }, "airmass"),
        MetricConfig::new(Statistic::NoutliersNsigma { n_sigma: 3.0 }, "airmass"),
        MetricConfig::new(Statistic::NoutliersNsigma { n_sigma: -2.5 }, "airmass"),
        MetricConfig::new(Statistic::CoaddM5, "fiveSigmaDepth"),
        MetricConfig::new(Statistic::DcrPrecision(DcrConfig::default()), "ignored"),
        MetricConfig::new(Statistic::Count, "night").with_name("Visits"),
    ]
    .into_iter()
    .map(|config| build(config).name().to_string())
    .collect();
    assert_eq!(
        names,
        vec![
            "Mean finSeeing",
            "25th%ile airmass",
            "N(+3Sigma) airmass",
            "N(-2.5Sigma) airmass",
            "Coaddm5 fiveSigmaDepth",
            "DCRprecision",
            "Visits",
        ]
    );
}

#[test]
fn test_invalid_metric_options() {
    let registry = Registry::new();
    assert!(
        MetricConfig::new(Statistic::Percentile { percentile: 120.0 }, "x")
            .build(&registry)
            .unwrap_err()
            .is_configuration()
    );
    assert!(
        MetricConfig::new(Statistic::NoutliersNsigma { n_sigma: f64::NAN }, "x")
            .build(&registry)
            .is_err()
    );
    let missing = MetricConfig::new(
        Statistic::Custom {
            name: "Nope".into(),
            params: Params::new(),
        },
        "x",
    );
    assert!(matches!(
        missing.build(&registry),
        Err(MafError::UnknownPlugin { kind: "metric", .. })
    ));
}

#[test]
fn test_empty_slices_are_masked_badval() {
    let table = Table::new()
        .with_f64("x", vec![0.1, 0.2, 0.9])
        .unwrap();
    let mut slicer =
        OneDSlicer::new(OneDConfig::new("x").with_edges(vec![0.0, 0.3, 0.6, 1.0])).unwrap();
    slicer.setup(&table, &table.all_rows()).unwrap();

    let metric = build(MetricConfig::new(Statistic::Mean, "x"));
    let mut bundle = MetricBundle::new("b", metric, Arc::new(slicer), "");
    bundle.run(&table).unwrap();

    let results = bundle.results().unwrap();
    assert_eq!(results.mask(), &[false, true, false]);
    assert_eq!(results.filled()[1], -666.0);
    assert!((results.get(0).unwrap() - 0.15).abs() < 1e-12);
    assert_eq!(results.get(1), None);
    assert_eq!(bundle.metadata(), "all");
}

#[test]
fn test_metric_badval_is_masked() {
    let table = Table::new().with_f64("x", vec![1.0, 2.0]).unwrap();
    let mut slicer = OneDSlicer::new(OneDConfig::new("x").with_bins(2)).unwrap();
    slicer.setup(&table, &table.all_rows()).unwrap();

    // The second bin's value coincides with the badval
    let metric = build(MetricConfig::new(Statistic::Identity, "x").with_badval(2.0));
    let mut bundle = MetricBundle::new("b", metric, Arc::new(slicer), "");
    bundle.run(&table).unwrap();
    let results = bundle.results().unwrap();
    assert_eq!(results.mask(), &[false, true]);
    assert_eq!(results.fill(), 2.0);
}

#[test]
fn test_summaries_skip_masked_entries() {
    let table = Table::new()
        .with_f64("x", vec![0.1, 0.2, 0.9, 0.95])
        .unwrap();
    let mut slicer =
        OneDSlicer::new(OneDConfig::new("x").with_edges(vec![0.0, 0.5, 0.8, 1.0])).unwrap();
    slicer.setup(&table, &table.all_rows()).unwrap();

    let metric = build(MetricConfig::new(Statistic::Count, "x"));
    let summaries = vec![
        build(MetricConfig::summary(Statistic::Mean)),
        build(MetricConfig::summary(Statistic::Min)),
        build(MetricConfig::summary(Statistic::Identity)),
    ];
    let mut bundle =
        MetricBundle::new("b", metric, Arc::new(slicer), "").with_summaries(summaries);
    bundle.run(&table).unwrap();

    let summary: Vec<Option<f64>> = bundle.summary_values().iter().map(|s| s.value).collect();
    // Counts are [2, masked, 2]; a masked zero would drag the mean down
    assert_eq!(summary, vec![Some(2.0), Some(2.0), None]);
    assert_eq!(bundle.summary_values()[0].name, "Mean metricdata");
}

#[test]
fn test_summary_of_all_masked_is_none() {
    let results = MaskedArray::new(-666.0);
    let median = build(MetricConfig::summary(Statistic::Median));
    let summary = summarize(median.as_ref(), &results).unwrap();
    assert_eq!(summary.value, None);
}

#[test]
fn test_missing_column_fails_before_slices_run() {
    let table = observations(50, 1);
    let mut slicer = OneDSlicer::new(OneDConfig::new("airmass").with_bins(3)).unwrap();
    slicer.setup(&table, &table.all_rows()).unwrap();
    let metric = build(MetricConfig::new(Statistic::Mean, "finSeeing"));
    let mut bundle = MetricBundle::new("b", metric, Arc::new(slicer), "");
    assert_eq!(
        bundle.run(&table).unwrap_err(),
        MafError::UnknownColumn("finSeeing".into())
    );
    assert!(bundle.results().is_none());
}

/// Fraction of rows above a threshold
#[derive(Debug)]
struct FractionAbove {
    column: String,
    threshold: f64,
}

impl Metric for FractionAbove {
    fn name(&self) -> &str {
        "FractionAbove"
    }

    fn required_columns(&self) -> Vec<&str> {
        vec![self.column.as_str()]
    }

    fn run(&self, slice: &DataSlice<'_>, _point: &SlicePoint) -> Result<f64> {
        let values = slice.values(&self.column)?;
        if values.is_empty() {
            return Ok(self.badval());
        }
        let above = values.iter().filter(|&&v| v > self.threshold).count();
        Ok(above as f64 / values.len() as f64)
    }
}

#[test]
fn test_custom_metric_through_registry() {
    let mut registry = Registry::new();
    registry.register_metric("fraction_above", |params| {
        params.reject_unknown(&["column", "threshold"])?;
        Ok(Box::new(FractionAbove {
            column: params.str("column")?.unwrap_or("airmass").to_string(),
            threshold: params.f64("threshold")?.unwrap_or(1.5),
        }))
    });

    let config = MetricConfig::new(
        Statistic::Custom {
            name: "fraction_above".into(),
            params: Params::new().with("threshold", ParamValue::Number(2.0)),
        },
        "ignored",
    );
    let metric = config.build(&registry).unwrap();
    assert_eq!(metric.name(), "FractionAbove");

    let table = Table::new()
        .with_f64("airmass", vec![1.0, 2.5, 3.0, 1.2])
        .unwrap();
    let value = metric.run(&table.full_slice(), &SlicePoint::Whole).unwrap();
    assert_eq!(value, 0.5);

    let renamed = config.clone().with_name("Other");
    assert!(renamed.build(&registry).is_err());
}
