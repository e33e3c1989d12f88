//! Stock metric sets and per-filter groupings for building run configurations.
//!
//! Every function returns plain configuration values, so callers can extend
//! or edit them before handing them to a [`SliceGroup`](crate::SliceGroup).

use crate::bundle::MergeSpec;
use crate::metrics::{MetricConfig, Statistic};

/// Survey filters in wavelength order
pub const FILTERS: [&str; 6] = ["u", "g", "r", "i", "z", "y"];

fn outliers(n_sigma: f64) -> Statistic {
    Statistic::NoutliersNsigma { n_sigma }
}

fn percentile(percentile: f64) -> Statistic {
    Statistic::Percentile { percentile }
}

/// Replace the column in each default name; an empty replacement drops it
fn rename_column(configs: Vec<MetricConfig>, replacement: Option<&str>) -> Vec<MetricConfig> {
    let Some(replacement) = replacement else {
        return configs;
    };
    configs
        .into_iter()
        .map(|config| {
            let name = config.stat.label(replacement).trim_end().to_string();
            config.with_name(name)
        })
        .collect()
}

/// Mean, rms, median, count, max, min and the 3-sigma outlier counts
#[must_use]
pub fn standard_summary() -> Vec<MetricConfig> {
    vec![
        MetricConfig::summary(Statistic::Mean),
        MetricConfig::summary(Statistic::Rms),
        MetricConfig::summary(Statistic::Median),
        MetricConfig::summary(Statistic::Count),
        MetricConfig::summary(Statistic::Max),
        MetricConfig::summary(Statistic::Min),
        MetricConfig::summary(outliers(3.0)).with_name("N(+3Sigma)"),
        MetricConfig::summary(outliers(-3.0)).with_name("N(-3Sigma)"),
    ]
}

/// [`standard_summary`] plus the quartiles
#[must_use]
pub fn extended_summary() -> Vec<MetricConfig> {
    let mut summary = standard_summary();
    summary.push(MetricConfig::summary(percentile(25.0)).with_name("25th%ile"));
    summary.push(MetricConfig::summary(percentile(75.0)).with_name("75th%ile"));
    summary
}

/// Mean, median, min and max of `column`, usually run with a whole-dataset slicer
#[must_use]
pub fn standard_metrics(column: &str, replace_column: Option<&str>) -> Vec<MetricConfig> {
    let configs = [Statistic::Mean, Statistic::Median, Statistic::Min, Statistic::Max]
        .into_iter()
        .map(|stat| MetricConfig::new(stat, column))
        .collect();
    rename_column(configs, replace_column)
}

#[must_use]
pub fn extended_metrics(column: &str, replace_column: Option<&str>) -> Vec<MetricConfig> {
    let mut configs = standard_metrics(column, None);
    configs.extend(
        [
            Statistic::Rms,
            outliers(3.0),
            outliers(-3.0),
            percentile(25.0),
            percentile(75.0),
            Statistic::Count,
        ]
        .into_iter()
        .map(|stat| MetricConfig::new(stat, column)),
    );
    rename_column(configs, replace_column)
}

/// Metrics for a column holding a wrap-around angle in degrees
#[must_use]
pub fn standard_angle_metrics(column: &str, replace_column: Option<&str>) -> Vec<MetricConfig> {
    let configs = [
        Statistic::MeanAngle,
        Statistic::RmsAngle,
        Statistic::FullRangeAngle,
        Statistic::Min,
        Statistic::Max,
    ]
    .into_iter()
    .map(|stat| MetricConfig::new(stat, column))
    .collect();
    rename_column(configs, replace_column)
}

/// One entry of [`filter_list`]
#[derive(Debug, Clone, PartialEq)]
pub struct FilterBand {
    /// Filter name, or `"all"` for every band together
    pub filter: String,
    pub constraint: String,
    pub color: String,
    /// Display order, `all` first
    pub order: usize,
    pub metadata: String,
}

impl FilterBand {
    /// Merge membership drawing this band in its color with its metadata as label
    #[must_use]
    pub fn merge(&self, group: impl Into<String>) -> MergeSpec {
        MergeSpec {
            group: group.into(),
            color: Some(self.color.clone()),
            label: Some(self.metadata.clone()),
        }
    }
}

fn band_color(filter: &str) -> &'static str {
    match filter {
        "u" => "cyan",
        "g" => "g",
        "r" => "orange",
        "i" => "r",
        "z" => "m",
        "y" => "b",
        _ => "k",
    }
}

/// Per-filter constraints, plot colors and metadata.
///
/// With `include_all`, an `all` entry covering every band comes first.
/// `extra_constraint` is and-ed onto each band's constraint (it is the whole
/// constraint of the `all` entry) and prefixes the metadata unless
/// `extra_metadata` is given.
#[must_use]
pub fn filter_list(
    include_all: bool,
    extra_constraint: Option<&str>,
    extra_metadata: Option<&str>,
) -> Vec<FilterBand> {
    let extra_constraint = extra_constraint.filter(|c| !c.trim().is_empty());
    let prefix = match (extra_metadata, extra_constraint) {
        (Some(meta), _) => format!("{meta} "),
        (None, Some(constraint)) => format!("{constraint} "),
        (None, None) => String::new(),
    };

    let all = include_all.then_some("all");
    all.into_iter()
        .chain(FILTERS)
        .map(|filter| {
            let (constraint, metadata, order) = if filter == "all" {
                (
                    extra_constraint.unwrap_or_default().to_string(),
                    format!("{prefix}all bands"),
                    0,
                )
            } else {
                let band = format!("filter = \"{filter}\"");
                let constraint = match extra_constraint {
                    Some(extra) => format!("({extra}) and ({band})"),
                    None => band,
                };
                let order = FILTERS.iter().position(|f| *f == filter).map_or(0, |i| i + 1);
                (constraint, format!("{prefix}{filter} band"), order)
            };
            FilterBand {
                filter: filter.to_string(),
                constraint,
                color: band_color(filter).to_string(),
                order,
                metadata,
            }
        })
        .collect()
}
