//! Run orchestration: expand a [`RunConfig`] into bundles, execute them with
//! shared partitions, then render and persist the results.
//!
//! Bundles are independent. A failing bundle is reported in
//! [`RunReport::failures`] and never stops its siblings. With the `parallel`
//! feature bundles execute on the rayon pool; results are always collected in
//! declaration order.

use std::path::PathBuf;
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::bundle::{DisplayMeta, MergeSpec, MetricBundle};
use crate::cache::PartitionCache;
use crate::constraint::{ConstraintEvaluator, PredicateEvaluator};
use crate::error::{MafError, Result};
use crate::metrics::MetricConfig;
use crate::registry::Registry;
use crate::render::{Persister, PlotLayer, PlotRequest, Renderer};
use crate::slicer::SlicerConfig;
use crate::table::Table;

fn default_out_dir() -> PathBuf {
    PathBuf::from("out")
}

fn default_constraints() -> Vec<String> {
    vec![String::new()]
}

/// Complete, immutable description of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub run_name: String,
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
    #[serde(default)]
    pub groups: Vec<SliceGroup>,
}

/// One slicer applied with several metrics under several constraints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SliceGroup {
    pub slicer: SlicerConfig,
    pub metrics: Vec<MetricEntry>,
    #[serde(default = "default_constraints")]
    pub constraints: Vec<String>,
    /// Replaces the constraint text in output names and labels
    #[serde(default)]
    pub metadata: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricEntry {
    pub metric: MetricConfig,
    #[serde(default)]
    pub summaries: Vec<MetricConfig>,
    #[serde(default)]
    pub merge: Option<MergeSpec>,
    #[serde(default)]
    pub display: DisplayMeta,
}

impl MetricEntry {
    #[must_use]
    pub fn new(metric: MetricConfig) -> Self {
        Self {
            metric,
            summaries: Vec::new(),
            merge: None,
            display: DisplayMeta::default(),
        }
    }

    #[must_use]
    pub fn with_summaries(mut self, summaries: Vec<MetricConfig>) -> Self {
        self.summaries = summaries;
        self
    }

    #[must_use]
    pub fn with_merge(mut self, merge: MergeSpec) -> Self {
        self.merge = Some(merge);
        self
    }
}

/// Collapse every run of characters outside `[A-Za-z0-9]` into one `_`
#[must_use]
pub fn sanitize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

/// One bundle to execute, in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct BundlePlan {
    pub name: String,
    pub group: usize,
    pub entry: usize,
    pub constraint: String,
    pub metadata: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Execute,
    Render,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BundleFailure {
    /// Bundle name, or plot name for render failures
    pub name: String,
    pub stage: FailureStage,
    pub error: MafError,
}

#[derive(Debug, Default)]
pub struct RunReport {
    /// Successfully executed bundles in declaration order
    pub bundles: Vec<MetricBundle>,
    pub failures: Vec<BundleFailure>,
    /// Paths written by the persister
    pub artifacts: Vec<PathBuf>,
    /// Slicer setups performed (one per distinct slicer config and constraint)
    pub partition_setups: usize,
}

impl RunReport {
    #[must_use]
    pub fn bundle(&self, name: &str) -> Option<&MetricBundle> {
        self.bundles.iter().find(|b| b.name() == name)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Driver {
    config: RunConfig,
    registry: Registry,
    evaluator: Arc<dyn ConstraintEvaluator>,
}

impl Driver {
    #[must_use]
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            registry: Registry::new(),
            evaluator: Arc::new(PredicateEvaluator::new()),
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn with_evaluator(mut self, evaluator: impl ConstraintEvaluator + 'static) -> Self {
        self.evaluator = Arc::new(evaluator);
        self
    }

    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Expand groups into bundles: constraint-major within a group, metrics in
    /// declared order. Repeated output names get a numeric suffix.
    #[must_use]
    pub fn plan(&self) -> Vec<BundlePlan> {
        let mut plans = Vec::new();
        let mut seen: FxHashMap<String, usize> = FxHashMap::default();
        for (group_idx, group) in self.config.groups.iter().enumerate() {
            for constraint in &group.constraints {
                let metadata = match (&group.metadata, constraint.trim().is_empty()) {
                    (Some(meta), false) if group.constraints.len() > 1 => {
                        format!("{meta} {constraint}")
                    }
                    (Some(meta), _) => meta.clone(),
                    (None, true) => "all".to_string(),
                    (None, false) => constraint.clone(),
                };
                for (entry_idx, entry) in group.metrics.iter().enumerate() {
                    let base = sanitize_name(&format!(
                        "{}_{}_{}_{}",
                        self.config.run_name,
                        entry.metric.display_name(),
                        metadata,
                        group.slicer.kind()
                    ));
                    let count = seen.entry(base.clone()).or_insert(0);
                    *count += 1;
                    let name = if *count == 1 {
                        base
                    } else {
                        format!("{base}_{count}")
                    };
                    plans.push(BundlePlan {
                        name,
                        group: group_idx,
                        entry: entry_idx,
                        constraint: constraint.clone(),
                        metadata: metadata.clone(),
                    });
                }
            }
        }
        plans
    }

    fn execute_one(
        &self,
        plan: &BundlePlan,
        table: &Table,
        cache: &PartitionCache,
    ) -> Result<MetricBundle> {
        let group = &self.config.groups[plan.group];
        let entry = &group.metrics[plan.entry];

        let rows = cache.rows(table, self.evaluator.as_ref(), &plan.constraint)?;
        let slicer = cache.slicer(&group.slicer, &plan.constraint, &self.registry, table, &rows)?;
        let metric = entry.metric.build(&self.registry)?;
        let summaries = entry
            .summaries
            .iter()
            .map(|summary| summary.build(&self.registry))
            .collect::<Result<Vec<_>>>()?;

        let mut bundle = MetricBundle::new(&plan.name, metric, slicer, &plan.constraint)
            .with_metadata(&plan.metadata)
            .with_summaries(summaries)
            .with_merge(entry.merge.clone())
            .with_display(entry.display.clone());
        bundle.run(table)?;
        Ok(bundle)
    }

    /// Execute every planned bundle without rendering
    pub fn execute(&self, table: &Table) -> RunReport {
        let plans = self.plan();
        let cache = PartitionCache::new();
        tracing::info!(
            run = %self.config.run_name,
            bundles = plans.len(),
            rows = table.len(),
            "run started"
        );

        #[cfg(feature = "parallel")]
        let outcomes: Vec<Result<MetricBundle>> = plans
            .par_iter()
            .map(|plan| self.execute_one(plan, table, &cache))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<Result<MetricBundle>> = plans
            .iter()
            .map(|plan| self.execute_one(plan, table, &cache))
            .collect();

        let mut report = RunReport::default();
        for (plan, outcome) in plans.iter().zip(outcomes) {
            match outcome {
                Ok(bundle) => report.bundles.push(bundle),
                Err(error) => {
                    tracing::warn!(bundle = %plan.name, %error, "bundle failed");
                    report.failures.push(BundleFailure {
                        name: plan.name.clone(),
                        stage: FailureStage::Execute,
                        error,
                    });
                }
            }
        }
        report.partition_setups = cache.setups();
        report
    }

    /// Execute, then render and persist: standalone bundles in declared
    /// order, then merge groups in order of first appearance
    pub fn run<R, P>(&self, table: &Table, renderer: &R, persister: &P) -> RunReport
    where
        R: Renderer,
        P: Persister<R::Artifact>,
    {
        let mut report = self.execute(table);
        for request in plot_requests(&self.config.run_name, &report.bundles) {
            let path = self
                .config
                .out_dir
                .join(format!("{}.{}", request.name, renderer.extension()));
            let outcome = renderer
                .render(&request)
                .and_then(|artifact| persister.persist(&artifact, &path));
            match outcome {
                Ok(()) => report.artifacts.push(path),
                Err(error) => {
                    tracing::warn!(plot = %request.name, %error, "render failed");
                    report.failures.push(BundleFailure {
                        name: request.name,
                        stage: FailureStage::Render,
                        error,
                    });
                }
            }
        }
        tracing::info!(
            run = %self.config.run_name,
            bundles = report.bundles.len(),
            failures = report.failures.len(),
            partition_setups = report.partition_setups,
            "run finished"
        );
        report
    }
}

/// Plot requests for executed bundles: one per standalone bundle, then one
/// per merge group holding its members in order
#[must_use]
pub fn plot_requests(run_name: &str, bundles: &[MetricBundle]) -> Vec<PlotRequest> {
    let mut standalone = Vec::new();
    let mut groups: Vec<(String, Vec<PlotLayer>)> = Vec::new();
    for bundle in bundles {
        match bundle.merge() {
            None => standalone.push(PlotRequest {
                name: bundle.name().to_string(),
                layers: vec![PlotLayer::from_bundle(bundle)],
            }),
            Some(merge) => match groups.iter_mut().find(|(g, _)| *g == merge.group) {
                Some((_, layers)) => layers.push(PlotLayer::from_bundle(bundle)),
                None => groups.push((merge.group.clone(), vec![PlotLayer::from_bundle(bundle)])),
            },
        }
    }
    standalone.extend(groups.into_iter().map(|(group, layers)| PlotRequest {
        name: sanitize_name(&format!("{run_name}_{group}")),
        layers,
    }));
    standalone
}
