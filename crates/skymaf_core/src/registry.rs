//! Named factories for slicer and metric variants outside the built-in set.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{MafError, Result};
use crate::metrics::Metric;
use crate::slicer::Slicer;

/// A single option value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<ParamValue>),
}

/// Options handed to a registered factory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: ParamValue) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Numeric option, `None` if absent
    pub fn f64(&self, key: &str) -> Result<Option<f64>> {
        match self.get(key) {
            None => Ok(None),
            Some(ParamValue::Number(v)) => Ok(Some(*v)),
            Some(other) => Err(type_error(key, "a number", other)),
        }
    }

    /// Text option, `None` if absent
    pub fn str(&self, key: &str) -> Result<Option<&str>> {
        match self.get(key) {
            None => Ok(None),
            Some(ParamValue::Text(v)) => Ok(Some(v)),
            Some(other) => Err(type_error(key, "a string", other)),
        }
    }

    pub fn bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(ParamValue::Bool(v)) => Ok(Some(*v)),
            Some(other) => Err(type_error(key, "a boolean", other)),
        }
    }

    /// List of numbers, `None` if absent
    pub fn f64_list(&self, key: &str) -> Result<Option<Vec<f64>>> {
        match self.get(key) {
            None => Ok(None),
            Some(ParamValue::List(items)) => items
                .iter()
                .map(|item| match item {
                    ParamValue::Number(v) => Ok(*v),
                    other => Err(type_error(key, "a list of numbers", other)),
                })
                .collect::<Result<Vec<_>>>()
                .map(Some),
            Some(other) => Err(type_error(key, "a list of numbers", other)),
        }
    }

    /// Fail on any key outside `allowed`
    pub fn reject_unknown(&self, allowed: &[&str]) -> Result<()> {
        match self.keys().find(|key| !allowed.contains(key)) {
            Some(key) => Err(MafError::config(format!(
                "unknown option `{key}` (expected one of: {})",
                allowed.join(", ")
            ))),
            None => Ok(()),
        }
    }
}

fn type_error(key: &str, expected: &str, found: &ParamValue) -> MafError {
    MafError::config(format!("option `{key}` must be {expected}, got {found:?}"))
}

pub type MetricFactory = Arc<dyn Fn(&Params) -> Result<Box<dyn Metric>> + Send + Sync>;
pub type SlicerFactory = Arc<dyn Fn(&Params) -> Result<Box<dyn Slicer>> + Send + Sync>;

/// Name → factory lookup for custom variants
#[derive(Clone, Default)]
pub struct Registry {
    metrics: FxHashMap<String, MetricFactory>,
    slicers: FxHashMap<String, SlicerFactory>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut metrics: Vec<_> = self.metrics.keys().collect();
        let mut slicers: Vec<_> = self.slicers.keys().collect();
        metrics.sort();
        slicers.sort();
        f.debug_struct("Registry")
            .field("metrics", &metrics)
            .field("slicers", &slicers)
            .finish()
    }
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a metric factory
    pub fn register_metric<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&Params) -> Result<Box<dyn Metric>> + Send + Sync + 'static,
    {
        self.metrics.insert(name.into(), Arc::new(factory));
        self
    }

    /// Register (or replace) a slicer factory
    pub fn register_slicer<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&Params) -> Result<Box<dyn Slicer>> + Send + Sync + 'static,
    {
        self.slicers.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn build_metric(&self, name: &str, params: &Params) -> Result<Box<dyn Metric>> {
        let factory = self
            .metrics
            .get(name)
            .ok_or_else(|| MafError::UnknownPlugin {
                kind: "metric",
                name: name.to_string(),
            })?;
        factory(params)
    }

    pub fn build_slicer(&self, name: &str, params: &Params) -> Result<Box<dyn Slicer>> {
        let factory = self
            .slicers
            .get(name)
            .ok_or_else(|| MafError::UnknownPlugin {
                kind: "slicer",
                name: name.to_string(),
            })?;
        factory(params)
    }

    #[must_use]
    pub fn has_metric(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    #[must_use]
    pub fn has_slicer(&self, name: &str) -> bool {
        self.slicers.contains_key(name)
    }
}
