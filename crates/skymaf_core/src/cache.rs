//! Run-scoped memoization of constraint selections and slicer setups.
//!
//! Each key owns a cell that is filled exactly once: the first caller computes
//! the value while concurrent callers for the same key block on the cell and
//! then share the result. Failures are cached too, so a broken slicer is set up
//! once no matter how many bundles use it.

use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use rustc_hash::FxHashMap;

use crate::constraint::ConstraintEvaluator;
use crate::error::Result;
use crate::registry::Registry;
use crate::slicer::{Slicer, SlicerConfig};
use crate::table::Table;

type Cell<T> = Arc<OnceLock<Result<T>>>;

fn cell<K: Eq + Hash, T>(map: &Mutex<FxHashMap<K, Cell<T>>>, key: K) -> Cell<T> {
    let mut guard = map.lock().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(guard.entry(key).or_default())
}

#[derive(Default)]
pub struct PartitionCache {
    slicers: Mutex<FxHashMap<(String, String), Cell<Arc<dyn Slicer>>>>,
    selections: Mutex<FxHashMap<String, Cell<Arc<Vec<usize>>>>>,
    setups: AtomicUsize,
}

impl PartitionCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows matching `constraint`, evaluated once per constraint string
    pub fn rows(
        &self,
        table: &Table,
        evaluator: &dyn ConstraintEvaluator,
        constraint: &str,
    ) -> Result<Arc<Vec<usize>>> {
        let cell = cell(&self.selections, constraint.to_string());
        cell.get_or_init(|| {
            let rows = evaluator.select(table, constraint)?;
            tracing::debug!(constraint, rows = rows.len(), "constraint evaluated");
            Ok(Arc::new(rows))
        })
        .clone()
    }

    /// The set-up slicer for `(config, constraint)`, built on first use
    pub fn slicer(
        &self,
        config: &SlicerConfig,
        constraint: &str,
        registry: &Registry,
        table: &Table,
        rows: &[usize],
    ) -> Result<Arc<dyn Slicer>> {
        let key = (config.fingerprint(), constraint.to_string());
        let cell = cell(&self.slicers, key);
        cell.get_or_init(|| {
            self.setups.fetch_add(1, Ordering::Relaxed);
            let mut slicer = config.build(registry)?;
            slicer.setup(table, rows)?;
            tracing::debug!(
                slicer = slicer.kind(),
                constraint,
                slices = slicer.slice_count()?,
                warnings = slicer.warnings().len(),
                "slicer set up"
            );
            Ok(Arc::from(slicer))
        })
        .clone()
    }

    /// Number of slicer setups attempted so far
    #[must_use]
    pub fn setups(&self) -> usize {
        self.setups.load(Ordering::Relaxed)
    }
}
