use crate::error::{MafError, Result};
use crate::table::Table;

use super::{Partition, SliceGeometry, SlicePoint, Slicer};

/// Whole-dataset slicer: exactly one slice containing every filtered row
#[derive(Debug, Clone, Default)]
pub struct UniSlicer {
    partition: Option<Partition>,
}

impl UniSlicer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Slicer for UniSlicer {
    fn kind(&self) -> &str {
        "UniSlicer"
    }

    fn setup(&mut self, _table: &Table, rows: &[usize]) -> Result<()> {
        let mut rows = rows.to_vec();
        rows.sort_unstable();
        rows.dedup();
        self.partition = Some(Partition::new(vec![SlicePoint::Whole], vec![rows])?);
        Ok(())
    }

    fn partition(&self) -> Result<&Partition> {
        self.partition.as_ref().ok_or(MafError::NotConfigured)
    }

    fn geometry(&self) -> Option<SliceGeometry> {
        self.partition.as_ref().map(|_| SliceGeometry::Whole)
    }
}
