//! In-memory columnar table of observation records.
//!
//! The engine never copies row data: slices are lists of row indices into a
//! shared `Table`, and metrics gather the values they need through a
//! [`DataSlice`] view.

use std::borrow::Cow;

use rustc_hash::FxHashMap;

use crate::error::{MafError, Result};

/// A single named column
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Numeric values (angles are stored in degrees unless a slicer says otherwise)
    Float(Vec<f64>),
    /// Categorical values such as the filter name
    Text(Vec<String>),
}

impl Column {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Float(values) => values.len(),
            Self::Text(values) => values.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Float(_) => "numeric",
            Self::Text(_) => "text",
        }
    }
}

/// Immutable columnar dataset with equal-length named columns
#[derive(Debug, Clone, Default)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Column>,
    index: FxHashMap<String, usize>,
    rows: usize,
}

impl Table {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column, replacing any existing column with the same name.
    ///
    /// The first column fixes the row count; later columns must match it.
    pub fn with_column(mut self, name: impl Into<String>, column: Column) -> Result<Self> {
        let name = name.into();
        if !self.columns.is_empty() && column.len() != self.rows {
            return Err(MafError::ColumnLength {
                column: name,
                expected: self.rows,
                found: column.len(),
            });
        }
        self.rows = column.len();
        if let Some(&idx) = self.index.get(&name) {
            self.columns[idx] = column;
        } else {
            self.index.insert(name.clone(), self.columns.len());
            self.names.push(name);
            self.columns.push(column);
        }
        Ok(self)
    }

    pub fn with_f64(self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        self.with_column(name, Column::Float(values))
    }

    pub fn with_text<S: Into<String>>(
        self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Result<Self> {
        let values = values.into_iter().map(Into::into).collect();
        self.with_column(name, Column::Text(values))
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Column names in insertion order
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.index
            .get(name)
            .map(|&idx| &self.columns[idx])
            .ok_or_else(|| MafError::UnknownColumn(name.to_string()))
    }

    /// Borrow a numeric column
    pub fn f64_column(&self, name: &str) -> Result<&[f64]> {
        match self.column(name)? {
            Column::Float(values) => Ok(values),
            other => Err(MafError::ColumnType {
                column: name.to_string(),
                expected: "numeric",
                found: other.type_name(),
            }),
        }
    }

    /// Borrow a text column
    pub fn text_column(&self, name: &str) -> Result<&[String]> {
        match self.column(name)? {
            Column::Text(values) => Ok(values),
            other => Err(MafError::ColumnType {
                column: name.to_string(),
                expected: "text",
                found: other.type_name(),
            }),
        }
    }

    /// Check that every named column exists
    pub fn require_columns<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Result<()> {
        for name in names {
            if !self.has_column(name) {
                return Err(MafError::UnknownColumn(name.to_string()));
            }
        }
        Ok(())
    }

    /// Row indices `0..len` (the selection used when there is no constraint)
    #[must_use]
    pub fn all_rows(&self) -> Vec<usize> {
        (0..self.rows).collect()
    }

    /// A view over the whole table
    #[must_use]
    pub fn full_slice(&self) -> DataSlice<'_> {
        DataSlice::new(self, Cow::Owned(self.all_rows()))
    }
}

/// Borrowed view of the rows belonging to one slice
#[derive(Debug, Clone)]
pub struct DataSlice<'a> {
    table: &'a Table,
    rows: Cow<'a, [usize]>,
}

impl<'a> DataSlice<'a> {
    pub fn new(table: &'a Table, rows: Cow<'a, [usize]>) -> Self {
        Self { table, rows }
    }

    pub fn borrowed(table: &'a Table, rows: &'a [usize]) -> Self {
        Self::new(table, Cow::Borrowed(rows))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    #[must_use]
    pub fn table(&self) -> &'a Table {
        self.table
    }

    /// Gather a numeric column's values for the rows of this slice
    pub fn values(&self, column: &str) -> Result<Vec<f64>> {
        let data = self.table.f64_column(column)?;
        Ok(self.rows.iter().map(|&row| data[row]).collect())
    }

    /// Gather a numeric column's finite values for the rows of this slice
    pub fn finite_values(&self, column: &str) -> Result<Vec<f64>> {
        let mut values = self.values(column)?;
        values.retain(|v| v.is_finite());
        Ok(values)
    }

    /// Gather a text column's values for the rows of this slice
    pub fn labels(&self, column: &str) -> Result<Vec<&'a str>> {
        let data = self.table.text_column(column)?;
        Ok(self.rows.iter().map(|&row| data[row].as_str()).collect())
    }
}
