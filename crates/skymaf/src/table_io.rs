//! Loading observation tables from JSON
//!
//! The document holds one array per column:
//! `{"columns": {"airmass": [1.2, 1.4], "filter": ["r", "g"]}}`.
//! Numeric columns may contain `null`, which becomes NaN and is ignored by
//! slicers and metrics.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use color_eyre::eyre::{WrapErr, eyre};
use serde::Deserialize;
use skymaf_core::{Column, Table};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TableDocument {
    columns: BTreeMap<String, ColumnData>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ColumnData {
    Numbers(Vec<Option<f64>>),
    Labels(Vec<String>),
}

impl From<ColumnData> for Column {
    fn from(data: ColumnData) -> Self {
        match data {
            ColumnData::Numbers(values) => {
                Column::Float(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
            }
            ColumnData::Labels(values) => Column::Text(values),
        }
    }
}

/// Parse a table document. Columns are added in name order.
pub fn table_from_json(json: &str) -> color_eyre::Result<Table> {
    let document: TableDocument = serde_json::from_str(json)?;
    let mut table = Table::new();
    for (name, data) in document.columns {
        table = table.with_column(name, data.into())?;
    }
    Ok(table)
}

pub fn load_table(path: &Path) -> color_eyre::Result<Table> {
    let content = fs::read_to_string(path)
        .wrap_err_with(|| format!("reading table {}", path.display()))?;
    let table = table_from_json(&content)
        .map_err(|e| eyre!("loading table {}: {e}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        rows = table.len(),
        columns = table.column_names().len(),
        "table loaded"
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_columns() {
        let table = table_from_json(
            r#"{"columns": {"airmass": [1.2, null, 1.5], "filter": ["r", "g", "r"]}}"#,
        )
        .unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.column_names(), &["airmass", "filter"]);
        let airmass = table.f64_column("airmass").unwrap();
        assert!(airmass[1].is_nan());
        assert_eq!(table.text_column("filter").unwrap()[2], "r");
    }

    #[test]
    fn test_ragged_columns_rejected() {
        let err = table_from_json(r#"{"columns": {"a": [1, 2], "b": [1]}}"#).unwrap_err();
        assert!(err.to_string().contains("`b`"), "{err}");
    }

    #[test]
    fn test_mixed_types_rejected() {
        assert!(table_from_json(r#"{"columns": {"a": [1, "r"]}}"#).is_err());
        assert!(table_from_json(r#"{"rows": []}"#).is_err());
    }
}
