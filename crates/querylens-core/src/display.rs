//! Mapping engine results into a display-ready table.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::config::DisplayConfig;
use crate::executor::QueryResult;

/// Column description consumed by a grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayColumn {
    pub field: String,
    pub header_name: String,
    pub data_type: String,
    pub width: u32,
    pub sortable: bool,
    pub filterable: bool,
    /// URL template for cells of this column, `{value}` is substituted
    pub link_template: Option<String>,
}

/// One result row with a synthetic id; the data has no key of its own
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayRow {
    pub id: usize,
    pub values: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DisplayTable {
    pub columns: Vec<DisplayColumn>,
    pub rows: Vec<DisplayRow>,
}

/// Layout options for [`DisplayTable::from_result`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayOptions {
    pub column_width: u32,
    pub column_links: BTreeMap<String, String>,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        DisplayConfig::default().into()
    }
}

impl From<DisplayConfig> for DisplayOptions {
    fn from(config: DisplayConfig) -> Self {
        Self {
            column_width: config.column_width,
            column_links: config.column_links,
        }
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl DisplayTable {
    pub fn from_result(result: QueryResult, options: &DisplayOptions) -> Self {
        let columns = result
            .schema
            .into_iter()
            .map(|column| DisplayColumn {
                header_name: column.name.clone(),
                link_template: options.column_links.get(&column.name).cloned(),
                field: column.name,
                data_type: column.data_type,
                width: options.column_width,
                sortable: true,
                filterable: true,
            })
            .collect();

        let rows = result
            .rows
            .into_iter()
            .enumerate()
            .map(|(id, values)| DisplayRow { id, values })
            .collect();

        Self { columns, rows }
    }

    pub fn column(&self, field: &str) -> Option<&DisplayColumn> {
        self.columns.iter().find(|c| c.field == field)
    }

    /// Link target for a cell, if its column carries a link template and the
    /// cell has a non-null value
    pub fn link_for(&self, row: &DisplayRow, field: &str) -> Option<String> {
        let template = self.column(field)?.link_template.as_ref()?;
        let value = row.values.get(field).filter(|v| !v.is_null())?;
        Some(template.replace("{value}", &cell_text(value)))
    }
}
