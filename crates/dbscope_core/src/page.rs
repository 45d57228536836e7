use crate::{ColumnInfo, Row, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Raw result of a page query as returned by a driver.
///
/// `columns` are the result-set column names in result order; each row holds
/// values in the same order. Rows that failed to decode are already dropped
/// by the driver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl RowSet {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }
}

/// One page of table data in the uniform shape handed to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPage {
    /// Column metadata for the table, in catalog order.
    pub columns: Vec<ColumnInfo>,

    /// Decoded rows as ordered column-name -> value mappings. SQL NULL is
    /// present as an explicit `Value::Null`, never an omitted key.
    pub rows: Vec<IndexMap<String, Value>>,

    /// Row count for the whole table, not just this page.
    pub total: u64,
}
