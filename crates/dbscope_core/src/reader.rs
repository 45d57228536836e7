use crate::{Connection, DataPage, DbError, Pagination, TableRef};
use indexmap::IndexMap;
use log::debug;
use std::time::Duration;

fn unwrap_query_message(err: DbError) -> String {
    match err {
        DbError::QueryFailed(message) => message,
        other => other.to_string(),
    }
}

/// Fetch one page of table data in the uniform `DataPage` shape.
///
/// Column resolution, the total count, and the page query each fail with
/// their own error kind so the caller can tell which step broke. Individual
/// rows whose width disagrees with the result columns are dropped rather
/// than aborting the page.
pub fn fetch_page(
    conn: &dyn Connection,
    table: &TableRef,
    page: &Pagination,
    timeout: Option<Duration>,
) -> Result<DataPage, DbError> {
    let columns = conn
        .table_columns(table)
        .map_err(|e| DbError::ColumnInfoUnavailable(unwrap_query_message(e)))?;

    let total = conn
        .count_rows(table, timeout)
        .map_err(|e| DbError::CountFailed(unwrap_query_message(e)))?;

    let raw = conn
        .select_page(table, page, timeout)
        .map_err(|e| DbError::QueryFailed(unwrap_query_message(e)))?;

    let mut rows = Vec::with_capacity(raw.rows.len());
    for row in raw.rows {
        if row.len() != raw.columns.len() {
            debug!(
                "skipping row with {} values against {} columns in {}",
                row.len(),
                raw.columns.len(),
                table
            );
            continue;
        }

        rows.push(
            raw.columns
                .iter()
                .cloned()
                .zip(row)
                .collect::<IndexMap<_, _>>(),
        );
    }

    Ok(DataPage {
        columns,
        rows,
        total,
    })
}
