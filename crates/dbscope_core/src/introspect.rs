use crate::{ColumnInfo, Connection, DbError, TableInfo, TableRef};
use log::debug;

/// Enumerate tables on the active connection, with best-effort row counts.
///
/// The listing itself failing propagates; a failing count for a single table
/// does not, it lists as 0 instead. Tables come back in whatever order the
/// backend returned them.
pub fn list_tables(conn: &dyn Connection) -> Result<Vec<TableInfo>, DbError> {
    let names = conn.table_names()?;
    let mut tables = Vec::with_capacity(names.len());

    for table in names {
        let row_count = match conn.count_rows(&table, None) {
            Ok(count) => count,
            Err(e) => {
                debug!("row count for {} failed, listing as 0: {e}", table);
                0
            }
        };

        tables.push(TableInfo {
            name: table.name,
            row_count,
            schema: table.schema,
        });
    }

    Ok(tables)
}

/// Column metadata for one table on the active connection.
pub fn list_columns(conn: &dyn Connection, table: &TableRef) -> Result<Vec<ColumnInfo>, DbError> {
    conn.table_columns(table)
}
