//! Streaming table data copy between two databases.
//!
//! [`TableCopy`] moves rows between two dialect-bound connections: a
//! forward-only cursor on the source feeds a batched prepared insert on the
//! target, one chunk at a time. The whole table is never buffered. Values
//! cross the dialect boundary as neutral [`SqlValue`](crate::core::SqlValue)
//! instances, read through the source dialect and bound through the target
//! dialect.
//!
//! [`copy_tables`] is the full pipeline: extract the named tables from the
//! source, create them on the target, copy the contents, commit once.

use std::sync::Arc;

use tracing::{debug, info};

use crate::core::schema::{Schema, Table};
use crate::core::traits::{
    with_read_connection, with_write_connection, Connection, ConnectionPool, SqlDialect,
};
use crate::core::types::DbType;
use crate::ddl::DdlBuilder;
use crate::error::{Result, SchemaError};
use crate::extract::SchemaExtraction;

/// Default number of rows fetched and inserted per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Copies table contents from a source to a target connection.
pub struct TableCopy<'a> {
    source_dialect: Arc<dyn SqlDialect>,
    source: &'a mut dyn Connection,
    target_dialect: Arc<dyn SqlDialect>,
    target: &'a mut dyn Connection,
    chunk_size: usize,
}

impl<'a> TableCopy<'a> {
    /// Create a copy routine over the given connections.
    ///
    /// `chunk_size` is used both as the source cursor's fetch size and as
    /// the insert batch size.
    pub fn new(
        source_dialect: Arc<dyn SqlDialect>,
        source: &'a mut dyn Connection,
        target_dialect: Arc<dyn SqlDialect>,
        target: &'a mut dyn Connection,
        chunk_size: usize,
    ) -> Self {
        Self {
            source_dialect,
            source,
            target_dialect,
            target,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Copy all rows of the given table, returning the number of rows
    /// copied.
    ///
    /// Does not commit; the caller commits the target connection.
    pub fn copy_table(&mut self, table: &Table) -> Result<u64> {
        let columns = table.columns();
        if columns.is_empty() {
            return Err(SchemaError::copy(&table.name, "table has no columns"));
        }
        let types: Vec<DbType> = columns.iter().map(|column| column.ty).collect();

        let select = {
            let column_list = columns
                .iter()
                .map(|column| self.source_dialect.column_ref(&column.db_name))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "SELECT {} FROM {}",
                column_list,
                self.source_dialect.table_ref(&table.db_name)
            )
        };
        let insert = {
            let column_list = columns
                .iter()
                .map(|column| self.target_dialect.column_ref(&column.db_name))
                .collect::<Vec<_>>()
                .join(", ");
            let parameters = vec!["?"; columns.len()].join(", ");
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.target_dialect.table_ref(&table.db_name),
                column_list,
                parameters
            )
        };

        debug!(table = %table.name, "copying table contents");

        let mut cursor = self.source.query(&select, self.chunk_size)?;
        let mut statement = self.target.prepare(&insert)?;

        let mut rows_copied = 0u64;
        let mut pending = 0usize;
        while cursor.advance()? {
            for (position, ty) in types.iter().enumerate() {
                let value = self
                    .source_dialect
                    .read_value(cursor.as_ref(), position + 1, *ty)?;
                self.target_dialect
                    .bind_value(statement.as_mut(), position + 1, &value, *ty)?;
            }
            statement.add_batch()?;
            pending += 1;
            if pending == self.chunk_size {
                rows_copied += statement.execute_batch()?;
                pending = 0;
            }
        }
        if pending > 0 {
            rows_copied += statement.execute_batch()?;
        }

        debug!(table = %table.name, rows = rows_copied, "finished copying table contents");
        Ok(rows_copied)
    }
}

/// Copy the given tables from the source database to the target database.
///
/// The tables are introspected on the source, created on the target in the
/// target dialect, and their contents copied in chunks of `chunk_size` rows.
/// The target database must not already contain tables with the given names.
/// Commits the target connection once after all tables are copied; both
/// connections are released on every exit path.
///
/// Returns the total number of rows copied.
pub fn copy_tables(
    source_pool: &dyn ConnectionPool,
    target_pool: &dyn ConnectionPool,
    table_names: &[&str],
    chunk_size: usize,
) -> Result<u64> {
    if table_names.is_empty() {
        info!("No tables to copy");
        return Ok(0);
    }

    with_read_connection(source_pool, |read| {
        with_write_connection(target_pool, |write| {
            let source_dialect = read.dialect();
            let target_dialect = write.dialect();

            info!(tables = ?table_names, "copying tables");

            let mut schema = Schema::new();
            {
                let mut metadata = read.metadata()?;
                let mut extraction =
                    SchemaExtraction::new(metadata.as_mut(), source_dialect.clone());
                for name in table_names {
                    debug!(table = name, "analyzing table");
                    extraction.add_table(&mut schema, name)?;
                }
                // metadata and extraction drop here, freeing the read
                // connection for the row cursors below
            }

            debug!("creating target tables");
            let statements =
                DdlBuilder::new(target_dialect.as_ref()).create_statements(schema.part());
            for statement in &statements {
                write.execute(statement)?;
            }

            let mut total_rows = 0u64;
            {
                let mut copy = TableCopy::new(
                    source_dialect,
                    &mut *read,
                    target_dialect,
                    &mut *write,
                    chunk_size,
                );
                for name in table_names {
                    let table = schema.table(name).ok_or_else(|| {
                        SchemaError::extraction(format!("Table '{}' was not extracted.", name))
                    })?;
                    let rows = copy
                        .copy_table(table)
                        .map_err(|err| SchemaError::copy(*name, err.to_string()))?;
                    info!(table = name, rows, "copied table contents");
                    total_rows += rows;
                }
            }

            write.commit()?;
            Ok(total_rows)
        })
    })
}
