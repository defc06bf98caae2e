//! Schema introspection from live catalog metadata.
//!
//! [`SchemaExtraction`] rebuilds a [`Schema`] from the listings of a
//! [`CatalogMetadata`] source, using the dialect's type analysis to map
//! driver-reported types back into the closed type system.
//!
//! Foreign keys are not reconstructed: extracted tables carry columns,
//! primary key and indexes only. This is a known limitation of the catalog
//! reconstruction, not an oversight; compatibility checking and data copy do
//! not depend on extracted constraints.

use std::sync::Arc;

use crate::core::schema::{Column, Index, IndexKind, Schema, Table};
use crate::core::traits::{
    meta_layout, with_read_connection, CatalogMetadata, ConnectionPool, SqlDialect,
};
use crate::error::{Result, SchemaError};

/// Reconstructs schema models from catalog metadata.
pub struct SchemaExtraction<'a> {
    metadata: &'a mut dyn CatalogMetadata,
    dialect: Arc<dyn SqlDialect>,
}

impl<'a> SchemaExtraction<'a> {
    /// Create an extraction reading from the given metadata source,
    /// interpreting types through the given dialect.
    pub fn new(metadata: &'a mut dyn CatalogMetadata, dialect: Arc<dyn SqlDialect>) -> Self {
        Self { metadata, dialect }
    }

    /// Extract all tables of the connected catalog into `schema`.
    pub fn add_tables(&mut self, schema: &mut Schema) -> Result<()> {
        let listing = self.list_tables("%")?;
        for (name, remark) in listing {
            self.add_table_internal(schema, &name, remark)?;
        }
        Ok(())
    }

    /// Extract the single table with the given name into `schema` and return
    /// it.
    pub fn add_table<'s>(&mut self, schema: &'s mut Schema, table_name: &str) -> Result<&'s Table> {
        let pattern = self.dialect.table_pattern(table_name);
        let listing = self.list_tables(&pattern)?;
        let remark = listing
            .into_iter()
            .find(|(name, _)| name == table_name)
            .and_then(|(_, remark)| remark);
        self.add_table_internal(schema, table_name, remark)?;
        match schema.table(table_name) {
            Some(table) => Ok(table),
            None => unreachable!("table was just added"),
        }
    }

    fn add_table_internal(
        &mut self,
        schema: &mut Schema,
        table_name: &str,
        remark: Option<String>,
    ) -> Result<()> {
        let columns = self.read_columns(table_name)?;
        let mut table = Table::new(table_name).with_comment(remark);
        for column in columns {
            table
                .add_column(column)
                .map_err(|err| SchemaError::extraction(err.to_string()))?;
        }

        if let Some(primary_key) = self.read_primary_key(table_name, &table)? {
            table
                .set_primary_key(primary_key)
                .map_err(|err| SchemaError::extraction(err.to_string()))?;
        }

        let pk_name = table.primary_key().map(|index| index.name.clone());
        for index in self.read_indexes(table_name, pk_name.as_deref(), &table)? {
            table
                .add_index(index)
                .map_err(|err| SchemaError::extraction(err.to_string()))?;
        }

        schema.add_table(table)
    }

    fn list_tables(&mut self, pattern: &str) -> Result<Vec<(String, Option<String>)>> {
        use meta_layout::tables::*;

        let mut listing = Vec::new();
        let mut cursor = self.metadata.tables(None, None, pattern)?;
        while cursor.advance()? {
            let name = cursor.get_string(TABLE_NAME)?.ok_or_else(|| {
                SchemaError::extraction("Table listing row without a table name.")
            })?;
            let remark = cursor.get_string(REMARKS)?.filter(|r| !r.is_empty());
            listing.push((name, remark));
        }
        Ok(listing)
    }

    fn read_columns(&mut self, table_name: &str) -> Result<Vec<Column>> {
        use meta_layout::columns::*;

        let mut columns = Vec::new();
        let mut cursor = self.metadata.columns(None, None, table_name, "%")?;
        while cursor.advance()? {
            let name = cursor.get_string(COLUMN_NAME)?.ok_or_else(|| {
                SchemaError::extraction(format!(
                    "Column listing row of table '{}' without a column name.",
                    table_name
                ))
            })?;
            let sql_type = cursor.get_i32(DATA_TYPE)?;
            let type_name = cursor.get_string(TYPE_NAME)?.unwrap_or_default();
            let size = cursor.get_i64(COLUMN_SIZE)?;
            let scale = cursor.get_i32(DECIMAL_DIGITS)?;
            let nullable = cursor.get_i32(NULLABLE)?;
            let remark = cursor.get_string(REMARKS)?.filter(|r| !r.is_empty());
            let octet_size = cursor.get_i64(CHAR_OCTET_LENGTH)?;

            let ty = self
                .dialect
                .analyze_sql_type(sql_type, &type_name, size, scale)?;
            let binary = ty.has_binary_variant()
                && self
                    .dialect
                    .analyze_sql_type_binary(sql_type, &type_name, size, octet_size);

            let mut column = Column::new(name, ty);
            if ty.has_size() {
                column.size = size.max(0) as u64;
            }
            if ty.has_precision() {
                column.precision = scale.max(0) as u32;
            }
            column.mandatory = nullable == meta_layout::COLUMN_NO_NULLS;
            column.binary = binary;
            column.comment = remark;
            columns.push(column);
        }

        if columns.is_empty() {
            return Err(SchemaError::extraction(format!(
                "Table '{}' has no columns.",
                table_name
            )));
        }
        Ok(columns)
    }

    fn read_primary_key(&mut self, table_name: &str, table: &Table) -> Result<Option<Index>> {
        use meta_layout::primary_keys::*;

        let mut slots: Vec<Option<String>> = Vec::new();
        let mut pk_name: Option<String> = None;
        let mut cursor = self.metadata.primary_keys(None, None, table_name)?;
        while cursor.advance()? {
            let column = cursor.get_string(COLUMN_NAME)?.ok_or_else(|| {
                SchemaError::extraction(format!(
                    "Primary key row of table '{}' without a column name.",
                    table_name
                ))
            })?;
            let sequence = cursor.get_i32(KEY_SEQ)?;
            if sequence < 1 {
                return Err(SchemaError::extraction(format!(
                    "Invalid key sequence {} in primary key of table '{}'.",
                    sequence, table_name
                )));
            }
            if pk_name.is_none() {
                pk_name = cursor.get_string(PK_NAME)?;
            }

            let position = sequence as usize - 1;
            if position >= slots.len() {
                slots.resize(position + 1, None);
            }
            if slots[position].is_some() {
                return Err(SchemaError::extraction(format!(
                    "Duplicate key sequence {} in primary key of table '{}'.",
                    sequence, table_name
                )));
            }
            slots[position] = Some(column);
        }
        drop(cursor);

        if slots.is_empty() {
            return Ok(None);
        }

        let mut columns = Vec::with_capacity(slots.len());
        for (position, slot) in slots.into_iter().enumerate() {
            let column = slot.ok_or_else(|| {
                SchemaError::extraction(format!(
                    "Missing key sequence {} in primary key of table '{}'.",
                    position + 1,
                    table_name
                ))
            })?;
            if table.column(&column).is_none() {
                return Err(SchemaError::extraction(format!(
                    "Primary key column '{}' of table '{}' does not exist.",
                    column, table_name
                )));
            }
            columns.push(column);
        }

        let name = pk_name.unwrap_or_else(|| format!("PK_{}", table_name));
        Ok(Some(Index::new(name, IndexKind::Primary, columns)))
    }

    fn read_indexes(
        &mut self,
        table_name: &str,
        pk_name: Option<&str>,
        table: &Table,
    ) -> Result<Vec<Index>> {
        use meta_layout::index_info::*;

        let mut indexes = Vec::new();
        let mut current: Option<Index> = None;
        let mut cursor = self
            .metadata
            .index_info(None, None, table_name, false, false)?;
        while cursor.advance()? {
            let index_type = cursor.get_i32(TYPE)?;
            if index_type == meta_layout::TABLE_INDEX_STATISTIC {
                // Statistics pseudo-rows describe the table, not an index.
                continue;
            }
            let Some(name) = cursor.get_string(INDEX_NAME)? else {
                continue;
            };
            if pk_name == Some(name.as_str()) {
                // The primary key index is already part of the table definition.
                continue;
            }

            let non_unique = cursor.get_bool(NON_UNIQUE)?;
            let column = cursor.get_string(COLUMN_NAME)?.ok_or_else(|| {
                SchemaError::extraction(format!(
                    "Index '{}' of table '{}' has a row without a column name.",
                    name, table_name
                ))
            })?;
            if table.column(&column).is_none() {
                return Err(SchemaError::extraction(format!(
                    "Column '{}' referenced by index '{}' of table '{}' does not exist.",
                    column, name, table_name
                )));
            }

            match current.as_mut() {
                Some(index) if index.name == name => index.columns.push(column),
                _ => {
                    if let Some(done) = current.take() {
                        indexes.push(done);
                    }
                    let kind = if non_unique {
                        IndexKind::Default
                    } else {
                        IndexKind::Unique
                    };
                    current = Some(Index::new(name, kind, vec![column]));
                }
            }
        }
        if let Some(done) = current.take() {
            indexes.push(done);
        }
        Ok(indexes)
    }
}

/// Extract the full schema of the given database.
pub fn extract_schema(pool: &dyn ConnectionPool) -> Result<Schema> {
    with_read_connection(pool, |connection| {
        let dialect = connection.dialect();
        let mut metadata = connection.metadata()?;
        let mut extraction = SchemaExtraction::new(metadata.as_mut(), dialect);
        let mut schema = Schema::new();
        extraction.add_tables(&mut schema)?;
        Ok(schema)
    })
}

/// Extract the schema of a single table from the given database.
///
/// Returns a schema containing only the extracted table.
pub fn extract_table(pool: &dyn ConnectionPool, table_name: &str) -> Result<Schema> {
    with_read_connection(pool, |connection| {
        let dialect = connection.dialect();
        let mut metadata = connection.metadata()?;
        let mut extraction = SchemaExtraction::new(metadata.as_mut(), dialect);
        let mut schema = Schema::new();
        extraction.add_table(&mut schema, table_name)?;
        Ok(schema)
    })
}
