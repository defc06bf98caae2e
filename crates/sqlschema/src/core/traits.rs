//! Collaborator seams consumed by the schema engine.
//!
//! This module defines the abstractions through which the engine talks to a
//! concrete database product:
//!
//! - [`SqlDialect`]: SQL syntax strategy (quoting, type rendering, value
//!   marshalling, savepoints)
//! - [`Connection`]: JDBC-like statement/cursor access to one database
//!   connection
//! - [`CatalogMetadata`]: catalog listings with fixed positional row layouts
//! - [`ConnectionPool`]: borrow/release of read and write connections
//!
//! The engine never hard-codes a product; callers inject implementations of
//! these traits. [`SqlDialect`] default methods provide ANSI behaviour so a
//! product dialect only overrides what differs.

use std::sync::Arc;

use crate::error::{Result, SchemaError};

use super::schema::{Column, Index, ReferentialAction};
use super::types::DbType;
use super::value::SqlValue;

/// Positional layouts of the catalog metadata row sets, 1-based.
///
/// These mirror the standard JDBC `DatabaseMetaData` result-set layouts and
/// must be preserved bit-for-bit by [`CatalogMetadata`] implementations for
/// drop-in compatibility with driver-provided metadata.
pub mod meta_layout {
    /// Layout of the table listing.
    pub mod tables {
        pub const TABLE_NAME: usize = 3;
        pub const REMARKS: usize = 5;
    }

    /// Layout of the column listing.
    pub mod columns {
        pub const COLUMN_NAME: usize = 4;
        pub const DATA_TYPE: usize = 5;
        pub const TYPE_NAME: usize = 6;
        pub const COLUMN_SIZE: usize = 7;
        pub const DECIMAL_DIGITS: usize = 9;
        pub const NULLABLE: usize = 11;
        pub const REMARKS: usize = 12;
        pub const CHAR_OCTET_LENGTH: usize = 16;
    }

    /// Layout of the primary key listing.
    pub mod primary_keys {
        pub const COLUMN_NAME: usize = 4;
        pub const KEY_SEQ: usize = 5;
        pub const PK_NAME: usize = 6;
    }

    /// Layout of the index info listing.
    pub mod index_info {
        pub const NON_UNIQUE: usize = 4;
        pub const INDEX_NAME: usize = 6;
        pub const TYPE: usize = 7;
        pub const COLUMN_NAME: usize = 9;
    }

    /// `NULLABLE` value for columns that cannot store NULL.
    pub const COLUMN_NO_NULLS: i32 = 0;

    /// Index `TYPE` value for table statistics pseudo-rows.
    pub const TABLE_INDEX_STATISTIC: i32 = 0;
}

/// Handle for an intra-transaction rollback point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Savepoint(pub u64);

/// SQL syntax strategy for a database product.
///
/// Default method bodies implement plain ANSI SQL, the way a generic driver
/// would accept it; product dialects override the pieces that differ
/// (identifier quoting, type spellings, option suffixes, savepoint support).
pub trait SqlDialect: Send + Sync {
    /// The dialect identifier (e.g. "ansi", "mysql", "oracle").
    fn name(&self) -> &str;

    /// A quoted table name reference for the table with the given name.
    fn table_ref(&self, name: &str) -> String {
        name.to_string()
    }

    /// A quoted column name reference for the column with the given name.
    fn column_ref(&self, name: &str) -> String {
        name.to_string()
    }

    /// A qualified reference, prefixed with the schema name if one is given.
    fn qualified_name(&self, schema: Option<&str>, name: &str) -> String {
        match schema {
            Some(prefix) => format!("{}.{}", self.table_ref(prefix), self.table_ref(name)),
            None => self.table_ref(name),
        }
    }

    /// Separator appended after each synthesized DDL statement.
    fn statement_separator(&self) -> &str {
        ";\n"
    }

    /// Pattern matching exactly the table with the given name in catalog
    /// listings.
    fn table_pattern(&self, table_name: &str) -> String {
        table_name.to_string()
    }

    /// Append the product-specific type declaration for the given column,
    /// including size/precision/binary parameters for types that declare
    /// them, and the NOT NULL modifier for mandatory columns.
    fn append_db_type(&self, out: &mut String, column: &Column) {
        match column.ty {
            DbType::Boolean => out.push_str("BOOLEAN"),
            DbType::Byte => out.push_str("TINYINT"),
            DbType::Short => out.push_str("SMALLINT"),
            DbType::Int => out.push_str("INTEGER"),
            DbType::Long => out.push_str("BIGINT"),
            DbType::Id => out.push_str("BIGINT"),
            DbType::Char => {
                out.push_str("CHAR(");
                out.push_str(&column.size.to_string());
                out.push(')');
            }
            DbType::String => {
                out.push_str("VARCHAR(");
                out.push_str(&column.size.to_string());
                out.push(')');
            }
            DbType::Clob => out.push_str("CLOB"),
            DbType::Blob => out.push_str("BLOB"),
            DbType::Date => out.push_str("DATE"),
            DbType::Time => out.push_str("TIME"),
            DbType::DateTime => out.push_str("TIMESTAMP"),
            DbType::Decimal => {
                out.push_str("DECIMAL(");
                out.push_str(&column.size.to_string());
                out.push_str(", ");
                out.push_str(&column.precision.to_string());
                out.push(')');
            }
            DbType::Float => out.push_str("FLOAT"),
            DbType::Double => out.push_str("DOUBLE PRECISION"),
        }
        if column.mandatory {
            out.push_str(" NOT NULL");
        }
    }

    /// Append storage options after the closing parenthesis of a
    /// `CREATE TABLE` statement. ANSI has none.
    fn append_table_options(&self, _out: &mut String, _pk_storage: bool, _compress: u32) {}

    /// Append a rendered comment for a table or column. ANSI has none.
    fn append_comment(&self, _out: &mut String, _comment: &str) {}

    /// Append storage/compression options to a `CREATE INDEX` statement.
    /// ANSI has none.
    fn append_index_options(&self, _out: &mut String, _index: &Index) {}

    /// The SQL keyword for a referential action.
    fn referential_action_sql(&self, action: ReferentialAction) -> &'static str {
        match action {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::Clear => "SET NULL",
            ReferentialAction::Restrict => "RESTRICT",
        }
    }

    /// Append the ON DELETE / ON UPDATE clauses of a foreign key constraint.
    ///
    /// The default renders a clause only for non-RESTRICT actions, RESTRICT
    /// being the implicit behaviour everywhere.
    fn append_constraint_actions(
        &self,
        out: &mut String,
        on_delete: ReferentialAction,
        on_update: ReferentialAction,
    ) {
        if on_delete != ReferentialAction::Restrict {
            out.push_str(" ON DELETE ");
            out.push_str(self.referential_action_sql(on_delete));
        }
        if on_update != ReferentialAction::Restrict {
            out.push_str(" ON UPDATE ");
            out.push_str(self.referential_action_sql(on_update));
        }
    }

    /// The statement emptying the given table.
    fn truncate_table_statement(&self, table_ref: &str) -> String {
        format!("TRUNCATE TABLE {}", table_ref)
    }

    /// The statement dropping the given table.
    fn drop_table_statement(&self, table_ref: &str) -> String {
        format!("DROP TABLE {}", table_ref)
    }

    /// The statement dropping a foreign key constraint from a table.
    fn drop_foreign_key_statement(&self, table_ref: &str, constraint_ref: &str) -> String {
        format!("ALTER TABLE {} DROP CONSTRAINT {}", table_ref, constraint_ref)
    }

    /// Analyze the type description reported by a column listing.
    ///
    /// Maps the driver's (type code, type name, size, scale) tuple to the
    /// database-independent [`DbType`].
    fn analyze_sql_type(
        &self,
        sql_type: i32,
        type_name: &str,
        _size: i64,
        scale: i32,
    ) -> Result<DbType> {
        DbType::from_sql_type(sql_type, scale).ok_or_else(|| {
            SchemaError::extraction(format!(
                "Unsupported SQL type code {} ('{}').",
                sql_type, type_name
            ))
        })
    }

    /// Whether the reported column was created with the binary modifier.
    fn analyze_sql_type_binary(
        &self,
        _sql_type: i32,
        _type_name: &str,
        _size: i64,
        _octet_size: i64,
    ) -> bool {
        false
    }

    /// Read one column of the cursor's current row into a neutral value.
    fn read_value(&self, row: &dyn RowCursor, column: usize, ty: DbType) -> Result<SqlValue> {
        row.get_value(column, ty)
    }

    /// Bind a neutral value to one positional parameter of a prepared
    /// statement.
    fn bind_value(
        &self,
        statement: &mut dyn PreparedStatement,
        column: usize,
        value: &SqlValue,
        ty: DbType,
    ) -> Result<()> {
        statement.set_value(column, value, ty)
    }

    /// Acquire a savepoint on the given connection.
    ///
    /// Returns `None` on products without savepoint support; the rollback and
    /// release hooks then do nothing.
    fn set_savepoint(&self, connection: &mut dyn Connection) -> Result<Option<Savepoint>> {
        connection.set_savepoint().map(Some)
    }

    /// Roll the connection back to the given savepoint.
    fn rollback_to_savepoint(
        &self,
        connection: &mut dyn Connection,
        savepoint: Option<Savepoint>,
    ) -> Result<()> {
        match savepoint {
            Some(savepoint) => connection.rollback_to_savepoint(savepoint),
            None => Ok(()),
        }
    }

    /// Release the given savepoint, keeping the outer transaction usable.
    fn release_savepoint(
        &self,
        connection: &mut dyn Connection,
        savepoint: Option<Savepoint>,
    ) -> Result<()> {
        match savepoint {
            Some(savepoint) => connection.release_savepoint(savepoint),
            None => Ok(()),
        }
    }
}

/// Positional access to the current row of a cursor, 1-based like the
/// catalog layouts in [`meta_layout`].
pub trait Row {
    /// Read a string column; `None` for NULL.
    fn get_string(&self, column: usize) -> Result<Option<String>>;

    /// Read an integer column; `0` for NULL.
    fn get_i32(&self, column: usize) -> Result<i32>;

    /// Read a long column; `0` for NULL.
    fn get_i64(&self, column: usize) -> Result<i64>;

    /// Read a boolean column; `false` for NULL.
    fn get_bool(&self, column: usize) -> Result<bool>;

    /// Read a column as a neutral [`SqlValue`] of the given type.
    fn get_value(&self, column: usize, ty: DbType) -> Result<SqlValue>;
}

/// A forward-only, read-only result cursor.
pub trait RowCursor: Row {
    /// Advance to the next row. Returns `false` when the result set is
    /// exhausted.
    fn advance(&mut self) -> Result<bool>;
}

/// A prepared statement with positional parameters and batch execution.
pub trait PreparedStatement {
    /// Bind a value to the 1-based parameter position.
    fn set_value(&mut self, column: usize, value: &SqlValue, ty: DbType) -> Result<()>;

    /// Append the currently bound parameter row to the batch.
    fn add_batch(&mut self) -> Result<()>;

    /// Execute the accumulated batch, returning the number of affected rows.
    fn execute_batch(&mut self) -> Result<u64>;
}

/// Catalog metadata listings of one database, with the positional row
/// layouts documented in [`meta_layout`].
pub trait CatalogMetadata {
    /// List tables matching the given catalog/schema/table patterns.
    fn tables<'c>(
        &'c mut self,
        catalog: Option<&str>,
        schema_pattern: Option<&str>,
        table_pattern: &str,
    ) -> Result<Box<dyn RowCursor + 'c>>;

    /// List columns of the matching tables, in driver-reported order.
    fn columns<'c>(
        &'c mut self,
        catalog: Option<&str>,
        schema_pattern: Option<&str>,
        table_pattern: &str,
        column_pattern: &str,
    ) -> Result<Box<dyn RowCursor + 'c>>;

    /// List primary key columns of the given table.
    fn primary_keys<'c>(
        &'c mut self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: &str,
    ) -> Result<Box<dyn RowCursor + 'c>>;

    /// List index information for the given table.
    fn index_info<'c>(
        &'c mut self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: &str,
        unique_only: bool,
        approximate: bool,
    ) -> Result<Box<dyn RowCursor + 'c>>;
}

/// One borrowed database connection.
pub trait Connection {
    /// The SQL dialect of the underlying database.
    fn dialect(&self) -> Arc<dyn SqlDialect>;

    /// Execute a statement, returning the number of affected rows.
    fn execute(&mut self, sql: &str) -> Result<u64>;

    /// Open a forward-only, read-only cursor over the given query with the
    /// given fetch size.
    fn query<'c>(&'c mut self, sql: &str, fetch_size: usize) -> Result<Box<dyn RowCursor + 'c>>;

    /// Prepare a statement with positional parameters.
    fn prepare<'c>(&'c mut self, sql: &str) -> Result<Box<dyn PreparedStatement + 'c>>;

    /// Commit the current transaction.
    fn commit(&mut self) -> Result<()>;

    /// Set a native savepoint. Prefer going through
    /// [`SqlDialect::set_savepoint`], which knows whether the product
    /// supports savepoints at all.
    fn set_savepoint(&mut self) -> Result<Savepoint>;

    /// Roll back to a native savepoint.
    fn rollback_to_savepoint(&mut self, savepoint: Savepoint) -> Result<()>;

    /// Release a native savepoint.
    fn release_savepoint(&mut self, savepoint: Savepoint) -> Result<()>;

    /// Access the catalog metadata of the connected database.
    fn metadata<'c>(&'c mut self) -> Result<Box<dyn CatalogMetadata + 'c>>;
}

/// Borrow/release of database connections.
///
/// Use [`with_read_connection`]/[`with_write_connection`] rather than calling
/// borrow and release directly; the helpers release on every exit path.
pub trait ConnectionPool {
    /// The SQL dialect of the pooled database.
    fn dialect(&self) -> Arc<dyn SqlDialect>;

    /// Borrow a connection for reading.
    fn borrow_read_connection(&self) -> Result<Box<dyn Connection + '_>>;

    /// Borrow a connection for writing.
    fn borrow_write_connection(&self) -> Result<Box<dyn Connection + '_>>;

    /// Return a read connection to the pool.
    fn release_read_connection(&self, connection: Box<dyn Connection + '_>);

    /// Return a write connection to the pool.
    fn release_write_connection(&self, connection: Box<dyn Connection + '_>);
}

struct ConnectionGuard<'p> {
    pool: &'p dyn ConnectionPool,
    connection: Option<Box<dyn Connection + 'p>>,
    write: bool,
}

impl<'p> ConnectionGuard<'p> {
    fn connection(&mut self) -> &mut dyn Connection {
        match self.connection.as_mut() {
            Some(connection) => connection.as_mut(),
            None => unreachable!("connection already released"),
        }
    }
}

impl Drop for ConnectionGuard<'_> {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            if self.write {
                self.pool.release_write_connection(connection);
            } else {
                self.pool.release_read_connection(connection);
            }
        }
    }
}

/// Run `body` with a borrowed read connection, releasing it on every exit
/// path including panics.
pub fn with_read_connection<R>(
    pool: &dyn ConnectionPool,
    body: impl FnOnce(&mut dyn Connection) -> Result<R>,
) -> Result<R> {
    let connection = pool.borrow_read_connection()?;
    let mut guard = ConnectionGuard {
        pool,
        connection: Some(connection),
        write: false,
    };
    body(guard.connection())
}

/// Run `body` with a borrowed write connection, releasing it on every exit
/// path including panics.
pub fn with_write_connection<R>(
    pool: &dyn ConnectionPool,
    body: impl FnOnce(&mut dyn Connection) -> Result<R>,
) -> Result<R> {
    let connection = pool.borrow_write_connection()?;
    let mut guard = ConnectionGuard {
        pool,
        connection: Some(connection),
        write: true,
    };
    body(guard.connection())
}
