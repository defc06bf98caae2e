//! # sqlschema
//!
//! Relational schema engine: models a database schema as data, synthesizes
//! dialect-specific DDL, reverse-engineers a schema from live catalog
//! metadata, checks whether one schema can safely absorb data from another,
//! and copies table data between two databases of possibly different
//! dialects.
//!
//! - **Schema model**: [`Schema`]/[`Table`]/[`Column`]/[`Index`]/
//!   [`ForeignKey`] with a closed [`DbType`] type system
//! - **Topological ordering** of tables along their foreign keys, with
//!   mandatory cycle detection
//! - **DDL synthesis** in three phases (tables, indexes, constraints) for
//!   any injected [`SqlDialect`]
//! - **Introspection** from JDBC-layout catalog metadata
//! - **Compatibility checking** between a reference and a candidate schema
//! - **Reset/recreate** with savepoint-isolated, failure-tolerant drops
//! - **Cross-dialect table copy**, streaming and batched
//!
//! All components are synchronous and hold no global state; concurrency and
//! connection management belong to the caller, which injects the
//! [`SqlDialect`], [`Connection`], [`CatalogMetadata`] and [`ConnectionPool`]
//! collaborators.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sqlschema::{compatibility_violations, extract_schema, recreate_tables_with_pool};
//!
//! let expected = build_application_schema();
//! recreate_tables_with_pool(&pool, &expected)?;
//! let actual = extract_schema(&pool)?;
//! assert!(compatibility_violations(&expected, &actual, true).is_empty());
//! ```

pub mod compat;
pub mod copy;
pub mod core;
pub mod ddl;
pub mod dialect;
pub mod error;
pub mod extract;
pub mod order;
pub mod reset;

// Re-exports for convenient access
pub use crate::compat::{check_compatible, compatibility_violations, Violation, ViolationSink};
pub use crate::copy::{copy_tables, TableCopy, DEFAULT_CHUNK_SIZE};
pub use crate::core::{
    mangle_db_name, CatalogMetadata, Column, Connection, ConnectionPool, DbType, ForeignKey,
    Index, IndexKind, PreparedStatement, ReferentialAction, Row, RowCursor, Savepoint, Schema,
    SchemaPart, SqlDialect, SqlValue, Table,
};
pub use crate::ddl::{to_sql, DdlBuilder};
pub use crate::dialect::AnsiDialect;
pub use crate::error::{Result, SchemaError};
pub use crate::extract::{extract_schema, extract_table, SchemaExtraction};
pub use crate::order::{sort_tables, topsort, topsort_tolerant};
pub use crate::reset::{
    create, create_tables, create_tables_with_pool, drop_tables, exists, recreate_tables,
    recreate_tables_with_pool, reset_table_with_pool, reset_tables, reset_tables_with_pool,
    try_reset_table,
};
