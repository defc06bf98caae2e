//! Core model types and collaborator traits.

pub mod schema;
pub mod traits;
pub mod types;
pub mod value;

pub use schema::{
    mangle_db_name, Column, ForeignKey, Index, IndexKind, ReferentialAction, Schema, SchemaPart,
    Table,
};
pub use traits::{
    meta_layout, with_read_connection, with_write_connection, CatalogMetadata, Connection,
    ConnectionPool, PreparedStatement, Row, RowCursor, Savepoint, SqlDialect,
};
pub use types::{sql_types, DbType};
pub use value::SqlValue;
