//! The closed column type system.
//!
//! Every column in the schema model carries one of the [`DbType`] tags. The
//! tags are database-independent; a [`SqlDialect`](super::traits::SqlDialect)
//! renders each tag into the concrete SQL type of its product and analyzes
//! catalog metadata back into a tag.

use serde::{Deserialize, Serialize};

/// SQL type codes as reported by driver catalog metadata.
///
/// These are the standard JDBC `java.sql.Types` constants. Drivers feeding
/// [`CatalogMetadata`](super::traits::CatalogMetadata) report the `DATA_TYPE`
/// column of a column listing using these codes.
pub mod sql_types {
    pub const BIT: i32 = -7;
    pub const TINYINT: i32 = -6;
    pub const BIGINT: i32 = -5;
    pub const LONGVARBINARY: i32 = -4;
    pub const VARBINARY: i32 = -3;
    pub const BINARY: i32 = -2;
    pub const LONGVARCHAR: i32 = -1;
    pub const CHAR: i32 = 1;
    pub const NUMERIC: i32 = 2;
    pub const DECIMAL: i32 = 3;
    pub const INTEGER: i32 = 4;
    pub const SMALLINT: i32 = 5;
    pub const FLOAT: i32 = 6;
    pub const REAL: i32 = 7;
    pub const DOUBLE: i32 = 8;
    pub const VARCHAR: i32 = 12;
    pub const DATE: i32 = 91;
    pub const TIME: i32 = 92;
    pub const TIMESTAMP: i32 = 93;
    pub const BLOB: i32 = 2004;
    pub const CLOB: i32 = 2005;
    pub const BOOLEAN: i32 = 16;
    pub const NCHAR: i32 = -15;
    pub const NVARCHAR: i32 = -9;
    pub const LONGNVARCHAR: i32 = -16;
    pub const NCLOB: i32 = 2011;
}

/// Database-independent column type tag.
///
/// Whether a type declares a size, precision, or binary parameter is fixed
/// per tag, not per column instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DbType {
    /// Binary large object.
    Blob,
    /// Boolean value.
    Boolean,
    /// 8-bit signed integer.
    Byte,
    /// 16-bit signed integer.
    Short,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// Technical object identifier.
    Id,
    /// Fixed-length character string.
    Char,
    /// Variable-length character string.
    String,
    /// Character large object.
    Clob,
    /// Date without time component.
    Date,
    /// Time without date component.
    Time,
    /// Combined date and time.
    DateTime,
    /// Fixed-point decimal number.
    Decimal,
    /// 32-bit floating point number.
    Float,
    /// 64-bit floating point number.
    Double,
}

impl DbType {
    /// Whether columns of this type declare a size parameter.
    pub const fn has_size(self) -> bool {
        matches!(
            self,
            DbType::Char | DbType::String | DbType::Clob | DbType::Blob | DbType::Decimal
        )
    }

    /// Whether columns of this type declare a precision parameter.
    pub const fn has_precision(self) -> bool {
        matches!(self, DbType::Decimal)
    }

    /// Whether this type has a binary (collation-insensitive) variant.
    pub const fn has_binary_variant(self) -> bool {
        matches!(self, DbType::Char | DbType::String | DbType::Clob)
    }

    /// Default analysis of a driver-reported SQL type code.
    ///
    /// Maps a `java.sql.Types` code to the corresponding [`DbType`].
    /// Dialects with non-standard drivers refine this via
    /// [`SqlDialect::analyze_sql_type`](super::traits::SqlDialect::analyze_sql_type).
    pub fn from_sql_type(sql_type: i32, _scale: i32) -> Option<DbType> {
        use sql_types::*;
        let db_type = match sql_type {
            BIT | BOOLEAN => DbType::Boolean,
            TINYINT => DbType::Byte,
            SMALLINT => DbType::Short,
            INTEGER => DbType::Int,
            BIGINT => DbType::Long,
            CHAR | NCHAR => DbType::Char,
            VARCHAR | NVARCHAR | LONGVARCHAR | LONGNVARCHAR => DbType::String,
            CLOB | NCLOB => DbType::Clob,
            BLOB | BINARY | VARBINARY | LONGVARBINARY => DbType::Blob,
            DATE => DbType::Date,
            TIME => DbType::Time,
            TIMESTAMP => DbType::DateTime,
            NUMERIC | DECIMAL => DbType::Decimal,
            REAL => DbType::Float,
            FLOAT | DOUBLE => DbType::Double,
            _ => return None,
        };
        Some(db_type)
    }
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DbType::Blob => "BLOB",
            DbType::Boolean => "BOOLEAN",
            DbType::Byte => "BYTE",
            DbType::Short => "SHORT",
            DbType::Int => "INT",
            DbType::Long => "LONG",
            DbType::Id => "ID",
            DbType::Char => "CHAR",
            DbType::String => "STRING",
            DbType::Clob => "CLOB",
            DbType::Date => "DATE",
            DbType::Time => "TIME",
            DbType::DateTime => "DATETIME",
            DbType::Decimal => "DECIMAL",
            DbType::Float => "FLOAT",
            DbType::Double => "DOUBLE",
        };
        f.write_str(name)
    }
}
