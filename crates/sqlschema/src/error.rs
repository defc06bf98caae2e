//! Error types for the schema engine.

use thiserror::Error;

/// Main error type for schema operations.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// A schema model invariant was violated while building the model
    /// (duplicate table/column name, unknown column reference, etc.)
    #[error("Model error: {0}")]
    Model(String),

    /// Schema extraction from catalog metadata failed structurally
    #[error("Schema extraction failed: {0}")]
    Extraction(String),

    /// The foreign-key graph contains a cycle; no table order exists
    #[error("Cyclic table dependencies: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    /// Appending synthesized DDL to the output sink failed
    #[error("Writing DDL output failed")]
    Ddl(#[from] std::fmt::Error),

    /// Database statement or cursor error
    #[error("Database error: {0}")]
    Sql(String),

    /// Data copy failed for a specific table
    #[error("Copy failed for table {table}: {message}")]
    Copy { table: String, message: String },

    /// Connection pool error
    #[error("Pool error: {0}")]
    Pool(String),
}

impl SchemaError {
    /// Create a Model error
    pub fn model(message: impl Into<String>) -> Self {
        SchemaError::Model(message.into())
    }

    /// Create an Extraction error
    pub fn extraction(message: impl Into<String>) -> Self {
        SchemaError::Extraction(message.into())
    }

    /// Create a Sql error
    pub fn sql(message: impl Into<String>) -> Self {
        SchemaError::Sql(message.into())
    }

    /// Create a Copy error
    pub fn copy(table: impl Into<String>, message: impl Into<String>) -> Self {
        SchemaError::Copy {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a Pool error
    pub fn pool(message: impl Into<String>) -> Self {
        SchemaError::Pool(message.into())
    }
}

/// Result type alias for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cyclic_dependency_message() {
        let err = SchemaError::CyclicDependency {
            cycle: vec!["A".to_string(), "B".to_string(), "A".to_string()],
        };
        assert_eq!(err.to_string(), "Cyclic table dependencies: A -> B -> A");
    }

    #[test]
    fn test_copy_message() {
        let err = SchemaError::copy("ORDERS", "connection lost");
        assert_eq!(
            err.to_string(),
            "Copy failed for table ORDERS: connection lost"
        );
    }
}
