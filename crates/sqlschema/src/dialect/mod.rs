//! Concrete dialect implementations.
//!
//! [`AnsiDialect`] is the plain instantiation of the [`SqlDialect`] defaults:
//! unquoted identifiers, ANSI type spellings, no storage options, native
//! savepoints delegated to the connection. Product dialects start from the
//! same defaults and override what differs.

use crate::core::traits::SqlDialect;

/// Plain ANSI SQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsiDialect;

impl AnsiDialect {
    /// Create a new ANSI dialect.
    pub fn new() -> Self {
        Self
    }
}

impl SqlDialect for AnsiDialect {
    fn name(&self) -> &str {
        "ansi"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{Column, ReferentialAction};
    use crate::core::types::{sql_types, DbType};

    #[test]
    fn test_identifier_references_unquoted() {
        let dialect = AnsiDialect::new();
        assert_eq!(dialect.table_ref("ORDERS"), "ORDERS");
        assert_eq!(dialect.column_ref("ID"), "ID");
        assert_eq!(dialect.qualified_name(Some("APP"), "ORDERS"), "APP.ORDERS");
        assert_eq!(dialect.qualified_name(None, "ORDERS"), "ORDERS");
    }

    #[test]
    fn test_type_rendering() {
        let dialect = AnsiDialect::new();

        let mut out = String::new();
        dialect.append_db_type(&mut out, &Column::new("name", DbType::String).with_size(100));
        assert_eq!(out, "VARCHAR(100)");

        let mut out = String::new();
        dialect.append_db_type(
            &mut out,
            &Column::new("amount", DbType::Decimal)
                .with_size(10)
                .with_precision(2)
                .mandatory(),
        );
        assert_eq!(out, "DECIMAL(10, 2) NOT NULL");

        let mut out = String::new();
        dialect.append_db_type(&mut out, &Column::new("id", DbType::Long).mandatory());
        assert_eq!(out, "BIGINT NOT NULL");
    }

    #[test]
    fn test_ddl_helper_statements() {
        let dialect = AnsiDialect::new();
        assert_eq!(
            dialect.truncate_table_statement("ORDERS"),
            "TRUNCATE TABLE ORDERS"
        );
        assert_eq!(dialect.drop_table_statement("ORDERS"), "DROP TABLE ORDERS");
        assert_eq!(
            dialect.drop_foreign_key_statement("ORDERS", "FK_CUSTOMER"),
            "ALTER TABLE ORDERS DROP CONSTRAINT FK_CUSTOMER"
        );
    }

    #[test]
    fn test_constraint_actions_skip_restrict() {
        let dialect = AnsiDialect::new();

        let mut out = String::new();
        dialect.append_constraint_actions(
            &mut out,
            ReferentialAction::Restrict,
            ReferentialAction::Restrict,
        );
        assert_eq!(out, "");

        let mut out = String::new();
        dialect.append_constraint_actions(
            &mut out,
            ReferentialAction::Cascade,
            ReferentialAction::Clear,
        );
        assert_eq!(out, " ON DELETE CASCADE ON UPDATE SET NULL");
    }

    #[test]
    fn test_analyze_sql_type() {
        let dialect = AnsiDialect::new();
        assert_eq!(
            dialect
                .analyze_sql_type(sql_types::VARCHAR, "varchar", 255, 0)
                .unwrap(),
            DbType::String
        );
        assert_eq!(
            dialect
                .analyze_sql_type(sql_types::NUMERIC, "numeric", 10, 2)
                .unwrap(),
            DbType::Decimal
        );
        assert!(dialect.analyze_sql_type(4242, "weird", 0, 0).is_err());
    }
}
