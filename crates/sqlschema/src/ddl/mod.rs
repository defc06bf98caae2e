//! DDL synthesis from the schema model.
//!
//! [`DdlBuilder`] turns a [`SchemaPart`] (a whole schema or any sub-tree)
//! into create statements for a target dialect. Emission is phased: first
//! all `CREATE TABLE` statements, then all `CREATE INDEX` statements, then
//! all `ALTER TABLE ... ADD CONSTRAINT` statements, so that index and
//! constraint references always resolve against already-declared tables no
//! matter how tables reference each other.

use std::fmt;

use crate::core::schema::{Column, ForeignKey, Index, IndexKind, Schema, SchemaPart, Table};
use crate::core::traits::SqlDialect;
use crate::error::Result;

/// Phased DDL generator for one target dialect.
pub struct DdlBuilder<'a> {
    dialect: &'a dyn SqlDialect,
}

impl<'a> DdlBuilder<'a> {
    /// Create a builder for the given dialect.
    pub fn new(dialect: &'a dyn SqlDialect) -> Self {
        Self { dialect }
    }

    /// Append the DDL for the given schema part to `out`, each statement
    /// terminated by the dialect's statement separator.
    ///
    /// A [`SchemaPart::Column`] appends the bare column specification
    /// (usable in `ALTER TABLE ... ADD` style callers) without a separator.
    ///
    /// A failed append surfaces as the single DDL sink failure kind of
    /// [`SchemaError`](crate::error::SchemaError); the sink contents are
    /// undefined in that case and must not be reused.
    pub fn create_sql(&self, part: SchemaPart<'_>, out: &mut dyn fmt::Write) -> Result<()> {
        if let SchemaPart::Column { column, .. } = part {
            out.write_str(&self.column_spec(column))?;
            return Ok(());
        }
        for statement in self.create_statements(part) {
            out.write_str(&statement)?;
            out.write_str(self.dialect.statement_separator())?;
        }
        Ok(())
    }

    /// The individual DDL statements for the given schema part, in execution
    /// order (tables, then indexes, then constraints).
    pub fn create_statements(&self, part: SchemaPart<'_>) -> Vec<String> {
        let mut statements = Vec::new();
        self.emit_tables(&mut statements, part);
        self.emit_indexes(&mut statements, part);
        self.emit_constraints(&mut statements, part);
        statements
    }

    fn emit_tables(&self, statements: &mut Vec<String>, part: SchemaPart<'_>) {
        match part {
            SchemaPart::Schema(schema) => {
                for table in schema.tables() {
                    statements.push(self.table_statement(schema.name(), table));
                }
            }
            SchemaPart::Table { schema, table } => {
                statements.push(self.table_statement(schema, table));
            }
            _ => {}
        }
    }

    fn emit_indexes(&self, statements: &mut Vec<String>, part: SchemaPart<'_>) {
        match part {
            SchemaPart::Schema(schema) => {
                for table in schema.tables() {
                    for index in table.indexes() {
                        statements.push(self.index_statement(schema.name(), table, index));
                    }
                }
            }
            SchemaPart::Table { schema, table } => {
                for index in table.indexes() {
                    statements.push(self.index_statement(schema, table, index));
                }
            }
            SchemaPart::Index {
                schema,
                table,
                index,
            } if index.kind != IndexKind::Primary => {
                statements.push(self.index_statement(schema, table, index));
            }
            _ => {}
        }
    }

    fn emit_constraints(&self, statements: &mut Vec<String>, part: SchemaPart<'_>) {
        match part {
            SchemaPart::Schema(schema) => {
                for table in schema.tables() {
                    for foreign_key in table.foreign_keys() {
                        statements.push(self.foreign_key_statement(
                            schema.name(),
                            Some(schema),
                            table,
                            foreign_key,
                        ));
                    }
                }
            }
            SchemaPart::Table { schema, table } => {
                for foreign_key in table.foreign_keys() {
                    statements.push(self.foreign_key_statement(schema, None, table, foreign_key));
                }
            }
            SchemaPart::ForeignKey {
                schema,
                table,
                foreign_key,
            } => {
                statements.push(self.foreign_key_statement(schema, None, table, foreign_key));
            }
            _ => {}
        }
    }

    /// The column specification as it appears inside `CREATE TABLE`.
    pub fn column_spec(&self, column: &Column) -> String {
        let mut spec = self.dialect.column_ref(&column.db_name);
        spec.push(' ');
        self.dialect.append_db_type(&mut spec, column);
        spec
    }

    fn table_statement(&self, schema: Option<&str>, table: &Table) -> String {
        let dialect = self.dialect;
        let mut sql = String::from("CREATE TABLE ");
        sql.push_str(&dialect.qualified_name(schema, &table.db_name));
        sql.push_str(" (\n");
        let mut first = true;
        for column in table.columns() {
            if !first {
                sql.push_str(",\n");
            }
            first = false;
            sql.push('\t');
            sql.push_str(&self.column_spec(column));
        }
        if let Some(primary_key) = table.primary_key() {
            sql.push_str(",\n\tPRIMARY KEY (");
            self.append_column_list(&mut sql, table, &primary_key.columns);
            sql.push(')');
        }
        sql.push_str("\n)");
        dialect.append_table_options(&mut sql, table.pk_storage, table.compress);
        if let Some(comment) = &table.comment {
            dialect.append_comment(&mut sql, comment);
        }
        sql
    }

    fn index_statement(&self, schema: Option<&str>, table: &Table, index: &Index) -> String {
        let dialect = self.dialect;
        let mut sql = String::from("CREATE ");
        if index.kind == IndexKind::Unique {
            sql.push_str("UNIQUE ");
        }
        sql.push_str("INDEX ");
        sql.push_str(&dialect.qualified_name(schema, &index.name));
        sql.push_str(" ON ");
        sql.push_str(&dialect.qualified_name(schema, &table.db_name));
        sql.push_str(" (");
        self.append_column_list(&mut sql, table, &index.columns);
        sql.push(')');
        dialect.append_index_options(&mut sql, index);
        sql
    }

    fn foreign_key_statement(
        &self,
        schema_name: Option<&str>,
        schema: Option<&Schema>,
        table: &Table,
        foreign_key: &ForeignKey,
    ) -> String {
        let dialect = self.dialect;
        let target = schema.and_then(|s| s.table(&foreign_key.target_table));

        let mut sql = String::from("ALTER TABLE ");
        sql.push_str(&dialect.qualified_name(schema_name, &table.db_name));
        sql.push_str(" ADD CONSTRAINT ");
        sql.push_str(&dialect.qualified_name(schema_name, &foreign_key.name));
        sql.push_str(" FOREIGN KEY (");
        self.append_column_list(&mut sql, table, &foreign_key.columns);
        sql.push_str(") REFERENCES ");
        let target_db_name = target.map_or(foreign_key.target_table.as_str(), |t| &t.db_name);
        sql.push_str(&dialect.qualified_name(schema_name, target_db_name));
        sql.push_str(" (");
        match target {
            Some(target_table) => {
                self.append_column_list(&mut sql, target_table, &foreign_key.target_columns)
            }
            None => {
                let mut first = true;
                for column in &foreign_key.target_columns {
                    if !first {
                        sql.push_str(", ");
                    }
                    first = false;
                    sql.push_str(&dialect.column_ref(column));
                }
            }
        }
        sql.push(')');
        dialect.append_constraint_actions(&mut sql, foreign_key.on_delete, foreign_key.on_update);
        sql
    }

    fn append_column_list(&self, sql: &mut String, table: &Table, columns: &[String]) {
        let mut first = true;
        for name in columns {
            if !first {
                sql.push_str(", ");
            }
            first = false;
            let db_name = table.column(name).map_or(name.as_str(), |c| &c.db_name);
            sql.push_str(&self.dialect.column_ref(db_name));
        }
    }
}

/// Translate the given schema part into DDL text in the given dialect.
pub fn to_sql(dialect: &dyn SqlDialect, part: SchemaPart<'_>) -> Result<String> {
    let mut out = String::new();
    DdlBuilder::new(dialect).create_sql(part, &mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::ReferentialAction;
    use crate::core::types::DbType;
    use crate::dialect::AnsiDialect;
    use crate::error::SchemaError;

    fn sample_schema(name: Option<&str>) -> Schema {
        let mut customer = Table::new("CUSTOMER");
        customer
            .add_column(Column::new("ID", DbType::Int).mandatory())
            .unwrap();
        customer
            .add_column(Column::new("NAME", DbType::String).with_size(200))
            .unwrap();
        customer
            .set_primary_key(Index::new(
                "PK_CUSTOMER",
                IndexKind::Primary,
                vec!["ID".to_string()],
            ))
            .unwrap();
        customer
            .add_index(Index::new(
                "UX_CUSTOMER_NAME",
                IndexKind::Unique,
                vec!["NAME".to_string()],
            ))
            .unwrap();

        let mut order = Table::new("ORDERS");
        order
            .add_column(Column::new("ID", DbType::Int).mandatory())
            .unwrap();
        order
            .add_column(Column::new("CUSTOMER_ID", DbType::Int).mandatory())
            .unwrap();
        order
            .set_primary_key(Index::new(
                "PK_ORDERS",
                IndexKind::Primary,
                vec!["ID".to_string()],
            ))
            .unwrap();
        order
            .add_foreign_key(
                ForeignKey::new(
                    "FK_ORDERS_CUSTOMER",
                    vec!["CUSTOMER_ID".to_string()],
                    "CUSTOMER",
                    vec!["ID".to_string()],
                )
                .on_delete(ReferentialAction::Cascade),
            )
            .unwrap();

        let mut schema = match name {
            Some(n) => Schema::with_name(n),
            None => Schema::new(),
        };
        schema.add_table(customer).unwrap();
        schema.add_table(order).unwrap();
        schema
    }

    #[test]
    fn test_phases_in_fixed_order() {
        let schema = sample_schema(None);
        let dialect = AnsiDialect::new();
        let statements = DdlBuilder::new(&dialect).create_statements(schema.part());

        assert_eq!(statements.len(), 4);
        assert!(statements[0].starts_with("CREATE TABLE CUSTOMER"));
        assert!(statements[1].starts_with("CREATE TABLE ORDERS"));
        assert!(statements[2].starts_with("CREATE UNIQUE INDEX UX_CUSTOMER_NAME"));
        assert!(statements[3].starts_with("ALTER TABLE ORDERS ADD CONSTRAINT"));
    }

    #[test]
    fn test_create_table_statement_text() {
        let schema = sample_schema(None);
        let dialect = AnsiDialect::new();
        let statements = DdlBuilder::new(&dialect).create_statements(schema.part());

        assert_eq!(
            statements[0],
            "CREATE TABLE CUSTOMER (\n\
             \tID INTEGER NOT NULL,\n\
             \tNAME VARCHAR(200),\n\
             \tPRIMARY KEY (ID)\n\
             )"
        );
    }

    #[test]
    fn test_foreign_key_statement_text() {
        let schema = sample_schema(None);
        let dialect = AnsiDialect::new();
        let statements = DdlBuilder::new(&dialect).create_statements(schema.part());

        assert_eq!(
            statements[3],
            "ALTER TABLE ORDERS ADD CONSTRAINT FK_ORDERS_CUSTOMER \
             FOREIGN KEY (CUSTOMER_ID) REFERENCES CUSTOMER (ID) ON DELETE CASCADE"
        );
    }

    #[test]
    fn test_schema_qualification() {
        let schema = sample_schema(Some("APP"));
        let dialect = AnsiDialect::new();
        let statements = DdlBuilder::new(&dialect).create_statements(schema.part());

        assert!(statements[0].starts_with("CREATE TABLE APP.CUSTOMER"));
        assert!(statements[2]
            .starts_with("CREATE UNIQUE INDEX APP.UX_CUSTOMER_NAME ON APP.CUSTOMER"));
        assert!(statements[3].starts_with(
            "ALTER TABLE APP.ORDERS ADD CONSTRAINT APP.FK_ORDERS_CUSTOMER"
        ));
        assert!(statements[3].contains("REFERENCES APP.CUSTOMER"));
    }

    #[test]
    fn test_single_table_sub_tree() {
        let schema = sample_schema(None);
        let dialect = AnsiDialect::new();
        let table = schema.table("ORDERS").unwrap();
        let statements = DdlBuilder::new(&dialect).create_statements(SchemaPart::Table {
            schema: None,
            table,
        });

        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE ORDERS"));
        assert!(statements[1].starts_with("ALTER TABLE ORDERS ADD CONSTRAINT"));
    }

    #[test]
    fn test_column_part_renders_bare_spec() {
        let schema = sample_schema(None);
        let dialect = AnsiDialect::new();
        let table = schema.table("CUSTOMER").unwrap();
        let column = table.column("NAME").unwrap();

        let mut out = String::new();
        DdlBuilder::new(&dialect)
            .create_sql(SchemaPart::Column { table, column }, &mut out)
            .unwrap();
        assert_eq!(out, "NAME VARCHAR(200)");
    }

    #[test]
    fn test_statements_terminated_by_separator() {
        let schema = sample_schema(None);
        let dialect = AnsiDialect::new();
        let sql = to_sql(&dialect, schema.part()).unwrap();
        assert_eq!(sql.matches(";\n").count(), 4);
        assert!(sql.ends_with(";\n"));
    }

    struct FailingSink;

    impl std::fmt::Write for FailingSink {
        fn write_str(&mut self, _s: &str) -> std::fmt::Result {
            Err(std::fmt::Error)
        }
    }

    #[test]
    fn test_sink_failure_surfaced() {
        let schema = sample_schema(None);
        let dialect = AnsiDialect::new();
        let err = DdlBuilder::new(&dialect)
            .create_sql(schema.part(), &mut FailingSink)
            .unwrap_err();
        assert!(matches!(err, SchemaError::Ddl(_)));
    }
}
