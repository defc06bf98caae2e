//! Dropping, truncating and recreating schema tables.
//!
//! Reset works on databases in unknown state: tables or constraints may or
//! may not exist. Every drop/truncate statement therefore runs inside its
//! own savepoint; a failure rolls back only that statement, is logged, and
//! is folded into the boolean result. "Object does not exist" is a normal
//! outcome in idempotent reset workflows, not an error.
//!
//! The connection-level functions never commit; callers commit once after
//! the full pass. The pool-level wrappers borrow a write connection, commit
//! after the pass and release the connection on every exit path.

use tracing::{debug, info};

use crate::core::schema::{Schema, SchemaPart, Table};
use crate::core::traits::{
    with_write_connection, Connection, ConnectionPool, SqlDialect,
};
use crate::ddl::DdlBuilder;
use crate::error::{Result, SchemaError};

/// Execute one statement inside its own savepoint.
///
/// Returns whether the statement succeeded. A statement-level SQL failure is
/// rolled back to the savepoint, logged, and reported as `false`; any other
/// failure propagates. The savepoint is released on both paths.
fn guarded_execute(
    connection: &mut dyn Connection,
    dialect: &dyn SqlDialect,
    sql: &str,
    context: &str,
) -> Result<bool> {
    let savepoint = dialect.set_savepoint(connection)?;
    match connection.execute(sql) {
        Ok(_) => {
            dialect.release_savepoint(connection, savepoint)?;
            Ok(true)
        }
        Err(SchemaError::Sql(reason)) => {
            dialect.rollback_to_savepoint(connection, savepoint)?;
            dialect.release_savepoint(connection, savepoint)?;
            info!("{}: {}", context, reason);
            Ok(false)
        }
        Err(other) => {
            // Best-effort cleanup; the original failure wins.
            let _ = dialect.rollback_to_savepoint(connection, savepoint);
            let _ = dialect.release_savepoint(connection, savepoint);
            Err(other)
        }
    }
}

/// Test whether the given table exists in the connected database.
///
/// Probes with a `SELECT` that returns no rows, guarded by a savepoint so
/// that a failed probe leaves the transaction usable.
pub fn exists(
    connection: &mut dyn Connection,
    schema_name: Option<&str>,
    table: &Table,
) -> Result<bool> {
    let dialect = connection.dialect();
    let check = format!(
        "SELECT * FROM {} WHERE 1=0",
        dialect.qualified_name(schema_name, &table.db_name)
    );

    let savepoint = dialect.set_savepoint(connection)?;
    let probe = {
        match connection.query(&check, 1) {
            Ok(_cursor) => Ok(true),
            Err(SchemaError::Sql(_)) => Ok(false),
            Err(other) => Err(other),
        }
    };
    match probe {
        Ok(true) => {
            dialect.release_savepoint(connection, savepoint)?;
            Ok(true)
        }
        Ok(false) => {
            dialect.rollback_to_savepoint(connection, savepoint)?;
            dialect.release_savepoint(connection, savepoint)?;
            Ok(false)
        }
        Err(other) => {
            let _ = dialect.rollback_to_savepoint(connection, savepoint);
            let _ = dialect.release_savepoint(connection, savepoint);
            Err(other)
        }
    }
}

/// Drop (or, with `truncate`, empty) the table with the given name.
///
/// Returns whether the statement succeeded; a failure (e.g. the table does
/// not exist) is logged and reported as `false`.
pub fn try_reset_table(
    connection: &mut dyn Connection,
    table_name: &str,
    truncate: bool,
) -> Result<bool> {
    let dialect = connection.dialect();
    let table_ref = dialect.table_ref(table_name);
    let sql = if truncate {
        dialect.truncate_table_statement(&table_ref)
    } else {
        dialect.drop_table_statement(&table_ref)
    };
    guarded_execute(
        connection,
        dialect.as_ref(),
        &sql,
        &format!("Cannot drop table '{}'", table_name),
    )
}

/// Drop (or, with `truncate`, empty) all tables of the given schema.
///
/// Without `truncate`, all foreign keys are dropped first so that the table
/// drop order cannot be blocked by cross-table references; tables are then
/// processed in reverse of the schema's declaration order. Each statement is
/// savepoint-guarded; the result is the logical AND of all per-statement
/// outcomes. Does not commit.
pub fn reset_tables(
    connection: &mut dyn Connection,
    schema: &Schema,
    truncate: bool,
) -> Result<bool> {
    let dialect = connection.dialect();
    let mut success = true;

    let mut tables: Vec<&Table> = schema.tables().iter().collect();
    // Reverse of creation order increases the chance that referencing tables
    // go away before the tables they reference.
    tables.reverse();

    if !truncate {
        // Drop constraints first to remove cross-table ordering constraints
        // entirely.
        for table in &tables {
            for foreign_key in table.foreign_keys() {
                let table_ref = dialect.qualified_name(schema.name(), &table.db_name);
                let constraint_ref = dialect.qualified_name(schema.name(), &foreign_key.name);
                let sql = dialect.drop_foreign_key_statement(&table_ref, &constraint_ref);
                let context = format!(
                    "Cannot drop foreign key '{}' on table '{}'",
                    foreign_key.name, table.name
                );
                if !guarded_execute(connection, dialect.as_ref(), &sql, &context)? {
                    success = false;
                }
            }
        }
    }

    for table in &tables {
        let table_ref = dialect.qualified_name(schema.name(), &table.db_name);
        let sql = if truncate {
            dialect.truncate_table_statement(&table_ref)
        } else {
            dialect.drop_table_statement(&table_ref)
        };
        let context = format!("Cannot drop table '{}'", table.name);
        if !guarded_execute(connection, dialect.as_ref(), &sql, &context)? {
            success = false;
        }
    }

    Ok(success)
}

/// Execute the DDL for the given schema part and commit.
pub fn create(connection: &mut dyn Connection, part: SchemaPart<'_>) -> Result<()> {
    let dialect = connection.dialect();
    let statements = DdlBuilder::new(dialect.as_ref()).create_statements(part);
    for statement in &statements {
        connection.execute(statement)?;
    }
    connection.commit()
}

/// Create all tables of the given schema.
///
/// With `check_existence`, tables that already exist are skipped. Commits
/// once after the pass.
pub fn create_tables(
    connection: &mut dyn Connection,
    schema: &Schema,
    check_existence: bool,
) -> Result<()> {
    let dialect = connection.dialect();
    for table in schema.tables() {
        if check_existence && exists(connection, schema.name(), table)? {
            debug!(table = %table.name, "table already exists, skipping");
            continue;
        }
        let statements = DdlBuilder::new(dialect.as_ref()).create_statements(SchemaPart::Table {
            schema: schema.name(),
            table,
        });
        for statement in &statements {
            connection.execute(statement)?;
        }
    }
    connection.commit()
}

/// Drop all tables of the given schema and create them afresh.
///
/// Used instead of truncating when the existing tables may have a different
/// layout.
pub fn recreate_tables(connection: &mut dyn Connection, schema: &Schema) -> Result<()> {
    reset_tables(connection, schema, false)?;
    create(connection, schema.part())
}

/// Drop/truncate all tables of the given schema, borrowing a write
/// connection from the pool and committing once after the pass.
pub fn reset_tables_with_pool(
    pool: &dyn ConnectionPool,
    schema: &Schema,
    truncate: bool,
) -> Result<bool> {
    with_write_connection(pool, |connection| {
        let success = reset_tables(connection, schema, truncate)?;
        connection.commit()?;
        Ok(success)
    })
}

/// Drop all tables of the given schema.
pub fn drop_tables(pool: &dyn ConnectionPool, schema: &Schema) -> Result<bool> {
    reset_tables_with_pool(pool, schema, false)
}

/// Drop a single table by name, borrowing a write connection from the pool
/// and committing afterwards.
pub fn reset_table_with_pool(
    pool: &dyn ConnectionPool,
    table_name: &str,
    truncate: bool,
) -> Result<bool> {
    with_write_connection(pool, |connection| {
        let success = try_reset_table(connection, table_name, truncate)?;
        connection.commit()?;
        Ok(success)
    })
}

/// Create all tables of the given schema on a pooled write connection.
pub fn create_tables_with_pool(pool: &dyn ConnectionPool, schema: &Schema) -> Result<()> {
    with_write_connection(pool, |connection| create(connection, schema.part()))
}

/// Drop and recreate all tables of the given schema on a pooled write
/// connection.
pub fn recreate_tables_with_pool(pool: &dyn ConnectionPool, schema: &Schema) -> Result<()> {
    with_write_connection(pool, |connection| recreate_tables(connection, schema))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::core::schema::{Column, ForeignKey, Index, IndexKind};
    use crate::core::traits::{
        CatalogMetadata, PreparedStatement, Row, RowCursor, Savepoint,
    };
    use crate::core::types::DbType;
    use crate::core::value::SqlValue;
    use crate::dialect::AnsiDialect;

    // =========================================================================
    // Mock connection recording statements and savepoint events
    // =========================================================================

    struct EmptyCursor;

    impl Row for EmptyCursor {
        fn get_string(&self, _column: usize) -> Result<Option<String>> {
            Err(SchemaError::sql("no current row"))
        }
        fn get_i32(&self, _column: usize) -> Result<i32> {
            Err(SchemaError::sql("no current row"))
        }
        fn get_i64(&self, _column: usize) -> Result<i64> {
            Err(SchemaError::sql("no current row"))
        }
        fn get_bool(&self, _column: usize) -> Result<bool> {
            Err(SchemaError::sql("no current row"))
        }
        fn get_value(&self, _column: usize, _ty: DbType) -> Result<SqlValue> {
            Err(SchemaError::sql("no current row"))
        }
    }

    impl RowCursor for EmptyCursor {
        fn advance(&mut self) -> Result<bool> {
            Ok(false)
        }
    }

    #[derive(Default)]
    struct MockConnection {
        executed: Vec<String>,
        queried: Vec<String>,
        fail_on: Vec<String>,
        committed: usize,
        savepoints: u64,
        events: Vec<String>,
    }

    impl MockConnection {
        fn failing_on(patterns: &[&str]) -> Self {
            Self {
                fail_on: patterns.iter().map(|p| p.to_string()).collect(),
                ..Default::default()
            }
        }

        fn fails(&self, sql: &str) -> bool {
            self.fail_on.iter().any(|pattern| sql.contains(pattern))
        }
    }

    impl Connection for MockConnection {
        fn dialect(&self) -> Arc<dyn SqlDialect> {
            Arc::new(AnsiDialect::new())
        }

        fn execute(&mut self, sql: &str) -> Result<u64> {
            self.executed.push(sql.to_string());
            if self.fails(sql) {
                Err(SchemaError::sql(format!("object does not exist: {sql}")))
            } else {
                Ok(0)
            }
        }

        fn query<'c>(
            &'c mut self,
            sql: &str,
            _fetch_size: usize,
        ) -> Result<Box<dyn RowCursor + 'c>> {
            self.queried.push(sql.to_string());
            if self.fails(sql) {
                Err(SchemaError::sql(format!("object does not exist: {sql}")))
            } else {
                Ok(Box::new(EmptyCursor))
            }
        }

        fn prepare<'c>(&'c mut self, _sql: &str) -> Result<Box<dyn PreparedStatement + 'c>> {
            Err(SchemaError::sql("prepare not supported by mock"))
        }

        fn commit(&mut self) -> Result<()> {
            self.committed += 1;
            Ok(())
        }

        fn set_savepoint(&mut self) -> Result<Savepoint> {
            self.savepoints += 1;
            self.events.push(format!("set {}", self.savepoints));
            Ok(Savepoint(self.savepoints))
        }

        fn rollback_to_savepoint(&mut self, savepoint: Savepoint) -> Result<()> {
            self.events.push(format!("rollback {}", savepoint.0));
            Ok(())
        }

        fn release_savepoint(&mut self, savepoint: Savepoint) -> Result<()> {
            self.events.push(format!("release {}", savepoint.0));
            Ok(())
        }

        fn metadata<'c>(&'c mut self) -> Result<Box<dyn CatalogMetadata + 'c>> {
            Err(SchemaError::sql("metadata not supported by mock"))
        }
    }

    fn order_schema() -> Schema {
        let mut order = Table::new("ORDER");
        order
            .add_column(Column::new("id", DbType::Int).mandatory())
            .unwrap();
        order
            .set_primary_key(Index::new(
                "PK_ORDER",
                IndexKind::Primary,
                vec!["id".to_string()],
            ))
            .unwrap();

        let mut item = Table::new("ORDER_ITEM");
        item.add_column(Column::new("id", DbType::Int).mandatory())
            .unwrap();
        item.add_column(Column::new("order_id", DbType::Int)).unwrap();
        item.set_primary_key(Index::new(
            "PK_ORDER_ITEM",
            IndexKind::Primary,
            vec!["id".to_string()],
        ))
        .unwrap();
        item.add_foreign_key(ForeignKey::new(
            "FK_ORDER_ITEM_ORDER",
            vec!["order_id".to_string()],
            "ORDER",
            vec!["id".to_string()],
        ))
        .unwrap();

        let mut schema = Schema::new();
        schema.add_table(order).unwrap();
        schema.add_table(item).unwrap();
        schema
    }

    // =========================================================================
    // Reset tests
    // =========================================================================

    #[test]
    fn test_drop_order_constraints_first_then_reverse() {
        let schema = order_schema();
        let mut connection = MockConnection::default();

        let success = reset_tables(&mut connection, &schema, false).unwrap();
        assert!(success);
        assert_eq!(
            connection.executed,
            vec![
                "ALTER TABLE ORDER_ITEM DROP CONSTRAINT FK_ORDER_ITEM_ORDER",
                "DROP TABLE ORDER_ITEM",
                "DROP TABLE ORDER",
            ]
        );
        // The caller commits, not the reset pass.
        assert_eq!(connection.committed, 0);
    }

    #[test]
    fn test_truncate_keeps_constraints() {
        let schema = order_schema();
        let mut connection = MockConnection::default();

        let success = reset_tables(&mut connection, &schema, true).unwrap();
        assert!(success);
        assert_eq!(
            connection.executed,
            vec!["TRUNCATE TABLE ORDER_ITEM", "TRUNCATE TABLE ORDER"]
        );
    }

    #[test]
    fn test_failed_statement_rolled_back_and_pass_continues() {
        let schema = order_schema();
        let mut connection = MockConnection::failing_on(&["DROP TABLE ORDER_ITEM"]);

        let success = reset_tables(&mut connection, &schema, false).unwrap();
        assert!(!success);
        // All three statements were still attempted.
        assert_eq!(connection.executed.len(), 3);
        // Statement 2 failed: savepoint 2 rolled back, all released.
        assert_eq!(
            connection.events,
            vec![
                "set 1", "release 1", "set 2", "rollback 2", "release 2", "set 3", "release 3",
            ]
        );
    }

    #[test]
    fn test_reset_of_empty_database_is_nonfatal() {
        let schema = order_schema();
        // Every statement fails: nothing exists yet.
        let mut connection = MockConnection::failing_on(&["DROP"]);

        let result = reset_tables(&mut connection, &schema, false);
        assert!(matches!(result, Ok(false)));
    }

    #[test]
    fn test_exists_probe() {
        let schema = order_schema();
        let table = schema.table("ORDER").unwrap();

        let mut connection = MockConnection::default();
        assert!(exists(&mut connection, None, table).unwrap());
        assert_eq!(connection.queried, vec!["SELECT * FROM ORDER WHERE 1=0"]);
        assert_eq!(connection.events, vec!["set 1", "release 1"]);

        let mut connection = MockConnection::failing_on(&["SELECT * FROM ORDER "]);
        assert!(!exists(&mut connection, None, table).unwrap());
        assert_eq!(connection.events, vec!["set 1", "rollback 1", "release 1"]);
    }

    #[test]
    fn test_recreate_drops_then_creates() {
        let schema = order_schema();
        let mut connection = MockConnection::default();

        recreate_tables(&mut connection, &schema).unwrap();

        let drops: Vec<&String> = connection
            .executed
            .iter()
            .filter(|sql| sql.starts_with("DROP") || sql.contains("DROP CONSTRAINT"))
            .collect();
        assert_eq!(drops.len(), 3);

        let creates: Vec<&String> = connection
            .executed
            .iter()
            .filter(|sql| sql.starts_with("CREATE TABLE"))
            .collect();
        assert_eq!(creates.len(), 2);

        // Every DROP comes before the first CREATE.
        let first_create = connection
            .executed
            .iter()
            .position(|sql| sql.starts_with("CREATE TABLE"))
            .unwrap();
        assert!(connection.executed[..first_create]
            .iter()
            .all(|sql| sql.contains("DROP")));

        assert_eq!(connection.committed, 1);
    }

    #[test]
    fn test_create_tables_skips_existing() {
        let schema = order_schema();
        let mut connection = MockConnection::default();

        // Both probes succeed: everything exists, nothing is created.
        create_tables(&mut connection, &schema, true).unwrap();
        assert!(connection.executed.is_empty());
        assert_eq!(connection.committed, 1);
    }

    #[test]
    fn test_schema_qualified_reset() {
        let mut schema = Schema::with_name("APP");
        let mut table = Table::new("T");
        table.add_column(Column::new("id", DbType::Int)).unwrap();
        schema.add_table(table).unwrap();

        let mut connection = MockConnection::default();
        reset_tables(&mut connection, &schema, false).unwrap();
        assert_eq!(connection.executed, vec!["DROP TABLE APP.T"]);
    }
}
