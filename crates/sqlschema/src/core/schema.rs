//! The relational schema model.
//!
//! [`Schema`], [`Table`], [`Column`], [`Index`] and [`ForeignKey`] form a
//! database-agnostic description of a relational schema. Instances are built
//! either programmatically or by
//! [`SchemaExtraction`](crate::extract::SchemaExtraction) from live catalog
//! metadata, and are read-only data afterwards.
//!
//! The mutating methods validate the model invariants (unique table and
//! column names, index and key columns belonging to their table, matching
//! foreign-key column counts) and fail with
//! [`SchemaError::Model`](crate::error::SchemaError) on violation.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};

use super::types::DbType;

/// A named catalog of tables.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    /// Schema name, used as qualification prefix in generated DDL.
    /// `None` addresses the connection's default schema.
    name: Option<String>,

    tables: Vec<Table>,
}

impl Schema {
    /// Create a new unnamed schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new schema with the given name.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            tables: Vec::new(),
        }
    }

    /// The schema name, if one is declared.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Add a table to this schema.
    ///
    /// Fails if a table with the same name already exists.
    pub fn add_table(&mut self, table: Table) -> Result<()> {
        if self.table(&table.name).is_some() {
            return Err(SchemaError::model(format!(
                "Duplicate table '{}' in schema.",
                table.name
            )));
        }
        self.tables.push(table);
        Ok(())
    }

    /// Look up a table by its model name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// The tables of this schema in declaration order.
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// This schema as a dispatchable [`SchemaPart`].
    pub fn part(&self) -> SchemaPart<'_> {
        SchemaPart::Schema(self)
    }
}

/// A relational table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Model name of the table.
    pub name: String,

    /// External name used in SQL statements (may differ from the model name,
    /// see [`mangle_db_name`]).
    pub db_name: String,

    /// Table comment.
    pub comment: Option<String>,

    /// Whether the table should be organized by its primary key, on dialects
    /// that support index-organized storage.
    pub pk_storage: bool,

    /// Storage compression level, `0` for none. Interpretation is up to the
    /// dialect.
    pub compress: u32,

    columns: Vec<Column>,
    primary_key: Option<Index>,
    indexes: Vec<Index>,
    foreign_keys: Vec<ForeignKey>,
}

impl Table {
    /// Create a new table whose external name equals the model name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let db_name = name.clone();
        Self {
            name,
            db_name,
            comment: None,
            pk_storage: false,
            compress: 0,
            columns: Vec::new(),
            primary_key: None,
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Set the external name.
    pub fn with_db_name(mut self, db_name: impl Into<String>) -> Self {
        self.db_name = db_name.into();
        self
    }

    /// Set the table comment.
    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment;
        self
    }

    /// Add a column.
    ///
    /// Fails if a column with the same name already exists.
    pub fn add_column(&mut self, column: Column) -> Result<()> {
        if self.column(&column.name).is_some() {
            return Err(SchemaError::model(format!(
                "Duplicate column '{}' in table '{}'.",
                column.name, self.name
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Look up a column by its model name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The columns of this table in declaration order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Set the primary key.
    ///
    /// The index kind is forced to [`IndexKind::Primary`]; all referenced
    /// columns must exist.
    pub fn set_primary_key(&mut self, mut index: Index) -> Result<()> {
        index.kind = IndexKind::Primary;
        self.check_index_columns(&index)?;
        self.primary_key = Some(index);
        Ok(())
    }

    /// The primary key, if one is set.
    pub fn primary_key(&self) -> Option<&Index> {
        self.primary_key.as_ref()
    }

    /// Add a non-primary index.
    ///
    /// All referenced columns must exist in this table.
    pub fn add_index(&mut self, index: Index) -> Result<()> {
        if index.kind == IndexKind::Primary {
            return Err(SchemaError::model(format!(
                "Index '{}' on table '{}': use set_primary_key for primary indexes.",
                index.name, self.name
            )));
        }
        self.check_index_columns(&index)?;
        self.indexes.push(index);
        Ok(())
    }

    /// The non-primary indexes of this table.
    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    /// Add a foreign key.
    ///
    /// Source and target column lists must have equal length, and all source
    /// columns must exist in this table. The target table is resolved by name
    /// at use time (ordering, DDL), since it may be declared later.
    pub fn add_foreign_key(&mut self, foreign_key: ForeignKey) -> Result<()> {
        if foreign_key.columns.len() != foreign_key.target_columns.len() {
            return Err(SchemaError::model(format!(
                "Foreign key '{}' on table '{}': {} source columns vs {} target columns.",
                foreign_key.name,
                self.name,
                foreign_key.columns.len(),
                foreign_key.target_columns.len()
            )));
        }
        for column in &foreign_key.columns {
            if self.column(column).is_none() {
                return Err(SchemaError::model(format!(
                    "Foreign key '{}' on table '{}' references unknown column '{}'.",
                    foreign_key.name, self.name, column
                )));
            }
        }
        self.foreign_keys.push(foreign_key);
        Ok(())
    }

    /// The foreign keys of this table.
    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    fn check_index_columns(&self, index: &Index) -> Result<()> {
        for column in &index.columns {
            if self.column(column).is_none() {
                return Err(SchemaError::model(format!(
                    "Index '{}' on table '{}' references unknown column '{}'.",
                    index.name, self.name, column
                )));
            }
        }
        Ok(())
    }
}

/// A table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Model name of the column.
    pub name: String,

    /// External name used in SQL statements.
    pub db_name: String,

    /// The column type.
    pub ty: DbType,

    /// Size parameter; meaningful only if [`DbType::has_size`].
    pub size: u64,

    /// Precision parameter; meaningful only if [`DbType::has_precision`].
    pub precision: u32,

    /// Whether NULL cannot be stored.
    pub mandatory: bool,

    /// Whether the binary variant of the type is used; meaningful only if
    /// [`DbType::has_binary_variant`].
    pub binary: bool,

    /// Column comment.
    pub comment: Option<String>,
}

impl Column {
    /// Create a column whose external name equals the model name.
    pub fn new(name: impl Into<String>, ty: DbType) -> Self {
        let name = name.into();
        let db_name = name.clone();
        Self {
            name,
            db_name,
            ty,
            size: 0,
            precision: 0,
            mandatory: false,
            binary: false,
            comment: None,
        }
    }

    /// Set the size parameter.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Set the precision parameter.
    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    /// Mark the column mandatory (NOT NULL).
    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// Use the binary variant of the type.
    pub fn binary(mut self) -> Self {
        self.binary = true;
        self
    }
}

/// Kind of an [`Index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexKind {
    /// Plain lookup index.
    Default,
    /// Unique constraint index.
    Unique,
    /// Primary key index.
    Primary,
}

/// A lookup structure on an ordered list of columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    /// Index name.
    pub name: String,

    /// Index kind.
    pub kind: IndexKind,

    /// Names of the indexed columns, in index order.
    pub columns: Vec<String>,

    /// Whether the index should be kept in memory, on dialects that support
    /// memory-resident indexes.
    pub in_memory: bool,

    /// Storage compression level, `0` for none.
    pub compress: u32,
}

impl Index {
    /// Create a new index.
    pub fn new(name: impl Into<String>, kind: IndexKind, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            columns,
            in_memory: false,
            compress: 0,
        }
    }
}

/// Action taken on the referencing row when the referenced row is deleted or
/// updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReferentialAction {
    /// Reject the operation.
    #[default]
    Restrict,
    /// Propagate the operation.
    Cascade,
    /// Clear the referencing columns to NULL.
    Clear,
}

/// A referential constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Constraint name.
    pub name: String,

    /// Source column names in the owning table.
    pub columns: Vec<String>,

    /// Name of the referenced table.
    pub target_table: String,

    /// Referenced column names, parallel to `columns`.
    pub target_columns: Vec<String>,

    /// Action on deletion of the referenced row.
    pub on_delete: ReferentialAction,

    /// Action on update of the referenced key.
    pub on_update: ReferentialAction,
}

impl ForeignKey {
    /// Create a new foreign key with `RESTRICT` semantics for delete and
    /// update.
    pub fn new(
        name: impl Into<String>,
        columns: Vec<String>,
        target_table: impl Into<String>,
        target_columns: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            columns,
            target_table: target_table.into(),
            target_columns,
            on_delete: ReferentialAction::Restrict,
            on_update: ReferentialAction::Restrict,
        }
    }

    /// Set the on-delete action.
    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = action;
        self
    }

    /// Set the on-update action.
    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = action;
        self
    }
}

/// A dispatchable fragment of a schema model.
///
/// Consumers that operate on whole schemas as well as sub-trees (the DDL
/// synthesizer in particular) dispatch on this tagged union instead of
/// requiring a full [`Schema`]. Variants carry the owning schema name and
/// table where the part itself has no back reference.
#[derive(Debug, Clone, Copy)]
pub enum SchemaPart<'a> {
    /// A whole schema.
    Schema(&'a Schema),
    /// A single table with its indexes and foreign keys.
    Table {
        /// Owning schema name used for qualification, if any.
        schema: Option<&'a str>,
        /// The table.
        table: &'a Table,
    },
    /// A single column.
    Column {
        /// The owning table.
        table: &'a Table,
        /// The column.
        column: &'a Column,
    },
    /// A single index.
    Index {
        /// Owning schema name used for qualification, if any.
        schema: Option<&'a str>,
        /// The owning table.
        table: &'a Table,
        /// The index.
        index: &'a Index,
    },
    /// A single foreign key.
    ForeignKey {
        /// Owning schema name used for qualification, if any.
        schema: Option<&'a str>,
        /// The owning table.
        table: &'a Table,
        /// The foreign key.
        foreign_key: &'a ForeignKey,
    },
}

/// Derive an external database name from a camel-case model name.
///
/// Upper-cases the name, separates camel-case word boundaries with
/// underscores and folds every non-alphanumeric character to an underscore:
/// `ThisIsAName` becomes `THIS_IS_A_NAME`, `userID` becomes `USER_ID`.
///
/// This function is not designed to be foolproof, but fast.
pub fn mangle_db_name(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut db_name = String::with_capacity(name.len() + 10);
    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_uppercase() && !db_name.ends_with('_') {
            let last_lower = chars[i - 1].is_lowercase();
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if last_lower || next_lower {
                db_name.push('_');
            }
        }
        if c.is_alphanumeric() {
            db_name.extend(c.to_uppercase());
        } else {
            db_name.push('_');
        }
    }
    db_name
}
