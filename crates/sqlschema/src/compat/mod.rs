//! Schema compatibility checking.
//!
//! A candidate schema is compatible to a reference schema if data shaped
//! like the reference can be stored in the candidate without loss. Problems
//! are reported through a [`ViolationSink`] instead of being raised, so one
//! pass surfaces every violation instead of stopping at the first.

use tracing::warn;

use crate::core::schema::{Column, Schema, Table};
use crate::core::types::DbType;

/// A single compatibility problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A reference table is missing from the candidate schema.
    MissingTable {
        table: String,
    },
    /// A reference column is missing from the candidate table.
    MissingColumn {
        table: String,
        column: String,
    },
    /// The candidate has a mandatory column the reference does not know;
    /// reference-shaped inserts would fail.
    UnexpectedMandatoryColumn {
        table: String,
        column: String,
    },
    /// The candidate column type cannot hold the reference column type.
    TypeMismatch {
        table: String,
        column: String,
        reference: DbType,
        candidate: DbType,
    },
    /// The candidate column is mandatory while the reference column is not.
    MandatoryMismatch {
        table: String,
        column: String,
    },
    /// The candidate column uses the binary variant while the reference does
    /// not.
    BinaryMismatch {
        table: String,
        column: String,
    },
    /// The candidate column is smaller than the reference column.
    SizeTooSmall {
        table: String,
        column: String,
        reference: u64,
        candidate: u64,
    },
    /// The candidate column has less precision than the reference column.
    PrecisionTooSmall {
        table: String,
        column: String,
        reference: u32,
        candidate: u32,
    },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::MissingTable { table } => {
                write!(f, "Table '{}' missing.", table)
            }
            Violation::MissingColumn { table, column } => {
                write!(f, "Column '{}' missing in table '{}'.", column, table)
            }
            Violation::UnexpectedMandatoryColumn { table, column } => {
                write!(
                    f,
                    "Additional column '{}' in table '{}' is mandatory.",
                    column, table
                )
            }
            Violation::TypeMismatch {
                table,
                column,
                reference,
                candidate,
            } => {
                write!(
                    f,
                    "Type of column '{}' in table '{}' does not match: {} not compatible with {}.",
                    column, table, candidate, reference
                )
            }
            Violation::MandatoryMismatch { table, column } => {
                write!(
                    f,
                    "Mandatory attribute of column '{}' in table '{}' does not match: mandatory not compatible with non-mandatory.",
                    column, table
                )
            }
            Violation::BinaryMismatch { table, column } => {
                write!(
                    f,
                    "Binary attribute of column '{}' in table '{}' does not match: binary not compatible with non-binary.",
                    column, table
                )
            }
            Violation::SizeTooSmall {
                table,
                column,
                reference,
                candidate,
            } => {
                write!(
                    f,
                    "Size attribute of column '{}' in table '{}' does not match: {} is smaller than {}.",
                    column, table, candidate, reference
                )
            }
            Violation::PrecisionTooSmall {
                table,
                column,
                reference,
                candidate,
            } => {
                write!(
                    f,
                    "Precision attribute of column '{}' in table '{}' does not match: {} is smaller than {}.",
                    column, table, candidate, reference
                )
            }
        }
    }
}

/// Receiver for compatibility violations. Reporting never fails.
pub trait ViolationSink {
    /// Record one violation.
    fn report(&mut self, violation: Violation);
}

impl ViolationSink for Vec<Violation> {
    fn report(&mut self, violation: Violation) {
        self.push(violation);
    }
}

/// Check whether `candidate` can losslessly host data shaped like
/// `reference`, reporting every violation to `sink`.
///
/// With `strict`, only exact integer type matches are accepted; otherwise a
/// wider reference integer type also accepts the narrower candidate types
/// (see [`type_accepts`]).
pub fn check_compatible(
    sink: &mut dyn ViolationSink,
    reference: &Schema,
    candidate: &Schema,
    strict: bool,
) {
    for reference_table in reference.tables() {
        match candidate.table(&reference_table.name) {
            Some(candidate_table) => {
                check_table_compatible(sink, reference_table, candidate_table, strict);
            }
            None => sink.report(Violation::MissingTable {
                table: reference_table.name.clone(),
            }),
        }
    }
}

/// Check one candidate table against its reference table.
pub fn check_table_compatible(
    sink: &mut dyn ViolationSink,
    reference: &Table,
    candidate: &Table,
    strict: bool,
) {
    for reference_column in reference.columns() {
        match candidate.column(&reference_column.name) {
            Some(candidate_column) => check_column_compatible(
                sink,
                &reference.name,
                reference_column,
                candidate_column,
                strict,
            ),
            None => sink.report(Violation::MissingColumn {
                table: reference.name.clone(),
                column: reference_column.name.clone(),
            }),
        }
    }

    for candidate_column in candidate.columns() {
        if reference.column(&candidate_column.name).is_none() && candidate_column.mandatory {
            sink.report(Violation::UnexpectedMandatoryColumn {
                table: reference.name.clone(),
                column: candidate_column.name.clone(),
            });
        }
    }
}

/// Check one candidate column against its reference column.
pub fn check_column_compatible(
    sink: &mut dyn ViolationSink,
    table: &str,
    reference: &Column,
    candidate: &Column,
    strict: bool,
) {
    if !type_accepts(reference.ty, candidate.ty, strict) {
        sink.report(Violation::TypeMismatch {
            table: table.to_string(),
            column: candidate.name.clone(),
            reference: reference.ty,
            candidate: candidate.ty,
        });
        // Remaining attribute checks are meaningless across incompatible types.
        return;
    }

    if candidate.mandatory && !reference.mandatory {
        sink.report(Violation::MandatoryMismatch {
            table: table.to_string(),
            column: candidate.name.clone(),
        });
    }

    let ty = reference.ty;
    if ty.has_binary_variant() && candidate.binary && !reference.binary {
        sink.report(Violation::BinaryMismatch {
            table: table.to_string(),
            column: candidate.name.clone(),
        });
    }

    if ty.has_size() && candidate.size < reference.size {
        sink.report(Violation::SizeTooSmall {
            table: table.to_string(),
            column: candidate.name.clone(),
            reference: reference.size,
            candidate: candidate.size,
        });
    }

    if ty.has_precision() && candidate.precision < reference.precision {
        sink.report(Violation::PrecisionTooSmall {
            table: table.to_string(),
            column: candidate.name.clone(),
            reference: reference.precision,
            candidate: candidate.precision,
        });
    }
}

/// Whether a candidate column of type `candidate` can hold data of the
/// reference type `reference`.
///
/// The relation is directed. Identical types are always accepted; beyond
/// that, a BYTE reference accepts BOOLEAN (the two cannot always be
/// distinguished in catalog metadata), STRING accepts CLOB, and DATETIME
/// accepts DATE and TIME. With `strict == false` the integer types
/// additionally accept every narrower integer candidate.
pub fn type_accepts(reference: DbType, candidate: DbType, strict: bool) -> bool {
    if reference == candidate {
        return true;
    }
    match reference {
        DbType::Byte => candidate == DbType::Boolean,
        DbType::Short => !strict && matches!(candidate, DbType::Byte | DbType::Boolean),
        DbType::Int => {
            !strict && matches!(candidate, DbType::Short | DbType::Byte | DbType::Boolean)
        }
        DbType::Long => {
            !strict
                && matches!(
                    candidate,
                    DbType::Int | DbType::Short | DbType::Byte | DbType::Boolean
                )
        }
        DbType::String => candidate == DbType::Clob,
        DbType::DateTime => matches!(candidate, DbType::Date | DbType::Time),
        _ => false,
    }
}

/// Convenience wrapper collecting and logging all violations.
pub fn compatibility_violations(
    reference: &Schema,
    candidate: &Schema,
    strict: bool,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    check_compatible(&mut violations, reference, candidate, strict);
    for violation in &violations {
        warn!("{}", violation);
    }
    violations
}
