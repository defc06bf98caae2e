//! Generic topological ordering with cycle detection.
//!
//! [`topsort`] orders a finite set of nodes so that every node appears after
//! all of its transitive dependencies, failing with the offending cycle path
//! when the dependency graph is cyclic. [`topsort_tolerant`] shares the same
//! traversal but silently skips back edges, yielding a partial order for
//! cyclic inputs; it exists for consumers whose legacy behaviour never
//! treated cycles as errors (see [`project`]).
//!
//! [`sort_tables`] is the table-ordering call site: a table depends on every
//! table referenced by one of its foreign keys, so data can be inserted in
//! the resulting order without violating constraints.

pub mod project;

use std::collections::HashSet;
use std::hash::Hash;

use indexmap::IndexSet;

use crate::core::schema::{Schema, Table};
use crate::error::{Result, SchemaError};

/// A dependency cycle discovered during [`topsort`], as the path of nodes
/// from the first re-entered node back to itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError<T>(pub Vec<T>);

/// Order `input` topologically with respect to `dependencies`.
///
/// Every node is placed after all of its transitive dependencies. Nodes are
/// visited in declared order and their dependencies in declared order, so
/// ties consistently resolve in favour of earlier declarations.
///
/// With `add_dependencies`, nodes reachable through `dependencies` but absent
/// from `input` are included in the result; otherwise they are traversed but
/// omitted.
///
/// Fails with the cycle path when the graph is cyclic.
pub fn topsort<T, F>(
    dependencies: &F,
    input: &[T],
    add_dependencies: bool,
) -> std::result::Result<Vec<T>, CycleError<T>>
where
    T: Clone + Eq + Hash,
    F: Fn(&T) -> Vec<T>,
{
    sort_inner(dependencies, input, add_dependencies, false)
}

/// Like [`topsort`], but a cyclic graph yields a partial order instead of an
/// error: back edges are skipped, everything else is ordered as usual.
pub fn topsort_tolerant<T, F>(dependencies: &F, input: &[T], add_dependencies: bool) -> Vec<T>
where
    T: Clone + Eq + Hash,
    F: Fn(&T) -> Vec<T>,
{
    match sort_inner(dependencies, input, add_dependencies, true) {
        Ok(result) => result,
        // Back edges are skipped in tolerant mode; no cycle error escapes.
        Err(_) => unreachable!("tolerant sort reported a cycle"),
    }
}

fn sort_inner<T, F>(
    dependencies: &F,
    input: &[T],
    add_dependencies: bool,
    tolerate_cycles: bool,
) -> std::result::Result<Vec<T>, CycleError<T>>
where
    T: Clone + Eq + Hash,
    F: Fn(&T) -> Vec<T>,
{
    let input_set: Option<HashSet<T>> = if add_dependencies {
        None
    } else {
        Some(input.iter().cloned().collect())
    };

    let mut result = Vec::with_capacity(input.len());
    let mut seen = HashSet::new();
    let mut pending = IndexSet::new();
    for element in input {
        visit(
            dependencies,
            &mut result,
            &mut seen,
            &mut pending,
            element,
            input_set.as_ref(),
            tolerate_cycles,
        )?;
    }

    Ok(result)
}

fn visit<T, F>(
    dependencies: &F,
    result: &mut Vec<T>,
    seen: &mut HashSet<T>,
    pending: &mut IndexSet<T>,
    element: &T,
    input_set: Option<&HashSet<T>>,
    tolerate_cycles: bool,
) -> std::result::Result<(), CycleError<T>>
where
    T: Clone + Eq + Hash,
    F: Fn(&T) -> Vec<T>,
{
    if seen.contains(element) {
        if pending.contains(element) && !tolerate_cycles {
            let mut cycle: Vec<T> = pending.iter().cloned().collect();
            cycle.push(element.clone());
            return Err(CycleError(cycle));
        }
        return Ok(());
    }
    seen.insert(element.clone());
    pending.insert(element.clone());
    for dependency in dependencies(element) {
        visit(
            dependencies,
            result,
            seen,
            pending,
            &dependency,
            input_set,
            tolerate_cycles,
        )?;
    }
    pending.shift_remove(element);
    if input_set.map_or(true, |set| set.contains(element)) {
        result.push(element.clone());
    }
    Ok(())
}

/// Sort the tables of the given schema topologically according to their
/// foreign key dependencies.
///
/// A table referenced by a foreign key is placed before every table that
/// references it, so data can be inserted in the returned order without
/// violating constraints. Foreign keys pointing outside the schema are
/// ignored.
///
/// Fails with [`SchemaError::CyclicDependency`] when the foreign key graph is
/// cyclic (self-referencing tables included); a partial order would silently
/// break insertion order.
pub fn sort_tables(schema: &Schema) -> Result<Vec<&Table>> {
    let names: Vec<String> = schema.tables().iter().map(|t| t.name.clone()).collect();
    let dependencies = |name: &String| -> Vec<String> {
        match schema.table(name) {
            Some(table) => table
                .foreign_keys()
                .iter()
                .filter(|fk| schema.table(&fk.target_table).is_some())
                .map(|fk| fk.target_table.clone())
                .collect(),
            None => Vec::new(),
        }
    };

    let ordered = topsort(&dependencies, &names, true)
        .map_err(|CycleError(cycle)| SchemaError::CyclicDependency { cycle })?;

    Ok(ordered
        .iter()
        .filter_map(|name| schema.table(name))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{Column, ForeignKey, Index, IndexKind};
    use crate::core::types::DbType;

    fn deps_from<'a>(edges: &'a [(&'a str, &'a [&'a str])]) -> impl Fn(&String) -> Vec<String> + 'a {
        move |node: &String| {
            edges
                .iter()
                .find(|(n, _)| n == node)
                .map(|(_, ds)| ds.iter().map(|d| d.to_string()).collect())
                .unwrap_or_default()
        }
    }

    fn names(input: &[&str]) -> Vec<String> {
        input.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_dependencies_come_first() {
        let edges: &[(&str, &[&str])] = &[("a", &["b", "c"]), ("b", &["c"]), ("c", &[])];
        let sorted = topsort(&deps_from(edges), &names(&["a", "b", "c"]), true).unwrap();
        assert_eq!(sorted, names(&["c", "b", "a"]));
    }

    #[test]
    fn test_declared_order_kept_for_independent_nodes() {
        let edges: &[(&str, &[&str])] = &[("x", &[]), ("y", &[]), ("z", &[])];
        let sorted = topsort(&deps_from(edges), &names(&["x", "y", "z"]), true).unwrap();
        assert_eq!(sorted, names(&["x", "y", "z"]));
    }

    #[test]
    fn test_dependencies_outside_input_omitted() {
        let edges: &[(&str, &[&str])] = &[("a", &["ext"]), ("ext", &[])];
        let sorted = topsort(&deps_from(edges), &names(&["a"]), false).unwrap();
        assert_eq!(sorted, names(&["a"]));

        let sorted = topsort(&deps_from(edges), &names(&["a"]), true).unwrap();
        assert_eq!(sorted, names(&["ext", "a"]));
    }

    #[test]
    fn test_cycle_detected() {
        let edges: &[(&str, &[&str])] = &[("a", &["b"]), ("b", &["a"])];
        let err = topsort(&deps_from(edges), &names(&["a", "b"]), true).unwrap_err();
        assert_eq!(err.0, names(&["a", "b", "a"]));
    }

    #[test]
    fn test_self_cycle_detected() {
        let edges: &[(&str, &[&str])] = &[("a", &["a"])];
        let err = topsort(&deps_from(edges), &names(&["a"]), true).unwrap_err();
        assert_eq!(err.0, names(&["a", "a"]));
    }

    #[test]
    fn test_tolerant_sort_yields_partial_order() {
        let edges: &[(&str, &[&str])] = &[("a", &["b"]), ("b", &["a"]), ("c", &[])];
        let sorted = topsort_tolerant(&deps_from(edges), &names(&["a", "b", "c"]), true);
        assert_eq!(sorted, names(&["b", "a", "c"]));
    }

    fn order_schema(reversed: bool) -> Schema {
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
        if reversed {
            schema.add_table(item).unwrap();
            schema.add_table(order).unwrap();
        } else {
            schema.add_table(order).unwrap();
            schema.add_table(item).unwrap();
        }
        schema
    }

    #[test]
    fn test_sort_tables_referenced_table_first() {
        for reversed in [false, true] {
            let schema = order_schema(reversed);
            let sorted = sort_tables(&schema).unwrap();
            let sorted_names: Vec<&str> = sorted.iter().map(|t| t.name.as_str()).collect();
            assert_eq!(sorted_names, vec!["ORDER", "ORDER_ITEM"]);
        }
    }

    #[test]
    fn test_sort_tables_cycle_fails() {
        let mut a = Table::new("A");
        a.add_column(Column::new("b_id", DbType::Int)).unwrap();
        a.add_foreign_key(ForeignKey::new(
            "FK_A_B",
            vec!["b_id".to_string()],
            "B",
            vec!["id".to_string()],
        ))
        .unwrap();

        let mut b = Table::new("B");
        b.add_column(Column::new("id", DbType::Int)).unwrap();
        b.add_column(Column::new("a_id", DbType::Int)).unwrap();
        b.add_foreign_key(ForeignKey::new(
            "FK_B_A",
            vec!["a_id".to_string()],
            "A",
            vec!["id".to_string()],
        ))
        .unwrap();

        let mut schema = Schema::new();
        schema.add_table(a).unwrap();
        schema.add_table(b).unwrap();

        let err = sort_tables(&schema).unwrap_err();
        match err {
            SchemaError::CyclicDependency { cycle } => {
                assert_eq!(cycle, vec!["A", "B", "A"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_sort_tables_ignores_external_references() {
        let mut t = Table::new("T");
        t.add_column(Column::new("x", DbType::Int)).unwrap();
        t.add_foreign_key(ForeignKey::new(
            "FK_EXT",
            vec!["x".to_string()],
            "NOT_IN_SCHEMA",
            vec!["id".to_string()],
        ))
        .unwrap();

        let mut schema = Schema::new();
        schema.add_table(t).unwrap();

        let sorted = sort_tables(&schema).unwrap();
        assert_eq!(sorted.len(), 1);
        assert_eq!(sorted[0].name, "T");
    }
}
