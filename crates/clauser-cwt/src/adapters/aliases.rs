//! Alias and single-alias expansion.
//!
//! Alias families are already indexed on the graph; this module adds the
//! on-demand expansion the checker needs, with visited sets capping the
//! recursion that `.cwt` files use freely (e.g. a trigger clause whose
//! body is itself `single_alias_right[trigger_clause]`).

use std::collections::BTreeSet;

use crate::field::FieldKind;
use crate::graph::{AliasMember, SchemaGraph};
use crate::ir::{RuleStatement, RuleValue};

/// Members of a family, in declaration order.
pub fn family_members<'g>(graph: &'g SchemaGraph, family: &str) -> &'g [AliasMember] {
    graph
        .aliases
        .get(family)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Resolves a rule's value to the block it stands for, chasing
/// `single_alias_right[...]` indirections. Returns `None` for plain scalar
/// values and for unresolvable or cyclic references.
pub fn effective_block<'g>(
    graph: &'g SchemaGraph,
    rule: &'g RuleStatement,
) -> Option<&'g [RuleStatement]> {
    let mut visited = BTreeSet::new();
    effective_block_inner(graph, rule, &mut visited)
}

fn effective_block_inner<'g>(
    graph: &'g SchemaGraph,
    rule: &'g RuleStatement,
    visited: &mut BTreeSet<String>,
) -> Option<&'g [RuleStatement]> {
    match &rule.value {
        RuleValue::Block(rules) => Some(rules),
        RuleValue::Scalar { text, .. } => match FieldKind::parse(text) {
            FieldKind::SingleAliasRight(name) => {
                if !visited.insert(name.clone()) {
                    return None;
                }
                let target = graph.single_aliases.get(&name)?;
                effective_block_inner(graph, target, visited)
            }
            _ => None,
        },
    }
}
