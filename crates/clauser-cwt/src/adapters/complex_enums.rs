//! Complex enum resolution: materializing member sets by scanning project
//! files and walking the configured name tree.

use std::collections::{BTreeMap, BTreeSet};

use clauser_syntax::{Facts, ObjectFact, ParseOptions, ParsedSource, ValueFact};

use super::path_matches;
use crate::graph::{ComplexEnumDef, SchemaGraph};
use crate::ir::{RuleStatement, RuleValue};
use crate::provider::FileProvider;

/// Resolves every complex enum against the project. A definition with no
/// `path` filter matches no file and produces an empty set.
pub fn resolve(
    graph: &SchemaGraph,
    provider: &dyn FileProvider,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut out: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for name in graph.complex_enums.keys() {
        out.insert(name.clone(), BTreeSet::new());
    }
    if graph.complex_enums.is_empty() {
        return out;
    }

    for (path, content) in provider.files() {
        let mut carrier: Option<ParsedSource> = None;
        for def in graph.complex_enums.values() {
            if !path_matches(
                &def.path,
                false,
                def.path_file.as_deref(),
                def.path_extension.as_deref(),
                &path,
            ) {
                continue;
            }
            let parsed = carrier
                .get_or_insert_with(|| ParsedSource::parse(&content, ParseOptions::jomini()));
            let facts = parsed.facts();
            let members = out.entry(def.name.clone()).or_default();
            if def.start_from_root {
                collect(&def.name_tree, facts.root(), facts, members);
            } else {
                // One level down: inside each top-level object.
                for fields in facts.root().fields.values() {
                    for field in fields {
                        if let ValueFact::Object(id) = field.value {
                            collect(&def.name_tree, facts.get(id), facts, members);
                        }
                    }
                }
            }
        }
    }
    out
}

/// Walks one level of the name tree against one object.
///
/// - `enum_name = {}` collects keys whose value is an object;
/// - `enum_name = scalar` collects keys whose value is a scalar;
/// - `key = enum_name` collects the scalar values of `key` fields;
/// - `scalar = { ... }` descends into every object-valued field;
/// - `key = { ... }` descends into object-valued `key` fields.
fn collect(
    tree: &[RuleStatement],
    object: &ObjectFact,
    facts: &Facts,
    members: &mut BTreeSet<String>,
) {
    for rule in tree {
        match (rule.key.as_str(), &rule.value) {
            ("enum_name", RuleValue::Block(_)) => {
                for (key, fields) in &object.fields {
                    if fields
                        .iter()
                        .any(|f| matches!(f.value, ValueFact::Object(_) | ValueFact::Tagged { .. }))
                    {
                        members.insert(key.clone());
                    }
                }
            }
            ("enum_name", RuleValue::Scalar { .. }) => {
                for (key, fields) in &object.fields {
                    if fields
                        .iter()
                        .any(|f| matches!(f.value, ValueFact::Scalar { .. }))
                    {
                        members.insert(key.clone());
                    }
                }
            }
            (key, RuleValue::Scalar { text, .. }) if text == "enum_name" => {
                for fields in object
                    .fields
                    .iter()
                    .filter(|(k, _)| k.eq_ignore_ascii_case(key))
                    .map(|(_, f)| f)
                {
                    for field in fields {
                        if let Some(value) = field.value.as_scalar_text() {
                            members.insert(value.to_string());
                        }
                    }
                }
            }
            ("scalar", RuleValue::Block(subtree)) => {
                for fields in object.fields.values() {
                    for field in fields {
                        descend(&field.value, subtree, facts, members);
                    }
                }
            }
            (key, RuleValue::Block(subtree)) => {
                for fields in object
                    .fields
                    .iter()
                    .filter(|(k, _)| k.eq_ignore_ascii_case(key))
                    .map(|(_, f)| f)
                {
                    for field in fields {
                        descend(&field.value, subtree, facts, members);
                    }
                }
            }
            _ => {}
        }
    }
}

fn descend(
    value: &ValueFact,
    subtree: &[RuleStatement],
    facts: &Facts,
    members: &mut BTreeSet<String>,
) {
    match value {
        ValueFact::Object(id) | ValueFact::Tagged { body: id, .. } => {
            collect(subtree, facts.get(*id), facts, members);
        }
        _ => {}
    }
}
