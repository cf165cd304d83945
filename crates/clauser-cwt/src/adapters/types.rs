//! Type discovery: materializing each type's id set from project files.

use std::collections::{BTreeMap, BTreeSet};

use clauser_syntax::{
    Category, Diagnostic, Facts, ObjectFact, ParseOptions, ParsedSource, ValueFact,
};
use clauser_syntax::TextRange;

use super::{path_matches, subtypes};
use crate::graph::{SchemaGraph, TypeDef};
use crate::provider::FileProvider;

/// Duplicate id for a type declared `unique = yes`.
pub const TYPECHECK_DUPLICATE_DEFINITION: &str = "TYPECHECK_DUPLICATE_DEFINITION";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdEntry {
    /// Subtypes active for this occurrence (first occurrence wins for
    /// non-unique duplicates).
    pub subtypes: BTreeSet<String>,
}

/// One governed object occurrence inside a file, as used both by discovery
/// and by the check engine.
pub struct EntryObject<'f> {
    /// Key under which the entry appeared, if keyed.
    pub key: Option<String>,
    /// Resolved id (key, `name_field` value, or file stem).
    pub id: String,
    pub object: &'f ObjectFact,
    pub key_range: Option<TextRange>,
}

/// Scans every provider file once, producing `type → id → entry`.
pub fn discover_types(
    graph: &SchemaGraph,
    provider: &dyn FileProvider,
) -> (BTreeMap<String, BTreeMap<String, IdEntry>>, Vec<Diagnostic>) {
    let mut ids: BTreeMap<String, BTreeMap<String, IdEntry>> = BTreeMap::new();
    let mut diagnostics = Vec::new();

    for def in graph.types.values() {
        ids.insert(def.name.clone(), BTreeMap::new());
    }

    for (path, content) in provider.files() {
        let applicable: Vec<&TypeDef> = graph
            .types
            .values()
            .filter(|def| file_matches(def, &path))
            .collect();
        if applicable.is_empty() {
            continue;
        }

        let parsed = ParsedSource::parse(&content, ParseOptions::jomini());
        let facts = parsed.facts();

        for def in applicable {
            for entry in entry_objects(def, facts, &path) {
                let slot = ids.get_mut(&def.name).expect("pre-seeded");
                if slot.contains_key(&entry.id) {
                    if def.unique {
                        diagnostics.push(Diagnostic::error(
                            TYPECHECK_DUPLICATE_DEFINITION,
                            Category::Typecheck,
                            entry.key_range.unwrap_or(entry.object.range),
                            format!(
                                "duplicate {} `{}` (in {})",
                                def.name, entry.id, path
                            ),
                        ));
                    }
                    continue;
                }
                let subtypes = subtypes::select_subtype(def, entry.key.as_deref(), entry.object)
                    .map(|s| BTreeSet::from([s.name.clone()]))
                    .unwrap_or_default();
                slot.insert(entry.id, IdEntry { subtypes });
            }
        }
    }

    (ids, diagnostics)
}

pub fn file_matches(def: &TypeDef, path: &str) -> bool {
    path_matches(
        &def.path,
        def.path_strict,
        def.path_file.as_deref(),
        def.path_extension.as_deref(),
        path,
    )
}

/// The object occurrences a type definition governs within one file.
pub fn entry_objects<'f>(def: &TypeDef, facts: &'f Facts, path: &str) -> Vec<EntryObject<'f>> {
    if def.type_per_file {
        let stem = file_stem(path);
        return vec![EntryObject {
            key: None,
            id: stem.to_string(),
            object: facts.root(),
            key_range: None,
        }];
    }

    let mut out = Vec::new();
    let root = facts.root();
    match &def.skip_root_key {
        Some(skip) => {
            for (key, fields) in &root.fields {
                if !skip.matches(key) {
                    continue;
                }
                for field in fields {
                    if let ValueFact::Object(id) = field.value {
                        collect_entries(def, facts.get(id), facts, &mut out);
                    }
                }
            }
        }
        None => collect_entries(def, root, facts, &mut out),
    }
    out
}

fn collect_entries<'f>(
    def: &TypeDef,
    container: &'f ObjectFact,
    facts: &'f Facts,
    out: &mut Vec<EntryObject<'f>>,
) {
    for (key, fields) in &container.fields {
        if let Some(filter) = &def.type_key_filter
            && !filter.admits(key)
        {
            continue;
        }
        if let Some(prefix) = &def.starts_with
            && !key.starts_with(prefix.as_str())
        {
            continue;
        }
        for field in fields {
            let object = match field.value {
                ValueFact::Object(id) => facts.get(id),
                _ => continue,
            };
            let id = match &def.name_field {
                None => key.clone(),
                Some(name_field) => {
                    match object
                        .fields
                        .get(name_field)
                        .and_then(|f| f.first())
                        .and_then(|f| f.value.as_scalar_text())
                    {
                        Some(name) => name.to_string(),
                        // Unnamed entries are not discoverable ids.
                        None => continue,
                    }
                }
            };
            out.push(EntryObject {
                key: Some(key.clone()),
                id,
                object,
                key_range: Some(field.key_range),
            });
        }
    }
}

fn file_stem(path: &str) -> &str {
    let file = path.rsplit_once('/').map_or(path, |(_, f)| f);
    file.rsplit_once('.').map_or(file, |(stem, _)| stem)
}
