//! Adapters: deterministic artifacts derived from the schema graph plus
//! project content.
//!
//! Everything here is built once per schema load. Sets are ordered
//! (`BTreeMap`/`BTreeSet`) so artifacts compare equal across runs
//! regardless of discovery order.

pub mod aliases;
pub mod complex_enums;
pub mod subtypes;
pub mod types;

use std::collections::{BTreeMap, BTreeSet};

use clauser_syntax::Diagnostic;

use crate::graph::SchemaGraph;
use crate::provider::FileProvider;

/// Everything the checker consumes beyond the graph itself.
#[derive(Debug, Clone, Default)]
pub struct SchemaArtifacts {
    /// type name → discovered ids with their active subtypes.
    pub type_ids: BTreeMap<String, BTreeMap<String, types::IdEntry>>,
    /// complex enum name → materialized members.
    pub complex_enum_members: BTreeMap<String, BTreeSet<String>>,
    /// Modifiers materialized from `type[...] modifiers` templates:
    /// modifier name → categories.
    pub templated_modifiers: BTreeMap<String, BTreeSet<String>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl SchemaArtifacts {
    /// Scans the project once and materializes every adapter artifact.
    pub fn materialize(graph: &SchemaGraph, provider: &dyn FileProvider) -> SchemaArtifacts {
        let mut artifacts = SchemaArtifacts::default();

        let (type_ids, diagnostics) = types::discover_types(graph, provider);
        artifacts.type_ids = type_ids;
        artifacts.diagnostics = diagnostics;

        artifacts.complex_enum_members = complex_enums::resolve(graph, provider);

        for def in graph.types.values() {
            if def.modifiers.is_empty() {
                continue;
            }
            let Some(ids) = artifacts.type_ids.get(&def.name) else {
                continue;
            };
            for template in &def.modifiers {
                for id in ids.keys() {
                    let name = template.pattern.replace('$', id).to_ascii_lowercase();
                    artifacts
                        .templated_modifiers
                        .entry(name)
                        .or_default()
                        .insert(template.category.to_ascii_lowercase());
                }
            }
        }

        artifacts
    }

    /// Members of a simple or materialized complex enum.
    pub fn enum_members<'a>(
        &'a self,
        graph: &'a SchemaGraph,
        name: &str,
    ) -> Option<Vec<&'a str>> {
        if let Some(def) = graph.enums.get(name) {
            return Some(def.members.iter().map(String::as_str).collect());
        }
        self.complex_enum_members
            .get(name)
            .map(|set| set.iter().map(String::as_str).collect())
    }

    /// Scopes a modifier is valid in, consulting templated modifiers
    /// before the static table. `None` means the modifier is unknown.
    pub fn modifier_scopes(
        &self,
        graph: &SchemaGraph,
        name: &str,
    ) -> Option<BTreeSet<String>> {
        let lower = name.to_ascii_lowercase();
        if let Some(categories) = self.templated_modifiers.get(&lower) {
            let mut scopes = BTreeSet::new();
            for category in categories {
                if let Some(supported) = graph.modifiers.categories.get(category) {
                    scopes.extend(supported.iter().cloned());
                }
            }
            return Some(scopes);
        }
        graph.modifiers.scopes_for(&lower)
    }
}

/// Case-insensitive path filtering shared by type discovery and complex
/// enum resolution. An empty `paths` filter matches nothing.
pub(crate) fn path_matches(
    paths: &[String],
    path_strict: bool,
    path_file: Option<&str>,
    path_extension: Option<&str>,
    file_path: &str,
) -> bool {
    if paths.is_empty() {
        return false;
    }
    let lower = file_path.replace('\\', "/").to_ascii_lowercase();
    let (dir, file) = lower.rsplit_once('/').unwrap_or(("", lower.as_str()));

    if let Some(ext) = path_extension {
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        let has_ext = file.rsplit_once('.').is_some_and(|(_, e)| e == ext);
        if !has_ext {
            return false;
        }
    }
    if let Some(wanted) = path_file
        && file != wanted
    {
        return false;
    }

    paths.iter().any(|p| {
        if path_strict {
            dir == p.as_str()
        } else {
            dir == p.as_str() || dir.starts_with(&format!("{p}/"))
        }
    })
}
