//! CWTools `.cwt` schema ingest.
//!
//! `.cwt` files parse through the same lossless pipeline as game script
//! (with the schema-DSL lexing context), lower into a normalized rule IR
//! with `##` option and `###` doc metadata attached, and aggregate into a
//! [`SchemaGraph`]. Adapters then materialize the deterministic artifacts
//! the type checker consumes: discovered type ids, complex-enum member
//! sets, subtype matchers, alias expansion, and the special-file tables
//! (scopes, links, modifiers, localisation commands, values).

pub mod adapters;
pub mod field;
pub mod graph;
pub mod ir;
pub mod lower;
pub mod provider;

#[cfg(test)]
mod graph_tests;

pub use adapters::types::{EntryObject, IdEntry, TYPECHECK_DUPLICATE_DEFINITION};
pub use adapters::SchemaArtifacts;
pub use field::FieldKind;
pub use graph::{
    AliasMember, ComplexEnumDef, EnumDef, LinkType, LocTemplate, ModifierTable, ModifierTemplate,
    SchemaGraph, ScopeLink, ScopeTable, SkipRootKey, SubtypeDef, TypeDef, subtype_key,
};
pub use ir::{Cardinality, KeyFilter, RuleOptions, RuleStatement, RuleValue};
pub use lower::{LoweredFile, lower_file};
pub use provider::{
    AssetRegistry, DirFiles, FileProvider, LocalisationKeys, MemoryAssets, MemoryFiles,
    MemoryLocalisation,
};

/// Errors from filesystem-backed providers. Schema problems are
/// diagnostics, never errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("directory walk failed: {0}")]
    Walk(String),
}
