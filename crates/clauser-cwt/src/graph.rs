//! The schema graph: a cross-file index of everything the `.cwt` rules
//! declare.
//!
//! The graph is an arena keyed by stable names; cross-references stay
//! name-based (no pointer back-edges), and recursive constructs (aliases,
//! single-aliases) are expanded on demand by their consumers with visited
//! sets. Building is a one-shot sequential computation; the result is
//! immutable and freely shareable.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use clauser_syntax::{Diagnostic, ParseOptions, ParsedSource, Severity};
use indexmap::IndexMap;

use crate::ir::{KeyFilter, RuleStatement, RuleValue};
use crate::lower::lower_file;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipRootKey {
    Any,
    Specific(Vec<String>),
}

impl SkipRootKey {
    pub fn matches(&self, key: &str) -> bool {
        match self {
            SkipRootKey::Any => true,
            SkipRootKey::Specific(keys) => keys.iter().any(|k| k.eq_ignore_ascii_case(key)),
        }
    }
}

/// `type[T] = { ... }` and everything attached to it.
#[derive(Debug, Clone)]
pub struct TypeDef {
    pub name: String,
    /// Directory filters, `game/` prefix stripped, lower-cased.
    pub path: Vec<String>,
    pub path_strict: bool,
    pub path_file: Option<String>,
    pub path_extension: Option<String>,
    pub name_field: Option<String>,
    pub type_per_file: bool,
    pub skip_root_key: Option<SkipRootKey>,
    pub starts_with: Option<String>,
    pub unique: bool,
    pub severity: Option<Severity>,
    pub type_key_filter: Option<KeyFilter>,
    pub subtypes: Vec<SubtypeDef>,
    pub localisation: Vec<LocTemplate>,
    pub modifiers: Vec<ModifierTemplate>,
}

#[derive(Debug, Clone)]
pub struct SubtypeDef {
    pub name: String,
    pub rules: Vec<RuleStatement>,
    pub options: crate::ir::RuleOptions,
}

/// `name = "$_desc"` under a type's `localisation` block. `$` substitutes
/// the discovered id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocTemplate {
    pub name: String,
    pub pattern: String,
    pub required: bool,
    pub primary: bool,
}

/// `$_modifier = category` under a type's `modifiers` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifierTemplate {
    pub pattern: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    pub name: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ComplexEnumDef {
    pub name: String,
    pub path: Vec<String>,
    pub path_file: Option<String>,
    pub path_extension: Option<String>,
    /// When false, matching begins inside each top-level entry instead of
    /// at the file root.
    pub start_from_root: bool,
    pub name_tree: Vec<RuleStatement>,
}

#[derive(Debug, Clone)]
pub struct AliasMember {
    pub name: String,
    pub statement: RuleStatement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    Scope,
    Value,
    Both,
}

impl LinkType {
    pub fn includes_scope(self) -> bool {
        matches!(self, LinkType::Scope | LinkType::Both)
    }

    pub fn includes_value(self) -> bool {
        matches!(self, LinkType::Value | LinkType::Both)
    }
}

/// One entry of `links.cwt`.
#[derive(Debug, Clone)]
pub struct ScopeLink {
    pub name: String,
    pub input_scopes: BTreeSet<String>,
    pub output_scope: String,
    pub prefix: Option<String>,
    pub link_type: LinkType,
    pub from_data: bool,
    /// Membership source for `from_data` links, e.g. `value[variable]`.
    pub data_source: Option<String>,
}

/// Scope names and their alias spellings from `scopes.cwt`.
#[derive(Debug, Clone, Default)]
pub struct ScopeTable {
    names: BTreeSet<String>,
    aliases: BTreeMap<String, String>,
}

impl ScopeTable {
    pub fn insert(&mut self, name: &str, aliases: impl IntoIterator<Item = String>) {
        let canonical = name.to_ascii_lowercase();
        self.names.insert(canonical.clone());
        self.aliases.insert(canonical.clone(), canonical.clone());
        for alias in aliases {
            self.aliases.insert(alias.to_ascii_lowercase(), canonical.clone());
        }
    }

    /// Canonical scope name for any spelling. `any` and `all` are wildcard
    /// scopes that always exist.
    pub fn canonical(&self, name: &str) -> Option<&str> {
        let lower = name.to_ascii_lowercase();
        if lower == "any" || lower == "all" {
            return Some("any");
        }
        self.aliases.get(&lower).map(String::as_str)
    }

    pub fn names(&self) -> &BTreeSet<String> {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Modifier names and categories, merged from `modifiers.cwt` and
/// `modifier_categories.cwt`.
#[derive(Debug, Clone, Default)]
pub struct ModifierTable {
    /// modifier name → categories.
    pub modifiers: BTreeMap<String, BTreeSet<String>>,
    /// category → supported scopes.
    pub categories: BTreeMap<String, BTreeSet<String>>,
}

impl ModifierTable {
    /// Union of the scopes supported by the modifier's categories; `None`
    /// for unknown modifiers, `Some(empty)` for known ones with no
    /// category metadata.
    pub fn scopes_for(&self, name: &str) -> Option<BTreeSet<String>> {
        let categories = self.modifiers.get(&name.to_ascii_lowercase())?;
        let mut scopes = BTreeSet::new();
        for category in categories {
            if let Some(supported) = self.categories.get(category) {
                scopes.extend(supported.iter().cloned());
            }
        }
        Some(scopes)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SchemaGraph {
    pub types: IndexMap<String, TypeDef>,
    /// Rule bodies for types, keyed by type name; merged across files.
    pub type_rules: IndexMap<String, Vec<RuleStatement>>,
    pub enums: IndexMap<String, EnumDef>,
    pub complex_enums: IndexMap<String, ComplexEnumDef>,
    /// alias family → members in declaration order.
    pub aliases: IndexMap<String, Vec<AliasMember>>,
    pub single_aliases: IndexMap<String, RuleStatement>,
    /// Declared `value[...]` memberships from `values.cwt`.
    pub value_sets: IndexMap<String, BTreeSet<String>>,
    pub scopes: ScopeTable,
    pub links: IndexMap<String, ScopeLink>,
    pub modifiers: ModifierTable,
    /// localisation command → scopes it is valid in.
    pub loc_commands: IndexMap<String, BTreeSet<String>>,
}

impl SchemaGraph {
    /// Builds the graph from named `.cwt` sources. Files are processed in
    /// name order so the result is independent of input ordering.
    pub fn build<'a>(
        files: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> (SchemaGraph, Vec<Diagnostic>) {
        let mut sorted: Vec<(&str, &str)> = files.into_iter().collect();
        sorted.sort_by_key(|(name, _)| name.to_string());

        let mut graph = SchemaGraph::default();
        let mut diagnostics = Vec::new();

        for (_name, content) in sorted {
            let carrier = ParsedSource::parse(content, ParseOptions::schema_dsl());
            diagnostics.extend(carrier.diagnostics().iter().cloned());
            let lowered = lower_file(&carrier);
            diagnostics.extend(lowered.diagnostics);
            for statement in &lowered.statements {
                graph.ingest_top_level(statement);
            }
        }

        (graph, diagnostics)
    }

    fn ingest_top_level(&mut self, statement: &RuleStatement) {
        if let Some(arg) = bracket_arg(&statement.key, "alias") {
            if let Some((family, member)) = arg.split_once(':') {
                self.aliases
                    .entry(family.to_string())
                    .or_default()
                    .push(AliasMember {
                        name: member.to_string(),
                        statement: statement.clone(),
                    });
            }
            return;
        }
        if let Some(name) = bracket_arg(&statement.key, "single_alias") {
            self.single_aliases.insert(name.to_string(), statement.clone());
            return;
        }

        match statement.key.as_str() {
            "types" => self.ingest_types(statement),
            "enums" => self.ingest_enums(statement),
            "values" => self.ingest_values(statement),
            "scopes" => self.ingest_scopes(statement),
            "links" => self.ingest_links(statement),
            "modifiers" => self.ingest_modifiers(statement),
            "modifier_categories" => self.ingest_modifier_categories(statement),
            "localisation_commands" => self.ingest_loc_commands(statement),
            _ => {
                // Anything else is a rule body for a (possibly
                // later-declared) type.
                if let RuleValue::Block(rules) = &statement.value {
                    self.type_rules
                        .entry(statement.key.clone())
                        .or_default()
                        .extend(rules.iter().cloned());
                }
            }
        }
    }

    fn ingest_types(&mut self, statement: &RuleStatement) {
        let Some(entries) = statement.value.as_block() else {
            return;
        };
        for entry in entries {
            let Some(name) = bracket_arg(&entry.key, "type") else {
                continue;
            };
            let def = parse_type_def(name, entry);
            self.types.insert(def.name.clone(), def);
        }
    }

    fn ingest_enums(&mut self, statement: &RuleStatement) {
        let Some(entries) = statement.value.as_block() else {
            return;
        };
        for entry in entries {
            if let Some(name) = bracket_arg(&entry.key, "enum") {
                let members = entry
                    .value
                    .as_block()
                    .map(|rules| rules.iter().map(|r| r.key.clone()).collect())
                    .unwrap_or_default();
                self.enums.insert(
                    name.to_string(),
                    EnumDef {
                        name: name.to_string(),
                        members,
                    },
                );
            } else if let Some(name) = bracket_arg(&entry.key, "complex_enum") {
                if let Some(def) = parse_complex_enum(name, entry) {
                    self.complex_enums.insert(name.to_string(), def);
                }
            }
        }
    }

    fn ingest_values(&mut self, statement: &RuleStatement) {
        let Some(entries) = statement.value.as_block() else {
            return;
        };
        for entry in entries {
            if let Some(name) = bracket_arg(&entry.key, "value") {
                let members = entry
                    .value
                    .as_block()
                    .map(|rules| rules.iter().map(|r| r.key.clone()).collect())
                    .unwrap_or_default();
                self.value_sets.insert(name.to_string(), members);
            }
        }
    }

    fn ingest_scopes(&mut self, statement: &RuleStatement) {
        let Some(entries) = statement.value.as_block() else {
            return;
        };
        for entry in entries {
            let aliases = entry
                .value
                .as_block()
                .and_then(|rules| rules.iter().find(|r| r.key == "aliases"))
                .and_then(|r| r.value.as_block())
                .map(|rules| rules.iter().map(|r| r.key.clone()).collect::<Vec<_>>())
                .unwrap_or_default();
            self.scopes.insert(&entry.key, aliases);
        }
    }

    fn ingest_links(&mut self, statement: &RuleStatement) {
        let Some(entries) = statement.value.as_block() else {
            return;
        };
        for entry in entries {
            let Some(body) = entry.value.as_block() else {
                continue;
            };
            let field = |key: &str| -> Option<&str> {
                body.iter()
                    .find(|r| r.key == key)
                    .and_then(|r| r.value.as_scalar_text())
            };
            let input_scopes = body
                .iter()
                .find(|r| r.key == "input_scopes")
                .and_then(|r| r.value.as_block())
                .map(|rules| {
                    rules
                        .iter()
                        .map(|r| r.key.to_ascii_lowercase())
                        .collect::<BTreeSet<_>>()
                })
                .or_else(|| {
                    field("input_scopes")
                        .map(|s| BTreeSet::from([s.to_ascii_lowercase()]))
                })
                .unwrap_or_default();

            let link_type = match field("type") {
                Some("value") => LinkType::Value,
                Some("both") => LinkType::Both,
                _ => LinkType::Scope,
            };

            self.links.insert(
                entry.key.clone(),
                ScopeLink {
                    name: entry.key.clone(),
                    input_scopes,
                    output_scope: field("output_scope")
                        .map(|s| s.to_ascii_lowercase())
                        .unwrap_or_else(|| "any".to_string()),
                    prefix: field("prefix").map(str::to_string),
                    link_type,
                    from_data: field("from_data") == Some("yes"),
                    data_source: field("data_source").map(str::to_string),
                },
            );
        }
    }

    fn ingest_modifiers(&mut self, statement: &RuleStatement) {
        let Some(entries) = statement.value.as_block() else {
            return;
        };
        for entry in entries {
            let categories: BTreeSet<String> = match &entry.value {
                RuleValue::Scalar { text, .. } => BTreeSet::from([text.to_ascii_lowercase()]),
                RuleValue::Block(rules) => rules
                    .iter()
                    .find(|r| r.key == "categories")
                    .and_then(|r| r.value.as_block())
                    .map(|rules| rules.iter().map(|r| r.key.to_ascii_lowercase()).collect())
                    .unwrap_or_default(),
            };
            self.modifiers
                .modifiers
                .insert(entry.key.to_ascii_lowercase(), categories);
        }
    }

    fn ingest_modifier_categories(&mut self, statement: &RuleStatement) {
        let Some(entries) = statement.value.as_block() else {
            return;
        };
        for entry in entries {
            let scopes = entry
                .value
                .as_block()
                .and_then(|rules| rules.iter().find(|r| r.key == "supported_scopes"))
                .and_then(|r| r.value.as_block())
                .map(|rules| {
                    rules
                        .iter()
                        .map(|r| r.key.to_ascii_lowercase())
                        .collect::<BTreeSet<_>>()
                })
                .unwrap_or_default();
            self.modifiers
                .categories
                .insert(entry.key.to_ascii_lowercase(), scopes);
        }
    }

    fn ingest_loc_commands(&mut self, statement: &RuleStatement) {
        let Some(entries) = statement.value.as_block() else {
            return;
        };
        for entry in entries {
            let scopes = entry
                .value
                .as_block()
                .map(|rules| {
                    rules
                        .iter()
                        .map(|r| r.key.to_ascii_lowercase())
                        .collect::<BTreeSet<_>>()
                })
                .unwrap_or_default();
            self.loc_commands.insert(entry.key.clone(), scopes);
        }
    }
}

/// `name[arg]` → `arg` when `name` matches.
pub(crate) fn bracket_arg<'a>(key: &'a str, name: &str) -> Option<&'a str> {
    let rest = key.strip_prefix(name)?;
    rest.strip_prefix('[')?.strip_suffix(']')
}

/// `subtype[x]` → `x`; used wherever rule bodies are flattened against an
/// active subtype.
pub fn subtype_key(key: &str) -> Option<&str> {
    bracket_arg(key, "subtype")
}

/// Normalizes a `path = "game/common/x"` filter for matching.
fn normalize_path(path: &str) -> String {
    let lower = path.replace('\\', "/").to_ascii_lowercase();
    let lower = lower.trim_matches('/');
    lower.strip_prefix("game/").unwrap_or(lower).to_string()
}

fn parse_type_def(name: &str, entry: &RuleStatement) -> TypeDef {
    let mut def = TypeDef {
        name: name.to_string(),
        path: Vec::new(),
        path_strict: false,
        path_file: None,
        path_extension: None,
        name_field: None,
        type_per_file: false,
        skip_root_key: None,
        starts_with: None,
        unique: false,
        severity: entry.options.severity,
        type_key_filter: entry.options.type_key_filter.clone(),
        subtypes: Vec::new(),
        localisation: Vec::new(),
        modifiers: Vec::new(),
    };

    let Some(body) = entry.value.as_block() else {
        return def;
    };

    let mut skip_keys: Vec<String> = Vec::new();
    for rule in body {
        if let Some(subtype) = bracket_arg(&rule.key, "subtype") {
            def.subtypes.push(SubtypeDef {
                name: subtype.to_string(),
                rules: rule.value.as_block().map(<[_]>::to_vec).unwrap_or_default(),
                options: rule.options.clone(),
            });
            continue;
        }
        match (rule.key.as_str(), &rule.value) {
            ("path", RuleValue::Scalar { text, .. }) => def.path.push(normalize_path(text)),
            ("path_strict", RuleValue::Scalar { text, .. }) => def.path_strict = text == "yes",
            ("path_file", RuleValue::Scalar { text, .. }) => {
                def.path_file = Some(text.to_ascii_lowercase());
            }
            ("path_extension", RuleValue::Scalar { text, .. }) => {
                def.path_extension = Some(text.to_ascii_lowercase());
            }
            ("name_field", RuleValue::Scalar { text, .. }) => {
                def.name_field = Some(text.clone());
            }
            ("type_per_file", RuleValue::Scalar { text, .. }) => {
                def.type_per_file = text == "yes";
            }
            ("unique", RuleValue::Scalar { text, .. }) => def.unique = text == "yes",
            ("starts_with", RuleValue::Scalar { text, .. }) => {
                def.starts_with = Some(text.clone());
            }
            ("skip_root_key", RuleValue::Scalar { text, .. }) => {
                if text == "any" {
                    def.skip_root_key = Some(SkipRootKey::Any);
                } else {
                    skip_keys.push(text.clone());
                }
            }
            ("skip_root_key", RuleValue::Block(rules)) => {
                skip_keys.extend(rules.iter().map(|r| r.key.clone()));
            }
            ("localisation", RuleValue::Block(rules)) => {
                for loc in rules {
                    if let RuleValue::Scalar { text, .. } = &loc.value {
                        def.localisation.push(LocTemplate {
                            name: loc.key.clone(),
                            pattern: text.clone(),
                            required: loc.options.required,
                            primary: loc.options.primary,
                        });
                    }
                }
            }
            ("modifiers", RuleValue::Block(rules)) => {
                for modifier in rules {
                    if let RuleValue::Scalar { text, .. } = &modifier.value {
                        def.modifiers.push(ModifierTemplate {
                            pattern: modifier.key.clone(),
                            category: text.clone(),
                        });
                    }
                }
            }
            _ => {}
        }
    }
    if !skip_keys.is_empty() && def.skip_root_key.is_none() {
        def.skip_root_key = Some(SkipRootKey::Specific(skip_keys));
    }
    def
}

fn parse_complex_enum(name: &str, entry: &RuleStatement) -> Option<ComplexEnumDef> {
    let body = entry.value.as_block()?;
    let mut def = ComplexEnumDef {
        name: name.to_string(),
        path: Vec::new(),
        path_file: None,
        path_extension: None,
        start_from_root: true,
        name_tree: Vec::new(),
    };
    for rule in body {
        match (rule.key.as_str(), &rule.value) {
            ("path", RuleValue::Scalar { text, .. }) => def.path.push(normalize_path(text)),
            ("path_file", RuleValue::Scalar { text, .. }) => {
                def.path_file = Some(text.to_ascii_lowercase());
            }
            ("path_extension", RuleValue::Scalar { text, .. }) => {
                def.path_extension = Some(text.to_ascii_lowercase());
            }
            ("start_from_root", RuleValue::Scalar { text, .. }) => {
                def.start_from_root = text == "yes";
            }
            ("name", RuleValue::Block(rules)) => def.name_tree = rules.clone(),
            _ => {}
        }
    }
    Some(def)
}
