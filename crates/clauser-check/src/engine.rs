//! The type-check engine: a deterministic walk of analysis facts against
//! the schema graph.
//!
//! Checking is staged: a first pass over the project collects dynamic
//! `value_set[...]` writes, a second pass validates each file against the
//! graph, the adapter artifacts and the merged value sets. Within one walk
//! the engine matches every field occurrence to its candidate rules,
//! validates scalar values, and recurses into block values with scope
//! transitions; the rule stack then reads the resolved picture and emits
//! diagnostics. No rule aborts the walk.

use std::collections::{BTreeMap, BTreeSet};

use clauser_cwt::adapters::{aliases, subtypes, types};
use clauser_cwt::{
    AssetRegistry, FieldKind, LocalisationKeys, RuleStatement, SchemaArtifacts, SchemaGraph,
    TypeDef,
};
use clauser_syntax::ast::scalar::{Number, ScalarValue, interpret_scalar};
use clauser_syntax::{
    Category, Diagnostic, DiagnosticSink, Facts, LocalisationCoverage, ObjectFact, ParsedSource,
    Severity, UnresolvedPolicy, ValueFact,
};

use crate::rules::{
    Candidate, EntryInfo, Failure, FieldResolution, ObjectCx, Resolution, RuleRef, Runner, codes,
};
use crate::scope::{ChainEnv, ChainKind, ScopeContext, compatible, resolve_chain};

/// `value_set[...]` writes discovered across the project: set name →
/// members.
pub type DynamicValues = BTreeMap<String, BTreeSet<String>>;

const MAX_DEPTH: u32 = 128;

#[derive(Debug, Clone, Copy, Default)]
pub struct CheckOptions {
    /// Report known modifiers with missing category metadata.
    pub strict_modifiers: bool,
}

pub struct CheckEngine<'a> {
    graph: &'a SchemaGraph,
    artifacts: &'a SchemaArtifacts,
    assets: Option<&'a dyn AssetRegistry>,
    localisation: Option<&'a dyn LocalisationKeys>,
    options: CheckOptions,
    runner: Runner,
}

impl<'a> CheckEngine<'a> {
    pub fn new(graph: &'a SchemaGraph, artifacts: &'a SchemaArtifacts) -> CheckEngine<'a> {
        CheckEngine {
            graph,
            artifacts,
            assets: None,
            localisation: None,
            options: CheckOptions::default(),
            runner: Runner::default_stack(),
        }
    }

    /// Replaces the rule stack. [`Runner::typecheck`] has already rejected
    /// any rule violating the contract.
    pub fn with_runner(
        graph: &'a SchemaGraph,
        artifacts: &'a SchemaArtifacts,
        runner: Runner,
    ) -> CheckEngine<'a> {
        CheckEngine {
            runner,
            ..CheckEngine::new(graph, artifacts)
        }
    }

    pub fn assets(mut self, assets: &'a dyn AssetRegistry) -> Self {
        self.assets = Some(assets);
        self
    }

    pub fn localisation(mut self, localisation: &'a dyn LocalisationKeys) -> Self {
        self.localisation = Some(localisation);
        self
    }

    pub fn options(mut self, options: CheckOptions) -> Self {
        self.options = options;
        self
    }

    /// Pass 1: dynamic `value_set[...]` writes in one file.
    pub fn collect_values(&self, path: &str, carrier: &ParsedSource) -> DynamicValues {
        let empty = DynamicValues::new();
        let mut walk = Walk::new(self, carrier, &empty, true);
        walk.run(path);
        walk.writes
    }

    /// Pass 2: diagnostics for one file, given the merged dynamic values.
    pub fn check_file(
        &self,
        path: &str,
        carrier: &ParsedSource,
        dynamic: &DynamicValues,
    ) -> Vec<Diagnostic> {
        let mut walk = Walk::new(self, carrier, dynamic, false);
        walk.run(path);
        walk.sink.into_vec()
    }

    /// Both passes over a whole project, in file order.
    pub fn check_project(&self, files: &[(&str, &ParsedSource)]) -> Vec<Diagnostic> {
        let mut dynamic = DynamicValues::new();
        for &(path, carrier) in files {
            for (set, members) in self.collect_values(path, carrier) {
                dynamic.entry(set).or_default().extend(members);
            }
        }

        let mut out = Vec::new();
        for &(path, carrier) in files {
            out.extend(self.check_file(path, carrier, &dynamic));
        }
        out
    }
}

struct Walk<'s, 'a> {
    engine: &'s CheckEngine<'a>,
    facts: &'s Facts,
    policy: UnresolvedPolicy,
    coverage: LocalisationCoverage,
    sink: DiagnosticSink,
    dynamic: &'s DynamicValues,
    writes: DynamicValues,
    collect_only: bool,
}

impl<'s, 'a: 's> Walk<'s, 'a> {
    fn new(
        engine: &'s CheckEngine<'a>,
        carrier: &'s ParsedSource,
        dynamic: &'s DynamicValues,
        collect_only: bool,
    ) -> Walk<'s, 'a> {
        Walk {
            engine,
            facts: carrier.facts(),
            policy: carrier.options().unresolved_reference_policy,
            coverage: carrier.options().localisation_coverage,
            sink: DiagnosticSink::new(),
            dynamic,
            writes: DynamicValues::new(),
            collect_only,
        }
    }

    fn run(&mut self, path: &str) {
        let mut claimed = BTreeSet::new();
        for def in self.engine.graph.types.values() {
            if !types::file_matches(def, path) {
                continue;
            }
            for entry in types::entry_objects(def, self.facts, path) {
                // The first type whose filters admit an object governs it.
                if !claimed.insert(entry.object.id) {
                    continue;
                }
                self.check_entry(def, &entry);
            }
        }
    }

    fn check_entry(&mut self, def: &'s TypeDef, entry: &types::EntryObject<'s>) {
        let subtype = subtypes::select_subtype(def, entry.key.as_deref(), entry.object);
        let mut scope = ScopeContext::new("any");
        if let Some(st) = subtype {
            scope = apply_scope_options(&scope, &st.options);
        }

        let rules: Vec<&'s RuleStatement> = flatten_rules(
            self.engine
                .graph
                .type_rules
                .get(&def.name)
                .map(Vec::as_slice)
                .unwrap_or_default(),
            subtype.map(|s| s.name.as_str()),
        );

        let info = EntryInfo {
            type_name: &def.name,
            id: entry.id.clone(),
            subtype: subtype.map(|s| s.name.as_str()),
            key_range: entry.key_range,
            templates: &def.localisation,
        };
        self.check_object(
            &rules,
            entry.object,
            &scope,
            Some(&info),
            subtype.map(|s| s.name.as_str()),
            0,
        );
    }

    fn check_object(
        &mut self,
        rules: &[&'s RuleStatement],
        object: &'s ObjectFact,
        scope: &ScopeContext,
        entry: Option<&EntryInfo<'_>>,
        active_subtype: Option<&str>,
        depth: u32,
    ) {
        if depth > MAX_DEPTH {
            // Internal invariant: rule recursion must be bounded by the
            // finite source. Terminate this subtree cleanly.
            self.sink.push(Diagnostic::new(
                codes::TYPECHECK_INTERNAL,
                Severity::Error,
                Category::Typecheck,
                object.range,
                "internal error: rule recursion limit exceeded",
            ));
            return;
        }

        let resolution = self.resolve(rules, object, scope);

        if !self.collect_only {
            let cx = ObjectCx {
                graph: self.engine.graph,
                artifacts: self.engine.artifacts,
                assets: self.engine.assets,
                localisation: self.engine.localisation,
                object,
                scope,
                resolution: &resolution,
                entry,
                unresolved_policy: self.policy,
                coverage: self.coverage,
                strict_modifiers: self.engine.options.strict_modifiers,
            };
            self.engine.runner.run(&cx, &mut self.sink);
        }

        // Scope transitions and recursion into block values. Each child
        // gets its own cloned context, so siblings stay isolated.
        for field in &resolution.fields {
            let Some(chosen) = field.block_candidate else {
                continue;
            };
            let candidate = &field.candidates[chosen];
            let Some(body) = candidate.body else {
                continue;
            };
            let child_id = match field.value {
                ValueFact::Object(id) => *id,
                ValueFact::Tagged { body: id, .. } => *id,
                _ => continue,
            };

            let mut child_scope = apply_scope_options(scope, candidate.options());
            if let Some(key_scope) = &candidate.key_scope {
                child_scope = scope.pushed(key_scope);
            }

            let body_rules = flatten_rules(body, active_subtype);
            self.check_object(
                &body_rules,
                self.facts.get(child_id),
                &child_scope,
                None,
                active_subtype,
                depth + 1,
            );
        }
    }

    // --- matching ---

    fn resolve(
        &mut self,
        rules: &[&'s RuleStatement],
        object: &'s ObjectFact,
        scope: &ScopeContext,
    ) -> Resolution<'s> {
        let rule_refs: Vec<RuleRef<'s>> = rules
            .iter()
            .map(|&rule| RuleRef {
                rule,
                key_kind: FieldKind::parse(&rule.key),
                bare: is_bare(rule),
            })
            .collect();
        let mut counts = vec![0u32; rule_refs.len()];
        let mut fields = Vec::new();

        for (key, occurrences) in &object.fields {
            for field in occurrences {
                let mut modifier_scopes = None;
                let mut candidates: Vec<Candidate<'s>> = Vec::new();
                for (idx, rule_ref) in rule_refs.iter().enumerate() {
                    if rule_ref.bare {
                        continue;
                    }
                    self.match_key(
                        idx,
                        rule_ref,
                        key,
                        scope,
                        &mut candidates,
                        &mut modifier_scopes,
                    );
                }

                let is_block = matches!(
                    field.value,
                    ValueFact::Object(_) | ValueFact::Tagged { .. }
                );
                let block_candidate = is_block
                    .then(|| candidates.iter().position(|c| c.body.is_some()))
                    .flatten();

                let mut accepted = Vec::new();
                let mut first_failure: Option<Failure> = None;
                if let ValueFact::Scalar { text, was_quoted, .. } = &field.value {
                    for (ci, candidate) in candidates.iter().enumerate() {
                        let Some(spec) = &candidate.spec else {
                            continue;
                        };
                        let result = if candidate.scope_ok {
                            // The rule's own scope transitions govern its
                            // value as well as its subtree.
                            let rule_scope = apply_scope_options(scope, candidate.options());
                            self.validate_scalar(spec, text, *was_quoted, &rule_scope)
                        } else {
                            Err(Failure::Scope(format!(
                                "`{key}` is not valid in {} scope",
                                scope.current
                            )))
                        };
                        match result {
                            Ok(()) => accepted.push(ci),
                            Err(failure) => {
                                if first_failure.is_none() {
                                    first_failure = Some(failure);
                                }
                            }
                        }
                    }
                }

                // One count per occurrence, attributed to the candidate
                // that actually governs it.
                let governing = block_candidate
                    .or_else(|| accepted.first().copied())
                    .or(if candidates.is_empty() { None } else { Some(0) });
                if let Some(ci) = governing {
                    counts[candidates[ci].rule_idx] += 1;
                }

                fields.push(FieldResolution {
                    key,
                    key_range: field.key_range,
                    value: &field.value,
                    value_range: field.value.range_in(self.facts),
                    is_block,
                    candidates,
                    accepted,
                    first_failure,
                    block_candidate,
                    modifier_scopes,
                });
            }
        }

        let item_failures = self.resolve_items(&rule_refs, &mut counts, object, scope);

        Resolution {
            rules: rule_refs,
            counts,
            fields,
            item_failures,
        }
    }

    fn resolve_items(
        &mut self,
        rule_refs: &[RuleRef<'s>],
        counts: &mut [u32],
        object: &'s ObjectFact,
        scope: &ScopeContext,
    ) -> Vec<(clauser_syntax::TextRange, Failure)> {
        let mut failures = Vec::new();
        let bare: Vec<usize> = rule_refs
            .iter()
            .enumerate()
            .filter(|(_, r)| r.bare)
            .map(|(i, _)| i)
            .collect();

        for item in &object.items {
            let ValueFact::Scalar {
                text,
                was_quoted,
                range,
            } = &item.value
            else {
                continue;
            };
            if bare.is_empty() {
                if !rule_refs.is_empty() {
                    failures.push((
                        *range,
                        Failure::Type(format!("`{text}` is not expected here")),
                    ));
                }
                continue;
            }

            let mut matched = false;
            let mut first: Option<Failure> = None;
            for &idx in &bare {
                let result =
                    self.validate_scalar(&rule_refs[idx].key_kind, text, *was_quoted, scope);
                match result {
                    Ok(()) => {
                        counts[idx] += 1;
                        matched = true;
                        break;
                    }
                    Err(failure) => {
                        if first.is_none() {
                            first = Some(failure);
                        }
                    }
                }
            }
            if !matched {
                failures.push((
                    *range,
                    first.unwrap_or_else(|| {
                        Failure::Type(format!("`{text}` is not a valid entry"))
                    }),
                ));
            }
        }
        failures
    }

    /// Adds every candidate this rule contributes for `key`.
    fn match_key(
        &mut self,
        rule_idx: usize,
        rule_ref: &RuleRef<'s>,
        key: &str,
        scope: &ScopeContext,
        candidates: &mut Vec<Candidate<'s>>,
        modifier_scopes: &mut Option<BTreeSet<String>>,
    ) {
        let graph = self.engine.graph;
        let rule = rule_ref.rule;

        let mut push_plain = |candidates: &mut Vec<Candidate<'s>>, key_scope: Option<String>| {
            candidates.push(Candidate {
                rule_idx,
                stmt: rule,
                spec: rule.value.as_scalar_text().map(FieldKind::parse),
                body: aliases::effective_block(graph, rule),
                scope_ok: scope_gate(&rule.options.scopes, scope),
                key_scope,
            });
        };

        match &rule_ref.key_kind {
            FieldKind::Literal(lit) => {
                if lit.eq_ignore_ascii_case(key) {
                    push_plain(candidates, None);
                }
            }
            FieldKind::Scalar => push_plain(candidates, None),
            FieldKind::Int { min, max } => {
                if int_in_range(key, *min, *max) {
                    push_plain(candidates, None);
                }
            }
            FieldKind::Float { min, max } => {
                if float_in_range(key, *min, *max) {
                    push_plain(candidates, None);
                }
            }
            FieldKind::Enum(name) => {
                if self.enum_contains(name, key) {
                    push_plain(candidates, None);
                }
            }
            FieldKind::TypeRef { .. } => {
                if self
                    .type_ref_accepts(&rule_ref.key_kind, key)
                    .is_ok()
                {
                    push_plain(candidates, None);
                }
            }
            FieldKind::Value(name) => {
                if self.value_set_contains(name, key) {
                    push_plain(candidates, None);
                }
            }
            FieldKind::ValueSet(name) => {
                self.writes
                    .entry(name.clone())
                    .or_default()
                    .insert(key.to_string());
                push_plain(candidates, None);
            }
            FieldKind::Scope(expected) => {
                match self.resolve_scope_chain(key, scope) {
                    Ok(out) => {
                        let ok = compatible(expected, &out);
                        candidates.push(Candidate {
                            rule_idx,
                            stmt: rule,
                            spec: rule.value.as_scalar_text().map(FieldKind::parse),
                            body: aliases::effective_block(graph, rule),
                            scope_ok: ok && scope_gate(&rule.options.scopes, scope),
                            key_scope: Some(out),
                        });
                    }
                    Err(_) => {}
                }
            }
            FieldKind::ScopeField | FieldKind::EventTarget(_) => {
                if let Ok(out) = self.resolve_scope_chain(key, scope) {
                    push_plain(candidates, Some(out));
                }
            }
            FieldKind::AliasName(family) => {
                let mut any_member = false;
                for member in aliases::family_members(graph, family) {
                    if !self.member_matches(&FieldKind::parse(&member.name), key, scope) {
                        continue;
                    }
                    any_member = true;
                    candidates.push(Candidate {
                        rule_idx,
                        stmt: &member.statement,
                        spec: member.statement.value.as_scalar_text().map(FieldKind::parse),
                        body: aliases::effective_block(graph, &member.statement),
                        scope_ok: scope_gate(&member.statement.options.scopes, scope),
                        key_scope: None,
                    });
                }
                if !any_member
                    && let Some(scopes) = self.engine.artifacts.modifier_scopes(graph, key)
                {
                    *modifier_scopes = Some(scopes);
                    candidates.push(Candidate {
                        rule_idx,
                        stmt: rule,
                        spec: Some(FieldKind::VariableField { int: false }),
                        body: None,
                        scope_ok: true,
                        key_scope: None,
                    });
                }
            }
            FieldKind::AliasKeysField(family) => {
                if aliases::family_members(graph, family)
                    .iter()
                    .any(|m| m.name.eq_ignore_ascii_case(key))
                {
                    push_plain(candidates, None);
                }
            }
            _ => {}
        }
    }

    /// Simplified key matching for alias member names.
    fn member_matches(&mut self, kind: &FieldKind, key: &str, scope: &ScopeContext) -> bool {
        match kind {
            FieldKind::Literal(lit) => lit.eq_ignore_ascii_case(key),
            FieldKind::Scalar => true,
            FieldKind::Enum(name) => self.enum_contains(name, key),
            FieldKind::TypeRef { .. } => self.type_ref_accepts(kind, key).is_ok(),
            FieldKind::Value(name) => self.value_set_contains(name, key),
            FieldKind::ValueSet(name) => {
                self.writes
                    .entry(name.clone())
                    .or_default()
                    .insert(key.to_string());
                true
            }
            FieldKind::Int { min, max } => int_in_range(key, *min, *max),
            FieldKind::Scope(expected) => self
                .resolve_scope_chain(key, scope)
                .map(|out| compatible(expected, &out))
                .unwrap_or(false),
            FieldKind::ScopeField => self.resolve_scope_chain(key, scope).is_ok(),
            _ => false,
        }
    }

    // --- scalar validation ---

    fn validate_scalar(
        &mut self,
        spec: &FieldKind,
        text: &str,
        was_quoted: bool,
        scope: &ScopeContext,
    ) -> Result<(), Failure> {
        match spec {
            FieldKind::Bool => match text {
                "yes" | "no" if !was_quoted => Ok(()),
                _ => Err(Failure::Type("expected `yes` or `no`".into())),
            },
            FieldKind::Int { min, max } => {
                if int_in_range(text, *min, *max) {
                    Ok(())
                } else {
                    Err(Failure::Type(match (min, max) {
                        (None, None) => "expected an integer".to_string(),
                        _ => format!(
                            "expected an integer between {} and {}",
                            min.map_or("-inf".into(), |v| v.to_string()),
                            max.map_or("inf".into(), |v| v.to_string())
                        ),
                    }))
                }
            }
            FieldKind::Float { min, max } => {
                if float_in_range(text, *min, *max) {
                    Ok(())
                } else {
                    Err(Failure::Type("expected a number".into()))
                }
            }
            FieldKind::Scalar => Ok(()),
            FieldKind::PercentageField => {
                let digits = text.strip_suffix('%').unwrap_or("");
                if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                    Ok(())
                } else {
                    Err(Failure::Type("expected a percentage like `50%`".into()))
                }
            }
            FieldKind::DateField => match interpret_scalar(text) {
                ScalarValue::Date(_) => Ok(()),
                _ => Err(Failure::Type("expected a date like `1444.11.11`".into())),
            },
            FieldKind::Localisation
            | FieldKind::LocalisationSynced
            | FieldKind::LocalisationInline => Ok(()),
            FieldKind::Filepath { prefix, extension } => {
                let Some(assets) = self.engine.assets else {
                    return Ok(());
                };
                let full = format!(
                    "{}{}{}",
                    prefix.as_deref().unwrap_or(""),
                    text,
                    extension.as_deref().unwrap_or("")
                );
                if assets.file_exists(&full) {
                    Ok(())
                } else {
                    Err(Failure::Reference(format!("file `{full}` does not exist")))
                }
            }
            FieldKind::Icon { path } => {
                let Some(assets) = self.engine.assets else {
                    return Ok(());
                };
                let full = format!("{path}/{text}.dds");
                if assets.file_exists(&full) {
                    Ok(())
                } else {
                    Err(Failure::Reference(format!("icon `{full}` does not exist")))
                }
            }
            FieldKind::VariableField { int } | FieldKind::ValueField { int } => {
                match interpret_scalar(text) {
                    ScalarValue::Number(Number::Int(_) | Number::Wide(_)) => Ok(()),
                    ScalarValue::Number(Number::Decimal(_)) if !int => Ok(()),
                    ScalarValue::Number(_) => {
                        Err(Failure::Type("expected an integer value".into()))
                    }
                    _ => match self.resolve_value_chain(text, scope) {
                        Ok(()) => Ok(()),
                        Err(failure) => Err(failure),
                    },
                }
            }
            FieldKind::Enum(name) => {
                if self.enum_contains(name, text) {
                    Ok(())
                } else {
                    Err(Failure::Reference(format!(
                        "`{text}` is not a member of `{name}`"
                    )))
                }
            }
            FieldKind::TypeRef { .. } => self.type_ref_accepts(spec, text),
            FieldKind::Scope(expected) => match self.resolve_scope_chain(text, scope) {
                Ok(out) => {
                    if compatible(expected, &out) {
                        Ok(())
                    } else {
                        Err(Failure::Scope(format!(
                            "`{text}` yields {out} scope, expected {expected}"
                        )))
                    }
                }
                Err(failure) => Err(failure),
            },
            FieldKind::ScopeField | FieldKind::EventTarget(_) => {
                self.resolve_scope_chain(text, scope).map(|_| ())
            }
            FieldKind::Value(name) => {
                if self.value_set_contains(name, text) {
                    Ok(())
                } else {
                    Err(Failure::Reference(format!(
                        "`{text}` is not a member of value set `{name}`"
                    )))
                }
            }
            FieldKind::ValueSet(name) => {
                self.writes
                    .entry(name.clone())
                    .or_default()
                    .insert(text.to_string());
                Ok(())
            }
            FieldKind::AliasKeysField(family) => {
                if aliases::family_members(self.engine.graph, family)
                    .iter()
                    .any(|m| m.name.eq_ignore_ascii_case(text))
                {
                    Ok(())
                } else {
                    Err(Failure::Reference(format!(
                        "`{text}` is not a `{family}` key"
                    )))
                }
            }
            FieldKind::Literal(lit) => {
                if lit.eq_ignore_ascii_case(text) {
                    Ok(())
                } else {
                    Err(Failure::Type(format!("expected `{lit}`")))
                }
            }
            FieldKind::AliasName(_)
            | FieldKind::AliasMatchLeft(_)
            | FieldKind::SingleAliasRight(_)
            | FieldKind::UnknownBracket { .. } => Err(Failure::Unresolved(format!(
                "cannot resolve `{text}` against this rule"
            ))),
        }
    }

    // --- shared membership helpers ---

    fn enum_contains(&self, name: &str, value: &str) -> bool {
        self.engine
            .artifacts
            .enum_members(self.engine.graph, name)
            .is_some_and(|members| members.iter().any(|m| m.eq_ignore_ascii_case(value)))
    }

    fn value_set_contains(&self, name: &str, value: &str) -> bool {
        let declared = self
            .engine
            .graph
            .value_sets
            .get(name)
            .is_some_and(|set| set.contains(value));
        let dynamic = self
            .dynamic
            .get(name)
            .is_some_and(|set| set.contains(value));
        declared || dynamic
    }

    fn type_ref_accepts(&self, spec: &FieldKind, text: &str) -> Result<(), Failure> {
        let FieldKind::TypeRef {
            type_name,
            subtype,
            prefix,
            suffix,
        } = spec
        else {
            unreachable!("caller checked the kind");
        };

        let mut id = text;
        if let Some(p) = prefix {
            id = id
                .strip_prefix(p.as_str())
                .ok_or_else(|| Failure::Type(format!("expected a `{p}`-prefixed value")))?;
        }
        if let Some(s) = suffix {
            id = id
                .strip_suffix(s.as_str())
                .ok_or_else(|| Failure::Type(format!("expected a `{s}`-suffixed value")))?;
        }

        if let Some(ids) = self.engine.artifacts.type_ids.get(type_name) {
            let entry = ids
                .iter()
                .find(|(known, _)| known.eq_ignore_ascii_case(id));
            return match entry {
                Some((_, info)) => match subtype {
                    Some(wanted) if !info.subtypes.contains(wanted) => {
                        Err(Failure::Reference(format!(
                            "`{id}` is not a {type_name}.{wanted}"
                        )))
                    }
                    _ => Ok(()),
                },
                None => Err(Failure::Reference(format!(
                    "`{id}` is not a known {type_name}"
                ))),
            };
        }

        // `<spriteType>` resolves through the asset registry.
        if type_name.eq_ignore_ascii_case("spritetype") {
            if let Some(assets) = self.engine.assets {
                return if assets.sprite_names().contains(id) {
                    Ok(())
                } else {
                    Err(Failure::Reference(format!("`{id}` is not a known sprite")))
                };
            }
        }

        Err(Failure::Unresolved(format!("unknown type `{type_name}`")))
    }

    fn resolve_scope_chain(&self, text: &str, scope: &ScopeContext) -> Result<String, Failure> {
        self.resolve_chain(text, scope, ChainKind::Scope)
    }

    fn resolve_value_chain(&self, text: &str, scope: &ScopeContext) -> Result<(), Failure> {
        self.resolve_chain(text, scope, ChainKind::Value).map(|_| ())
    }

    fn resolve_chain(
        &self,
        text: &str,
        scope: &ScopeContext,
        kind: ChainKind,
    ) -> Result<String, Failure> {
        let graph = self.engine.graph;
        let artifacts = self.engine.artifacts;
        let dynamic = self.dynamic;
        let oracle = move |spec: &FieldKind, data: &str| -> bool {
            match spec {
                FieldKind::Value(name) | FieldKind::ValueSet(name) => {
                    graph
                        .value_sets
                        .get(name)
                        .is_some_and(|set| set.contains(data))
                        || dynamic.get(name).is_some_and(|set| set.contains(data))
                }
                FieldKind::Enum(name) => artifacts
                    .enum_members(graph, name)
                    .is_some_and(|members| members.iter().any(|m| m.eq_ignore_ascii_case(data))),
                FieldKind::TypeRef { type_name, .. } => artifacts
                    .type_ids
                    .get(type_name)
                    .is_some_and(|ids| ids.keys().any(|k| k.eq_ignore_ascii_case(data))),
                _ => true,
            }
        };
        let env = ChainEnv {
            graph,
            is_member: &oracle,
        };
        resolve_chain(&env, scope, text, kind).map_err(|e| match e {
            crate::scope::ChainError::UnknownSegment(_) => Failure::Unresolved(e.to_string()),
            crate::scope::ChainError::InputScope { .. } => Failure::Scope(e.to_string()),
            crate::scope::ChainError::DataSource { .. }
            | crate::scope::ChainError::WrongLinkType(_) => Failure::Reference(e.to_string()),
        })
    }
}

// --- free helpers ---

fn apply_scope_options(scope: &ScopeContext, options: &clauser_cwt::RuleOptions) -> ScopeContext {
    scope.with_rule_options(options)
}

fn scope_gate(scopes: &[String], scope: &ScopeContext) -> bool {
    scopes.is_empty()
        || scope.current == "any"
        || scopes.iter().any(|s| compatible(s, &scope.current))
}

/// `subtype[x]` blocks filter by the active subtype (with `!x` negation);
/// everything else passes through.
fn flatten_rules<'w>(
    rules: impl IntoIterator<Item = &'w RuleStatement> + Copy,
    active: Option<&str>,
) -> Vec<&'w RuleStatement> {
    let mut out = Vec::new();
    flatten_into(rules, active, &mut out);
    out
}

fn flatten_into<'w>(
    rules: impl IntoIterator<Item = &'w RuleStatement>,
    active: Option<&str>,
    out: &mut Vec<&'w RuleStatement>,
) {
    for rule in rules {
        if let Some(name) = clauser_cwt::subtype_key(&rule.key) {
            let (negated, name) = match name.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, name),
            };
            let is_active = active == Some(name);
            if is_active != negated
                && let Some(body) = rule.value.as_block()
            {
                flatten_into(body.iter(), active, out);
            }
            continue;
        }
        out.push(rule);
    }
}

/// A bare member entry: the lowering gives those identical key and value
/// ranges.
fn is_bare(rule: &RuleStatement) -> bool {
    matches!(&rule.value, clauser_cwt::RuleValue::Scalar { range, .. } if *range == rule.key_range)
}

fn int_in_range(text: &str, min: Option<i64>, max: Option<i64>) -> bool {
    match interpret_scalar(text) {
        ScalarValue::Number(Number::Int(v)) => in_range(v as i64, min, max),
        ScalarValue::Number(Number::Wide(v)) => in_range(v, min, max),
        _ => false,
    }
}

fn in_range(v: i64, min: Option<i64>, max: Option<i64>) -> bool {
    min.is_none_or(|m| v >= m) && max.is_none_or(|m| v <= m)
}

fn float_in_range(text: &str, min: Option<f64>, max: Option<f64>) -> bool {
    let value = match interpret_scalar(text) {
        ScalarValue::Number(Number::Int(v)) => v as f64,
        ScalarValue::Number(Number::Wide(v)) => v as f64,
        ScalarValue::Number(Number::Decimal(d)) => d.value(),
        _ => return false,
    };
    min.is_none_or(|m| value >= m) && max.is_none_or(|m| value <= m)
}
