//! The rule contract and the type-check rule stack.
//!
//! Rules are capability values: metadata (code, domain, confidence) plus a
//! check entry point over a resolved object. Runners enforce the contract
//! mechanically before any rule executes: type-check rules must be
//! `correctness`/`sound` with a `TYPECHECK_` code; lint rules must be
//! semantic/style/heuristic with policy-or-heuristic confidence and a
//! `LINT_` code.

mod cardinality;
mod custom;
mod localisation;
mod modifiers;
mod primitives;
mod references;

use std::collections::BTreeSet;

use clauser_cwt::{RuleOptions, RuleStatement, SchemaArtifacts, SchemaGraph};
use clauser_cwt::{AssetRegistry, FieldKind, LocalisationKeys};
use clauser_syntax::{
    DiagnosticSink, LocalisationCoverage, ObjectFact, TextRange, UnresolvedPolicy, ValueFact,
};

use crate::scope::ScopeContext;

/// Stable type-check diagnostic codes.
pub mod codes {
    pub const TYPECHECK_REQUIRED_FIELD_MISSING: &str = "TYPECHECK_REQUIRED_FIELD_MISSING";
    pub const TYPECHECK_CARDINALITY_VIOLATION: &str = "TYPECHECK_CARDINALITY_VIOLATION";
    pub const TYPECHECK_INVALID_FIELD_TYPE: &str = "TYPECHECK_INVALID_FIELD_TYPE";
    pub const TYPECHECK_INVALID_FIELD_REFERENCE: &str = "TYPECHECK_INVALID_FIELD_REFERENCE";
    pub const TYPECHECK_UNRESOLVED_REFERENCE: &str = "TYPECHECK_UNRESOLVED_REFERENCE";
    pub const TYPECHECK_SCOPE_INCOMPATIBLE: &str = "TYPECHECK_SCOPE_INCOMPATIBLE";
    pub const TYPECHECK_MODIFIER_SCOPE: &str = "TYPECHECK_MODIFIER_SCOPE";
    pub const TYPECHECK_LOCALISATION_MISSING: &str = "TYPECHECK_LOCALISATION_MISSING";
    pub const TYPECHECK_RULE_CUSTOM_ERROR: &str = "TYPECHECK_RULE_CUSTOM_ERROR";
    /// Internal invariant violation; fatal for the affected subtree.
    pub const TYPECHECK_INTERNAL: &str = "TYPECHECK_INTERNAL";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Correctness,
    Semantic,
    Style,
    Heuristic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    Sound,
    Policy,
    Heuristic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMeta {
    pub code: &'static str,
    pub domain: Domain,
    pub confidence: Confidence,
}

/// A rule that failed the mechanical contract and was rejected before
/// execution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractViolation {
    #[error("type-check rule `{0}` must declare domain = correctness")]
    TypecheckDomain(&'static str),
    #[error("type-check rule `{0}` must declare confidence = sound")]
    TypecheckConfidence(&'static str),
    #[error("type-check rule `{0}` must carry a TYPECHECK_ code")]
    TypecheckPrefix(&'static str),
    #[error("lint rule `{0}` must not declare domain = correctness")]
    LintDomain(&'static str),
    #[error("lint rule `{0}` must declare confidence = policy or heuristic")]
    LintConfidence(&'static str),
    #[error("lint rule `{0}` must carry a LINT_ code")]
    LintPrefix(&'static str),
}

pub fn validate_typecheck_rule(meta: &RuleMeta) -> Result<(), ContractViolation> {
    if !meta.code.starts_with("TYPECHECK_") {
        return Err(ContractViolation::TypecheckPrefix(meta.code));
    }
    if meta.domain != Domain::Correctness {
        return Err(ContractViolation::TypecheckDomain(meta.code));
    }
    if meta.confidence != Confidence::Sound {
        return Err(ContractViolation::TypecheckConfidence(meta.code));
    }
    Ok(())
}

/// The same boundary, as lint engines must apply it.
pub fn validate_lint_rule(meta: &RuleMeta) -> Result<(), ContractViolation> {
    if !meta.code.starts_with("LINT_") {
        return Err(ContractViolation::LintPrefix(meta.code));
    }
    if meta.domain == Domain::Correctness {
        return Err(ContractViolation::LintDomain(meta.code));
    }
    if meta.confidence == Confidence::Sound {
        return Err(ContractViolation::LintConfidence(meta.code));
    }
    Ok(())
}

/// One band of the type-check rule stack.
pub trait CheckRule {
    fn meta(&self) -> RuleMeta;
    fn run(&self, cx: &ObjectCx<'_>, sink: &mut DiagnosticSink);
}

/// Ordered, contract-validated rule stack.
pub struct Runner {
    rules: Vec<Box<dyn CheckRule>>,
}

impl Runner {
    /// Validates every rule against the type-check contract; any violation
    /// rejects the whole stack before execution.
    pub fn typecheck(rules: Vec<Box<dyn CheckRule>>) -> Result<Runner, ContractViolation> {
        for rule in &rules {
            validate_typecheck_rule(&rule.meta())?;
        }
        Ok(Runner { rules })
    }

    /// The deterministic default stack.
    pub fn default_stack() -> Runner {
        Runner::typecheck(vec![
            Box::new(cardinality::CardinalityRule),
            Box::new(primitives::PrimitiveFieldRule),
            Box::new(references::ReferenceRule),
            Box::new(references::UnknownKeyRule),
            Box::new(localisation::LocalisationRule),
            Box::new(modifiers::ModifierScopeRule),
            Box::new(custom::CustomConstraintRule),
        ])
        .expect("builtin rules satisfy the contract")
    }

    pub fn run(&self, cx: &ObjectCx<'_>, sink: &mut DiagnosticSink) {
        for rule in &self.rules {
            rule.run(cx, sink);
        }
    }

    pub fn codes(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.meta().code).collect()
    }
}

/// Why a scalar value failed a candidate rule. The variant picks the
/// diagnostic code and which band reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Wrong shape or primitive type.
    Type(String),
    /// A reference to something that exists but does not contain the value.
    Reference(String),
    /// A scope incompatibility.
    Scope(String),
    /// Something we cannot resolve at all; reporting is policy-gated.
    Unresolved(String),
}

/// A rule that might govern one field occurrence.
pub struct Candidate<'w> {
    /// Index into [`Resolution::rules`], for cardinality counting.
    pub rule_idx: usize,
    /// The statement whose value the field's value validates against: the
    /// rule itself, or the alias member it matched.
    pub stmt: &'w RuleStatement,
    /// Scalar value spec, when the statement's value is scalar.
    pub spec: Option<FieldKind>,
    /// Block body after single-alias indirection, when block-shaped.
    pub body: Option<&'w [RuleStatement]>,
    /// False when an alias member's `## scope` gate excludes the current
    /// scope.
    pub scope_ok: bool,
    /// Scope produced by a key that resolved as a link chain; the child
    /// walk enters it.
    pub key_scope: Option<String>,
}

impl Candidate<'_> {
    pub fn options(&self) -> &RuleOptions {
        &self.stmt.options
    }
}

/// One field occurrence with its matching candidates and the outcome of
/// scalar validation.
pub struct FieldResolution<'w> {
    pub key: &'w str,
    pub key_range: TextRange,
    pub value: &'w ValueFact,
    pub value_range: TextRange,
    pub is_block: bool,
    pub candidates: Vec<Candidate<'w>>,
    /// Candidate indices whose scalar spec accepted the value.
    pub accepted: Vec<usize>,
    /// First failure among scalar candidates, for reporting.
    pub first_failure: Option<Failure>,
    /// Candidate index chosen for block recursion.
    pub block_candidate: Option<usize>,
    /// Scope set when the key matched a modifier.
    pub modifier_scopes: Option<BTreeSet<String>>,
}

/// A rule in the applicable set, with its parsed key kind.
pub struct RuleRef<'w> {
    pub rule: &'w RuleStatement,
    pub key_kind: FieldKind,
    /// A bare member entry (`{ alpha beta }`) that matches array items.
    pub bare: bool,
}

pub struct Resolution<'w> {
    pub rules: Vec<RuleRef<'w>>,
    /// Matched occurrences per rule, parallel to `rules`.
    pub counts: Vec<u32>,
    pub fields: Vec<FieldResolution<'w>>,
    /// Failures for array items that matched no bare rule.
    pub item_failures: Vec<(TextRange, Failure)>,
}

/// Type-entry information available while checking an entry's subtree.
pub struct EntryInfo<'w> {
    pub type_name: &'w str,
    pub id: String,
    pub subtype: Option<&'w str>,
    pub key_range: Option<TextRange>,
    /// Localisation templates, only populated on the entry's own object.
    pub templates: &'w [clauser_cwt::LocTemplate],
}

/// Everything a rule may inspect at one object.
pub struct ObjectCx<'w> {
    pub graph: &'w SchemaGraph,
    pub artifacts: &'w SchemaArtifacts,
    pub assets: Option<&'w dyn AssetRegistry>,
    pub localisation: Option<&'w dyn LocalisationKeys>,
    pub object: &'w ObjectFact,
    pub scope: &'w ScopeContext,
    pub resolution: &'w Resolution<'w>,
    /// Present only at the entry (top) object of a typed entity.
    pub entry: Option<&'w EntryInfo<'w>>,
    pub unresolved_policy: UnresolvedPolicy,
    pub coverage: LocalisationCoverage,
    /// Report known modifiers with missing category metadata.
    pub strict_modifiers: bool,
}
