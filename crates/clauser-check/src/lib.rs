//! Schema-driven type checking for Clausewitz script.
//!
//! The engine walks the analysis facts of each parse carrier against a
//! [`clauser_cwt::SchemaGraph`] and its materialized artifacts, maintaining
//! a scope-context stack, and emits correctness diagnostics through a
//! deterministic, contract-validated rule stack. Rules never abort the
//! walk; internal invariant violations terminate the affected subtree with
//! a fatal diagnostic.

pub mod engine;
pub mod rules;
pub mod scope;

#[cfg(test)]
mod engine_tests;

pub use engine::{CheckEngine, CheckOptions, DynamicValues};
pub use rules::{
    CheckRule, Confidence, ContractViolation, Domain, ObjectCx, RuleMeta, Runner, codes,
    validate_lint_rule, validate_typecheck_rule,
};
pub use scope::{ChainError, ChainKind, ScopeContext, compatible, resolve_chain};
