//! The scope-context stack and link-chain resolution.
//!
//! A [`ScopeContext`] is a small immutable frame: current scope, root
//! scope, a `from` chain and a bounded `prev` history. Child traversals
//! clone and modify, so a scope change in one sibling subtree can never
//! leak into the next.

use std::collections::BTreeSet;

use clauser_cwt::{FieldKind, SchemaGraph};

/// Depth kept for `prev`, `prev_prev`, ...
const PREV_DEPTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeContext {
    pub current: String,
    pub root: String,
    /// `from`, `from_from`, ... outermost first.
    pub from: Vec<String>,
    /// `prev`, `prev_prev`, ... most recent first.
    pub prev: Vec<String>,
}

impl ScopeContext {
    pub fn new(scope: &str) -> ScopeContext {
        ScopeContext {
            current: scope.to_ascii_lowercase(),
            root: scope.to_ascii_lowercase(),
            from: Vec::new(),
            prev: Vec::new(),
        }
    }

    /// Enters `scope`, remembering the current one in the `prev` chain.
    pub fn pushed(&self, scope: &str) -> ScopeContext {
        let mut prev = Vec::with_capacity(PREV_DEPTH);
        prev.push(self.current.clone());
        prev.extend(self.prev.iter().take(PREV_DEPTH - 1).cloned());
        ScopeContext {
            current: scope.to_ascii_lowercase(),
            root: self.root.clone(),
            from: self.from.clone(),
            prev,
        }
    }

    /// Rebuilds the frame from `replace_scope` pairs
    /// (`this`/`root`/`from`/`from_from`/`prev`/...).
    pub fn replaced(&self, pairs: &[(String, String)]) -> ScopeContext {
        let mut next = self.clone();
        for (slot, scope) in pairs {
            let scope = scope.to_ascii_lowercase();
            match slot.as_str() {
                "this" => next.current = scope,
                "root" => next.root = scope,
                other => {
                    if let Some(depth) = chain_depth(other, "from") {
                        ensure_len(&mut next.from, depth + 1);
                        next.from[depth] = scope;
                    } else if let Some(depth) = chain_depth(other, "prev") {
                        ensure_len(&mut next.prev, depth + 1);
                        next.prev[depth] = scope;
                    }
                }
            }
        }
        next
    }

    /// Applies a rule's scope options. On one declaration `push_scope`
    /// beats `replace_scope`; the declaration's `replace_scope` is skipped.
    pub fn with_rule_options(&self, options: &clauser_cwt::RuleOptions) -> ScopeContext {
        if let Some(push) = &options.push_scope {
            return self.pushed(push);
        }
        if !options.replace_scope.is_empty() {
            return self.replaced(&options.replace_scope);
        }
        self.clone()
    }

    /// Resolves the builtin relations; `None` for anything else.
    pub fn resolve_relation(&self, name: &str) -> Option<String> {
        let lower = name.to_ascii_lowercase();
        if lower == "this" {
            return Some(self.current.clone());
        }
        if lower == "root" {
            return Some(self.root.clone());
        }
        if let Some(depth) = chain_depth(&lower, "from") {
            return Some(self.from.get(depth).cloned().unwrap_or_else(any));
        }
        if let Some(depth) = chain_depth(&lower, "prev") {
            return Some(self.prev.get(depth).cloned().unwrap_or_else(any));
        }
        None
    }
}

fn any() -> String {
    "any".to_string()
}

/// `from` → 0, `from_from` → 1, ... and likewise for `prev`.
fn chain_depth(name: &str, base: &str) -> Option<usize> {
    if !name.starts_with(base) {
        return None;
    }
    let mut rest = &name[base.len()..];
    let mut depth = 0;
    while let Some(next) = rest.strip_prefix(&format!("_{base}")) {
        depth += 1;
        rest = next;
    }
    rest.is_empty().then_some(depth)
}

/// Grows `v` with `any()` placeholders until it has at least `len` elements.
fn ensure_len(v: &mut Vec<String>, len: usize) {
    if v.len() < len {
        v.resize_with(len, any);
    }
}

/// Two scopes are compatible when equal or either side is the wildcard.
pub fn compatible(expected: &str, actual: &str) -> bool {
    expected == "any" || actual == "any" || expected.eq_ignore_ascii_case(actual)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    UnknownSegment(String),
    /// A link used from a scope outside its input set.
    InputScope {
        link: String,
        actual: String,
        expected: BTreeSet<String>,
    },
    /// `from_data` link whose payload is not in its data source.
    DataSource { link: String, data: String },
    /// Link exists but its `link_type` does not cover this position.
    WrongLinkType(String),
}

impl std::fmt::Display for ChainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainError::UnknownSegment(seg) => write!(f, "unknown scope segment `{seg}`"),
            ChainError::InputScope {
                link,
                actual,
                expected,
            } => write!(
                f,
                "`{link}` is not valid from {actual} scope (expects {})",
                expected
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            ChainError::DataSource { link, data } => {
                write!(f, "`{data}` is not a known target for `{link}`")
            }
            ChainError::WrongLinkType(link) => {
                write!(f, "`{link}` cannot be used in this position")
            }
        }
    }
}

/// Whether a chain must end in a scope or may end in a value link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainKind {
    Scope,
    Value,
}

/// Resolution environment: the graph plus a membership oracle for
/// `from_data` link payloads (`value[...]`, `enum[...]`).
pub struct ChainEnv<'a> {
    pub graph: &'a SchemaGraph,
    pub is_member: &'a dyn Fn(&FieldKind, &str) -> bool,
}

/// Resolves a dotted link chain (`owner.capital_scope`,
/// `event_target:foo.owner`) from `ctx`, returning the final scope.
pub fn resolve_chain(
    env: &ChainEnv<'_>,
    ctx: &ScopeContext,
    text: &str,
    kind: ChainKind,
) -> Result<String, ChainError> {
    let mut current = ctx.current.clone();
    let segments: Vec<&str> = text.split('.').collect();
    let last = segments.len().saturating_sub(1);

    for (i, segment) in segments.iter().enumerate() {
        let is_last = i == last;

        if let Some((prefix, data)) = segment.split_once(':') {
            let full_prefix = format!("{prefix}:");
            let link = env
                .graph
                .links
                .values()
                .find(|l| l.prefix.as_deref() == Some(full_prefix.as_str()))
                .ok_or_else(|| ChainError::UnknownSegment((*segment).to_string()))?;
            current = enter_link(env, link, &current, Some(data), is_last, kind)?;
            continue;
        }

        if let Some(scope) = ctx.resolve_relation(segment) {
            current = scope;
            continue;
        }

        let link = env
            .graph
            .links
            .get(&segment.to_ascii_lowercase())
            .or_else(|| env.graph.links.get(*segment))
            .ok_or_else(|| ChainError::UnknownSegment((*segment).to_string()))?;
        current = enter_link(env, link, &current, None, is_last, kind)?;
    }

    Ok(current)
}

fn enter_link(
    env: &ChainEnv<'_>,
    link: &clauser_cwt::ScopeLink,
    current: &str,
    data: Option<&str>,
    is_last: bool,
    kind: ChainKind,
) -> Result<String, ChainError> {
    // Interior segments must produce a scope; the final segment needs the
    // link type matching the position.
    let type_ok = if is_last && kind == ChainKind::Value {
        link.link_type.includes_value()
    } else {
        link.link_type.includes_scope()
    };
    if !type_ok {
        return Err(ChainError::WrongLinkType(link.name.clone()));
    }

    let input_ok = link.input_scopes.is_empty()
        || link.input_scopes.contains("any")
        || current == "any"
        || link.input_scopes.contains(current);
    if !input_ok {
        return Err(ChainError::InputScope {
            link: link.name.clone(),
            actual: current.to_string(),
            expected: link.input_scopes.clone(),
        });
    }

    if link.from_data {
        let data = data.unwrap_or_default();
        let source = link
            .data_source
            .as_deref()
            .map(FieldKind::parse)
            .unwrap_or(FieldKind::Scalar);
        let member = matches!(source, FieldKind::Scalar) || (env.is_member)(&source, data);
        if !member {
            return Err(ChainError::DataSource {
                link: link.name.clone(),
                data: data.to_string(),
            });
        }
    }

    Ok(link.output_scope.clone())
}
