//! Normalized rule-statement IR for `.cwt` files.
//!
//! A lowered rule keeps its key and value verbatim (classification happens
//! in [`crate::field`]), the options parsed from `##` metadata lines, doc
//! text from `###` lines, and a declaration path that disambiguates
//! repeated keys.

use clauser_syntax::ast::Operator;
use clauser_syntax::{PathSeg, Severity};
use clauser_syntax::TextRange;

#[derive(Debug, Clone, PartialEq)]
pub struct RuleStatement {
    pub key: String,
    pub op: Operator,
    pub value: RuleValue,
    pub options: RuleOptions,
    pub docs: Vec<String>,
    pub key_range: TextRange,
    pub range: TextRange,
    /// Declaration path with occurrence indices, root-relative.
    pub path: Vec<PathSeg>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleValue {
    Scalar {
        text: String,
        was_quoted: bool,
        range: TextRange,
    },
    Block(Vec<RuleStatement>),
}

impl RuleValue {
    pub fn as_scalar_text(&self) -> Option<&str> {
        match self {
            RuleValue::Scalar { text, .. } => Some(text),
            RuleValue::Block(_) => None,
        }
    }

    pub fn as_block(&self) -> Option<&[RuleStatement]> {
        match self {
            RuleValue::Block(rules) => Some(rules),
            RuleValue::Scalar { .. } => None,
        }
    }
}

/// `min..max` with `inf` for an open maximum. `~min` marks the minimum as
/// soft: violations downgrade to info.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cardinality {
    pub min: u32,
    pub max: Option<u32>,
    pub soft_min: bool,
}

impl Cardinality {
    pub fn parse(text: &str) -> Option<Cardinality> {
        let (min_text, max_text) = text.split_once("..")?;
        let min_text = min_text.trim();
        let max_text = max_text.trim();

        let (soft_min, min_text) = match min_text.strip_prefix('~') {
            Some(rest) => (true, rest),
            None => (false, min_text),
        };
        let min: u32 = min_text.parse().ok()?;
        let max = match max_text {
            "inf" => None,
            other => Some(other.parse().ok()?),
        };
        Some(Cardinality { min, max, soft_min })
    }

    pub fn required(min: u32) -> Cardinality {
        Cardinality {
            min,
            max: Some(min),
            soft_min: false,
        }
    }
}

/// `type_key_filter = x`, `type_key_filter = { a b }`, or the negated
/// `type_key_filter <> x` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFilter {
    pub negated: bool,
    pub keys: Vec<String>,
}

impl KeyFilter {
    pub fn admits(&self, key: &str) -> bool {
        let hit = self.keys.iter().any(|k| k.eq_ignore_ascii_case(key));
        hit != self.negated
    }
}

/// Options attached to one rule via `##` lines.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleOptions {
    pub cardinality: Option<Cardinality>,
    /// Scopes this rule is valid in (`## scope = country`).
    pub scopes: Vec<String>,
    pub push_scope: Option<String>,
    pub replace_scope: Vec<(String, String)>,
    pub severity: Option<Severity>,
    pub required: bool,
    pub primary: bool,
    pub comparison: bool,
    /// `## error_if_only_match = "message"`.
    pub error_if_only_match: Option<String>,
    pub type_key_filter: Option<KeyFilter>,
    pub starts_with: Option<String>,
    /// Unrecognised labels, preserved verbatim as `(key, value)`.
    pub other: Vec<(String, String)>,
}

impl RuleOptions {
    /// Effective minimum/maximum for cardinality checks. `required` without
    /// an explicit cardinality means exactly one.
    pub fn effective_cardinality(&self) -> Option<Cardinality> {
        if self.cardinality.is_some() {
            return self.cardinality;
        }
        self.required.then(|| Cardinality::required(1))
    }

    /// Applies one `## key [= value]` line. Returns `false` if the payload
    /// could not be understood.
    pub fn apply(&mut self, line: &str) -> bool {
        let line = line.trim();

        // The negated filter form uses `<>` instead of `=`.
        if let Some((k, v)) = line.split_once("<>")
            && k.trim() == "type_key_filter"
        {
            self.type_key_filter = Some(KeyFilter {
                negated: true,
                keys: braced_list(v.trim()),
            });
            return true;
        }

        let (key, value) = match line.split_once('=') {
            Some((k, v)) => (k.trim(), Some(v.trim())),
            None => (line, None),
        };

        match (key, value) {
            ("cardinality", Some(v)) => match Cardinality::parse(v) {
                Some(c) => {
                    self.cardinality = Some(c);
                    true
                }
                None => false,
            },
            ("scope" | "scopes", Some(v)) => {
                self.scopes = braced_list(v);
                !self.scopes.is_empty()
            }
            ("push_scope", Some(v)) => {
                self.push_scope = Some(unquote(v).to_string());
                true
            }
            ("replace_scope" | "replace_scopes", Some(v)) => {
                self.replace_scope = braced_pairs(v);
                !self.replace_scope.is_empty()
            }
            ("severity", Some(v)) => {
                self.severity = match v {
                    "error" => Some(Severity::Error),
                    "warning" => Some(Severity::Warning),
                    "info" | "information" => Some(Severity::Info),
                    "hint" => Some(Severity::Hint),
                    _ => return false,
                };
                true
            }
            ("required", None) => {
                self.required = true;
                true
            }
            ("primary", None) => {
                self.primary = true;
                true
            }
            ("comparison", None) => {
                self.comparison = true;
                true
            }
            ("error_if_only_match", v) => {
                self.error_if_only_match = Some(v.map(unquote).unwrap_or_default().to_string());
                true
            }
            ("type_key_filter", Some(v)) => {
                self.type_key_filter = Some(KeyFilter {
                    negated: false,
                    keys: braced_list(v),
                });
                true
            }
            ("starts_with", Some(v)) => {
                self.starts_with = Some(unquote(v).to_string());
                true
            }
            (k, v) => {
                self.other
                    .push((k.to_string(), v.unwrap_or_default().to_string()));
                true
            }
        }
    }
}

fn unquote(text: &str) -> &str {
    text.trim()
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text.trim())
}

/// `x` or `{ a b c }` → list of entries.
pub(crate) fn braced_list(value: &str) -> Vec<String> {
    let value = value.trim();
    let inner = value
        .strip_prefix('{')
        .and_then(|v| v.strip_suffix('}'))
        .unwrap_or(value);
    inner
        .split_whitespace()
        .map(|s| unquote(s).to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// `{ this = country root = country }` → pair list.
pub(crate) fn braced_pairs(value: &str) -> Vec<(String, String)> {
    let words = braced_list(value);
    let mut pairs = Vec::new();
    let mut i = 0;
    while i + 2 < words.len() {
        if words[i + 1] != "=" {
            break;
        }
        pairs.push((words[i].clone(), words[i + 2].clone()));
        i += 3;
    }
    pairs
}
