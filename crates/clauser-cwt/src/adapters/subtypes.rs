//! Subtype matchers: declaration-order, first-match predicates over an
//! object's contents.

use clauser_syntax::{ObjectFact, ValueFact};

use crate::field::FieldKind;
use crate::graph::{SubtypeDef, TypeDef};
use crate::ir::{RuleStatement, RuleValue};

/// Picks the active subtype for one object occurrence. At most one subtype
/// is active: the first whose predicate matches, in declaration order.
pub fn select_subtype<'t>(
    def: &'t TypeDef,
    key: Option<&str>,
    object: &ObjectFact,
) -> Option<&'t SubtypeDef> {
    def.subtypes
        .iter()
        .find(|subtype| matches(subtype, key, object))
}

fn matches(subtype: &SubtypeDef, key: Option<&str>, object: &ObjectFact) -> bool {
    if let Some(filter) = &subtype.options.type_key_filter {
        match key {
            Some(key) if filter.admits(key) => {}
            _ => return false,
        }
    }
    if let Some(prefix) = &subtype.options.starts_with {
        match key {
            Some(key) if key.starts_with(prefix.as_str()) => {}
            _ => return false,
        }
    }

    subtype
        .rules
        .iter()
        .all(|rule| condition_holds(rule, object))
}

/// One matcher rule as a condition:
/// - cardinality `0..0` inverts to must-not-contain,
/// - `key = literal` demands a field with that scalar value,
/// - any other shape demands key presence.
///
/// Non-literal keys cannot be decided without a full validation pass and
/// count as satisfied.
fn condition_holds(rule: &RuleStatement, object: &ObjectFact) -> bool {
    if FieldKind::parse(&rule.key).is_dynamic_key() {
        return true;
    }
    let forbidden = rule.options.cardinality.is_some_and(|c| c.max == Some(0));

    let mut occurrences = object
        .fields
        .iter()
        .filter(|(key, _)| key.eq_ignore_ascii_case(&rule.key))
        .flat_map(|(_, fields)| fields.iter());

    let holds = match &rule.value {
        RuleValue::Scalar { text, .. } => match FieldKind::parse(text) {
            FieldKind::Literal(literal) => occurrences
                .filter_map(|f| f.value.as_scalar_text())
                .any(|v| v.eq_ignore_ascii_case(&literal)),
            // A typed value (`int`, `scalar`, ...) is a presence test.
            _ => occurrences.next().is_some(),
        },
        RuleValue::Block(_) => occurrences
            .any(|f| matches!(f.value, ValueFact::Object(_) | ValueFact::Tagged { .. })),
    };

    if forbidden { !holds } else { holds }
}
