//! Modifier scope compatibility.

use clauser_syntax::{Category, Diagnostic, DiagnosticSink, Severity};

use crate::scope::compatible;

use super::{CheckRule, Confidence, Domain, ObjectCx, RuleMeta, codes};

pub struct ModifierScopeRule;

impl CheckRule for ModifierScopeRule {
    fn meta(&self) -> RuleMeta {
        RuleMeta {
            code: codes::TYPECHECK_MODIFIER_SCOPE,
            domain: Domain::Correctness,
            confidence: Confidence::Sound,
        }
    }

    fn run(&self, cx: &ObjectCx<'_>, sink: &mut DiagnosticSink) {
        for field in &cx.resolution.fields {
            let Some(scopes) = &field.modifier_scopes else {
                continue;
            };

            if scopes.is_empty() {
                // Known modifier, no category metadata.
                if cx.strict_modifiers {
                    sink.push(Diagnostic::new(
                        codes::TYPECHECK_MODIFIER_SCOPE,
                        Severity::Warning,
                        Category::Typecheck,
                        field.key_range,
                        format!("modifier `{}` has no scope metadata", field.key),
                    ));
                }
                continue;
            }

            let ok = scopes.contains("any")
                || scopes.iter().any(|s| compatible(s, &cx.scope.current));
            if !ok {
                sink.push(Diagnostic::new(
                    codes::TYPECHECK_MODIFIER_SCOPE,
                    Severity::Error,
                    Category::Typecheck,
                    field.key_range,
                    format!(
                        "modifier `{}` is not valid in {} scope",
                        field.key, cx.scope.current
                    ),
                ));
            }
        }
    }
}
