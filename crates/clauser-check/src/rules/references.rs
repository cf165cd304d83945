//! Reference resolution failures: enum/type/value memberships, scope
//! chains, and unknown keys under the unresolved-reference policy.

use clauser_syntax::{Category, Diagnostic, DiagnosticSink, Severity, UnresolvedPolicy};

use super::{CheckRule, Confidence, Domain, Failure, ObjectCx, RuleMeta, codes};

pub struct ReferenceRule;

impl CheckRule for ReferenceRule {
    fn meta(&self) -> RuleMeta {
        RuleMeta {
            code: codes::TYPECHECK_INVALID_FIELD_REFERENCE,
            domain: Domain::Correctness,
            confidence: Confidence::Sound,
        }
    }

    fn run(&self, cx: &ObjectCx<'_>, sink: &mut DiagnosticSink) {
        for field in &cx.resolution.fields {
            if field.is_block || field.candidates.is_empty() || !field.accepted.is_empty() {
                continue;
            }
            let Some(failure) = &field.first_failure else {
                continue;
            };
            if let Some((code, message)) = diagnose(failure, cx.unresolved_policy) {
                sink.push(Diagnostic::new(
                    code,
                    Severity::Error,
                    Category::Typecheck,
                    field.value_range,
                    message,
                ));
            }
        }

        for (range, failure) in &cx.resolution.item_failures {
            if let Some((code, message)) = diagnose(failure, cx.unresolved_policy) {
                sink.push(Diagnostic::new(
                    code,
                    Severity::Error,
                    Category::Typecheck,
                    *range,
                    message,
                ));
            }
        }
    }
}

fn diagnose(failure: &Failure, policy: UnresolvedPolicy) -> Option<(&'static str, String)> {
    match failure {
        // Reported by the primitive band.
        Failure::Type(_) => None,
        Failure::Reference(message) => Some((
            codes::TYPECHECK_INVALID_FIELD_REFERENCE,
            message.clone(),
        )),
        Failure::Scope(message) => {
            Some((codes::TYPECHECK_SCOPE_INCOMPATIBLE, message.clone()))
        }
        Failure::Unresolved(message) => match policy {
            UnresolvedPolicy::Defer => None,
            UnresolvedPolicy::Error => Some((
                codes::TYPECHECK_UNRESOLVED_REFERENCE,
                message.clone(),
            )),
        },
    }
}

/// Keys that matched no rule at all; unknown dynamic alias keys follow
/// the unresolved-reference policy.
pub struct UnknownKeyRule;

impl CheckRule for UnknownKeyRule {
    fn meta(&self) -> RuleMeta {
        RuleMeta {
            code: codes::TYPECHECK_UNRESOLVED_REFERENCE,
            domain: Domain::Correctness,
            confidence: Confidence::Sound,
        }
    }

    fn run(&self, cx: &ObjectCx<'_>, sink: &mut DiagnosticSink) {
        if cx.unresolved_policy == UnresolvedPolicy::Defer {
            return;
        }
        // An object with no applicable rules is ungoverned, not wrong.
        if cx.resolution.rules.is_empty() {
            return;
        }
        for field in &cx.resolution.fields {
            if field.candidates.is_empty() && field.modifier_scopes.is_none() {
                sink.push(Diagnostic::new(
                    codes::TYPECHECK_UNRESOLVED_REFERENCE,
                    Severity::Error,
                    Category::Typecheck,
                    field.key_range,
                    format!("unknown key `{}`", field.key),
                ));
            }
        }
    }
}
