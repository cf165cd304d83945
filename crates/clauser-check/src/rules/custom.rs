//! `## error_if_only_match` custom constraints: fires when a value matched
//! the annotated branch and no other branch.

use clauser_syntax::{Category, Diagnostic, DiagnosticSink, Severity};

use super::{CheckRule, Confidence, Domain, ObjectCx, RuleMeta, codes};

pub struct CustomConstraintRule;

impl CheckRule for CustomConstraintRule {
    fn meta(&self) -> RuleMeta {
        RuleMeta {
            code: codes::TYPECHECK_RULE_CUSTOM_ERROR,
            domain: Domain::Correctness,
            confidence: Confidence::Sound,
        }
    }

    fn run(&self, cx: &ObjectCx<'_>, sink: &mut DiagnosticSink) {
        for field in &cx.resolution.fields {
            if field.accepted.is_empty() {
                continue;
            }
            let annotated: Vec<&str> = field
                .accepted
                .iter()
                .filter_map(|&i| {
                    field.candidates[i]
                        .options()
                        .error_if_only_match
                        .as_deref()
                })
                .collect();
            // Fires only when every accepting branch is annotated.
            if annotated.len() != field.accepted.len() {
                continue;
            }
            let message = annotated
                .iter()
                .find(|m| !m.is_empty())
                .map(|m| (*m).to_string())
                .unwrap_or_else(|| format!("`{}` matches a disallowed form", field.key));
            sink.push(Diagnostic::new(
                codes::TYPECHECK_RULE_CUSTOM_ERROR,
                Severity::Error,
                Category::Typecheck,
                field.value_range,
                message,
            ));
        }
    }
}
