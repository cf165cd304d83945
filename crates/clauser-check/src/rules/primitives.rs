//! Primitive field-type constraints (`bool`, `int[..]`, `float[..]`,
//! `date_field`, shape mismatches).

use clauser_syntax::{Category, Diagnostic, DiagnosticSink, Severity};

use super::{CheckRule, Confidence, Domain, Failure, ObjectCx, RuleMeta, codes};

pub struct PrimitiveFieldRule;

impl CheckRule for PrimitiveFieldRule {
    fn meta(&self) -> RuleMeta {
        RuleMeta {
            code: codes::TYPECHECK_INVALID_FIELD_TYPE,
            domain: Domain::Correctness,
            confidence: Confidence::Sound,
        }
    }

    fn run(&self, cx: &ObjectCx<'_>, sink: &mut DiagnosticSink) {
        for field in &cx.resolution.fields {
            if field.candidates.is_empty() {
                continue;
            }

            // Block value where every candidate wants a scalar, or scalar
            // value where every candidate wants a block.
            if field.is_block && field.block_candidate.is_none() {
                sink.push(Diagnostic::new(
                    codes::TYPECHECK_INVALID_FIELD_TYPE,
                    Severity::Error,
                    Category::Typecheck,
                    field.value_range,
                    format!("`{}` does not take a block", field.key),
                ));
                continue;
            }
            if !field.is_block
                && field.accepted.is_empty()
                && field.first_failure.is_none()
                && field.candidates.iter().all(|c| c.body.is_some())
            {
                sink.push(Diagnostic::new(
                    codes::TYPECHECK_INVALID_FIELD_TYPE,
                    Severity::Error,
                    Category::Typecheck,
                    field.value_range,
                    format!("`{}` requires a block value", field.key),
                ));
                continue;
            }

            if !field.is_block && field.accepted.is_empty() {
                if let Some(Failure::Type(message)) = &field.first_failure {
                    sink.push(Diagnostic::new(
                        codes::TYPECHECK_INVALID_FIELD_TYPE,
                        Severity::Error,
                        Category::Typecheck,
                        field.value_range,
                        message.clone(),
                    ));
                }
            }
        }

        for (range, failure) in &cx.resolution.item_failures {
            if let Failure::Type(message) = failure {
                sink.push(Diagnostic::new(
                    codes::TYPECHECK_INVALID_FIELD_TYPE,
                    Severity::Error,
                    Category::Typecheck,
                    *range,
                    message.clone(),
                ));
            }
        }
    }
}
