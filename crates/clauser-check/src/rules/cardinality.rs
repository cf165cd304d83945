//! Required-field and cardinality checks.

use clauser_syntax::{Category, Diagnostic, DiagnosticSink, Severity};

use super::{CheckRule, Confidence, Domain, ObjectCx, RuleMeta, codes};

pub struct CardinalityRule;

impl CheckRule for CardinalityRule {
    fn meta(&self) -> RuleMeta {
        RuleMeta {
            code: codes::TYPECHECK_CARDINALITY_VIOLATION,
            domain: Domain::Correctness,
            confidence: Confidence::Sound,
        }
    }

    fn run(&self, cx: &ObjectCx<'_>, sink: &mut DiagnosticSink) {
        for (idx, rule_ref) in cx.resolution.rules.iter().enumerate() {
            let Some(cardinality) = rule_ref.rule.options.effective_cardinality() else {
                continue;
            };
            let count = cx.resolution.counts[idx];

            if count < cardinality.min {
                let (code, message) = if count == 0 && cardinality.min >= 1 {
                    (
                        codes::TYPECHECK_REQUIRED_FIELD_MISSING,
                        format!("missing required `{}`", rule_ref.rule.key),
                    )
                } else {
                    (
                        codes::TYPECHECK_CARDINALITY_VIOLATION,
                        format!(
                            "`{}` appears {} times but needs at least {}",
                            rule_ref.rule.key, count, cardinality.min
                        ),
                    )
                };
                let severity = if cardinality.soft_min {
                    Severity::Info
                } else {
                    rule_ref.rule.options.severity.unwrap_or(Severity::Error)
                };
                let range = cx.object.key_range.unwrap_or(cx.object.range);
                sink.push(Diagnostic::new(
                    code,
                    severity,
                    Category::Typecheck,
                    range,
                    message,
                ));
                continue;
            }

            if let Some(max) = cardinality.max
                && count > max
            {
                // Point at the first occurrence past the allowed maximum.
                let range = cx
                    .resolution
                    .fields
                    .iter()
                    .filter(|f| f.candidates.iter().any(|c| c.rule_idx == idx))
                    .nth(max as usize)
                    .map(|f| f.key_range)
                    .unwrap_or(cx.object.key_range.unwrap_or(cx.object.range));
                sink.push(Diagnostic::new(
                    codes::TYPECHECK_CARDINALITY_VIOLATION,
                    rule_ref.rule.options.severity.unwrap_or(Severity::Error),
                    Category::Typecheck,
                    range,
                    format!(
                        "`{}` appears {} times but allows at most {}",
                        rule_ref.rule.key, count, max
                    ),
                ));
            }
        }
    }
}
