//! Localisation checks: command tokens inside `[...]` interpolations and
//! required template keys for discovered type ids.

use clauser_cwt::FieldKind;
use clauser_syntax::{
    Category, Diagnostic, DiagnosticSink, LocalisationCoverage, Severity, UnresolvedPolicy,
    ValueFact,
};

use crate::scope::{ChainEnv, ChainKind, compatible, resolve_chain};

use super::{CheckRule, Confidence, Domain, ObjectCx, RuleMeta, codes};

pub struct LocalisationRule;

impl CheckRule for LocalisationRule {
    fn meta(&self) -> RuleMeta {
        RuleMeta {
            code: codes::TYPECHECK_LOCALISATION_MISSING,
            domain: Domain::Correctness,
            confidence: Confidence::Sound,
        }
    }

    fn run(&self, cx: &ObjectCx<'_>, sink: &mut DiagnosticSink) {
        self.check_commands(cx, sink);
        self.check_templates(cx, sink);
    }
}

impl LocalisationRule {
    /// `[Root.GetName]`-style command tokens inside localisation-typed
    /// field values.
    fn check_commands(&self, cx: &ObjectCx<'_>, sink: &mut DiagnosticSink) {
        for field in &cx.resolution.fields {
            let loc_candidate = field.accepted.iter().copied().find(|&i| {
                matches!(
                    field.candidates[i].spec,
                    Some(
                        FieldKind::Localisation
                            | FieldKind::LocalisationSynced
                            | FieldKind::LocalisationInline
                    )
                )
            });
            let Some(ci) = loc_candidate else {
                continue;
            };
            let ValueFact::Scalar { text, .. } = field.value else {
                continue;
            };
            // The rule's own scope transitions govern its value.
            let rule_scope = cx.scope.with_rule_options(field.candidates[ci].options());

            for token in bracketed_tokens(text) {
                let mut segments: Vec<&str> = token.split('.').collect();
                let Some(command) = segments.pop() else {
                    continue;
                };

                let Some(scopes) = cx.graph.loc_commands.get(command) else {
                    if cx.unresolved_policy == UnresolvedPolicy::Error {
                        sink.push(Diagnostic::new(
                            codes::TYPECHECK_UNRESOLVED_REFERENCE,
                            Severity::Error,
                            Category::Typecheck,
                            field.value_range,
                            format!("unknown localisation command `{command}`"),
                        ));
                    }
                    continue;
                };

                // Resolve the chain in front of the command, leniently.
                let base = if segments.is_empty() {
                    rule_scope.current.clone()
                } else {
                    let env = ChainEnv {
                        graph: cx.graph,
                        is_member: &|_, _| true,
                    };
                    match resolve_chain(&env, &rule_scope, &segments.join("."), ChainKind::Scope) {
                        Ok(scope) => scope,
                        Err(_) => continue,
                    }
                };

                let ok = scopes.is_empty()
                    || scopes.contains("any")
                    || scopes.iter().any(|s| compatible(s, &base));
                if !ok {
                    sink.push(Diagnostic::new(
                        codes::TYPECHECK_SCOPE_INCOMPATIBLE,
                        Severity::Error,
                        Category::Typecheck,
                        field.value_range,
                        format!("`{command}` is not valid from {base} scope"),
                    ));
                }
            }
        }
    }

    /// Required `type[...] localisation` template keys must exist per the
    /// configured coverage policy.
    fn check_templates(&self, cx: &ObjectCx<'_>, sink: &mut DiagnosticSink) {
        let Some(provider) = cx.localisation else {
            return;
        };
        let Some(entry) = cx.entry else {
            return;
        };

        let locales = provider.locales();
        if locales.is_empty() {
            return;
        }

        for template in entry.templates {
            if !template.required {
                continue;
            }
            let key = template.pattern.replace('$', &entry.id);
            let present = |locale: &String| provider.has_key(locale, &key);
            let satisfied = match cx.coverage {
                LocalisationCoverage::Any => locales.iter().any(present),
                LocalisationCoverage::All => locales.iter().all(present),
            };
            if !satisfied {
                sink.push(Diagnostic::new(
                    codes::TYPECHECK_LOCALISATION_MISSING,
                    Severity::Error,
                    Category::Typecheck,
                    entry.key_range.unwrap_or(cx.object.range),
                    format!(
                        "missing localisation `{}` for {} `{}`",
                        key, entry.type_name, entry.id
                    ),
                ));
            }
        }
    }
}

/// Substrings between `[` and `]`.
fn bracketed_tokens(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find('[') {
        let Some(close) = rest[open..].find(']') else {
            break;
        };
        out.push(&rest[open + 1..open + close]);
        rest = &rest[open + close + 1..];
    }
    out
}
