//! Parse options and feature gates.

use crate::lexer::{LexContext, LexOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Only `=`/`?=` assignments; legacy brace forms are errors.
    Strict,
    /// All operators accepted; legacy brace forms downgrade to warnings.
    #[default]
    Permissive,
}

/// How the semantic engines treat references they cannot resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnresolvedPolicy {
    /// Stay silent; the reference may be supplied by content we cannot see.
    #[default]
    Defer,
    Error,
}

/// Locale coverage required for localisation-key existence checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalisationCoverage {
    /// A key present in at least one locale passes.
    #[default]
    Any,
    All,
}

#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    pub mode: ParseMode,
    pub context: LexContext,
    /// Reserved: `[[PARAM] ... ]` script parameters. Accepted, no grammar
    /// effect yet.
    pub allow_parameter_syntax: bool,
    /// Reserved: CK3 `pattern = list "name"` forms. Accepted, no grammar
    /// effect yet.
    pub allow_unmarked_list_form: bool,
    pub allow_multiline_strings: bool,
    pub allow_unterminated_strings: bool,
    /// Permits `== != > >= < <=` in strict mode.
    pub allow_comparison_operators: bool,
    pub unresolved_reference_policy: UnresolvedPolicy,
    pub localisation_coverage: LocalisationCoverage,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            mode: ParseMode::Permissive,
            context: LexContext::Jomini,
            allow_parameter_syntax: false,
            allow_unmarked_list_form: false,
            allow_multiline_strings: true,
            allow_unterminated_strings: false,
            allow_comparison_operators: false,
            unresolved_reference_policy: UnresolvedPolicy::Defer,
            localisation_coverage: LocalisationCoverage::Any,
        }
    }
}

impl ParseOptions {
    /// Game-script defaults.
    pub fn jomini() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self {
            mode: ParseMode::Strict,
            ..Self::default()
        }
    }

    /// Profile for CWTools `.cwt` rule files.
    pub fn schema_dsl() -> Self {
        Self {
            context: LexContext::SchemaDsl,
            ..Self::default()
        }
    }

    pub(crate) fn lex_options(&self) -> LexOptions {
        LexOptions {
            allow_multiline_strings: self.allow_multiline_strings,
            allow_unterminated_strings: self.allow_unterminated_strings,
        }
    }
}
