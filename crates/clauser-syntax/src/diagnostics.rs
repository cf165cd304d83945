//! Diagnostics infrastructure shared by the lexer, parser and rule engines.
//!
//! Diagnostics are plain values attached to a parse carrier; nothing in the
//! pipeline aborts on them. Sinks deduplicate at `(code, start offset)` with
//! first-emission-wins semantics.

use std::collections::HashSet;
use std::fmt::Write as _;

use annotate_snippets::{AnnotationKind, Level, Renderer, Snippet};
use rowan::{TextRange, TextSize};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Hint => "hint",
        };
        f.write_str(s)
    }
}

/// Pipeline stage a diagnostic originates from. Matches the code prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Lexer,
    Parser,
    Typecheck,
    Lint,
}

/// A single diagnostic: stable code, severity, origin, source range, message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: &'static str,
    pub severity: Severity,
    pub category: Category,
    pub range: TextRange,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        code: &'static str,
        severity: Severity,
        category: Category,
        range: TextRange,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            severity,
            category,
            range,
            message: message.into(),
        }
    }

    pub fn error(
        code: &'static str,
        category: Category,
        range: TextRange,
        message: impl Into<String>,
    ) -> Self {
        Self::new(code, Severity::Error, category, range, message)
    }

    pub fn warning(
        code: &'static str,
        category: Category,
        range: TextRange,
        message: impl Into<String>,
    ) -> Self {
        Self::new(code, Severity::Warning, category, range, message)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] at {}..{}: {}",
            self.severity,
            self.code,
            u32::from(self.range.start()),
            u32::from(self.range.end()),
            self.message
        )
    }
}

impl Serialize for Diagnostic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Diagnostic", 6)?;
        s.serialize_field("code", self.code)?;
        s.serialize_field("severity", &self.severity)?;
        s.serialize_field("category", &self.category)?;
        s.serialize_field("start", &u32::from(self.range.start()))?;
        s.serialize_field("end", &u32::from(self.range.end()))?;
        s.serialize_field("message", &self.message)?;
        s.end()
    }
}

/// Collects diagnostics, suppressing any whose `(code, start)` was already
/// reported. The first emission wins; ordering is emission order.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticSink {
    diags: Vec<Diagnostic>,
    seen: HashSet<(&'static str, TextSize)>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the diagnostic was suppressed as a duplicate.
    pub fn push(&mut self, diag: Diagnostic) -> bool {
        if !self.seen.insert((diag.code, diag.range.start())) {
            return false;
        }
        self.diags.push(diag);
        true
    }

    pub fn extend(&mut self, diags: impl IntoIterator<Item = Diagnostic>) {
        for d in diags {
            self.push(d);
        }
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.diags
    }

    pub fn is_empty(&self) -> bool {
        self.diags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diags.len()
    }

    pub fn has_errors(&self) -> bool {
        self.diags.iter().any(Diagnostic::is_error)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diags
    }
}

/// Renders diagnostics against their source with annotate-snippets.
pub struct DiagnosticsPrinter<'d, 's> {
    diagnostics: &'d [Diagnostic],
    source: &'s str,
    path: Option<&'s str>,
    colored: bool,
}

impl<'d, 's> DiagnosticsPrinter<'d, 's> {
    pub fn new(diagnostics: &'d [Diagnostic], source: &'s str) -> Self {
        Self {
            diagnostics,
            source,
            path: None,
            colored: false,
        }
    }

    pub fn path(mut self, path: &'s str) -> Self {
        self.path = Some(path);
        self
    }

    pub fn colored(mut self, value: bool) -> Self {
        self.colored = value;
        self
    }

    pub fn render(&self) -> String {
        let renderer = if self.colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };

        let mut out = String::new();
        for (i, diag) in self.diagnostics.iter().enumerate() {
            let range = clamp_range(diag.range, self.source.len());
            let mut snippet = Snippet::source(self.source).line_start(1).annotation(
                AnnotationKind::Primary
                    .span(range)
                    .label(&diag.message),
            );
            if let Some(p) = self.path {
                snippet = snippet.path(p);
            }

            let level = match diag.severity {
                Severity::Error => Level::ERROR,
                Severity::Warning => Level::WARNING,
                Severity::Info => Level::INFO,
                Severity::Hint => Level::HELP,
            };
            let report = vec![level.primary_title(&diag.message).element(snippet)];

            if i > 0 {
                out.push('\n');
            }
            let _ = write!(out, "{}", renderer.render(&report));
        }
        out
    }
}

fn clamp_range(range: TextRange, limit: usize) -> std::ops::Range<usize> {
    let start: usize = range.start().into();
    let end: usize = range.end().into();
    if start == end {
        return start..(start + 1).min(limit);
    }
    start..end.min(limit)
}

/// Stable diagnostic codes. Lexer and parser codes live here; the rule
/// engines declare their own `TYPECHECK_*`/`LINT_*` constants next to the
/// rules that emit them.
pub mod codes {
    pub const LEXER_UNTERMINATED_STRING: &str = "LEXER_UNTERMINATED_STRING";
    pub const LEXER_INVALID_ESCAPE: &str = "LEXER_INVALID_ESCAPE";
    pub const LEXER_INVALID_CHARACTER: &str = "LEXER_INVALID_CHARACTER";

    pub const PARSER_EXPECTED_TOKEN: &str = "PARSER_EXPECTED_TOKEN";
    pub const PARSER_UNEXPECTED_TOKEN: &str = "PARSER_UNEXPECTED_TOKEN";
    pub const PARSER_LEGACY_EXTRA_RBRACE: &str = "PARSER_LEGACY_EXTRA_RBRACE";
    pub const PARSER_LEGACY_MISSING_RBRACE: &str = "PARSER_LEGACY_MISSING_RBRACE";
    /// Internal invariant violation: a list loop failed to advance.
    pub const PARSER_STALLED: &str = "PARSER_STALLED";
    /// `##` option line with no statement to attach to.
    pub const PARSER_DANGLING_OPTION: &str = "PARSER_DANGLING_OPTION";
    /// `##` option line whose payload could not be understood.
    pub const PARSER_INVALID_OPTION: &str = "PARSER_INVALID_OPTION";
}
