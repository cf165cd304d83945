//! The parse carrier: one source, parsed once, derived artifacts cached.
//!
//! The carrier is immutable after construction modulo its lazy caches, and
//! each cache slot initialises at most once (`OnceLock`). It stores the
//! green tree rather than a red root so the carrier itself stays
//! `Send + Sync`; red wrappers materialise on demand.

use std::sync::OnceLock;

use rowan::GreenNode;

use crate::ast::{self, SourceFile};
use crate::diagnostics::{Diagnostic, DiagnosticsPrinter};
use crate::facts::Facts;
use crate::options::ParseOptions;
use crate::parser::parse_green;
use crate::syntax::{SyntaxNode, dump_node};

const UTF8_BOM: &str = "\u{feff}";

pub struct ParsedSource {
    source: String,
    had_bom: bool,
    options: ParseOptions,
    green: GreenNode,
    diagnostics: Vec<Diagnostic>,
    ast: OnceLock<SourceFile>,
    facts: OnceLock<Facts>,
}

impl ParsedSource {
    /// Parses `text`. A UTF-8 BOM is stripped (and recorded); offsets in
    /// every derived artifact are relative to the stripped text.
    pub fn parse(text: &str, options: ParseOptions) -> ParsedSource {
        let (had_bom, stripped) = match text.strip_prefix(UTF8_BOM) {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let (green, diagnostics) = parse_green(stripped, options);
        ParsedSource {
            source: stripped.to_string(),
            had_bom,
            options,
            green,
            diagnostics,
            ast: OnceLock::new(),
            facts: OnceLock::new(),
        }
    }

    /// Source text with any BOM removed.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn had_bom(&self) -> bool {
        self.had_bom
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn green(&self) -> &GreenNode {
        &self.green
    }

    /// A fresh red root over the shared green tree. Cheap; not cached, so
    /// the carrier stays shareable across threads.
    pub fn syntax(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.green.clone())
    }

    pub fn ast(&self) -> &SourceFile {
        self.ast.get_or_init(|| ast::lower(&self.syntax()))
    }

    pub fn facts(&self) -> &Facts {
        self.facts.get_or_init(|| Facts::build(self.ast()))
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn printer(&self) -> DiagnosticsPrinter<'_, '_> {
        DiagnosticsPrinter::new(&self.diagnostics, &self.source)
    }

    /// Tree dump without trivia, for snapshots.
    pub fn dump_cst(&self) -> String {
        dump_node(&self.syntax(), false)
    }

    /// Tree dump with trivia, for losslessness checks.
    pub fn dump_cst_full(&self) -> String {
        dump_node(&self.syntax(), true)
    }
}

impl std::fmt::Debug for ParsedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedSource")
            .field("had_bom", &self.had_bom)
            .field("diagnostics", &self.diagnostics.len())
            .finish_non_exhaustive()
    }
}
