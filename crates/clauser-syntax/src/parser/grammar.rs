//! Grammar productions for Clausewitz script.
//!
//! The same productions serve game files and `.cwt` schema files; the
//! profiles differ in tokenisation context and option defaults, not shape.
//!
//! ```text
//! SourceFile       ::= StatementList EOF
//! Statement        ::= KeyValue | Value
//! KeyValue         ::= Scalar Operator Value
//! Value            ::= Scalar | Block | TaggedBlockValue
//! Block            ::= `{` StatementList `}`
//! TaggedBlockValue ::= Scalar Block        (value position, same line)
//! ```

use super::core::{CompletedMarker, Parser, ParserProgress};
use crate::diagnostics::codes;
use crate::kind::{SyntaxKind, token_sets};
use crate::options::ParseMode;

impl Parser<'_> {
    pub(crate) fn parse_source_file(&mut self) {
        let m = self.start();
        self.statement_list(true);
        self.complete(m, SyntaxKind::SourceFile);
    }

    fn statement_list(&mut self, top_level: bool) {
        let m = self.start();
        let mut progress = ParserProgress::default();
        loop {
            if self.should_stop() {
                break;
            }
            if self.at(SyntaxKind::RBrace) {
                if !top_level {
                    break;
                }
                self.legacy_extra_rbrace();
                continue;
            }
            if !progress.made_progress(self) {
                break;
            }
            self.statement();
        }
        self.complete(m, SyntaxKind::StatementList);
    }

    fn statement(&mut self) {
        let kind = self.current_kind();
        if kind.is_scalar_token() {
            let next = self.nth(1);
            if next.kind.is_operator() {
                self.key_value();
            } else if next.kind == SyntaxKind::LBrace && !next.has_preceding_line_break() {
                // `key{...}` is an implicit `=`
                let m = self.start();
                self.scalar();
                self.block();
                self.complete(m, SyntaxKind::KeyValue);
            } else {
                // Bare value statement: array element or stray scalar.
                self.scalar();
            }
            return;
        }
        match kind {
            SyntaxKind::LBrace => {
                self.block();
            }
            k if k.is_operator() => {
                // Rejects `= x` and the `== "bar"` reading where `=` would
                // be a key, in both modes.
                self.error_and_bump("an operator cannot start a statement");
            }
            _ => self.error_and_bump("expected a key or value"),
        }
    }

    fn key_value(&mut self) {
        let m = self.start();
        self.scalar();

        let op = self.current_kind();
        debug_assert!(op.is_operator());
        if token_sets::COMPARISON_OPERATORS.contains(op)
            && self.options.mode == ParseMode::Strict
            && !self.options.allow_comparison_operators
        {
            self.error(
                codes::PARSER_UNEXPECTED_TOKEN,
                format!("{} is not allowed outside comparison contexts", op.describe()),
            );
        }
        self.bump();

        self.value();
        self.complete(m, SyntaxKind::KeyValue);
    }

    fn value(&mut self) {
        let kind = self.current_kind();
        if kind.is_scalar_token() {
            // Line-break recovery: `a =` at end of line followed by
            // `key = ...` means the value is missing, not on the next line.
            // Blocks and plain scalars may still follow a line break.
            if self.has_preceding_line_break() && self.nth_kind(1).is_operator() {
                self.err_recover("expected a value", token_sets::STATEMENT_RECOVERY);
                return;
            }
            let was_unquoted = kind == SyntaxKind::ScalarUnquoted;
            let completed = self.scalar();
            // `color = rgb { ... }`: a same-line `{` after an unquoted
            // scalar promotes it to a tagged-block head. A line break in
            // between leaves the scalar as the value and the block becomes
            // a stray statement.
            if was_unquoted && self.at(SyntaxKind::LBrace) && !self.has_preceding_line_break() {
                let m = self.precede(completed);
                self.block();
                self.complete(m, SyntaxKind::TaggedBlockValue);
            }
            return;
        }
        if kind == SyntaxKind::LBrace {
            self.block();
            return;
        }
        self.err_recover("expected a value", token_sets::STATEMENT_RECOVERY);
    }

    fn scalar(&mut self) -> CompletedMarker {
        debug_assert!(self.current_kind().is_scalar_token());
        let m = self.start();
        self.bump();
        self.complete(m, SyntaxKind::Scalar)
    }

    fn block(&mut self) {
        let m = self.start();
        self.expect(SyntaxKind::LBrace, "`{`");
        self.statement_list(false);
        if !self.eat(SyntaxKind::RBrace) {
            let strict = self.options.mode == ParseMode::Strict;
            self.legacy(
                codes::PARSER_LEGACY_MISSING_RBRACE,
                "missing `}` to close this block",
                strict,
            );
        }
        self.complete(m, SyntaxKind::Block);
    }

    fn legacy_extra_rbrace(&mut self) {
        let strict = self.options.mode == ParseMode::Strict;
        self.legacy(
            codes::PARSER_LEGACY_EXTRA_RBRACE,
            "stray `}` with no matching `{`",
            strict,
        );
        let m = self.start();
        self.bump();
        self.complete(m, SyntaxKind::Error);
    }
}
