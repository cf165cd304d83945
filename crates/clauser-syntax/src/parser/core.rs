//! Parser state machine and low-level operations.
//!
//! The parser never touches the tree. It consumes non-trivia tokens from a
//! [`TokenSource`] and appends [`Event`]s; the sink builds the green tree
//! afterwards. Checkpoints snapshot the cursor plus the event and pending
//! diagnostic lengths, so rewinding is truncation. Speculation is a depth
//! counter that routes diagnostics into a queue which rewinds discard and
//! commits flush.

use rowan::TextRange;

use super::event::Event;
use crate::diagnostics::{Category, Diagnostic, DiagnosticSink, Severity, codes};
use crate::kind::{SyntaxKind, TokenSet};
use crate::lexer::Token;
use crate::options::ParseOptions;
use crate::source::{SourceCheckpoint, TokenSource, Trivia};

pub(crate) struct Parser<'s> {
    ts: TokenSource<'s>,
    pub(crate) options: ParseOptions,
    events: Vec<Event>,
    sink: DiagnosticSink,
    pending: Vec<Diagnostic>,
    speculation: u32,
    last_error_pos: Option<rowan::TextSize>,
    fatal: bool,
}

/// Handle to a provisional `Start` event.
#[derive(Debug)]
pub(crate) struct Marker {
    pos: u32,
}

/// A completed node that can still be re-parented via `precede`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CompletedMarker {
    pos: u32,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ParserCheckpoint {
    source: SourceCheckpoint,
    events: usize,
    pending: usize,
    last_error_pos: Option<rowan::TextSize>,
}

/// Stall guard for list loops: a loop iteration that consumes nothing is an
/// internal invariant violation and must abort the loop instead of spinning.
#[derive(Default)]
pub(crate) struct ParserProgress(Option<usize>);

impl ParserProgress {
    pub(crate) fn made_progress(&mut self, p: &mut Parser) -> bool {
        let pos = p.ts.position();
        if self.0 == Some(pos) {
            p.fatal_stall();
            return false;
        }
        self.0 = Some(pos);
        true
    }
}

impl<'s> Parser<'s> {
    pub(crate) fn new(ts: TokenSource<'s>, options: ParseOptions) -> Self {
        Self {
            ts,
            options,
            events: Vec::new(),
            sink: DiagnosticSink::new(),
            pending: Vec::new(),
            speculation: 0,
            last_error_pos: None,
            fatal: false,
        }
    }

    pub(crate) fn source(&self) -> &'s str {
        self.ts.source()
    }

    /// Events, trivia list and merged diagnostics, ordered by position.
    pub(crate) fn finish(mut self) -> (Vec<Event>, Vec<Trivia>, Vec<Diagnostic>) {
        debug_assert!(self.speculation == 0, "unbalanced speculation");
        self.pending.clear();
        let (trivia, lexer_diags) = self.ts.finish();

        let mut sink = DiagnosticSink::new();
        sink.extend(lexer_diags);
        sink.extend(self.sink.into_vec());
        let mut diagnostics = sink.into_vec();
        diagnostics.sort_by_key(|d| d.range.start());
        (self.events, trivia, diagnostics)
    }

    // --- cursor ---

    pub(crate) fn current(&self) -> Token {
        self.ts.current()
    }

    pub(crate) fn current_kind(&self) -> SyntaxKind {
        self.ts.current().kind
    }

    pub(crate) fn nth(&self, n: usize) -> Token {
        self.ts.nth(n)
    }

    pub(crate) fn nth_kind(&self, n: usize) -> SyntaxKind {
        self.ts.nth(n).kind
    }

    pub(crate) fn at(&self, kind: SyntaxKind) -> bool {
        self.current_kind() == kind
    }

    pub(crate) fn at_set(&self, set: TokenSet) -> bool {
        set.contains(self.current_kind())
    }

    pub(crate) fn at_eof(&self) -> bool {
        self.ts.at_eof()
    }

    pub(crate) fn has_preceding_line_break(&self) -> bool {
        self.ts.has_preceding_line_break()
    }

    pub(crate) fn current_range(&self) -> TextRange {
        self.ts.current().range
    }

    pub(crate) fn fatal(&self) -> bool {
        self.fatal
    }

    pub(crate) fn should_stop(&self) -> bool {
        self.at_eof() || self.fatal
    }

    // --- events ---

    pub(crate) fn bump(&mut self) {
        assert!(!self.at_eof(), "bump called at EOF");
        let token = self.ts.current();
        self.events.push(Event::Token {
            kind: token.kind,
            range: token.range,
        });
        self.ts.bump();
    }

    pub(crate) fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub(crate) fn start(&mut self) -> Marker {
        let pos = self.events.len() as u32;
        self.events.push(Event::Start {
            kind: SyntaxKind::Tombstone,
            forward_parent: None,
        });
        Marker { pos }
    }

    // --- checkpoints & speculation ---

    pub(crate) fn checkpoint(&self) -> ParserCheckpoint {
        ParserCheckpoint {
            source: self.ts.checkpoint(),
            events: self.events.len(),
            pending: self.pending.len(),
            last_error_pos: self.last_error_pos,
        }
    }

    pub(crate) fn rewind(&mut self, checkpoint: ParserCheckpoint) {
        self.ts.rewind(checkpoint.source);
        self.events.truncate(checkpoint.events);
        self.pending.truncate(checkpoint.pending);
        self.last_error_pos = checkpoint.last_error_pos;
    }

    pub(crate) fn begin_speculation(&mut self) {
        self.speculation += 1;
    }

    /// Keeps everything parsed since speculation began; queued diagnostics
    /// flush once the outermost speculation commits.
    pub(crate) fn commit_speculation(&mut self) {
        assert!(self.speculation > 0, "commit without begin");
        self.speculation -= 1;
        if self.speculation == 0 {
            for diag in self.pending.drain(..) {
                self.sink.push(diag);
            }
        }
    }

    /// Discards everything parsed since the checkpoint, queued diagnostics
    /// included.
    pub(crate) fn rollback_speculation(&mut self, checkpoint: ParserCheckpoint) {
        assert!(self.speculation > 0, "rollback without begin");
        self.speculation -= 1;
        self.rewind(checkpoint);
    }

    pub(crate) fn is_speculative(&self) -> bool {
        self.speculation > 0
    }

    // --- markers ---

    pub(crate) fn complete(&mut self, marker: Marker, kind: SyntaxKind) -> CompletedMarker {
        match &mut self.events[marker.pos as usize] {
            Event::Start { kind: slot, .. } => *slot = kind,
            _ => unreachable!("marker does not point at a start event"),
        }
        self.events.push(Event::Finish);
        CompletedMarker { pos: marker.pos }
    }

    pub(crate) fn abandon(&mut self, marker: Marker) {
        let pos = marker.pos as usize;
        if pos == self.events.len() - 1 {
            self.events.pop();
        } else {
            self.events[pos] = Event::Tombstone;
        }
    }

    /// Opens a new node that will become the parent of the completed one.
    pub(crate) fn precede(&mut self, completed: CompletedMarker) -> Marker {
        let new = self.start();
        match &mut self.events[completed.pos as usize] {
            Event::Start { forward_parent, .. } => {
                *forward_parent = Some(new.pos - completed.pos);
            }
            _ => unreachable!("completed marker does not point at a start event"),
        }
        new
    }

    // --- diagnostics ---

    fn emit(&mut self, diag: Diagnostic) {
        // One diagnostic per parse position, matching the sink's
        // (code, start) dedup with a stricter local guard.
        if self.last_error_pos == Some(diag.range.start()) {
            return;
        }
        self.last_error_pos = Some(diag.range.start());
        if self.speculation > 0 {
            self.pending.push(diag);
        } else {
            self.sink.push(diag);
        }
    }

    pub(crate) fn error(&mut self, code: &'static str, message: impl Into<String>) {
        self.error_at(code, self.current_range(), message);
    }

    pub(crate) fn error_at(
        &mut self,
        code: &'static str,
        range: TextRange,
        message: impl Into<String>,
    ) {
        self.emit(Diagnostic::error(code, Category::Parser, range, message));
    }

    pub(crate) fn warn(&mut self, code: &'static str, message: impl Into<String>) {
        let range = self.current_range();
        self.emit(Diagnostic::warning(code, Category::Parser, range, message));
    }

    /// Severity picked by parse mode: legacy forms warn in permissive mode
    /// and error in strict mode.
    pub(crate) fn legacy(&mut self, code: &'static str, message: impl Into<String>, strict: bool) {
        let severity = if strict {
            Severity::Error
        } else {
            Severity::Warning
        };
        let range = self.current_range();
        self.emit(Diagnostic::new(
            code,
            severity,
            Category::Parser,
            range,
            message,
        ));
    }

    /// On mismatch: emit diagnostic but don't consume (allows parent recovery).
    pub(crate) fn expect(&mut self, kind: SyntaxKind, what: &str) -> bool {
        if self.eat(kind) {
            return true;
        }
        self.error(codes::PARSER_EXPECTED_TOKEN, format!("expected {what}"));
        false
    }

    pub(crate) fn error_and_bump(&mut self, message: &str) {
        self.error(codes::PARSER_UNEXPECTED_TOKEN, message);
        if !self.at_eof() {
            let m = self.start();
            self.bump();
            self.complete(m, SyntaxKind::Error);
        }
    }

    /// Token-set recovery with line-break termination: wraps everything up
    /// to the next synchronisation point in an `Error` node.
    pub(crate) fn err_recover(&mut self, message: &str, recovery: TokenSet) {
        self.error(codes::PARSER_EXPECTED_TOKEN, message);
        if self.at_set(recovery) || self.should_stop() {
            return;
        }
        let m = self.start();
        while !self.at_set(recovery) && !self.should_stop() {
            self.bump();
            if self.has_preceding_line_break() {
                break;
            }
        }
        self.complete(m, SyntaxKind::Error);
    }

    pub(crate) fn fatal_stall(&mut self) {
        if !self.fatal {
            let range = self.current_range();
            // Bypasses the per-position guard: a stall must always surface.
            let diag = Diagnostic::error(
                codes::PARSER_STALLED,
                Category::Parser,
                range,
                "internal error: parser failed to advance",
            );
            if self.speculation > 0 {
                self.pending.push(diag);
            } else {
                self.sink.push(diag);
            }
            self.fatal = true;
        }
    }
}
