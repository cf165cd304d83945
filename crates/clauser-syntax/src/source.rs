//! Token buffering and the trivia-splitting token source.
//!
//! The buffered lexer caches the whole token stream and supports
//! checkpoint/rewind plus context changes (which invalidate the cache
//! forward of the cursor). The token source layers the trivia ownership
//! decision on top: the grammar only ever sees non-trivia tokens, while an
//! ordered trivia list records, at stream time, whether each piece trails
//! the token before it or leads the token after it.

use rowan::{TextRange, TextSize};

use crate::diagnostics::Diagnostic;
use crate::kind::SyntaxKind;
use crate::lexer::{LexContext, LexOptions, Token, lex, lex_at};

/// Stream-side trivia classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriviaKind {
    Newline,
    Whitespace,
    Comment,
    /// Bytes the lexer rejected; preserved for reconstruction.
    Skipped,
}

impl TriviaKind {
    pub(crate) fn from_token(kind: SyntaxKind) -> Option<TriviaKind> {
        match kind {
            SyntaxKind::Newline => Some(TriviaKind::Newline),
            SyntaxKind::Whitespace => Some(TriviaKind::Whitespace),
            SyntaxKind::Comment => Some(TriviaKind::Comment),
            SyntaxKind::Garbage => Some(TriviaKind::Skipped),
            _ => None,
        }
    }

    pub(crate) fn token_kind(self) -> SyntaxKind {
        match self {
            TriviaKind::Newline => SyntaxKind::Newline,
            TriviaKind::Whitespace => SyntaxKind::Whitespace,
            TriviaKind::Comment => SyntaxKind::Comment,
            TriviaKind::Skipped => SyntaxKind::Garbage,
        }
    }
}

/// One piece of trivia with its ownership decided.
///
/// `trailing` is decided once, at the token source: trivia after a token up
/// to and including the first newline trail that token; everything else
/// leads the next token (or the synthetic EOF).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trivia {
    pub kind: TriviaKind,
    pub range: TextRange,
    pub trailing: bool,
}

/// Cached token stream with lookahead, rewind and context invalidation.
pub struct BufferedLexer<'s> {
    source: &'s str,
    ctx: LexContext,
    options: LexOptions,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
    pos: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct LexCheckpoint {
    pos: usize,
}

impl<'s> BufferedLexer<'s> {
    pub fn new(source: &'s str, ctx: LexContext, options: LexOptions) -> Self {
        let out = lex(source, ctx, &options);
        Self {
            source,
            ctx,
            options,
            tokens: out.tokens,
            diagnostics: out.diagnostics,
            pos: 0,
        }
    }

    pub fn source(&self) -> &'s str {
        self.source
    }

    fn eof_token(&self) -> Token {
        Token::new(
            SyntaxKind::Eof,
            TextRange::empty(TextSize::from(self.source.len() as u32)),
        )
    }

    /// Current token, or an `Eof` sentinel past the end.
    pub fn current(&self) -> Token {
        self.nth(0)
    }

    pub fn nth(&self, n: usize) -> Token {
        self.tokens
            .get(self.pos + n)
            .copied()
            .unwrap_or_else(|| self.eof_token())
    }

    pub fn at_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub fn bump(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    pub fn checkpoint(&self) -> LexCheckpoint {
        LexCheckpoint { pos: self.pos }
    }

    pub fn rewind(&mut self, checkpoint: LexCheckpoint) {
        debug_assert!(checkpoint.pos <= self.pos, "rewind must move backwards");
        self.pos = checkpoint.pos;
    }

    /// Switches tokenisation context. Tokens at and beyond the cursor are
    /// dropped and the remainder of the input is lexed again, since the
    /// change can alter token extent.
    pub fn set_context(&mut self, ctx: LexContext) {
        if ctx == self.ctx {
            return;
        }
        self.ctx = ctx;

        let offset = self
            .tokens
            .get(self.pos)
            .map_or_else(|| TextSize::from(self.source.len() as u32), |t| t.range.start());

        self.tokens.truncate(self.pos);
        self.diagnostics.retain(|d| d.range.start() < offset);

        let out = lex_at(self.source, offset, ctx, &self.options);
        self.tokens.extend(out.tokens);
        self.diagnostics.extend(out.diagnostics);
    }

    pub(crate) fn raw_tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub(crate) fn raw_pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}

/// Non-trivia view over the buffered lexer. Owns the trivia list.
pub struct TokenSource<'s> {
    lexer: BufferedLexer<'s>,
    trivia: Vec<Trivia>,
}

#[derive(Debug, Clone, Copy)]
pub struct SourceCheckpoint {
    lexer: LexCheckpoint,
    trivia_len: usize,
}

impl<'s> TokenSource<'s> {
    pub fn new(lexer: BufferedLexer<'s>) -> Self {
        let mut source = Self {
            lexer,
            trivia: Vec::new(),
        };
        // Trivia before the first token leads that token.
        source.collect_trivia(false);
        source
    }

    pub fn source(&self) -> &'s str {
        self.lexer.source()
    }

    fn collect_trivia(&mut self, mut trailing: bool) {
        loop {
            let token = self.lexer.current();
            let Some(kind) = TriviaKind::from_token(token.kind) else {
                break;
            };
            self.trivia.push(Trivia {
                kind,
                range: token.range,
                trailing,
            });
            // The first newline is still trailing; everything after it leads
            // the next token.
            if kind == TriviaKind::Newline {
                trailing = false;
            }
            self.lexer.bump();
        }
    }

    /// Current non-trivia token (or the `Eof` sentinel).
    pub fn current(&self) -> Token {
        self.lexer.current()
    }

    /// LL(k) lookahead over non-trivia tokens.
    pub fn nth(&self, n: usize) -> Token {
        let tokens = self.lexer.raw_tokens();
        let mut remaining = n;
        for token in &tokens[self.lexer.raw_pos()..] {
            if token.kind.is_trivia() {
                continue;
            }
            if remaining == 0 {
                return *token;
            }
            remaining -= 1;
        }
        Token::new(
            SyntaxKind::Eof,
            TextRange::empty(TextSize::from(self.source().len() as u32)),
        )
    }

    pub fn at_eof(&self) -> bool {
        self.lexer.at_eof()
    }

    /// Consumes the current token and classifies the trivia behind it.
    pub fn bump(&mut self) {
        if self.at_eof() {
            return;
        }
        debug_assert!(!self.lexer.current().kind.is_trivia());
        self.lexer.bump();
        self.collect_trivia(true);
    }

    /// Whether a line break separates the current token from the previous.
    pub fn has_preceding_line_break(&self) -> bool {
        self.current().has_preceding_line_break()
    }

    /// Opaque stream position, used by the stall guard.
    pub fn position(&self) -> usize {
        self.lexer.raw_pos()
    }

    pub fn checkpoint(&self) -> SourceCheckpoint {
        SourceCheckpoint {
            lexer: self.lexer.checkpoint(),
            trivia_len: self.trivia.len(),
        }
    }

    pub fn rewind(&mut self, checkpoint: SourceCheckpoint) {
        self.lexer.rewind(checkpoint.lexer);
        self.trivia.truncate(checkpoint.trivia_len);
    }

    /// Tears the source down into its trivia list and lexer diagnostics,
    /// consumed by the tree sink and the parse carrier.
    pub(crate) fn finish(mut self) -> (Vec<Trivia>, Vec<Diagnostic>) {
        let diagnostics = self.lexer.take_diagnostics();
        (self.trivia, diagnostics)
    }
}
