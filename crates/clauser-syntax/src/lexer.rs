//! Lexer for Clausewitz script and the schema DSL.
//!
//! Produces span-based tokens without storing text - text is sliced from
//! source only when needed. Two logos machines share one public vocabulary:
//! the schema DSL folds `[ ] < >` into scalars so `alias_name[trigger]`,
//! `<technology>` and `int[0..10]` stay single tokens, which also retires the
//! comparison operators in that context.
//!
//! ## Error handling
//!
//! Unrecognised byte runs coalesce into single `Garbage` tokens with one
//! `LEXER_INVALID_CHARACTER` diagnostic per run. String problems (unclosed
//! quote, invalid escape) keep the token intact and attach diagnostics; the
//! options decide whether an unclosed quote at EOF is reported at all.

use logos::Logos;
use rowan::{TextRange, TextSize};

use crate::diagnostics::{Category, Diagnostic, codes};
use crate::kind::SyntaxKind;

/// Tokenisation context. A context change mid-stream alters token extent,
/// so the buffered lexer must invalidate its cache forward of the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LexContext {
    /// Game-script files.
    #[default]
    Jomini,
    /// CWTools `.cwt` rule files.
    SchemaDsl,
}

/// Options that change token extent.
#[derive(Debug, Clone, Copy)]
pub struct LexOptions {
    /// Quoted scalars may run across line breaks.
    pub allow_multiline_strings: bool,
    /// An unclosed quote at EOF closes silently instead of diagnosing.
    pub allow_unterminated_strings: bool,
}

impl Default for LexOptions {
    fn default() -> Self {
        Self {
            allow_multiline_strings: true,
            allow_unterminated_strings: false,
        }
    }
}

/// Per-token lexical facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenFlags(u8);

impl TokenFlags {
    pub const WAS_QUOTED: TokenFlags = TokenFlags(1 << 0);
    pub const HAS_ESCAPE: TokenFlags = TokenFlags(1 << 1);
    pub const HAS_PRECEDING_LINE_BREAK: TokenFlags = TokenFlags(1 << 2);

    #[inline]
    pub fn contains(self, other: TokenFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: TokenFlags) {
        self.0 |= other.0;
    }
}

/// Zero-copy token: kind + span + flags, text retrieved via [`token_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: SyntaxKind,
    pub range: TextRange,
    pub flags: TokenFlags,
}

impl Token {
    #[inline]
    pub fn new(kind: SyntaxKind, range: TextRange) -> Self {
        Self {
            kind,
            range,
            flags: TokenFlags::default(),
        }
    }

    #[inline]
    pub fn has_preceding_line_break(&self) -> bool {
        self.flags.contains(TokenFlags::HAS_PRECEDING_LINE_BREAK)
    }
}

/// Retrieves the text slice for a token. O(1) slice into source.
#[inline]
pub fn token_text<'s>(source: &'s str, token: &Token) -> &'s str {
    &source[std::ops::Range::<usize>::from(token.range)]
}

#[derive(Debug, Clone, Copy, Default)]
struct StrExtent {
    multiline: bool,
}

/// Length of a quoted scalar from just after the opening quote: through the
/// closing unescaped quote, or up to (not including) a line break when
/// multiline strings are off, or to EOF.
fn quoted_len(rem: &str, multiline: bool) -> usize {
    let bytes = rem.as_bytes();
    let mut i = 0;
    let mut escaped = false;
    while i < bytes.len() {
        let b = bytes[i];
        if escaped {
            escaped = false;
            i += 1;
            continue;
        }
        match b {
            b'\\' => {
                escaped = true;
                i += 1;
            }
            b'"' => return i + 1,
            b'\r' | b'\n' if !multiline => return i,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn quoted_jomini(lex: &mut logos::Lexer<RawJomini>) {
    let n = quoted_len(lex.remainder(), lex.extras.multiline);
    lex.bump(n);
}

fn quoted_dsl(lex: &mut logos::Lexer<RawDsl>) {
    let n = quoted_len(lex.remainder(), lex.extras.multiline);
    lex.bump(n);
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(extras = StrExtent)]
enum RawJomini {
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("=")]
    Eq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token("?=")]
    QuestionEq,
    /// Boundary characters end a scalar; `?` is both a scalar byte and the
    /// `?=` leader, resolved by a post-pass split.
    #[regex(r"[0-9A-Za-z_.\-:@$?\u{80}-\u{10FFFF}]+")]
    Scalar,
    #[token("\"", quoted_jomini)]
    Quoted,
    #[regex(r"[ \t]+")]
    #[token("\r")]
    Whitespace,
    #[token("\n")]
    #[token("\r\n")]
    Newline,
    #[regex(r"#[^\r\n]*", allow_greedy = true)]
    Comment,
}

impl RawJomini {
    fn kind(self) -> SyntaxKind {
        match self {
            RawJomini::LBrace => SyntaxKind::LBrace,
            RawJomini::RBrace => SyntaxKind::RBrace,
            RawJomini::Eq => SyntaxKind::Eq,
            RawJomini::EqEq => SyntaxKind::EqEq,
            RawJomini::NotEq => SyntaxKind::NotEq,
            RawJomini::Gt => SyntaxKind::Gt,
            RawJomini::GtEq => SyntaxKind::GtEq,
            RawJomini::Lt => SyntaxKind::Lt,
            RawJomini::LtEq => SyntaxKind::LtEq,
            RawJomini::QuestionEq => SyntaxKind::QuestionEq,
            RawJomini::Scalar => SyntaxKind::ScalarUnquoted,
            RawJomini::Quoted => SyntaxKind::ScalarQuoted,
            RawJomini::Whitespace => SyntaxKind::Whitespace,
            RawJomini::Newline => SyntaxKind::Newline,
            RawJomini::Comment => SyntaxKind::Comment,
        }
    }
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(extras = StrExtent)]
enum RawDsl {
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("=")]
    Eq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[regex(r"[0-9A-Za-z_.\-:@$?\[\]<>\u{80}-\u{10FFFF}]+")]
    Scalar,
    #[token("\"", quoted_dsl)]
    Quoted,
    #[regex(r"[ \t]+")]
    #[token("\r")]
    Whitespace,
    #[token("\n")]
    #[token("\r\n")]
    Newline,
    #[regex(r"#[^\r\n]*", allow_greedy = true)]
    Comment,
}

impl RawDsl {
    fn kind(self) -> SyntaxKind {
        match self {
            RawDsl::LBrace => SyntaxKind::LBrace,
            RawDsl::RBrace => SyntaxKind::RBrace,
            RawDsl::Eq => SyntaxKind::Eq,
            RawDsl::EqEq => SyntaxKind::EqEq,
            RawDsl::NotEq => SyntaxKind::NotEq,
            RawDsl::Scalar => SyntaxKind::ScalarUnquoted,
            RawDsl::Quoted => SyntaxKind::ScalarQuoted,
            RawDsl::Whitespace => SyntaxKind::Whitespace,
            RawDsl::Newline => SyntaxKind::Newline,
            RawDsl::Comment => SyntaxKind::Comment,
        }
    }
}

/// Output of [`lex`]: raw tokens (trivia included) plus lexer diagnostics.
#[derive(Debug, Clone, Default)]
pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Tokenises the whole input in one pass.
pub fn lex(source: &str, ctx: LexContext, options: &LexOptions) -> LexOutput {
    lex_at(source, TextSize::from(0), ctx, options)
}

/// Tokenises `source[offset..]` with ranges relative to the full text.
/// The buffered lexer uses this to re-lex after a context change.
pub(crate) fn lex_at(
    source: &str,
    offset: TextSize,
    ctx: LexContext,
    options: &LexOptions,
) -> LexOutput {
    let rest = &source[usize::from(offset)..];
    let extras = StrExtent {
        multiline: options.allow_multiline_strings,
    };

    let mut raw: Vec<(SyntaxKind, std::ops::Range<usize>)> = Vec::new();

    match ctx {
        LexContext::Jomini => {
            let mut lexer = RawJomini::lexer_with_extras(rest, extras);
            while let Some(item) = lexer.next() {
                match item {
                    Ok(kind) => raw.push((kind.kind(), lexer.span())),
                    Err(()) => coalesce_garbage(&mut raw, lexer.span()),
                }
            }
        }
        LexContext::SchemaDsl => {
            let mut lexer = RawDsl::lexer_with_extras(rest, extras);
            while let Some(item) = lexer.next() {
                match item {
                    Ok(kind) => raw.push((kind.kind(), lexer.span())),
                    Err(()) => coalesce_garbage(&mut raw, lexer.span()),
                }
            }
        }
    }

    finish(source, offset, ctx, options, raw)
}

/// Extends the current garbage run or starts a new one, so a run of bad
/// bytes becomes one token and one diagnostic.
fn coalesce_garbage(raw: &mut Vec<(SyntaxKind, std::ops::Range<usize>)>, span: std::ops::Range<usize>) {
    if let Some((kind, r)) = raw.last_mut()
        && *kind == SyntaxKind::Garbage
        && r.end == span.start
    {
        r.end = span.end;
        return;
    }
    raw.push((SyntaxKind::Garbage, span));
}

fn finish(
    source: &str,
    offset: TextSize,
    ctx: LexContext,
    options: &LexOptions,
    raw: Vec<(SyntaxKind, std::ops::Range<usize>)>,
) -> LexOutput {
    let base = usize::from(offset);
    let abs = |r: &std::ops::Range<usize>| {
        TextRange::new(
            TextSize::from((base + r.start) as u32),
            TextSize::from((base + r.end) as u32),
        )
    };

    let mut out = LexOutput::default();
    for (kind, span) in &raw {
        if *kind == SyntaxKind::Garbage {
            out.diagnostics.push(Diagnostic::error(
                codes::LEXER_INVALID_CHARACTER,
                Category::Lexer,
                abs(span),
                "unrecognised characters",
            ));
        }
    }

    let mut at_line_start = true;
    let mut i = 0;
    while i < raw.len() {
        let (kind, span) = raw[i].clone();
        i += 1;

        // `a?=b`: the scalar machine grabs the trailing `?`; re-split so the
        // operator surfaces.
        if ctx == LexContext::Jomini
            && kind == SyntaxKind::ScalarUnquoted
            && source[base + span.start..base + span.end].ends_with('?')
            && i < raw.len()
            && raw[i].0 == SyntaxKind::Eq
        {
            let eq_span = raw[i].1.clone();
            i += 1;
            if span.len() > 1 {
                let mut t = Token::new(SyntaxKind::ScalarUnquoted, abs(&(span.start..span.end - 1)));
                if at_line_start {
                    t.flags.insert(TokenFlags::HAS_PRECEDING_LINE_BREAK);
                    at_line_start = false;
                }
                out.tokens.push(t);
            }
            let mut op = Token::new(SyntaxKind::QuestionEq, abs(&(span.end - 1..eq_span.end)));
            if at_line_start {
                op.flags.insert(TokenFlags::HAS_PRECEDING_LINE_BREAK);
                at_line_start = false;
            }
            out.tokens.push(op);
            continue;
        }

        let mut token = Token::new(kind, abs(&span));

        if kind == SyntaxKind::ScalarQuoted {
            token.flags.insert(TokenFlags::WAS_QUOTED);
            let scan = scan_quoted(&source[base + span.start..base + span.end]);
            if scan.has_escape {
                token.flags.insert(TokenFlags::HAS_ESCAPE);
            }
            if let Some(rel) = scan.invalid_escape {
                let at = TextSize::from((base + span.start + rel) as u32);
                out.diagnostics.push(Diagnostic::error(
                    codes::LEXER_INVALID_ESCAPE,
                    Category::Lexer,
                    TextRange::new(at, at + TextSize::from(2)),
                    "invalid escape sequence; only `\\\\` and `\\\"` are recognised",
                ));
            }
            if !scan.terminated && !options.allow_unterminated_strings {
                out.diagnostics.push(Diagnostic::error(
                    codes::LEXER_UNTERMINATED_STRING,
                    Category::Lexer,
                    token.range,
                    "unterminated string",
                ));
            }
        }

        match kind {
            SyntaxKind::Newline => at_line_start = true,
            SyntaxKind::Whitespace | SyntaxKind::Comment | SyntaxKind::Garbage => {}
            _ => {
                if at_line_start {
                    token.flags.insert(TokenFlags::HAS_PRECEDING_LINE_BREAK);
                }
                at_line_start = false;
            }
        }

        out.tokens.push(token);
    }

    out
}

struct QuotedScan {
    terminated: bool,
    has_escape: bool,
    invalid_escape: Option<usize>,
}

fn scan_quoted(text: &str) -> QuotedScan {
    let bytes = text.as_bytes();
    debug_assert!(!bytes.is_empty() && bytes[0] == b'"');

    let mut has_escape = false;
    let mut invalid_escape = None;
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                has_escape = true;
                if i + 1 < bytes.len() {
                    if !matches!(bytes[i + 1], b'\\' | b'"') && invalid_escape.is_none() {
                        invalid_escape = Some(i);
                    }
                    i += 2;
                } else {
                    if invalid_escape.is_none() {
                        invalid_escape = Some(i);
                    }
                    i += 1;
                }
            }
            b'"' => {
                return QuotedScan {
                    terminated: true,
                    has_escape,
                    invalid_escape,
                };
            }
            _ => i += 1,
        }
    }
    QuotedScan {
        terminated: false,
        has_escape,
        invalid_escape,
    }
}
