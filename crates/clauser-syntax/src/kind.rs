//! Syntax kinds for Clausewitz script and the schema DSL.
//!
//! `SyntaxKind` serves dual roles: token kinds (from the lexer) and node kinds
//! (from the parser). `ClausewitzLang` implements Rowan's `Language` trait for
//! tree construction. Both grammar profiles (game script and `.cwt` schema
//! files) share this vocabulary; only tokenisation context differs.

use rowan::Language;

/// All token and node kinds. Tokens first, then nodes, then `__LAST` sentinel.
/// `#[repr(u16)]` enables safe transmute in `kind_from_raw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum SyntaxKind {
    LBrace = 0,
    RBrace,

    /// `=`
    Eq,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `?=`
    QuestionEq,

    /// Unquoted scalar: identifiers, numbers, dates, dotted names.
    /// The lexer does not classify further; interpretation is delayed.
    ScalarUnquoted,
    /// `"..."` scalar, escapes and inner newlines preserved verbatim.
    ScalarQuoted,

    Whitespace,
    Newline,
    Comment,
    /// Coalesced bytes the lexer could not tokenise. Re-enters the tree as
    /// skipped trivia so reconstruction stays byte-exact.
    Garbage,

    /// Synthesised by the tree sink; carries end-of-file trivia.
    Eof,
    /// Abandoned marker. Never appears in a finished tree.
    Tombstone,

    // --- Node kinds (non-terminals) ---
    Root,
    Error,
    SourceFile,
    StatementList,
    KeyValue,
    Block,
    Scalar,
    TaggedBlockValue,

    // Must be last - used for bounds checking in `kind_from_raw`
    #[doc(hidden)]
    __LAST,
}

use SyntaxKind::*;

impl SyntaxKind {
    #[inline]
    pub fn is_trivia(self) -> bool {
        matches!(self, Whitespace | Newline | Comment | Garbage)
    }

    #[inline]
    pub fn is_operator(self) -> bool {
        token_sets::OPERATORS.contains(self)
    }

    #[inline]
    pub fn is_scalar_token(self) -> bool {
        token_sets::SCALARS.contains(self)
    }

    /// Short human description for diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            LBrace => "`{`",
            RBrace => "`}`",
            Eq => "`=`",
            EqEq => "`==`",
            NotEq => "`!=`",
            Gt => "`>`",
            GtEq => "`>=`",
            Lt => "`<`",
            LtEq => "`<=`",
            QuestionEq => "`?=`",
            ScalarUnquoted => "scalar",
            ScalarQuoted => "quoted scalar",
            Whitespace => "whitespace",
            Newline => "line break",
            Comment => "comment",
            Garbage => "unrecognised characters",
            Eof => "end of file",
            Tombstone => "nothing",
            Root => "file",
            Error => "invalid syntax",
            SourceFile => "file",
            StatementList => "statement list",
            KeyValue => "assignment",
            Block => "block",
            Scalar => "scalar",
            TaggedBlockValue => "tagged block",
            __LAST => unreachable!(),
        }
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    #[inline]
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

/// Language tag for Rowan's tree types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClausewitzLang {}

impl Language for ClausewitzLang {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        assert!(raw.0 < __LAST as u16);
        // SAFETY: bounds checked above, and SyntaxKind is repr(u16)
        unsafe { std::mem::transmute::<u16, SyntaxKind>(raw.0) }
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

/// 64-bit bitset of `SyntaxKind`s for O(1) membership testing.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TokenSet(u64);

impl TokenSet {
    pub const EMPTY: TokenSet = TokenSet(0);

    /// Panics at compile time if any kind's discriminant >= 64.
    #[inline]
    pub const fn new(kinds: &[SyntaxKind]) -> Self {
        let mut bits = 0u64;
        let mut i = 0;
        while i < kinds.len() {
            let kind = kinds[i] as u16;
            assert!(kind < 64, "SyntaxKind value exceeds TokenSet capacity");
            bits |= 1 << kind;
            i += 1;
        }
        TokenSet(bits)
    }

    #[inline]
    pub const fn contains(&self, kind: SyntaxKind) -> bool {
        let kind = kind as u16;
        if kind >= 64 {
            return false;
        }
        self.0 & (1 << kind) != 0
    }

    #[inline]
    pub const fn union(self, other: TokenSet) -> TokenSet {
        TokenSet(self.0 | other.0)
    }
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_set();
        for i in 0..64u16 {
            if self.0 & (1 << i) != 0 && i < __LAST as u16 {
                let kind: SyntaxKind = unsafe { std::mem::transmute(i) };
                list.entry(&kind);
            }
        }
        list.finish()
    }
}

/// Pre-defined token sets for the parser.
pub mod token_sets {
    use super::*;

    pub const OPERATORS: TokenSet =
        TokenSet::new(&[Eq, EqEq, NotEq, Gt, GtEq, Lt, LtEq, QuestionEq]);

    /// Operators beyond plain `=`, gated by `allow_comparison_operators`
    /// in strict mode. `?=` rides along with `=` as an assignment form.
    pub const COMPARISON_OPERATORS: TokenSet =
        TokenSet::new(&[EqEq, NotEq, Gt, GtEq, Lt, LtEq]);

    pub const SCALARS: TokenSet = TokenSet::new(&[ScalarUnquoted, ScalarQuoted]);

    /// Synchronisation points for statement-level recovery.
    pub const STATEMENT_RECOVERY: TokenSet =
        TokenSet::new(&[RBrace, ScalarUnquoted, ScalarQuoted, Eof]);
}
