//! Red-tree wrappers: navigation handles over the green tree.
//!
//! Trivia ownership is recomputed positionally here (the policy is purely
//! positional, so the stream-side decision and these accessors always
//! agree): a token's trailing run is everything through the first newline
//! after it; its leading run is whatever remains between the previous
//! token's trailing run and the token itself.

use rowan::TextSize;

use crate::kind::{ClausewitzLang, SyntaxKind};
use crate::source::TriviaKind;

pub type SyntaxNode = rowan::SyntaxNode<ClausewitzLang>;
pub type SyntaxToken = rowan::SyntaxToken<ClausewitzLang>;
pub type SyntaxElement = rowan::NodeOrToken<SyntaxNode, SyntaxToken>;

/// Compact tree-side view of one trivia token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriviaPiece {
    pub kind: TriviaKind,
    pub len: TextSize,
}

/// Extensions over non-trivia tokens.
pub trait SyntaxTokenExt {
    /// Trivia owned by this token on its leading side, in source order.
    fn leading_trivia(&self) -> Vec<SyntaxToken>;

    /// Trivia owned by this token on its trailing side: everything through
    /// the first newline after it.
    fn trailing_trivia(&self) -> Vec<SyntaxToken>;

    /// Leading + text + trailing.
    fn text_with_trivia(&self) -> String;

    /// Piece view of a trivia token; `None` for non-trivia.
    fn trivia_piece(&self) -> Option<TriviaPiece>;
}

fn trivia_kind(token: &SyntaxToken) -> Option<TriviaKind> {
    TriviaKind::from_token(token.kind())
}

impl SyntaxTokenExt for SyntaxToken {
    fn leading_trivia(&self) -> Vec<SyntaxToken> {
        debug_assert!(!self.kind().is_trivia());

        // Everything between the previous non-trivia token and this one.
        let mut run = Vec::new();
        let mut cursor = self.prev_token();
        let mut has_prev_token = false;
        while let Some(t) = cursor {
            if !t.kind().is_trivia() {
                has_prev_token = true;
                break;
            }
            run.push(t.clone());
            cursor = t.prev_token();
        }
        run.reverse();

        // The previous token owns the run prefix through its first newline.
        if has_prev_token {
            let split = run
                .iter()
                .position(|t| t.kind() == SyntaxKind::Newline)
                .map_or(run.len(), |i| i + 1);
            run.drain(..split);
        }
        run
    }

    fn trailing_trivia(&self) -> Vec<SyntaxToken> {
        debug_assert!(!self.kind().is_trivia());

        let mut run = Vec::new();
        let mut cursor = self.next_token();
        while let Some(t) = cursor {
            if !t.kind().is_trivia() {
                break;
            }
            let is_newline = t.kind() == SyntaxKind::Newline;
            run.push(t.clone());
            if is_newline {
                break;
            }
            cursor = t.next_token();
        }
        run
    }

    fn text_with_trivia(&self) -> String {
        let mut out = String::new();
        for t in self.leading_trivia() {
            out.push_str(t.text());
        }
        out.push_str(self.text());
        for t in self.trailing_trivia() {
            out.push_str(t.text());
        }
        out
    }

    fn trivia_piece(&self) -> Option<TriviaPiece> {
        trivia_kind(self).map(|kind| TriviaPiece {
            kind,
            len: self.text_range().len(),
        })
    }
}

/// First non-trivia token inside `node`, if any.
pub fn first_meaningful_token(node: &SyntaxNode) -> Option<SyntaxToken> {
    let end = node.text_range().end();
    let mut token = node.first_token()?;
    loop {
        if !token.kind().is_trivia() && token.kind() != SyntaxKind::Eof {
            return Some(token);
        }
        let next = token.next_token()?;
        if next.text_range().start() >= end {
            return None;
        }
        token = next;
    }
}

/// Last non-trivia token inside `node`, if any.
pub fn last_meaningful_token(node: &SyntaxNode) -> Option<SyntaxToken> {
    let start = node.text_range().start();
    let mut token = node.last_token()?;
    loop {
        if !token.kind().is_trivia() && token.kind() != SyntaxKind::Eof {
            return Some(token);
        }
        let prev = token.prev_token()?;
        if prev.text_range().end() <= start {
            return None;
        }
        token = prev;
    }
}

/// Node range trimmed of the trivia owned by its edge tokens.
pub fn trimmed_range(node: &SyntaxNode) -> rowan::TextRange {
    match (first_meaningful_token(node), last_meaningful_token(node)) {
        (Some(first), Some(last)) => {
            rowan::TextRange::new(first.text_range().start(), last.text_range().end())
        }
        _ => node.text_range(),
    }
}

/// Renders the tree for snapshots: nodes as bare kinds, tokens as
/// `Kind "text"`, two-space indent. `include_trivia` keeps trivia tokens.
pub fn dump_node(node: &SyntaxNode, include_trivia: bool) -> String {
    let mut out = String::new();
    dump_into(&mut out, node, 0, include_trivia);
    out
}

fn dump_into(out: &mut String, node: &SyntaxNode, depth: usize, include_trivia: bool) {
    use std::fmt::Write as _;

    for _ in 0..depth {
        out.push_str("  ");
    }
    let _ = writeln!(out, "{:?}", node.kind());

    for child in node.children_with_tokens() {
        match child {
            SyntaxElement::Node(n) => dump_into(out, &n, depth + 1, include_trivia),
            SyntaxElement::Token(t) => {
                if t.kind() == SyntaxKind::Eof && t.text().is_empty() {
                    continue;
                }
                if !include_trivia && t.kind().is_trivia() {
                    continue;
                }
                for _ in 0..depth + 1 {
                    out.push_str("  ");
                }
                let _ = writeln!(out, "{:?} {:?}", t.kind(), t.text());
            }
        }
    }
}
