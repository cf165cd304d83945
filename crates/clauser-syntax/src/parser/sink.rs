//! Tree sink: replays parser events into a green tree.
//!
//! Trivia attachment happens here, using the ownership decided at the token
//! source: on a token event the sink first emits that token's leading
//! trivia, then the token, then its trailing run (everything through the
//! first newline after it). At end of events the remaining trivia and a
//! zero-length `Eof` token close the `Root` node.
//!
//! Invariant: the finished tree's text equals the input byte-for-byte.

use rowan::{GreenNode, GreenNodeBuilder, TextRange, TextSize};

use super::event::Event;
use crate::kind::SyntaxKind;
use crate::source::Trivia;

pub(crate) fn build_tree(source: &str, mut events: Vec<Event>, trivia: Vec<Trivia>) -> GreenNode {
    let mut sink = TreeSink {
        source,
        trivia,
        cursor: 0,
        builder: GreenNodeBuilder::new(),
    };

    sink.builder.start_node(SyntaxKind::Root.into());

    let mut ancestors: Vec<SyntaxKind> = Vec::new();
    for i in 0..events.len() {
        match std::mem::replace(&mut events[i], Event::Tombstone) {
            Event::Start {
                kind,
                forward_parent,
            } => {
                // Collect the forward-parent chain, then open the oldest
                // ancestor first.
                ancestors.push(kind);
                let mut idx = i;
                let mut fp = forward_parent;
                while let Some(distance) = fp {
                    idx += distance as usize;
                    fp = match std::mem::replace(&mut events[idx], Event::Tombstone) {
                        Event::Start {
                            kind,
                            forward_parent,
                        } => {
                            ancestors.push(kind);
                            forward_parent
                        }
                        _ => unreachable!("forward parent must point at a start event"),
                    };
                }
                for kind in ancestors.drain(..).rev() {
                    if kind != SyntaxKind::Tombstone {
                        sink.builder.start_node(kind.into());
                    }
                }
            }
            Event::Finish => {
                sink.builder.finish_node();
            }
            Event::Token { kind, range } => sink.token(kind, range),
            Event::Tombstone => {}
        }
    }

    // End-of-file trivia leads the synthetic EOF token.
    sink.flush_rest();
    sink.builder.token(SyntaxKind::Eof.into(), "");

    sink.builder.finish_node();
    sink.builder.finish()
}

struct TreeSink<'s> {
    source: &'s str,
    trivia: Vec<Trivia>,
    cursor: usize,
    builder: GreenNodeBuilder<'static>,
}

impl TreeSink<'_> {
    fn token(&mut self, kind: SyntaxKind, range: TextRange) {
        self.flush_leading(range.start());
        self.builder
            .token(kind.into(), &self.source[std::ops::Range::<usize>::from(range)]);
        self.flush_trailing(range.end());
    }

    /// Emits every trivia piece that starts before `upto`.
    fn flush_leading(&mut self, upto: TextSize) {
        while let Some(piece) = self.trivia.get(self.cursor) {
            if piece.range.start() >= upto {
                break;
            }
            self.emit(*piece);
        }
    }

    /// Emits the contiguous run of trailing pieces owned by the token that
    /// just ended at `from`. Contiguity distinguishes this token's run from
    /// a later token's.
    fn flush_trailing(&mut self, mut from: TextSize) {
        while let Some(piece) = self.trivia.get(self.cursor) {
            if !piece.trailing || piece.range.start() != from {
                break;
            }
            from = piece.range.end();
            self.emit(*piece);
        }
    }

    fn flush_rest(&mut self) {
        while self.cursor < self.trivia.len() {
            let piece = self.trivia[self.cursor];
            self.emit(piece);
        }
    }

    fn emit(&mut self, piece: Trivia) {
        let text = &self.source[std::ops::Range::<usize>::from(piece.range)];
        self.builder.token(piece.kind.token_kind().into(), text);
        self.cursor += 1;
    }
}
