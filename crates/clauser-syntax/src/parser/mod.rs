//! Event-based parser producing a lossless CST.
//!
//! # Architecture
//!
//! Four stages, each feeding the next:
//!
//! 1. the lexer produces raw tokens (trivia included),
//! 2. the token source splits trivia out and decides its ownership,
//! 3. the grammar consumes non-trivia tokens and records events,
//! 4. the tree sink replays events into a rowan green tree, weaving the
//!    trivia back in at its owners.
//!
//! The parser is resilient: it always produces a tree covering every input
//! byte, and recoverable problems surface as diagnostics on the carrier.

mod core;
mod event;
mod grammar;
mod sink;

#[cfg(test)]
mod core_tests;

use rowan::GreenNode;

use crate::diagnostics::Diagnostic;
use crate::options::ParseOptions;
use crate::source::{BufferedLexer, TokenSource};

/// Parses one source into a green tree plus ordered diagnostics.
pub(crate) fn parse_green(source: &str, options: ParseOptions) -> (GreenNode, Vec<Diagnostic>) {
    let lexer = BufferedLexer::new(source, options.context, options.lex_options());
    let ts = TokenSource::new(lexer);
    let mut parser = core::Parser::new(ts, options);
    parser.parse_source_file();
    let (events, trivia, diagnostics) = parser.finish();
    let green = sink::build_tree(source, events, trivia);
    (green, diagnostics)
}
