//! Unit tests for the parser state machine: markers, forward parents,
//! checkpoints, speculation and the stall guard.

use super::core::{Parser, ParserProgress};
use super::sink::build_tree;
use crate::diagnostics::codes;
use crate::kind::SyntaxKind;
use crate::lexer::{LexContext, LexOptions};
use crate::options::ParseOptions;
use crate::source::{BufferedLexer, TokenSource};
use crate::syntax::SyntaxNode;

fn parser_for(source: &str) -> Parser<'_> {
    let lexer = BufferedLexer::new(source, LexContext::Jomini, LexOptions::default());
    Parser::new(TokenSource::new(lexer), ParseOptions::jomini())
}

fn build(source: &str, parser: Parser<'_>) -> SyntaxNode {
    let (events, trivia, _) = parser.finish();
    SyntaxNode::new_root(build_tree(source, events, trivia))
}

#[test]
fn marker_completes_into_node() {
    let source = "a";
    let mut p = parser_for(source);
    let m = p.start();
    p.bump();
    p.complete(m, SyntaxKind::Scalar);

    let root = build(source, p);
    let scalar = root.first_child().unwrap();
    assert_eq!(scalar.kind(), SyntaxKind::Scalar);
    assert_eq!(scalar.text().to_string(), "a");
}

#[test]
fn abandoned_marker_leaves_no_node() {
    let source = "a";
    let mut p = parser_for(source);
    let m = p.start();
    p.abandon(m);
    p.bump();

    let root = build(source, p);
    assert_eq!(root.children().count(), 0);
}

#[test]
fn precede_reparents_completed_node() {
    let source = "tag";
    let mut p = parser_for(source);
    let m = p.start();
    p.bump();
    let completed = p.complete(m, SyntaxKind::Scalar);
    let outer = p.precede(completed);
    p.complete(outer, SyntaxKind::TaggedBlockValue);

    let root = build(source, p);
    let tagged = root.first_child().unwrap();
    assert_eq!(tagged.kind(), SyntaxKind::TaggedBlockValue);
    let scalar = tagged.first_child().unwrap();
    assert_eq!(scalar.kind(), SyntaxKind::Scalar);
}

#[test]
fn rollback_discards_events_and_diagnostics() {
    let mut p = parser_for("a b");
    let checkpoint = p.checkpoint();
    let before = p.current();

    p.begin_speculation();
    p.bump();
    p.error(codes::PARSER_UNEXPECTED_TOKEN, "speculative complaint");
    assert!(p.is_speculative());
    p.rollback_speculation(checkpoint);

    assert!(!p.is_speculative());
    assert_eq!(p.current(), before);

    p.bump();
    p.bump();
    let (events, _, diagnostics) = p.finish();
    assert!(diagnostics.is_empty());
    // Only the two committed token events survive.
    assert_eq!(events.len(), 2);
}

#[test]
fn commit_flushes_queued_diagnostics() {
    let mut p = parser_for("a");
    p.begin_speculation();
    p.error(codes::PARSER_UNEXPECTED_TOKEN, "kept complaint");
    p.commit_speculation();
    p.bump();

    let (_, _, diagnostics) = p.finish();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, codes::PARSER_UNEXPECTED_TOKEN);
}

#[test]
fn one_diagnostic_per_position() {
    let mut p = parser_for("a");
    p.error(codes::PARSER_EXPECTED_TOKEN, "first");
    p.error(codes::PARSER_UNEXPECTED_TOKEN, "second at the same spot");
    let (_, _, diagnostics) = p.finish();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].message, "first");
}

#[test]
fn stall_guard_emits_fatal_diagnostic() {
    let mut p = parser_for("a");
    let mut progress = ParserProgress::default();
    assert!(progress.made_progress(&mut p));
    // No bump in between: the loop would spin forever.
    assert!(!progress.made_progress(&mut p));
    assert!(p.fatal());

    p.bump();
    let (_, _, diagnostics) = p.finish();
    assert!(diagnostics.iter().any(|d| d.code == codes::PARSER_STALLED));
}
