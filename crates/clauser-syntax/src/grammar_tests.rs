use indoc::indoc;

use crate::ast::{Operator, Statement, Value};
use crate::diagnostics::{Severity, codes};
use crate::options::{ParseMode, ParseOptions};
use crate::{ParsedSource, SyntaxKind};

fn parse(source: &str) -> ParsedSource {
    ParsedSource::parse(source, ParseOptions::jomini())
}

fn parse_strict(source: &str) -> ParsedSource {
    ParsedSource::parse(source, ParseOptions::strict())
}

#[test]
fn empty_file() {
    let parsed = parse("");
    assert!(parsed.diagnostics().is_empty());
    assert!(parsed.ast().statements.is_empty());
    assert_eq!(parsed.syntax().text().to_string(), "");
}

#[test]
fn simple_key_value() {
    let parsed = parse("a = b");
    assert!(parsed.diagnostics().is_empty());
    insta::assert_snapshot!(parsed.dump_cst(), @r#"
    Root
      SourceFile
        StatementList
          KeyValue
            Scalar
              ScalarUnquoted "a"
            Eq "="
            Scalar
              ScalarUnquoted "b"
    "#);
}

#[test]
fn compact_form() {
    // Compact real-world form: no spaces anywhere, comment at the tail.
    let source = "a={b=\"1\"c=d}foo=bar#good\n";
    let parsed = parse(source);
    assert!(parsed.diagnostics().is_empty());

    let ast = parsed.ast();
    assert_eq!(ast.statements.len(), 2);

    let a = ast.statements[0].as_key_value().unwrap();
    assert_eq!(a.key.text(), "a");
    let block = a.value.as_block().unwrap();
    assert_eq!(block.statements.len(), 2);
    let b = block.statements[0].as_key_value().unwrap();
    assert_eq!(b.key.text(), "b");
    assert_eq!(b.value.as_scalar().unwrap().text(), "1");
    assert!(b.value.as_scalar().unwrap().was_quoted());
    let c = block.statements[1].as_key_value().unwrap();
    assert_eq!(c.value.as_scalar().unwrap().text(), "d");

    let foo = ast.statements[1].as_key_value().unwrap();
    assert_eq!(foo.key.text(), "foo");
    assert_eq!(foo.value.as_scalar().unwrap().text(), "bar");

    assert_eq!(parsed.syntax().text().to_string(), source);
}

#[test]
fn tagged_block_value() {
    let parsed = parse("color = rgb { 100 200 150 }");
    assert!(parsed.diagnostics().is_empty());

    let kv = parsed.ast().statements[0].as_key_value().unwrap();
    let tagged = kv.value.as_tagged().unwrap();
    assert_eq!(tagged.tag.text(), "rgb");
    assert_eq!(tagged.body.as_array().len(), 3);
}

#[test]
fn tagged_block_needs_same_line() {
    // A line break between tag and `{` demotes the tag to a plain value
    // and the block becomes a stray statement.
    let parsed = parse("color = rgb\n{ 100 200 150 }");
    let ast = parsed.ast();
    assert_eq!(ast.statements.len(), 2);

    let kv = ast.statements[0].as_key_value().unwrap();
    assert_eq!(kv.value.as_scalar().unwrap().text(), "rgb");
    assert!(matches!(
        ast.statements[1],
        Statement::Value(Value::Block(_))
    ));
}

#[test]
fn quoted_tag_is_not_a_tag() {
    let parsed = parse("color = \"rgb\" { 1 }");
    let ast = parsed.ast();
    assert_eq!(ast.statements.len(), 2);
    let kv = ast.statements[0].as_key_value().unwrap();
    assert!(kv.value.as_scalar().unwrap().was_quoted());
}

#[test]
fn implicit_assignment() {
    let parsed = parse("key{ a = 1 }");
    assert!(parsed.diagnostics().is_empty());

    let kv = parsed.ast().statements[0].as_key_value().unwrap();
    assert_eq!(kv.op, Operator::Assign);
    assert!(kv.op_range.is_none());
    assert!(kv.value.as_block().is_some());
}

#[test]
fn implicit_assignment_needs_same_line() {
    let parsed = parse("key\n{ a = 1 }");
    let ast = parsed.ast();
    assert_eq!(ast.statements.len(), 2);
    assert!(matches!(
        ast.statements[0],
        Statement::Value(Value::Scalar(_))
    ));
}

#[test]
fn all_operators_lower() {
    let source = indoc! {"
        a = 1
        b == 2
        c != 3
        d > 4
        e >= 5
        f < 6
        g <= 7
        h ?= 8
    "};
    let parsed = parse(source);
    assert!(parsed.diagnostics().is_empty());
    let ops: Vec<Operator> = parsed
        .ast()
        .statements
        .iter()
        .map(|s| s.as_key_value().unwrap().op)
        .collect();
    assert_eq!(
        ops,
        vec![
            Operator::Assign,
            Operator::Equals,
            Operator::NotEquals,
            Operator::Greater,
            Operator::GreaterOrEqual,
            Operator::Less,
            Operator::LessOrEqual,
            Operator::ExistsAssign,
        ]
    );
}

#[test]
fn strict_mode_rejects_comparisons() {
    let parsed = parse_strict("a > 5");
    assert_eq!(parsed.diagnostics().len(), 1);
    assert_eq!(parsed.diagnostics()[0].code, codes::PARSER_UNEXPECTED_TOKEN);
    // The statement still parses as a key/value.
    assert!(parsed.ast().statements[0].as_key_value().is_some());
}

#[test]
fn strict_mode_comparison_gate() {
    let options = ParseOptions {
        mode: ParseMode::Strict,
        allow_comparison_operators: true,
        ..ParseOptions::default()
    };
    let parsed = ParsedSource::parse("a > 5", options);
    assert!(parsed.diagnostics().is_empty());
}

#[test]
fn strict_mode_allows_exists_assign() {
    let parsed = parse_strict("a ?= b");
    assert!(parsed.diagnostics().is_empty());
}

#[test]
fn permissive_extra_rbrace() {
    // Legacy save-game form: one closing brace too many.
    let parsed = parse("a = { 1 }\n}\nb = 2");

    let key_values: Vec<_> = parsed
        .ast()
        .statements
        .iter()
        .filter_map(Statement::as_key_value)
        .collect();
    assert_eq!(key_values.len(), 2);
    assert_eq!(key_values[1].key.text(), "b");

    let diags = parsed.diagnostics();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code, codes::PARSER_LEGACY_EXTRA_RBRACE);
    assert_eq!(diags[0].severity, Severity::Warning);
    assert_eq!(u32::from(diags[0].range.start()), 10);
}

#[test]
fn strict_extra_rbrace_is_error() {
    let parsed = ParsedSource::parse("a = { 1 }\n}\nb = 2", ParseOptions::strict());
    let diags = parsed.diagnostics();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code, codes::PARSER_LEGACY_EXTRA_RBRACE);
    assert_eq!(diags[0].severity, Severity::Error);

    // The stray brace is recorded in an error node; `b = 2` still parses.
    let error_nodes = parsed
        .syntax()
        .descendants()
        .filter(|n| n.kind() == SyntaxKind::Error)
        .count();
    assert_eq!(error_nodes, 1);
    let key_values: Vec<_> = parsed
        .ast()
        .statements
        .iter()
        .filter_map(Statement::as_key_value)
        .collect();
    assert_eq!(key_values.len(), 2);
}

#[test]
fn missing_rbrace_recovers() {
    let parsed = parse("a = { b = 1");
    let diags = parsed.diagnostics();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code, codes::PARSER_LEGACY_MISSING_RBRACE);
    assert_eq!(diags[0].severity, Severity::Warning);

    let kv = parsed.ast().statements[0].as_key_value().unwrap();
    let block = kv.value.as_block().unwrap();
    assert_eq!(block.statements.len(), 1);
}

#[test]
fn operator_cannot_start_statement() {
    // Also covers the `== "bar"` open question: `=` is never a key.
    let parsed = parse("== \"bar\"");
    assert!(!parsed.diagnostics().is_empty());
    let error_nodes = parsed
        .syntax()
        .descendants()
        .filter(|n| n.kind() == SyntaxKind::Error)
        .count();
    assert!(error_nodes >= 1);
}

#[test]
fn missing_value_recovers_on_next_line() {
    let parsed = parse("a =\nb = 2");
    assert_eq!(parsed.diagnostics().len(), 1);
    assert_eq!(parsed.diagnostics()[0].code, codes::PARSER_EXPECTED_TOKEN);

    let ast = parsed.ast();
    assert_eq!(ast.statements.len(), 2);
    let a = ast.statements[0].as_key_value().unwrap();
    assert!(matches!(a.value, Value::Error(_)));
    let b = ast.statements[1].as_key_value().unwrap();
    assert_eq!(b.key.text(), "b");
}

#[test]
fn bare_values_form_arrays() {
    let parsed = parse("list = { 1 2 3 }\n4 5");
    assert!(parsed.diagnostics().is_empty());
    let ast = parsed.ast();
    assert_eq!(ast.statements.len(), 3);
}

#[test]
fn quoted_key() {
    let parsed = parse("\"the key\" = 1");
    assert!(parsed.diagnostics().is_empty());
    let kv = parsed.ast().statements[0].as_key_value().unwrap();
    assert_eq!(kv.key.text(), "the key");
    assert!(kv.key.was_quoted());
}

#[test]
fn bom_is_stripped_and_recorded() {
    let parsed = parse("\u{feff}a = 1");
    assert!(parsed.had_bom());
    assert_eq!(parsed.source(), "a = 1");
    assert!(parsed.diagnostics().is_empty());
}

#[test]
fn nested_blocks() {
    let source = indoc! {"
        outer = {
            middle = {
                inner = yes
            }
        }
    "};
    let parsed = parse(source);
    assert!(parsed.diagnostics().is_empty());
    let outer = parsed.ast().statements[0].as_key_value().unwrap();
    let middle = outer.value.as_block().unwrap().statements[0]
        .as_key_value()
        .unwrap();
    let inner = middle.value.as_block().unwrap().statements[0]
        .as_key_value()
        .unwrap();
    assert_eq!(inner.key.text(), "inner");
}
