//! CST → AST lowering.

use rowan::TextRange;

use super::{Block, KeyValue, Operator, Scalar, SourceFile, Statement, TaggedBlock, Value};
use crate::kind::SyntaxKind;
use crate::syntax::{SyntaxElement, SyntaxNode, trimmed_range};

/// Lowers a `Root` (or `SourceFile`) red node into the owned AST.
pub fn lower(root: &SyntaxNode) -> SourceFile {
    let source_file = match root.kind() {
        SyntaxKind::SourceFile => root.clone(),
        _ => root
            .children()
            .find(|n| n.kind() == SyntaxKind::SourceFile)
            .unwrap_or_else(|| root.clone()),
    };

    let statements = source_file
        .children()
        .find(|n| n.kind() == SyntaxKind::StatementList)
        .map(|list| lower_statement_list(&list))
        .unwrap_or_default();

    SourceFile {
        statements,
        range: trimmed_range(&source_file),
    }
}

fn lower_statement_list(list: &SyntaxNode) -> Vec<Statement> {
    list.children().filter_map(|n| lower_statement(&n)).collect()
}

fn lower_statement(node: &SyntaxNode) -> Option<Statement> {
    match node.kind() {
        SyntaxKind::KeyValue => Some(Statement::KeyValue(lower_key_value(node))),
        SyntaxKind::Scalar => Some(Statement::Value(Value::Scalar(lower_scalar(node)))),
        SyntaxKind::Block => Some(Statement::Value(Value::Block(lower_block(node)))),
        SyntaxKind::TaggedBlockValue => Some(Statement::Value(Value::Tagged(lower_tagged(node)))),
        SyntaxKind::Error => Some(Statement::Value(Value::Error(trimmed_range(node)))),
        _ => None,
    }
}

fn lower_key_value(node: &SyntaxNode) -> KeyValue {
    let mut key = None;
    let mut op = Operator::Assign;
    let mut op_range = None;
    let mut value = None;

    for child in node.children_with_tokens() {
        match child {
            SyntaxElement::Token(t) => {
                if let Some(parsed) = Operator::from_kind(t.kind()) {
                    op = parsed;
                    op_range = Some(t.text_range());
                }
            }
            SyntaxElement::Node(n) => match n.kind() {
                SyntaxKind::Scalar if key.is_none() => key = Some(lower_scalar(&n)),
                SyntaxKind::Scalar => value = Some(Value::Scalar(lower_scalar(&n))),
                SyntaxKind::Block => value = Some(Value::Block(lower_block(&n))),
                SyntaxKind::TaggedBlockValue => value = Some(Value::Tagged(lower_tagged(&n))),
                SyntaxKind::Error => value = Some(Value::Error(trimmed_range(&n))),
                _ => {}
            },
        }
    }

    let range = trimmed_range(node);
    let key = key.unwrap_or_else(|| Scalar::new(String::new(), false, TextRange::empty(range.start())));
    let value = value.unwrap_or(Value::Error(TextRange::empty(range.end())));

    KeyValue {
        key,
        op,
        op_range,
        value,
        range,
    }
}

fn lower_block(node: &SyntaxNode) -> Block {
    let statements = node
        .children()
        .find(|n| n.kind() == SyntaxKind::StatementList)
        .map(|list| lower_statement_list(&list))
        .unwrap_or_default();

    Block {
        statements,
        range: trimmed_range(node),
    }
}

fn lower_tagged(node: &SyntaxNode) -> TaggedBlock {
    let mut tag = None;
    let mut body = None;
    for child in node.children() {
        match child.kind() {
            SyntaxKind::Scalar => tag = Some(lower_scalar(&child)),
            SyntaxKind::Block => body = Some(lower_block(&child)),
            _ => {}
        }
    }

    let range = trimmed_range(node);
    TaggedBlock {
        tag: tag.unwrap_or_else(|| Scalar::new(String::new(), false, TextRange::empty(range.start()))),
        body: body.unwrap_or(Block {
            statements: Vec::new(),
            range: TextRange::empty(range.end()),
        }),
        range,
    }
}

fn lower_scalar(node: &SyntaxNode) -> Scalar {
    let token = node
        .children_with_tokens()
        .filter_map(SyntaxElement::into_token)
        .find(|t| t.kind().is_scalar_token());

    match token {
        Some(t) => {
            let quoted = t.kind() == SyntaxKind::ScalarQuoted;
            let text = if quoted {
                unquote(t.text())
            } else {
                t.text().to_string()
            };
            Scalar::new(text, quoted, t.text_range())
        }
        None => Scalar::new(String::new(), false, TextRange::empty(trimmed_range(node).start())),
    }
}

/// Strips the surrounding quotes and resolves `\\` and `\"`. Unrecognised
/// escapes stay verbatim; an unterminated string just lacks the closer.
fn unquote(raw: &str) -> String {
    let inner = raw.strip_prefix('"').unwrap_or(raw);
    let inner = if ends_with_unescaped_quote(inner) {
        &inner[..inner.len() - 1]
    } else {
        inner
    };

    if !inner.contains('\\') {
        return inner.to_string();
    }

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(next @ ('\\' | '"')) => out.push(next),
            Some(next) => {
                out.push('\\');
                out.push(next);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn ends_with_unescaped_quote(inner: &str) -> bool {
    if !inner.ends_with('"') {
        return false;
    }
    let before = &inner[..inner.len() - 1];
    let backslashes = before.chars().rev().take_while(|&c| c == '\\').count();
    backslashes % 2 == 0
}
