//! `.cwt` CST → rule IR lowering.
//!
//! Structure comes from the typed AST; metadata comes from the CST's
//! trivia. `##` option lines and `###` doc lines attach to the next
//! statement, which is exactly the leading-trivia run of that statement's
//! first token under the two-phase trivia model.

use std::collections::HashSet;

use clauser_syntax::ast::{KeyValue, Statement, Value};
use clauser_syntax::diagnostics::codes;
use clauser_syntax::syntax::SyntaxTokenExt;
use clauser_syntax::{
    Category, Diagnostic, ParsedSource, PathSeg, SyntaxKind, SyntaxNode,
};
use clauser_syntax::{TextRange, TextSize};

use crate::ir::{RuleOptions, RuleStatement, RuleValue};

#[derive(Debug)]
pub struct LoweredFile {
    pub statements: Vec<RuleStatement>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn lower_file(carrier: &ParsedSource) -> LoweredFile {
    let mut lowerer = Lowerer {
        diagnostics: Vec::new(),
        consumed: HashSet::new(),
        metadata: MetadataIndex::build(&carrier.syntax()),
    };

    let statements = lowerer.lower_statements(&carrier.ast().statements, &mut Vec::new());
    lowerer.report_dangling(&carrier.syntax());

    LoweredFile {
        statements,
        diagnostics: lowerer.diagnostics,
    }
}

struct Lowerer {
    diagnostics: Vec<Diagnostic>,
    consumed: HashSet<TextSize>,
    metadata: MetadataIndex,
}

/// Option/doc comment runs keyed by the source offset of the statement
/// they attach to.
struct MetadataIndex {
    entries: Vec<(TextSize, Vec<(TextSize, String)>)>,
}

impl MetadataIndex {
    fn build(root: &SyntaxNode) -> MetadataIndex {
        let mut entries = Vec::new();
        for node in root.descendants() {
            let is_statement = matches!(
                node.kind(),
                SyntaxKind::KeyValue
                    | SyntaxKind::Block
                    | SyntaxKind::Scalar
                    | SyntaxKind::TaggedBlockValue
            );
            if !is_statement || node.parent().is_none_or(|p| p.kind() != SyntaxKind::StatementList)
            {
                continue;
            }
            let Some(first) = clauser_syntax::syntax::first_meaningful_token(&node) else {
                continue;
            };
            let comments: Vec<(TextSize, String)> = first
                .leading_trivia()
                .iter()
                .filter(|t| t.kind() == SyntaxKind::Comment)
                .map(|t| (t.text_range().start(), t.text().to_string()))
                .collect();
            if !comments.is_empty() {
                entries.push((first.text_range().start(), comments));
            }
        }
        MetadataIndex { entries }
    }

    fn take(&self, at: TextSize) -> Option<&[(TextSize, String)]> {
        self.entries
            .iter()
            .find(|(offset, _)| *offset == at)
            .map(|(_, comments)| comments.as_slice())
    }
}

impl Lowerer {
    fn lower_statements(
        &mut self,
        statements: &[Statement],
        path: &mut Vec<PathSeg>,
    ) -> Vec<RuleStatement> {
        let mut out: Vec<RuleStatement> = Vec::new();
        for statement in statements {
            match statement {
                Statement::KeyValue(kv) => {
                    let occurrence = out
                        .iter()
                        .filter(|r| r.key.eq_ignore_ascii_case(kv.key.text()))
                        .count() as u32;
                    path.push(PathSeg {
                        key: kv.key.text().to_string(),
                        occurrence,
                    });
                    let rule = self.lower_key_value(kv, path);
                    path.pop();
                    out.push(rule);
                }
                // Bare scalars act as enum/value-set members; blocks and
                // errors carry no schema meaning of their own.
                Statement::Value(Value::Scalar(s)) => {
                    let (options, docs) = self.attach_metadata(s.range.start());
                    out.push(RuleStatement {
                        key: s.text().to_string(),
                        op: clauser_syntax::ast::Operator::Assign,
                        value: RuleValue::Scalar {
                            text: s.text().to_string(),
                            was_quoted: s.was_quoted(),
                            range: s.range,
                        },
                        options,
                        docs,
                        key_range: s.range,
                        range: s.range,
                        path: path.clone(),
                    });
                }
                Statement::Value(_) => {}
            }
        }
        out
    }

    fn lower_key_value(&mut self, kv: &KeyValue, path: &mut Vec<PathSeg>) -> RuleStatement {
        let (options, docs) = self.attach_metadata(kv.range.start());
        let value = match &kv.value {
            Value::Scalar(s) => RuleValue::Scalar {
                text: s.text().to_string(),
                was_quoted: s.was_quoted(),
                range: s.range,
            },
            Value::Block(block) => RuleValue::Block(self.lower_statements(&block.statements, path)),
            Value::Tagged(tagged) => {
                RuleValue::Block(self.lower_statements(&tagged.body.statements, path))
            }
            Value::Error(range) => RuleValue::Scalar {
                text: String::new(),
                was_quoted: false,
                range: *range,
            },
        };

        RuleStatement {
            key: kv.key.text().to_string(),
            op: kv.op,
            value,
            options,
            docs,
            key_range: kv.key.range,
            range: kv.range,
            path: path.clone(),
        }
    }

    fn attach_metadata(&mut self, at: TextSize) -> (RuleOptions, Vec<String>) {
        let mut options = RuleOptions::default();
        let mut docs = Vec::new();

        let Some(comments) = self.metadata.take(at) else {
            return (options, docs);
        };
        for (offset, text) in comments {
            if let Some(doc) = text.strip_prefix("###") {
                self.consumed.insert(*offset);
                docs.push(doc.trim().to_string());
            } else if let Some(option) = text.strip_prefix("##") {
                self.consumed.insert(*offset);
                if !options.apply(option) {
                    self.diagnostics.push(Diagnostic::warning(
                        codes::PARSER_INVALID_OPTION,
                        Category::Parser,
                        TextRange::at(*offset, TextSize::from(text.len() as u32)),
                        format!("could not understand option `{}`", option.trim()),
                    ));
                }
            }
        }
        (options, docs)
    }

    /// `##` lines that did not land in front of any statement.
    fn report_dangling(&mut self, root: &SyntaxNode) {
        for token in root
            .descendants_with_tokens()
            .filter_map(|e| e.into_token())
            .filter(|t| t.kind() == SyntaxKind::Comment)
        {
            let text = token.text();
            if text.starts_with("##")
                && !text.starts_with("###")
                && !self.consumed.contains(&token.text_range().start())
            {
                self.diagnostics.push(Diagnostic::warning(
                    codes::PARSER_DANGLING_OPTION,
                    Category::Parser,
                    token.text_range(),
                    "option comment is not followed by a statement",
                ));
            }
        }
    }
}
