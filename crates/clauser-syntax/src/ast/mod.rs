//! Typed AST over the CST.
//!
//! Lowering walks the red tree once and produces an owned tree: statements
//! in source order, repeated keys preserved, scalars uninterpreted. Nothing
//! here mutates parser or CST state, and the result is `Send` so a carrier
//! can hand it across threads.

mod lower;
pub mod scalar;
mod views;

pub use lower::lower;
pub use views::BlockShape;

use rowan::TextRange;

use crate::kind::SyntaxKind;
use scalar::{ScalarValue, interpret_scalar};

#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub statements: Vec<Statement>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    KeyValue(KeyValue),
    Value(Value),
}

impl Statement {
    pub fn range(&self) -> TextRange {
        match self {
            Statement::KeyValue(kv) => kv.range,
            Statement::Value(v) => v.range(),
        }
    }

    pub fn as_key_value(&self) -> Option<&KeyValue> {
        match self {
            Statement::KeyValue(kv) => Some(kv),
            Statement::Value(_) => None,
        }
    }
}

/// The eight statement operators. Implicit assignments (`key{...}`) lower
/// to `Assign` with no operator range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=`
    Assign,
    /// `==`
    Equals,
    /// `!=`
    NotEquals,
    /// `>`
    Greater,
    /// `>=`
    GreaterOrEqual,
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
    /// `?=`
    ExistsAssign,
}

impl Operator {
    pub(crate) fn from_kind(kind: SyntaxKind) -> Option<Operator> {
        Some(match kind {
            SyntaxKind::Eq => Operator::Assign,
            SyntaxKind::EqEq => Operator::Equals,
            SyntaxKind::NotEq => Operator::NotEquals,
            SyntaxKind::Gt => Operator::Greater,
            SyntaxKind::GtEq => Operator::GreaterOrEqual,
            SyntaxKind::Lt => Operator::Less,
            SyntaxKind::LtEq => Operator::LessOrEqual,
            SyntaxKind::QuestionEq => Operator::ExistsAssign,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Assign => "=",
            Operator::Equals => "==",
            Operator::NotEquals => "!=",
            Operator::Greater => ">",
            Operator::GreaterOrEqual => ">=",
            Operator::Less => "<",
            Operator::LessOrEqual => "<=",
            Operator::ExistsAssign => "?=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyValue {
    pub key: Scalar,
    pub op: Operator,
    /// `None` for implicit assignments.
    pub op_range: Option<TextRange>,
    pub value: Value,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    Block(Block),
    Tagged(TaggedBlock),
    /// Placeholder for an `Error` CST node so downstream passes can proceed.
    Error(TextRange),
}

impl Value {
    pub fn range(&self) -> TextRange {
        match self {
            Value::Scalar(s) => s.range,
            Value::Block(b) => b.range,
            Value::Tagged(t) => t.range,
            Value::Error(r) => *r,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Value::Block(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_tagged(&self) -> Option<&TaggedBlock> {
        match self {
            Value::Tagged(t) => Some(t),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub range: TextRange,
}

/// `tag { ... }` on the right-hand side of an assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedBlock {
    pub tag: Scalar,
    pub body: Block,
    pub range: TextRange,
}

/// A scalar with delayed interpretation. `text` is the token payload:
/// quotes stripped and recognised escapes resolved for quoted scalars,
/// verbatim otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scalar {
    text: String,
    was_quoted: bool,
    pub range: TextRange,
}

impl Scalar {
    pub(crate) fn new(text: String, was_quoted: bool, range: TextRange) -> Self {
        Self {
            text,
            was_quoted,
            range,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn was_quoted(&self) -> bool {
        self.was_quoted
    }

    /// Interprets the scalar. Quoted scalars do not coerce: they come back
    /// [`ScalarValue::Unknown`] unless the caller opts in via
    /// [`Scalar::interpret_with_quoted`].
    pub fn interpret(&self) -> ScalarValue {
        if self.was_quoted {
            ScalarValue::Unknown
        } else {
            interpret_scalar(&self.text)
        }
    }

    pub fn interpret_with_quoted(&self) -> ScalarValue {
        interpret_scalar(&self.text)
    }
}
