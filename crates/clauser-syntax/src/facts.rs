//! Analysis facts: a nested object/field index over the AST.
//!
//! One pass flattens every object-valued position (the file root, block
//! values, tagged-block bodies) into an arena of facts carrying a stable
//! declaration path, source ranges and a per-key field index. The rule
//! engines walk facts, not the AST, so repeated traversal stays cheap and
//! positions stay stable.

use indexmap::IndexMap;
use rowan::TextRange;

use crate::ast::{Operator, SourceFile, Statement, Value};

/// Index into the facts arena. `FactId(0)` is the file root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactId(pub u32);

impl FactId {
    pub const ROOT: FactId = FactId(0);
}

/// One segment of a declaration path: a key plus its occurrence index among
/// equal keys of the same parent (`modifier[0]`, `modifier[1]`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSeg {
    pub key: String,
    pub occurrence: u32,
}

impl std::fmt::Display for PathSeg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.key, self.occurrence)
    }
}

/// An object-valued position in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectFact {
    pub id: FactId,
    pub parent: Option<FactId>,
    /// Ordered keys with occurrence indices; empty for the file root.
    pub path: Vec<PathSeg>,
    /// Range of the key that introduced this object; `None` for the root
    /// and for objects in value (array-element) position.
    pub key_range: Option<TextRange>,
    pub range: TextRange,
    /// Field index: key text → occurrences in source order.
    pub fields: IndexMap<String, Vec<FieldFact>>,
    /// Non-key-value statements (array elements), in source order.
    pub items: Vec<ItemFact>,
}

impl ObjectFact {
    /// Key of the last path segment, if any.
    pub fn key(&self) -> Option<&str> {
        self.path.last().map(|seg| seg.key.as_str())
    }

    pub fn path_string(&self) -> String {
        self.path
            .iter()
            .map(PathSeg::to_string)
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldFact {
    pub key_range: TextRange,
    pub op: Operator,
    /// Occurrence index among equal keys of this object.
    pub occurrence: u32,
    pub value: ValueFact,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemFact {
    pub value: ValueFact,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueFact {
    Scalar {
        text: String,
        was_quoted: bool,
        range: TextRange,
    },
    Object(FactId),
    Tagged {
        tag: String,
        body: FactId,
    },
    Error(TextRange),
}

impl ValueFact {
    pub fn range_in(&self, facts: &Facts) -> TextRange {
        match self {
            ValueFact::Scalar { range, .. } | ValueFact::Error(range) => *range,
            ValueFact::Object(id) => facts.get(*id).range,
            ValueFact::Tagged { body, .. } => facts.get(*body).range,
        }
    }

    pub fn as_scalar_text(&self) -> Option<&str> {
        match self {
            ValueFact::Scalar { text, .. } => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Facts {
    objects: Vec<ObjectFact>,
}

impl Facts {
    pub fn build(file: &SourceFile) -> Facts {
        let mut facts = Facts {
            objects: Vec::new(),
        };
        let root = facts.push(None, Vec::new(), None, file.range);
        facts.fill(root, &file.statements);
        facts
    }

    pub fn root(&self) -> &ObjectFact {
        &self.objects[0]
    }

    pub fn get(&self, id: FactId) -> &ObjectFact {
        &self.objects[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectFact> {
        self.objects.iter()
    }

    fn push(
        &mut self,
        parent: Option<FactId>,
        path: Vec<PathSeg>,
        key_range: Option<TextRange>,
        range: TextRange,
    ) -> FactId {
        let id = FactId(self.objects.len() as u32);
        self.objects.push(ObjectFact {
            id,
            parent,
            path,
            key_range,
            range,
            fields: IndexMap::new(),
            items: Vec::new(),
        });
        id
    }

    fn fill(&mut self, id: FactId, statements: &[Statement]) {
        for statement in statements {
            match statement {
                Statement::KeyValue(kv) => {
                    let occurrence = self
                        .get(id)
                        .fields
                        .get(kv.key.text())
                        .map_or(0, |v| v.len() as u32);
                    let value = self.lower_value(
                        id,
                        Some((kv.key.text(), occurrence, kv.key.range)),
                        &kv.value,
                    );
                    let field = FieldFact {
                        key_range: kv.key.range,
                        op: kv.op,
                        occurrence,
                        value,
                    };
                    self.objects[id.0 as usize]
                        .fields
                        .entry(kv.key.text().to_string())
                        .or_default()
                        .push(field);
                }
                Statement::Value(v) => {
                    let value = self.lower_value(id, None, v);
                    self.objects[id.0 as usize].items.push(ItemFact { value });
                }
            }
        }
    }

    fn lower_value(
        &mut self,
        parent: FactId,
        key: Option<(&str, u32, TextRange)>,
        value: &Value,
    ) -> ValueFact {
        match value {
            Value::Scalar(s) => ValueFact::Scalar {
                text: s.text().to_string(),
                was_quoted: s.was_quoted(),
                range: s.range,
            },
            Value::Block(block) => {
                let id = self.child(parent, key, block.range);
                self.fill(id, &block.statements);
                ValueFact::Object(id)
            }
            Value::Tagged(tagged) => {
                let id = self.child(parent, key, tagged.body.range);
                self.fill(id, &tagged.body.statements);
                ValueFact::Tagged {
                    tag: tagged.tag.text().to_string(),
                    body: id,
                }
            }
            Value::Error(range) => ValueFact::Error(*range),
        }
    }

    fn child(
        &mut self,
        parent: FactId,
        key: Option<(&str, u32, TextRange)>,
        range: TextRange,
    ) -> FactId {
        let mut path = self.get(parent).path.clone();
        let key_range = match key {
            Some((text, occurrence, key_range)) => {
                path.push(PathSeg {
                    key: text.to_string(),
                    occurrence,
                });
                Some(key_range)
            }
            None => None,
        };
        self.push(Some(parent), path, key_range, range)
    }
}
