//! Derived views over blocks.
//!
//! The canonical AST keeps repeated keys and source order; object, multimap
//! and array shapes are read-only projections computed on demand.

use indexmap::IndexMap;

use super::{Block, Statement, Value};

/// What a block's statements look like. Empty blocks are ambiguous: `{}`
/// could be either an empty object or an empty array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockShape {
    ObjectLike,
    ArrayLike,
    Mixed,
    EmptyAmbiguous,
}

impl Block {
    pub fn shape(&self) -> BlockShape {
        let mut key_values = false;
        let mut values = false;
        for statement in &self.statements {
            match statement {
                Statement::KeyValue(_) => key_values = true,
                Statement::Value(_) => values = true,
            }
        }
        match (key_values, values) {
            (true, true) => BlockShape::Mixed,
            (true, false) => BlockShape::ObjectLike,
            (false, true) => BlockShape::ArrayLike,
            (false, false) => BlockShape::EmptyAmbiguous,
        }
    }

    /// Last-write-wins object view. Distinct keys keep the source position
    /// of their first occurrence.
    pub fn as_object(&self) -> IndexMap<&str, &Value> {
        let mut map = IndexMap::new();
        for statement in &self.statements {
            if let Statement::KeyValue(kv) = statement {
                map.insert(kv.key.text(), &kv.value);
            }
        }
        map
    }

    /// Every value per key, in repetition order.
    pub fn as_multimap(&self) -> IndexMap<&str, Vec<&Value>> {
        let mut map: IndexMap<&str, Vec<&Value>> = IndexMap::new();
        for statement in &self.statements {
            if let Statement::KeyValue(kv) = statement {
                map.entry(kv.key.text()).or_default().push(&kv.value);
            }
        }
        map
    }

    /// The non-key-value statements, in order.
    pub fn as_array(&self) -> Vec<&Value> {
        self.statements
            .iter()
            .filter_map(|s| match s {
                Statement::Value(v) => Some(v),
                Statement::KeyValue(_) => None,
            })
            .collect()
    }
}
