//! Parser events.
//!
//! The grammar records what it saw; the tree sink replays the record into a
//! green tree. Keeping the two apart is what makes checkpoints, speculation
//! and forward-parenting cheap: they are all edits to a vector.

use rowan::TextRange;

use crate::kind::SyntaxKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    /// Opens a node. `forward_parent` is a forward distance to a later
    /// `Start` that must become this node's parent, letting the grammar
    /// re-parent an already finished node (`key = rgb { ... }`) without
    /// moving events.
    Start {
        kind: SyntaxKind,
        forward_parent: Option<u32>,
    },
    Token {
        kind: SyntaxKind,
        range: TextRange,
    },
    Finish,
    /// An abandoned marker. The sink skips it.
    Tombstone,
}
