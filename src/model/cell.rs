//! Subcell uses and labels.

use serde::{Deserialize, Serialize};

use super::{Rect, TileType};

/// Opaque cell-use identifier, unique within its parent def.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UseId(pub u64);

impl std::fmt::Display for UseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "u{}", self.0)
    }
}

/// A placed instance of another def. Only its bounding box matters to plowing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellUse {
    pub id: UseId,
    pub name: String,
    pub bbox: Rect,
}

impl CellUse {
    pub fn new(id: UseId, name: impl Into<String>, bbox: Rect) -> Self {
        Self { id, name: name.into(), bbox }
    }
}

/// Opaque label identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LabelId(pub u64);

/// A text label attached to material of `ttype` (space labels never move).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub text: String,
    pub rect: Rect,
    pub ttype: TileType,
}
