//! # Layout Database Trait
//!
//! The contract between the plow engine and whatever holds the real cell
//! definitions. The engine reads paint and subcells out of a def, works on a
//! private copy, and writes the result back through this trait.
//!
//! ## Implementations
//!
//! | Backend | Module | Description |
//! |---------|--------|-------------|
//! | `MemoryDb` | `memory` | In-memory defs for testing/embedding |
//!
//! Plowing is single-threaded and run-to-completion, so the trait is
//! synchronous. Callers serialize plow calls against other edits of the
//! same def.

pub mod memory;

use serde::{Deserialize, Serialize};

use crate::model::*;
use crate::undo::UndoRecord;
use crate::Result;

pub use memory::MemoryDb;

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque cell definition identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DefId(pub u64);

impl std::fmt::Display for DefId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "d{}", self.0)
    }
}

// ============================================================================
// Selection
// ============================================================================

/// The editor's current selection inside one def.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub paint: Vec<(Rect, TileType)>,
    pub cells: Vec<UseId>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.paint.is_empty() && self.cells.is_empty()
    }
}

// ============================================================================
// LayoutDb Trait
// ============================================================================

pub trait LayoutDb: Send + Sync {
    // ========================================================================
    // Defs
    // ========================================================================

    fn def_by_name(&self, name: &str) -> Result<DefId>;

    /// Bounding box of everything in the def, `None` when it is empty.
    fn bbox(&self, def: DefId) -> Result<Option<Rect>>;

    // ========================================================================
    // Reads
    // ========================================================================

    /// Non-space paint on `plane`, clipped to `area`.
    fn paint_in(&self, def: DefId, plane: usize, area: &Rect) -> Result<Vec<(Rect, TileType)>>;

    /// Subcell uses whose bounding box overlaps `area`.
    fn cells_in(&self, def: DefId, area: &Rect) -> Result<Vec<CellUse>>;

    fn labels(&self, def: DefId) -> Result<Vec<Label>>;

    fn selection(&self, def: DefId) -> Result<Selection>;

    // ========================================================================
    // Edits
    // ========================================================================

    fn paint_plane(&self, def: DefId, plane: usize, area: &Rect, ttype: TileType) -> Result<()>;

    fn erase_plane(&self, def: DefId, plane: usize, area: &Rect) -> Result<()>;

    /// Move a subcell use so that its bounding box becomes `bbox`.
    fn move_use(&self, def: DefId, id: UseId, bbox: Rect) -> Result<()>;

    fn move_label(&self, def: DefId, id: LabelId, rect: Rect) -> Result<()>;

    fn recompute_bbox(&self, def: DefId) -> Result<Option<Rect>>;

    // ========================================================================
    // Collaborators
    // ========================================================================

    fn request_redisplay(&self, def: DefId, area: &Rect);

    /// Queue an incremental design-rule check over `area`.
    fn request_drc(&self, def: DefId, area: &Rect);

    /// Cooperative interrupt, polled once per processed edge.
    fn interrupted(&self) -> bool;

    fn log_undo(&self, record: UndoRecord);

    /// Remove and return the most recent undo record.
    fn pop_undo(&self) -> Option<UndoRecord>;
}
