//! # Plow Engine
//!
//! Design-rule-correct compaction. A plow is a rectangle swept in one of
//! the four cardinal directions; every edge of material it crosses moves
//! with it, and every edge *those* edges would otherwise bring too close
//! moves too, until the layout settles.
//!
//! ## Pipeline
//!
//! ```text
//! Transform ──► Yank ──► initial edges ──► EdgeQueue
//!                                            │ pop leftmost
//!                                            ▼
//!                      boundary check ─► process_edge ─► rule table
//!                                            │               │ propagate
//!                                            ▼               ▼
//!                                        move_edge       EdgeQueue
//!                                            │
//!                                            ▼
//!                                   commit (writeback) ─► straighten
//! ```
//!
//! Everything between the yank and the commit works in a canonical frame
//! where the plow always moves east (`+x`). See [`crate::model::Transform`].
//!
//! ## Limitations
//!
//! - **One boundary per session**: setting a new boundary replaces the old one.
//! - **Jog paint is yank-local**: a re-yank during straightening discards
//!   jogs already removed in the discarded part of the buffer; those areas
//!   are written back unchanged.

pub mod edge;
pub mod queue;
pub mod session;

pub(crate) mod boundary;
pub(crate) mod commit;
pub(crate) mod engine;
pub(crate) mod jogs;
pub(crate) mod mover;
pub(crate) mod rules;
pub(crate) mod search;
pub(crate) mod width;
pub(crate) mod yank;

#[cfg(test)]
pub(crate) mod testutil;

use serde::{Deserialize, Serialize};

use crate::model::Rect;
use crate::storage::DefId;

pub use edge::{Edge, E_INITIAL};
pub use queue::EdgeQueue;
pub use session::{PlowConfig, PlowOutcome, PlowSession};

// ============================================================================
// Boundary
// ============================================================================

/// A legal area for plowing. Nothing in `def` may be pushed outside `area`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boundary {
    pub def: DefId,
    /// Legal rectangle in `def` coordinates.
    pub area: Rect,
    /// Where the boundary is drawn for the user.
    pub display_def: DefId,
    pub display_area: Rect,
}

impl Boundary {
    pub fn new(def: DefId, area: Rect) -> Self {
        Self { def, area, display_def: def, display_area: area }
    }
}

// ============================================================================
// Jog horizon
// ============================================================================

/// How far above and below a moving edge to look for an existing jog to
/// line up with. `Units(0)` disables the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JogHorizon {
    Units(i32),
    Infinite,
}

impl JogHorizon {
    /// Horizon distance in layout units; zero when disabled.
    pub fn distance(&self) -> i32 {
        match self {
            JogHorizon::Units(n) => (*n).max(0),
            JogHorizon::Infinite => crate::model::INFINITY,
        }
    }
}

impl Default for JogHorizon {
    fn default() -> Self {
        JogHorizon::Units(5)
    }
}

impl std::fmt::Display for JogHorizon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JogHorizon::Units(0) => f.write_str("none"),
            JogHorizon::Units(n) => write!(f, "{n}"),
            JogHorizon::Infinite => f.write_str("infinity"),
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Edge counters for one propagation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlowStats {
    /// Calls to the queue's `add`.
    pub queued: usize,
    /// Edges taken off the queue and examined.
    pub processed: usize,
    /// Edges that actually had to move.
    pub moved: usize,
    /// Edges whose target was clamped to the plow distance.
    pub clamped: usize,
}
