//! Undo records for plow parameter changes.
//!
//! Geometry edits are the caller's business; only the settings that live in
//! the plow session (boundary, jog horizon, auto-straighten) are logged here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::plow::{Boundary, JogHorizon};

/// Opaque undo record identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UndoId(pub u64);

/// A single parameter change, with enough state to revert it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamChange {
    Boundary { old: Option<Boundary>, new: Option<Boundary> },
    Horizon { old: JogHorizon, new: JogHorizon },
    Straighten { old: bool, new: bool },
}

impl ParamChange {
    /// The change that undoes this one.
    pub fn invert(&self) -> ParamChange {
        match self {
            ParamChange::Boundary { old, new } => ParamChange::Boundary { old: new.clone(), new: old.clone() },
            ParamChange::Horizon { old, new } => ParamChange::Horizon { old: *new, new: *old },
            ParamChange::Straighten { old, new } => ParamChange::Straighten { old: *new, new: *old },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndoRecord {
    pub id: UndoId,
    pub at: DateTime<Utc>,
    pub change: ParamChange,
}

impl UndoRecord {
    pub fn new(id: UndoId, change: ParamChange) -> Self {
        Self { id, at: Utc::now(), change }
    }
}
