//! # plow-rs: Design-Rule-Correct Layout Compaction
//!
//! The plow engine for a corner-stitched layout database. A plow is a
//! rectangle swept across a cell; every edge of material it crosses moves
//! with it, and every edge those edges would bring too close moves too,
//! until the layout is legal again.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `LayoutDb` is the contract between the plow and storage
//! 2. **Canonical frame**: the engine only ever plows east; other directions
//!    are rotations applied at yank time and undone at writeback
//! 3. **Commands own nothing**: text → [`command::Command`] is a pure function
//! 4. **Explicit session**: boundary, jog horizon and straightening live in a
//!    [`PlowSession`] built per call, never in globals
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use plow_rs::{Direction, Plower, Rect, Technology};
//!
//! # fn example(tech_json: &str) -> plow_rs::Result<()> {
//! let tech = Technology::from_json(tech_json)?;
//! let plower = Plower::open_memory(tech);
//! let def = plower.db().create_def("top")?;
//! let poly = plower.tech().type_named("poly")?;
//! plower.db().paint(def, plower.tech(), &Rect::new(0, 0, 10, 10), poly)?;
//!
//! // Sweep a plow 5 units east from the right side of the rectangle
//! let layers = plower.tech().all_types();
//! let outcome = plower.plow(def, Rect::new(5, 0, 10, 10), layers, Direction::East)?;
//! assert!(outcome.completed);
//! # Ok(())
//! # }
//! ```
//!
//! ## Layers
//!
//! | Module | Description |
//! |--------|-------------|
//! | `model` | Rectangles, directions, transforms, tile types, cell uses, labels |
//! | `tiles` | Corner-stitched planes with per-tile trailing coordinates |
//! | `tech` | Technology description and the compiled width/spacing rule tables |
//! | `storage` | `LayoutDb` trait and the in-memory `MemoryDb` |
//! | `plow` | Yank, edge queue, rule dispatch, mesh updates, writeback, jogs |
//! | `command` | `plow ...` / `straighten ...` command parsing |
//! | `undo` | Undo records for plow parameter changes |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod tiles;
pub mod tech;
pub mod storage;
pub mod undo;
pub mod plow;
pub mod command;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{
    Point, Rect, Direction, Transform,
    TileType, TypeMask, CellUse, UseId, Label, LabelId,
};

// ============================================================================
// Re-exports: Technology and storage
// ============================================================================

pub use tech::{Technology, TechSpec};
pub use storage::{DefId, LayoutDb, MemoryDb, Selection};

// ============================================================================
// Re-exports: Plow
// ============================================================================

pub use plow::{Boundary, JogHorizon, PlowConfig, PlowOutcome, PlowSession, PlowStats};
pub use command::{Command, EditContext};
pub use undo::{ParamChange, UndoId, UndoRecord};

// ============================================================================
// Top-level Plower handle
// ============================================================================

/// The primary entry point. A `Plower` wraps a layout database and a
/// technology, and carries the plow parameters between calls.
pub struct Plower<D: LayoutDb> {
    db: D,
    tech: Technology,
    config: PlowConfig,
    boundary: Option<Boundary>,
    next_undo: u64,
}

impl<D: LayoutDb> Plower<D> {
    pub fn new(db: D, tech: Technology) -> Self {
        Self::with_config(db, tech, PlowConfig::default())
    }

    pub fn with_config(db: D, tech: Technology, config: PlowConfig) -> Self {
        Self { db, tech, config, boundary: None, next_undo: 1 }
    }

    pub fn db(&self) -> &D {
        &self.db
    }

    pub fn tech(&self) -> &Technology {
        &self.tech
    }

    pub fn config(&self) -> &PlowConfig {
        &self.config
    }

    pub fn boundary(&self) -> Option<&Boundary> {
        self.boundary.as_ref()
    }

    fn session(&self) -> PlowSession<'_> {
        PlowSession::new(&self.tech, &self.db, &self.config, self.boundary.as_ref())
    }

    // ========================================================================
    // Plowing
    // ========================================================================

    /// Plow `rect` of `def` in `dir`. The plow's extent in `dir` is the
    /// distance; `layers` are the types the plow sees at first.
    pub fn plow(&self, def: DefId, rect: Rect, layers: TypeMask, dir: Direction) -> Result<PlowOutcome> {
        self.session().plow(def, rect, layers, dir)
    }

    /// Move the selection of `def` by `distance` in `dir`, pushing what is
    /// in the way.
    pub fn plow_selection(&self, def: DefId, distance: i32, dir: Direction) -> Result<PlowOutcome> {
        self.session().plow_selection(def, distance, dir)
    }

    /// Pull unneeded jogs inside `area` of `def` in `dir`.
    pub fn straighten(&self, def: DefId, area: Rect, dir: Direction) -> Result<Option<Rect>> {
        self.session().straighten(def, area, dir)
    }

    // ========================================================================
    // Parameters (undo-logged)
    // ========================================================================

    /// Restrict plowing in `def` to `area`. Replaces any earlier boundary.
    pub fn set_boundary(&mut self, def: DefId, area: Rect) -> Result<()> {
        self.set_boundary_with_display(def, area, def, area)
    }

    /// Like [`Plower::set_boundary`], with the outline drawn in a different
    /// def (usually the root of the window the box was in).
    pub fn set_boundary_with_display(
        &mut self,
        def: DefId,
        area: Rect,
        display_def: DefId,
        display_area: Rect,
    ) -> Result<()> {
        if area.is_null() {
            return Err(Error::InvalidArgument(format!("empty boundary {area}")));
        }
        let boundary = Boundary { def, area, display_def, display_area };
        self.change(ParamChange::Boundary { old: self.boundary.clone(), new: Some(boundary) });
        self.db.request_redisplay(display_def, &display_area);
        Ok(())
    }

    pub fn clear_boundary(&mut self) {
        if let Some(old) = self.boundary.clone() {
            self.db.request_redisplay(old.display_def, &old.display_area);
            self.change(ParamChange::Boundary { old: Some(old), new: None });
        }
    }

    pub fn set_jog_horizon(&mut self, horizon: JogHorizon) -> Result<()> {
        if let JogHorizon::Units(n) = horizon {
            if n < 0 {
                return Err(Error::InvalidArgument(format!("negative jog horizon {n}")));
            }
        }
        self.change(ParamChange::Horizon { old: self.config.jog_horizon, new: horizon });
        Ok(())
    }

    pub fn set_straighten(&mut self, on: bool) {
        self.change(ParamChange::Straighten { old: self.config.straighten, new: on });
    }

    /// Revert the most recent parameter change. Returns the record undone.
    pub fn undo_last(&mut self) -> Option<UndoRecord> {
        let record = self.db.pop_undo()?;
        self.apply(record.change.invert());
        tracing::debug!(id = record.id.0, "undid plow parameter change");
        Some(record)
    }

    fn change(&mut self, change: ParamChange) {
        let id = UndoId(self.next_undo);
        self.next_undo += 1;
        self.db.log_undo(UndoRecord::new(id, change.clone()));
        self.apply(change);
    }

    fn apply(&mut self, change: ParamChange) {
        match change {
            ParamChange::Boundary { new, .. } => {
                self.config.check_boundary = new.is_some();
                self.boundary = new;
            }
            ParamChange::Horizon { new, .. } => self.config.jog_horizon = new,
            ParamChange::Straighten { new, .. } => self.config.straighten = new,
        }
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Parse and run one command line against `ctx`, returning the text to
    /// show the user. Plows that the boundary cut short update the box.
    pub fn execute(&mut self, ctx: &mut EditContext, line: &str) -> Result<String> {
        let cmd = command::parse(line)?;
        tracing::debug!(?cmd, "plow command");

        match cmd {
            Command::Help => Ok(command::help_text()),

            Command::Plow { dir, layers } => {
                let edit_box = need_box(ctx)?;
                let mask = match layers {
                    Some(list) => self.tech.parse_layers(&list)?,
                    None => TypeMask::all_but_space().with(TileType::SPACE),
                };
                let outcome = self.plow(ctx.def, edit_box, mask, dir)?;
                if outcome.completed {
                    return Ok(String::new());
                }
                if let Some(achieved) = outcome.achieved {
                    ctx.edit_box = Some(achieved);
                }
                Ok("Reduced plow size to stay within the boundary.".into())
            }

            Command::Boundary => {
                let edit_box = need_box(ctx)?;
                self.set_boundary(ctx.def, edit_box)?;
                Ok(format!("Plowing restricted to {edit_box}."))
            }

            Command::NoBoundary => {
                self.clear_boundary();
                Ok("Plow boundary removed.".into())
            }

            Command::Horizon(h) => {
                if let Some(h) = h {
                    self.set_jog_horizon(h)?;
                }
                Ok(match self.config.jog_horizon {
                    JogHorizon::Infinite => "Jog horizon set to infinity.".into(),
                    JogHorizon::Units(n) => format!("Jog horizon set to {n} units."),
                })
            }

            Command::Jogs => {
                self.set_jog_horizon(JogHorizon::Units(0))?;
                Ok("Jog insertion re-enabled (horizon 0).".into())
            }

            Command::NoJogs => {
                self.set_jog_horizon(JogHorizon::Infinite)?;
                Ok("Jog insertion disabled.".into())
            }

            Command::AutoStraighten(on) => {
                self.set_straighten(on);
                Ok(if on {
                    "Jogs will be straightened after each plow.".into()
                } else {
                    "Jogs will not be straightened automatically.".into()
                })
            }

            Command::Selection { dir, amount } => {
                let edit_box = need_box(ctx)?;
                let (dir, distance) = match dir {
                    Some(d) => (d, amount.unwrap_or(1)),
                    None => {
                        let point = ctx.point.ok_or_else(|| {
                            Error::InvalidArgument("\"plow selection\" needs the point to give a distance".into())
                        })?;
                        dominant_displacement(point.x - edit_box.xbot, point.y - edit_box.ybot)
                    }
                };
                let outcome = self.plow_selection(ctx.def, distance, dir)?;
                let (dx, dy) = dir.offset(outcome.distance);
                ctx.edit_box = Some(edit_box.translate(dx, dy));
                Ok(if outcome.completed {
                    String::new()
                } else {
                    "Reduced distance to stay in the boundary.".into()
                })
            }

            Command::Straighten { dir } => {
                let edit_box = need_box(ctx)?;
                self.straighten(ctx.def, edit_box, dir)?;
                Ok(String::new())
            }
        }
    }
}

/// In-memory plower for testing and embedding.
impl Plower<MemoryDb> {
    pub fn open_memory(tech: Technology) -> Self {
        Self::new(MemoryDb::new(), tech)
    }
}

fn need_box(ctx: &EditContext) -> Result<Rect> {
    ctx.edit_box.ok_or_else(|| Error::InvalidArgument("no box".into()))
}

/// Direction and distance of the larger component of `(dx, dy)`; ties go
/// to the horizontal axis.
fn dominant_displacement(dx: i32, dy: i32) -> (Direction, i32) {
    if dy.abs() <= dx.abs() {
        (if dx > 0 { Direction::East } else { Direction::West }, dx.abs())
    } else {
        (if dy > 0 { Direction::North } else { Direction::South }, dy.abs())
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Plow command syntax error at position {position}: {message}")]
    SyntaxError { position: usize, message: String },

    #[error("Technology error: {0}")]
    TechError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dominant_displacement() {
        assert_eq!(dominant_displacement(5, 3), (Direction::East, 5));
        assert_eq!(dominant_displacement(-5, 3), (Direction::West, 5));
        assert_eq!(dominant_displacement(2, -7), (Direction::South, 7));
        assert_eq!(dominant_displacement(4, 4), (Direction::East, 4));
        assert_eq!(dominant_displacement(0, 0), (Direction::West, 0));
    }
}
