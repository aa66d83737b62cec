//! Parsed plow commands.

use crate::model::Direction;
use crate::plow::JogHorizon;

/// One command line, after parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `plow <direction> [layers]`: plow the box in `dir`.
    Plow { dir: Direction, layers: Option<String> },
    /// `plow boundary`: the box becomes the legal plowing area.
    Boundary,
    /// `plow noboundary`
    NoBoundary,
    /// `plow horizon [n|infinity]`: set or report the jog horizon.
    Horizon(Option<JogHorizon>),
    /// `plow jogs`: jog insertion back on (horizon 0).
    Jogs,
    /// `plow nojogs`: infinite horizon, so no new jogs are introduced.
    NoJogs,
    /// `plow straighten` / `plow nostraighten`
    AutoStraighten(bool),
    /// `plow selection [direction [amount]]`
    Selection { dir: Option<Direction>, amount: Option<i32> },
    /// `plow help`
    Help,
    /// `straighten <direction>`: straighten jogs inside the box.
    Straighten { dir: Direction },
}

impl Command {
    /// True for commands that change layout rather than settings.
    pub fn edits_layout(&self) -> bool {
        matches!(self, Command::Plow { .. } | Command::Selection { .. } | Command::Straighten { .. })
    }
}
