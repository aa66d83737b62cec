//! # Layout Model
//!
//! Plain data shared by every layer: coordinates, directions, tile types,
//! subcell uses and labels. No state, no I/O.

pub mod geometry;
pub mod transform;
pub mod types;
pub mod cell;

pub use geometry::{Point, Rect, INFINITY, MINFINITY, include};
pub use transform::{Direction, Transform};
pub use types::{TileType, TypeMask, MAX_TYPES};
pub use cell::{CellUse, UseId, Label, LabelId};
