//! Plowing inside a legal area.
//!
//! The plow records how far past the boundary any edge wanted to go, so
//! the caller can shrink the plow by that much and try again. Only edges
//! already beyond the right side are dropped outright.

use super::edge::Edge;
use super::Boundary;
use crate::model::{Rect, Transform};
use crate::storage::DefId;

/// The boundary for `def` in canonical coordinates, if one applies.
pub(crate) fn canonical_area(boundary: Option<&Boundary>, def: DefId, trans: &Transform) -> Option<Rect> {
    boundary.filter(|b| b.def == def).map(|b| trans.apply_rect(&b.area))
}

/// Record in `too_far` how far `edge` would move outside `area`. Returns
/// true only when the edge already lies wholly past the right side, in
/// which case it is not moved at all.
pub(crate) fn past_boundary(area: &Rect, edge: &Edge, too_far: &mut i32) -> bool {
    let mut beyond = false;
    let delta = if edge.x < area.xbot {
        edge.newx.max(area.xbot) - edge.x
    } else if edge.newx > area.xtop {
        beyond = edge.x > area.xtop;
        edge.newx - edge.x.max(area.xtop)
    } else if edge.ytop > area.ytop || edge.ybot < area.ybot {
        edge.newx - edge.x
    } else {
        0
    };
    if delta > *too_far {
        *too_far = delta;
    }
    beyond
}
