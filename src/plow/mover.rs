//! Moving an edge in the yank buffer.
//!
//! Nothing is repainted while the plow runs. An edge "moves" by raising
//! the trailing coordinate of the tiles on its right, splitting tiles at
//! the edge's ends so that only its own span changes. Tiles whose
//! geometry and trailing coordinates line up again afterwards are joined.

use crate::model::Point;
use crate::tiles::{Plane, TileId};
use crate::{Error, Result};

use super::edge::Edge;

fn stitch(t: Option<TileId>, which: &str, edge: &Edge) -> Result<TileId> {
    t.ok_or_else(|| Error::InvariantViolation(format!("missing {which} stitch moving {edge}")))
}

/// Two vertically adjacent tiles can be joined if they look the same
/// both before and after the plow.
fn mergeable(plane: &Plane, a: TileId, b: TileId) -> bool {
    let (ta, tb) = (&plane[a], &plane[b]);
    ta.ttype == tb.ttype
        && ta.left() == tb.left()
        && ta.right() == tb.right()
        && plane.trailing(a) == plane.trailing(b)
        && plane.leading(a) == plane.leading(b)
}

fn merge_top(plane: &mut Plane, tp: TileId) {
    if let Some(up) = plane.rt(tp) {
        if mergeable(plane, tp, up) {
            plane.join_y(tp, up);
        }
    }
}

fn merge_bottom(plane: &mut Plane, tp: TileId) {
    if let Some(down) = plane.lb(tp) {
        if mergeable(plane, tp, down) {
            plane.join_y(tp, down);
        }
    }
}

/// Set the trailing coordinate of every tile right of `edge` to at least
/// `edge.newx`.
pub(crate) fn move_edge(plane: &mut Plane, edge: &Edge) -> Result<()> {
    let (ybot, ytop, newx) = (edge.ybot, edge.ytop, edge.newx);

    let mut tp = plane.tile_at(Point::new(edge.x - 1, ytop - 1));
    if plane.leading(tp) < newx {
        if plane[tp].top() > ytop {
            plane.split_y(tp, ytop);
        }
        tp = stitch(plane.tr(tp), "tr", edge)?;
        if plane[tp].top() > ytop {
            plane.split_y(tp, ytop);
        }
    } else {
        tp = stitch(plane.tr(tp), "tr", edge)?;
        while plane[tp].bottom() >= ytop {
            tp = stitch(plane.lb(tp), "lb", edge)?;
        }
    }

    // Interior tiles along the right side
    while plane[tp].bottom() > ybot {
        if plane.trailing(tp) < newx {
            plane.set_trailing(tp, newx);
        }
        merge_top(plane, tp);
        tp = stitch(plane.lb(tp), "lb", edge)?;
    }

    // Bottom tile, and the left-hand tile beside it
    let mut tpl;
    if plane.trailing(tp) < newx {
        if plane[tp].bottom() < ybot {
            tp = plane.split_y(tp, ybot);
            plane.set_trailing(tp, newx);
            tpl = stitch(plane.bl(tp), "bl", edge)?;
        } else {
            tpl = stitch(plane.bl(tp), "bl", edge)?;
            plane.set_trailing(tp, newx);
            merge_bottom(plane, tp);
        }
        if plane[tpl].bottom() < ybot {
            tpl = plane.split_y(tpl, ybot);
        } else {
            merge_bottom(plane, tpl);
        }
    } else {
        tpl = stitch(plane.bl(tp), "bl", edge)?;
        while plane[tpl].top() <= ybot {
            tpl = stitch(plane.rt(tpl), "rt", edge)?;
        }
    }
    merge_top(plane, tp);

    // Left-hand tiles whose leading coordinate changed
    let mut t = plane.rt(tpl);
    while let Some(id) = t {
        let bottom = plane[id].bottom();
        if bottom > ytop {
            break;
        }
        merge_bottom(plane, id);
        if bottom == ytop {
            break;
        }
        t = plane.rt(id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Rect, TileType};
    use crate::tiles::Piece;
    use pretty_assertions::assert_eq;

    const M: TileType = TileType(1);

    fn bar() -> Plane {
        Plane::from_pieces(vec![Piece::new(Rect::new(0, 0, 4, 10), M)])
    }

    fn trailing_at(p: &Plane, x: i32, y: i32) -> i32 {
        p.trailing(p.tile_at(Point::new(x, y)))
    }

    #[test]
    fn test_full_height_edge_moves_one_tile() {
        let mut p = bar();
        move_edge(&mut p, &Edge::paint(0, 4, 7, 0, 10, M, TileType::SPACE)).unwrap();
        assert_eq!(trailing_at(&p, 5, 0), 7);
        assert_eq!(trailing_at(&p, 5, 9), 7);
        p.check_stitches().unwrap();
        p.check_merged().unwrap();
    }

    #[test]
    fn test_partial_edge_splits_at_its_ends() {
        let mut p = bar();
        move_edge(&mut p, &Edge::paint(0, 4, 7, 2, 6, M, TileType::SPACE)).unwrap();
        assert_eq!(trailing_at(&p, 5, 1), 4);
        assert_eq!(trailing_at(&p, 5, 3), 7);
        assert_eq!(trailing_at(&p, 5, 8), 4);
        p.check_stitches().unwrap();
        p.check_merged().unwrap();
    }

    #[test]
    fn test_tiles_rejoin_when_the_rest_catches_up() {
        let mut p = bar();
        move_edge(&mut p, &Edge::paint(0, 4, 7, 2, 6, M, TileType::SPACE)).unwrap();
        move_edge(&mut p, &Edge::paint(0, 4, 7, 6, 10, M, TileType::SPACE)).unwrap();
        move_edge(&mut p, &Edge::paint(0, 4, 7, 0, 2, M, TileType::SPACE)).unwrap();
        p.check_stitches().unwrap();
        p.check_merged().unwrap();
        let t = p.tile_at(Point::new(5, 5));
        assert_eq!(p[t].rect, Rect::new(4, 0, crate::model::INFINITY, 10));
        assert_eq!(p.trailing(t), 7);
    }
}
