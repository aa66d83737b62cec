//! Real width of material behind or ahead of an edge.
//!
//! The width of a region at an edge is the side of the largest square of
//! the region's material that touches the edge. It is found by starting
//! from a generous box and clipping it against foreign tiles until none
//! remain inside.

use super::edge::Edge;
use crate::model::{Rect, TypeMask};
use crate::tiles::Plane;

struct WidthClip {
    edge: Edge,
    area: Rect,
    /// Measuring leftward from the edge instead of rightward.
    back: bool,
}

impl WidthClip {
    /// The face of a foreign tile that points at the edge.
    fn near_face(&self, tile: &Rect) -> i32 {
        if self.back { tile.xtop } else { tile.xbot }
    }

    fn set_far(&mut self, x: i32) {
        if self.back {
            self.area.xbot = x;
        } else {
            self.area.xtop = x;
        }
    }

    fn first(&mut self, tile: &Rect) {
        let e = self.edge;
        let upper = if self.back { e.x - tile.xtop } else { tile.xbot - e.x };
        self.area.ytop = (e.ybot + upper).max(e.ytop);
        self.area.ybot = (e.ytop - upper).min(e.ybot);
        self.set_far(self.near_face(tile));
    }

    fn clip(&mut self, tile: &Rect) {
        let e = self.edge;
        let xw = if self.back { self.area.xtop - tile.xtop } else { tile.xbot - self.area.xbot };

        let vertical = if tile.ybot < e.ytop && tile.ytop > e.ybot {
            true
        } else if tile.ybot >= e.ytop {
            let yw = tile.ybot - self.area.ybot;
            if xw < yw {
                self.area.ytop = tile.ybot;
            }
            xw >= yw
        } else {
            let yw = self.area.ytop - tile.ytop;
            if xw < yw {
                self.area.ybot = tile.ytop;
            }
            xw >= yw
        };

        if vertical {
            self.set_far(self.near_face(tile));
            let yt = (e.ybot + xw).min(self.area.ytop);
            let yb = (e.ytop - xw).max(self.area.ybot);
            if yt > e.ytop {
                self.area.ytop = yt;
            }
            if yb < e.ybot {
                self.area.ybot = yb;
            }
        } else {
            let yw = self.area.height();
            if yw < self.area.width() {
                if self.back {
                    self.area.xbot = self.area.xtop - yw;
                } else {
                    self.area.xtop = self.area.xbot + yw;
                }
            }
        }
    }

    fn run(mut self, plane: &Plane, types: TypeMask) -> (i32, Rect) {
        let foreign = types.complement();
        if let Some(&t) = plane.tiles_in(&self.area, foreign).first() {
            self.first(&plane[t].rect);
        }
        while let Some(&t) = plane.tiles_in(&self.area, foreign).first() {
            self.clip(&plane[t].rect);
            if self.area.xbot == self.area.xtop {
                break;
            }
        }
        (self.area.width().min(self.area.height()), self.area)
    }
}

/// Width of the `types` material to the right of `edge`, never looking past
/// `bbox`. Also returns the box that was measured, so the caller can make
/// sure it was all yanked.
pub(crate) fn find_width(plane: &Plane, edge: &Edge, types: TypeMask, bbox: &Rect) -> (i32, Rect) {
    let area = Rect::new(edge.x, edge.ybot, bbox.xtop + 1, edge.ytop);
    WidthClip { edge: *edge, area, back: false }.run(plane, types)
}

/// Width of the `types` material to the left of `edge`.
pub(crate) fn find_width_back(plane: &Plane, edge: &Edge, types: TypeMask, bbox: &Rect) -> (i32, Rect) {
    let area = Rect::new(bbox.xbot - 1, edge.ybot, edge.x, edge.ytop);
    WidthClip { edge: *edge, area, back: true }.run(plane, types)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TileType;
    use crate::tiles::Piece;
    use pretty_assertions::assert_eq;

    const M: TileType = TileType(1);

    fn plane(r: Rect) -> Plane {
        Plane::from_pieces(vec![Piece::new(r, M)])
    }

    #[test]
    fn test_width_of_short_bar_is_its_height() {
        let bar = Rect::new(0, 0, 10, 4);
        let e = Edge::paint(0, 0, 0, 0, 4, TileType::SPACE, M);
        let (w, area) = find_width(&plane(bar), &e, TypeMask::only(M), &bar);
        assert_eq!(w, 4);
        assert_eq!(area, Rect::new(0, 0, 4, 4));
    }

    #[test]
    fn test_width_of_narrow_column_is_its_width() {
        let col = Rect::new(0, 0, 3, 20);
        let e = Edge::paint(0, 0, 0, 5, 8, TileType::SPACE, M);
        let (w, _) = find_width(&plane(col), &e, TypeMask::only(M), &col);
        assert_eq!(w, 3);
    }

    #[test]
    fn test_width_back_from_right_side() {
        let col = Rect::new(0, 0, 3, 20);
        let e = Edge::paint(0, 3, 3, 0, 20, M, TileType::SPACE);
        let (w, area) = find_width_back(&plane(col), &e, TypeMask::only(M), &col);
        assert_eq!(w, 3);
        assert_eq!(area, Rect::new(0, 0, 3, 20));
    }
}
