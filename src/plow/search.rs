//! # Plane Searches
//!
//! How the plow looks at the yank buffer:
//!
//! | Search | Finds |
//! |--------|-------|
//! | [`shadow`] | first edges visible looking right from the left side of an area |
//! | [`shadow_back`] | first edges visible looking left from the right side |
//! | [`atomize`] | every distinct (ltype, rtype) piece along one vertical line |
//! | [`OutlineWalker`] | the boundary of a region, one straight segment at a time |
//!
//! Searches return edges by value. A caller that wants to stop early just
//! stops iterating; nothing here holds a borrow of the plane across calls
//! except the outline walker, which keeps only tile handles.

use smallvec::SmallVec;

use super::edge::Edge;
use crate::model::{Direction, Point, Rect, TypeMask};
use crate::tiles::{Plane, TileId};

// ============================================================================
// Shadow searches
// ============================================================================

struct Shadow<'p> {
    plane: &'p Plane,
    pnum: usize,
    area: Rect,
    ok: TypeMask,
    /// Forward searches: top of the next edge. Backward: its bottom.
    edge_y: i32,
    found: Vec<Edge>,
}

impl<'p> Shadow<'p> {
    fn new(plane: &'p Plane, pnum: usize, area: &Rect, ok: TypeMask, edge_y: i32) -> Self {
        Self { plane, pnum, area: *area, ok, edge_y, found: Vec::new() }
    }

    fn right_side(&mut self, tp: TileId, bottom_left: i32, initial: bool) {
        let plane = self.plane;
        let Some(mut tpr) = plane.tr(tp) else { return };
        let left = plane[tpr].left();
        loop {
            let bottom = bottom_left.max(plane[tpr].bottom());
            if bottom < self.edge_y {
                let (lt, rt) = (plane[tp].ttype, plane[tpr].ttype);
                let visible = if initial {
                    lt != rt && (!self.ok.has(rt) || !self.ok.has(lt))
                } else {
                    !self.ok.has(rt)
                };
                if visible {
                    self.found.push(Edge::paint(
                        self.pnum,
                        left,
                        plane.trailing(tpr),
                        bottom,
                        self.edge_y,
                        lt,
                        rt,
                    ));
                    self.edge_y = bottom;
                } else if plane[tpr].right() >= self.area.xtop {
                    self.edge_y = bottom;
                } else {
                    self.right_side(tpr, bottom, false);
                }
            }
            match plane.lb(tpr) {
                Some(next) if plane[next].top() > bottom_left => tpr = next,
                _ => break,
            }
        }
    }

    fn left_side(&mut self, tp: TileId, top_right: i32) {
        let plane = self.plane;
        let Some(mut tpl) = plane.bl(tp) else { return };
        let right = plane[tpl].right();
        loop {
            let top = top_right.min(plane[tpl].top());
            if top > self.edge_y {
                if !self.ok.has(plane[tpl].ttype) {
                    self.found.push(Edge::paint(
                        self.pnum,
                        right,
                        plane.trailing(tp),
                        self.edge_y,
                        top,
                        plane[tpl].ttype,
                        plane[tp].ttype,
                    ));
                    self.edge_y = top;
                } else if plane[tpl].left() <= self.area.xbot {
                    self.edge_y = top;
                } else {
                    self.left_side(tpl, top);
                }
            }
            match plane.rt(tpl) {
                Some(next) if plane[next].bottom() < top_right => tpl = next,
                _ => break,
            }
        }
    }

    fn forward(mut self, initial: bool) -> Vec<Edge> {
        let area = self.area;
        let mut y = area.ytop - 1;
        while y >= area.ybot {
            let tp = self.plane.tile_at(Point::new(area.xbot, y));
            let t = &self.plane[tp];
            y = t.bottom() - 1;
            let bottom = t.bottom().max(area.ybot);
            if t.right() >= area.xtop {
                self.edge_y = bottom;
            } else {
                self.right_side(tp, bottom, initial);
            }
        }
        self.found
    }
}

/// Edges whose right-hand material is not in `ok`, found by sweeping right
/// from the left side of `area` until such an edge blocks the view. Edges
/// on the left side itself are found; edges on the right side are not.
/// Returned top to bottom.
pub(crate) fn shadow(plane: &Plane, pnum: usize, area: &Rect, ok: TypeMask) -> Vec<Edge> {
    Shadow::new(plane, pnum, area, ok, area.ytop).forward(false)
}

/// Like [`shadow`], but the first layer of edges reports any change of type
/// where either side is outside `ok`. Used to find the edges a plow hits.
pub(crate) fn shadow_initial(plane: &Plane, pnum: usize, area: &Rect, ok: TypeMask) -> Vec<Edge> {
    Shadow::new(plane, pnum, area, ok, area.ytop).forward(true)
}

/// Edges whose left-hand material is not in `ok`, found by sweeping left
/// from the right side of `area`. Returned bottom to top.
pub(crate) fn shadow_back(plane: &Plane, pnum: usize, area: &Rect, ok: TypeMask) -> Vec<Edge> {
    let mut s = Shadow::new(plane, pnum, area, ok, area.ybot);
    let mut y = area.ybot;
    while y < area.ytop {
        let tp = plane.tile_at(Point::new(area.xtop - 1, y));
        let t = &plane[tp];
        y = t.top();
        let top = t.top().min(area.ytop);
        if t.left() <= area.xbot {
            s.edge_y = top;
        } else {
            s.left_side(tp, top);
        }
    }
    s.found
}

/// Split the vertical line `x = rect.xbot` over `[rect.ybot, rect.ytop)`
/// into edges of uniform left and right type, skipping any whose right
/// side already trails at or past `rect.xtop`. Each edge gets
/// `newx = rect.xtop`. Right-hand tiles are visited top down; the pieces
/// beside each one come out bottom up.
pub(crate) fn atomize(plane: &Plane, pnum: usize, rect: &Rect) -> Vec<Edge> {
    let mut found = Vec::new();
    let mut ytop = rect.ytop;
    let mut tpr = plane.tile_at(Point::new(rect.xbot, rect.ytop - 1));
    while plane[tpr].top() > rect.ybot {
        if plane.trailing(tpr) < rect.xtop {
            let mut ybot = plane[tpr].bottom().max(rect.ybot);
            let mut tpl = plane.bl(tpr);
            while let Some(l) = tpl {
                if plane[l].bottom() >= ytop {
                    break;
                }
                if plane[l].top() > ybot {
                    let top = ytop.min(plane[l].top());
                    found.push(Edge::paint(
                        pnum,
                        rect.xbot,
                        rect.xtop,
                        ybot,
                        top,
                        plane[l].ttype,
                        plane[tpr].ttype,
                    ));
                    ybot = top;
                }
                tpl = plane.rt(l);
            }
        }
        ytop = plane[tpr].bottom();
        match plane.lb(tpr) {
            Some(next) => tpr = next,
            None => break,
        }
    }
    found
}

// ============================================================================
// Outline tracing
// ============================================================================

/// Give up on an outline after this many segments.
const MAX_OUTLINE_STEPS: usize = 100_000;

/// One straight piece of a region's boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Outline {
    /// Degenerate rectangle covering the segment.
    pub rect: Rect,
    pub inside: TileId,
    pub outside: TileId,
    pub prev: Direction,
    pub dir: Direction,
    pub next: Direction,
    /// Tiles of the segment that follows.
    pub next_in: TileId,
    pub next_out: TileId,
}

/// Follows the boundary of the region made of `inside` types, keeping the
/// region on the left when heading north from the start point.
pub(crate) struct OutlineWalker {
    inside: TypeMask,
    current: Direction,
    next_dir: Direction,
    next_in: TileId,
    next_out: TileId,
    next_rect: Rect,
    stack: SmallVec<[TileId; 16]>,
    steps: usize,
}

impl OutlineWalker {
    /// Start at `start` going `dir`, which must be north or south. Returns
    /// `None` if the start is at the edge of the world.
    pub fn new(plane: &Plane, start: Point, inside: TypeMask, dir: Direction) -> Option<Self> {
        let out = plane.tile_at(match dir {
            Direction::North => start,
            Direction::South => Point::new(start.x - 1, start.y - 1),
            _ => {
                tracing::warn!(%dir, "outline must start north or south");
                return None;
            }
        });
        let inn = plane.tile_at(match dir {
            Direction::North => Point::new(start.x - 1, start.y),
            _ => Point::new(start.x, start.y - 1),
        });

        let mut w = Self {
            inside,
            current: dir,
            next_dir: dir,
            next_in: inn,
            next_out: out,
            next_rect: Rect::new(start.x, start.y, start.x, start.y),
            stack: SmallVec::new(),
            steps: 0,
        };

        if !w.is_inside(plane, inn) {
            w.next_dir = if dir == Direction::North { Direction::West } else { Direction::East };
            w.next_out = inn;
        } else if w.is_inside(plane, out) {
            let mut o;
            if dir == Direction::North {
                w.next_dir = Direction::East;
                o = plane.lb(out)?;
                while plane[o].right() <= start.x {
                    o = plane.tr(o)?;
                }
            } else {
                w.next_dir = Direction::West;
                o = plane.rt(out)?;
                while plane[o].left() >= start.x {
                    o = plane.bl(o)?;
                }
            }
            w.next_out = o;
        }

        w.stack_outline(plane)?;
        w.extend(plane);
        Some(w)
    }

    fn is_inside(&self, plane: &Plane, t: TileId) -> bool {
        self.inside.has(plane[t].ttype)
    }

    /// The next segment, or `None` if the walk ran off the world or
    /// exceeded its step limit.
    pub fn next(&mut self, plane: &Plane) -> Option<Outline> {
        self.steps += 1;
        if self.steps > MAX_OUTLINE_STEPS {
            tracing::warn!(steps = self.steps, "outline walk did not terminate");
            return None;
        }
        let prev = self.current;
        self.current = self.next_dir;
        let (inside, outside, rect) = (self.next_in, self.next_out, self.next_rect);
        self.advance(plane, &rect)?;
        self.extend(plane);
        Some(Outline {
            rect,
            inside,
            outside,
            prev,
            dir: self.current,
            next: self.next_dir,
            next_in: self.next_in,
            next_out: self.next_out,
        })
    }

    /// Push the tiles along the side of the next segment that is cut into
    /// pieces, so they can be visited one at a time.
    fn stack_outline(&mut self, plane: &Plane) -> Option<()> {
        self.stack.clear();
        let r = self.next_rect;
        match self.next_dir {
            Direction::North => {
                let mut tp = plane.tr(self.next_in)?;
                while plane[tp].bottom() > r.ybot {
                    self.stack.push(tp);
                    tp = plane.lb(tp)?;
                }
                self.next_out = tp;
            }
            Direction::South => {
                let mut tp = plane.bl(self.next_in)?;
                while plane[tp].top() < r.ytop {
                    self.stack.push(tp);
                    tp = plane.rt(tp)?;
                }
                self.next_out = tp;
            }
            Direction::East => {
                let mut tp = plane.rt(self.next_out)?;
                while plane[tp].left() > r.xbot {
                    self.stack.push(tp);
                    tp = plane.bl(tp)?;
                }
                self.next_in = tp;
            }
            Direction::West => {
                let mut tp = plane.lb(self.next_out)?;
                while plane[tp].right() < r.xtop {
                    self.stack.push(tp);
                    tp = plane.tr(tp)?;
                }
                self.next_in = tp;
            }
        }
        Some(())
    }

    /// Stretch the next segment as far as both of its tiles go.
    fn extend(&mut self, plane: &Plane) {
        let (i, o) = (&plane[self.next_in], &plane[self.next_out]);
        let r = &mut self.next_rect;
        match self.next_dir {
            Direction::North => r.ytop = o.top().min(i.top()),
            Direction::South => r.ybot = o.bottom().max(i.bottom()),
            Direction::East => r.xtop = i.right().min(o.right()),
            Direction::West => r.xbot = i.left().max(o.left()),
        }
    }

    fn advance(&mut self, plane: &Plane, rect: &Rect) -> Option<()> {
        self.next_dir = self.current;
        let corner = match self.current {
            Direction::North | Direction::East => rect.ur(),
            Direction::South | Direction::West => rect.ll(),
        };
        self.next_rect = Rect::new(corner.x, corner.y, corner.x, corner.y);
        let nr = self.next_rect;

        if let Some(tp) = self.stack.pop() {
            match self.current {
                Direction::North => {
                    self.next_out = tp;
                    if self.is_inside(plane, tp) {
                        self.next_out = plane.lb(tp)?;
                        self.next_dir = Direction::East;
                    }
                }
                Direction::South => {
                    self.next_out = tp;
                    if self.is_inside(plane, tp) {
                        self.next_out = plane.rt(tp)?;
                        self.next_dir = Direction::West;
                    }
                }
                Direction::East => {
                    self.next_in = tp;
                    if !self.is_inside(plane, tp) {
                        self.next_in = plane.bl(tp)?;
                        self.next_dir = Direction::North;
                    }
                }
                Direction::West => {
                    self.next_in = tp;
                    if !self.is_inside(plane, tp) {
                        self.next_in = plane.tr(tp)?;
                        self.next_dir = Direction::South;
                    }
                }
            }
            if self.next_dir != self.current {
                self.stack_outline(plane)?;
            }
            return Some(());
        }

        match self.current {
            Direction::North => {
                let tpl = plane.rt(self.next_in)?;
                if !self.is_inside(plane, tpl) {
                    self.next_out = tpl;
                    self.next_dir = Direction::West;
                } else {
                    let tpr = if plane[tpl].right() > nr.xbot {
                        tpl
                    } else {
                        let mut t = plane.tr(tpl)?;
                        while plane[t].bottom() > nr.ybot {
                            t = plane.lb(t)?;
                        }
                        t
                    };
                    if self.is_inside(plane, tpr) {
                        self.next_out = plane.tr(self.next_in)?;
                        self.next_dir = Direction::East;
                    } else {
                        self.next_in = tpl;
                    }
                }
            }
            Direction::South => {
                let tpr = plane.lb(self.next_in)?;
                if !self.is_inside(plane, tpr) {
                    self.next_out = tpr;
                    self.next_dir = Direction::East;
                } else {
                    let tpl = if plane[tpr].left() < nr.xbot {
                        tpr
                    } else {
                        let mut t = plane.bl(tpr)?;
                        while plane[t].top() < nr.ytop {
                            t = plane.rt(t)?;
                        }
                        t
                    };
                    if self.is_inside(plane, tpl) {
                        self.next_out = plane.bl(self.next_in)?;
                        self.next_dir = Direction::West;
                    } else {
                        self.next_in = tpr;
                    }
                }
            }
            Direction::East => {
                let tpr = plane.tr(self.next_out)?;
                let tpl = if plane[tpr].top() > nr.ybot {
                    tpr
                } else {
                    let mut t = plane.rt(tpr)?;
                    while plane[t].left() > nr.xbot {
                        t = plane.bl(t)?;
                    }
                    t
                };
                if !self.is_inside(plane, tpl) {
                    self.next_in = plane.rt(self.next_out)?;
                    self.next_dir = Direction::North;
                } else if self.is_inside(plane, tpr) {
                    self.next_in = tpr;
                    self.next_dir = Direction::South;
                } else {
                    self.next_out = tpr;
                }
            }
            Direction::West => {
                let tpl = plane.bl(self.next_out)?;
                let tpr = if plane[tpl].bottom() < nr.ybot {
                    tpl
                } else {
                    let mut t = plane.lb(tpl)?;
                    while plane[t].right() < nr.xbot {
                        t = plane.tr(t)?;
                    }
                    t
                };
                if !self.is_inside(plane, tpr) {
                    self.next_in = plane.lb(self.next_out)?;
                    self.next_dir = Direction::South;
                } else if self.is_inside(plane, tpl) {
                    self.next_in = tpl;
                    self.next_dir = Direction::North;
                } else {
                    self.next_out = tpl;
                }
            }
        }
        self.stack_outline(plane)
    }
}

/// Walk the outline from `start`, handing `visit` every segment whose
/// direction is in `dirs`, until `visit` returns true or the walk ends.
pub(crate) fn trace_outline<F>(
    plane: &Plane,
    start: Point,
    inside: TypeMask,
    dir: Direction,
    dirs: &[Direction],
    mut visit: F,
) where
    F: FnMut(&Outline) -> bool,
{
    let Some(mut walker) = OutlineWalker::new(plane, start, inside, dir) else { return };
    while let Some(o) = walker.next(plane) {
        if dirs.contains(&o.dir) && visit(&o) {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TileType;
    use crate::tiles::Piece;
    use pretty_assertions::assert_eq;

    const M: TileType = TileType(1);
    const P: TileType = TileType(2);

    fn plane(rects: &[(Rect, TileType)]) -> Plane {
        Plane::from_pieces(rects.iter().map(|(r, t)| Piece::new(*r, *t)).collect())
    }

    fn spans(edges: &[Edge]) -> Vec<(i32, i32, i32, TileType, TileType)> {
        edges.iter().map(|e| (e.x, e.ybot, e.ytop, e.ltype, e.rtype)).collect()
    }

    #[test]
    fn test_shadow_stops_at_first_blocking_edge() {
        let p = plane(&[
            (Rect::new(15, 0, 20, 10), P),
            (Rect::new(25, 0, 30, 10), M),
        ]);
        let found = shadow(&p, 0, &Rect::new(10, 0, 40, 10), TypeMask::space());
        assert_eq!(spans(&found), vec![(15, 0, 10, TileType::SPACE, P)]);
        assert_eq!(found[0].newx, 15);
    }

    #[test]
    fn test_shadow_sees_around_partial_blockers() {
        let p = plane(&[
            (Rect::new(15, 5, 20, 10), P),
            (Rect::new(25, 0, 30, 10), M),
        ]);
        let found = shadow(&p, 0, &Rect::new(10, 0, 40, 10), TypeMask::space());
        assert_eq!(
            spans(&found),
            vec![(15, 5, 10, TileType::SPACE, P), (25, 0, 5, TileType::SPACE, M)]
        );
    }

    #[test]
    fn test_shadow_ignores_edge_on_right_side() {
        let p = plane(&[(Rect::new(20, 0, 30, 10), M)]);
        let found = shadow(&p, 0, &Rect::new(10, 0, 20, 10), TypeMask::space());
        assert!(found.is_empty());
    }

    #[test]
    fn test_shadow_initial_reports_type_changes() {
        let p = plane(&[(Rect::new(0, 0, 10, 10), M), (Rect::new(10, 0, 20, 10), P)]);
        // a plow of P only: the M|P edge counts because P is not ok
        let ok = TypeMask::only(P).complement();
        let found = shadow_initial(&p, 0, &Rect::new(5, 0, 25, 10), ok);
        assert_eq!(spans(&found), vec![(10, 0, 10, M, P)]);
    }

    #[test]
    fn test_shadow_back_finds_left_edges_bottom_up() {
        let p = plane(&[(Rect::new(0, 0, 10, 4), M), (Rect::new(0, 6, 12, 10), P)]);
        let found = shadow_back(&p, 0, &Rect::new(0, 0, 20, 10), TypeMask::space());
        assert_eq!(
            spans(&found),
            vec![(10, 0, 4, M, TileType::SPACE), (12, 6, 10, P, TileType::SPACE)]
        );
    }

    #[test]
    fn test_atomize_splits_by_left_type() {
        let p = plane(&[(Rect::new(0, 0, 10, 4), M), (Rect::new(0, 4, 10, 10), P)]);
        let found = atomize(&p, 0, &Rect::new(10, 0, 14, 10));
        assert_eq!(
            spans(&found),
            vec![(10, 0, 4, M, TileType::SPACE), (10, 4, 10, P, TileType::SPACE)]
        );
        assert!(found.iter().all(|e| e.newx == 14));
    }

    #[test]
    fn test_atomize_skips_edges_already_far_enough() {
        let mut p = plane(&[(Rect::new(0, 0, 10, 10), M)]);
        let right = p.tile_at(Point::new(10, 5));
        p.set_trailing(right, 14);
        assert!(atomize(&p, 0, &Rect::new(10, 0, 14, 10)).is_empty());
    }

    #[test]
    fn test_outline_walks_around_rectangle() {
        let p = plane(&[(Rect::new(0, 0, 10, 10), M)]);
        let mut w = OutlineWalker::new(&p, Point::new(10, 10), TypeMask::only(M), Direction::North)
            .unwrap();
        let segs: Vec<(Direction, Rect)> =
            (0..4).map(|_| w.next(&p).map(|o| (o.dir, o.rect)).unwrap()).collect();
        assert_eq!(
            segs,
            vec![
                (Direction::West, Rect::new(0, 10, 10, 10)),
                (Direction::South, Rect::new(0, 0, 0, 10)),
                (Direction::East, Rect::new(0, 0, 10, 0)),
                (Direction::North, Rect::new(10, 0, 10, 10)),
            ]
        );
    }

    #[test]
    fn test_trace_outline_filters_directions() {
        let p = plane(&[(Rect::new(0, 0, 10, 10), M)]);
        let mut seen = Vec::new();
        trace_outline(
            &p,
            Point::new(10, 10),
            TypeMask::only(M),
            Direction::North,
            &[Direction::South, Direction::North],
            |o| {
                seen.push(o.dir);
                o.dir == Direction::North
            },
        );
        assert_eq!(seen, vec![Direction::South, Direction::North]);
    }

    #[test]
    fn test_outline_rejects_horizontal_start() {
        let p = Plane::new();
        assert!(OutlineWalker::new(&p, Point::new(0, 0), TypeMask::ALL, Direction::East).is_none());
    }
}
