//! Subcells: found by moving paint, and moving paint themselves.
//!
//! Subcells are rigid. A paint edge that comes within the halo of a cell
//! pushes the whole cell; a cell that moves drags the paint inside and
//! beside it and pushes whatever lies in front of it.

use crate::model::{Rect, TypeMask};
use crate::plow::edge::Edge;
use crate::plow::engine::Engine;
use crate::plow::search::shadow;
use crate::Result;

pub(crate) fn find_cells(eng: &mut Engine<'_>, edge: &Edge) {
    let halo = eng.tech.halo();
    let area = Rect::new(edge.x - 1, edge.ybot - halo, edge.newx + halo, edge.ytop + halo);
    found_cells(eng, edge, &area);
}

/// Push every cell overlapping `area` far enough to stay clear of `mov`.
fn found_cells(eng: &mut Engine<'_>, mov: &Edge, area: &Rect) {
    let halo = eng.tech.halo();
    let mut pushed = Vec::new();
    for c in &eng.yank.cells {
        let bbox = c.cell.bbox;
        if !bbox.overlaps(area) || mov.cell == Some(c.cell.id) {
            continue;
        }
        let xmove = if bbox.xbot <= mov.x {
            mov.distance()
        } else {
            mov.newx + (bbox.xbot - mov.x).min(halo) - bbox.xbot
        };
        if c.moved < xmove {
            pushed.push(Edge::cell(c.cell.id, &bbox, bbox.xtop + xmove));
        }
    }
    eng.propagate_all(pushed);
}

/// A subcell with bounding box `bbox` (canonical, before the move) moves
/// by `mov.distance()`.
pub(crate) fn pr_cell(eng: &mut Engine<'_>, mov: &Edge, bbox: &Rect) -> Result<()> {
    let halo = eng.tech.halo();
    let dist = mov.distance();
    let search = Rect::new(bbox.xbot - 1, mov.ybot - halo, bbox.xtop + halo, mov.ytop + halo);
    let front = Rect::new(mov.x - 1, mov.ybot - halo, mov.newx + halo, mov.ytop + halo);

    for p in 0..eng.nplanes() {
        let plane = eng.yank.plane(p);
        let mut atoms = Vec::new();
        for t in plane.tiles_in(&search, TypeMask::ALL) {
            let tile = &plane[t];
            let (xbot, xtop) = if tile.left() <= search.xbot {
                let leading = plane.leading(t);
                let xtop = tile.right() + dist;
                if leading >= search.xtop || leading >= xtop {
                    continue;
                }
                (tile.right(), xtop)
            } else {
                let xtop = tile.left() + dist;
                if plane.trailing(t) >= xtop {
                    continue;
                }
                (tile.left(), xtop)
            };
            atoms.push(Rect::new(
                xbot,
                tile.bottom().max(search.ybot),
                xtop,
                tile.top().min(search.ytop),
            ));
        }
        for atom in atoms {
            eng.atomize_propagate(p, &atom);
        }

        let found = shadow(eng.yank.plane(p), p, &front, TypeMask::EMPTY);
        for imp in found {
            let newx = mov.newx + (imp.x - mov.x).min(halo);
            if newx > imp.newx {
                let mut e = imp;
                e.newx = newx;
                eng.propagate(&e);
            }
        }
    }

    let area = Rect::new(bbox.xbot - 1, mov.ybot - halo, mov.newx + halo, mov.ytop + halo);
    found_cells(eng, mov, &area);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TileType;
    use crate::plow::testutil::{db_with, engine, tech, ty};
    use crate::storage::MemoryDb;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_paint_edge_pushes_cell_in_front() {
        let t = tech();
        let (db, def): (MemoryDb, _) = db_with(&t, &[(Rect::new(0, 0, 4, 10), "poly")]);
        let u = db.add_use(def, "sub", Rect::new(10, 0, 20, 10)).unwrap();
        let mut eng = engine(&t, &db, def, Rect::new(-20, -20, 40, 30), 20);
        let poly = ty(&t, "poly");
        find_cells(&mut eng, &Edge::paint(0, 4, 9, 0, 10, poly, TileType::SPACE));
        let pushed = eng.queue.pop_leftmost().unwrap();
        assert_eq!(pushed.cell, Some(u));
        // halo of 3 kept between the moved edge and the cell
        assert_eq!(pushed.newx - pushed.x, 9 + 3 - 10);
    }

    #[test]
    fn test_cell_straddling_edge_moves_full_distance() {
        let t = tech();
        let (db, def) = db_with(&t, &[(Rect::new(0, 0, 4, 10), "poly")]);
        let u = db.add_use(def, "sub", Rect::new(2, 0, 12, 10)).unwrap();
        let mut eng = engine(&t, &db, def, Rect::new(-20, -20, 40, 30), 20);
        let poly = ty(&t, "poly");
        find_cells(&mut eng, &Edge::paint(0, 4, 9, 0, 10, poly, TileType::SPACE));
        let pushed = eng.queue.pop_leftmost().unwrap();
        assert_eq!(pushed.cell, Some(u));
        assert_eq!((pushed.x, pushed.newx), (12, 17));
    }
}
