//! Writing a plowed yank buffer back into the real def.
//!
//! Paint inside the changed area is erased and repainted from the yank
//! buffer at each tile's final position. Subcells that moved are moved,
//! not recreated, and labels follow the material they sit on.

use crate::model::{Rect, TypeMask};
use crate::storage::{DefId, LayoutDb};
use crate::tech::Technology;
use crate::Result;

use super::yank::Yank;

/// What a writeback touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Writeback {
    /// Area repainted, in def coordinates.
    pub area: Rect,
    pub cells_moved: usize,
    pub labels_moved: usize,
}

/// Copy the result of a plow from `yank` into `def`. `changed` is the
/// canonical area touched by moved edges.
pub(crate) fn commit(
    db: &dyn LayoutDb,
    tech: &Technology,
    def: DefId,
    yank: &Yank,
    changed: &Rect,
) -> Result<Writeback> {
    // One unit of slack catches edges sitting on the left side of the area
    let changed = changed.bloat(1);
    let area = yank.inverse.apply_rect(&changed).clamp_to_world();

    let mut cells_moved = 0;
    for c in yank.cells.iter().filter(|c| c.moved > 0) {
        let bbox = yank.inverse.apply_rect(&c.cell.bbox.translate(c.moved, 0));
        db.move_use(def, c.cell.id, bbox)?;
        db.request_redisplay(def, &bbox);
        cells_moved += 1;
    }

    let labels_moved = move_labels(db, tech, def, yank, &area)?;

    for p in 0..yank.planes.len() {
        db.erase_plane(def, p, &area)?;
        let plane = yank.plane(p);
        for (id, t) in plane.tiles() {
            if t.ttype.is_space() || !t.rect.overlaps(&changed) {
                continue;
            }
            let moved = Rect::new(plane.trailing(id), t.bottom(), plane.leading(id), t.top());
            db.paint_plane(def, p, &yank.inverse.apply_rect(&moved), t.ttype)?;
        }
    }

    db.recompute_bbox(def)?;
    db.request_redisplay(def, &area);
    db.request_drc(def, &area);
    tracing::debug!(%def, %area, cells_moved, labels_moved, "plow committed");
    Ok(Writeback { area, cells_moved, labels_moved })
}

/// Drag each label near the changed area along with the tiles of its type
/// that it sits on: with their right side if it touches it, otherwise with
/// their left side.
fn move_labels(db: &dyn LayoutDb, tech: &Technology, def: DefId, yank: &Yank, area: &Rect) -> Result<usize> {
    let mut moved = 0;
    for label in db.labels(def)? {
        if label.ttype.is_space() || !label.rect.touches(area) {
            continue;
        }
        let Some(p) = tech.planes_of(label.ttype).next() else {
            tracing::warn!(label = %label.text, "label type has no plane");
            continue;
        };
        let rect = yank.trans.apply_rect(&label.rect);
        let plane = yank.plane(p);
        let adjust = plane
            .tiles_in(&rect.bloat(1), TypeMask::only(label.ttype))
            .into_iter()
            .map(|id| {
                if rect.xtop == plane[id].right() {
                    plane.leading(id) - rect.xtop
                } else {
                    plane.trailing(id) - rect.xbot
                }
            })
            .fold(0, i32::max);
        if adjust > 0 {
            db.move_label(def, label.id, yank.inverse.apply_rect(&rect.translate(adjust, 0)))?;
            moved += 1;
        }
    }
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Point, TileType, Transform};
    use crate::plow::edge::Edge;
    use crate::plow::mover::move_edge;
    use crate::plow::testutil::{db_with, tech, ty};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_moved_edge_is_repainted_and_label_follows() {
        let t = tech();
        let poly = ty(&t, "poly");
        let (db, def) = db_with(&t, &[(Rect::new(0, 0, 4, 10), "poly")]);
        let l = db.add_label(def, "in", Rect::new(4, 5, 4, 5), poly).unwrap();
        let mut yank = Yank::load(&db, def, t.plane_count(), Transform::IDENTITY, Rect::new(-10, -10, 20, 20)).unwrap();
        let e = Edge::paint(0, 4, 7, 0, 10, poly, TileType::SPACE);
        move_edge(&mut yank.planes[0], &e).unwrap();

        let wb = commit(&db, &t, def, &yank, &e.rect()).unwrap();
        assert_eq!(wb.labels_moved, 1);
        assert_eq!(db.tiles(def, 0).unwrap(), vec![(Rect::new(0, 0, 7, 10), poly)]);
        assert_eq!(db.label(def, l).unwrap().rect, Rect::new(7, 5, 7, 5));
        assert_eq!(db.type_at(def, 0, Point::new(6, 9)).unwrap(), poly);
        assert_eq!(db.drc_requests().len(), 1);
    }
}
