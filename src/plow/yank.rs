//! # Yank Buffer
//!
//! A private, canonical-frame copy of the part of a def the plow is
//! working on. Propagation reads and moves tiles here; the real def is
//! only touched at commit time.
//!
//! The buffer grows on demand. Growing re-copies a larger area from the
//! def and carries over everything already decided in the old copy: the
//! trailing coordinate of every moved tile and the distance of every
//! moved subcell.

use crate::model::{CellUse, Point, Rect, Transform, TypeMask, UseId};
use crate::storage::{DefId, LayoutDb};
use crate::tiles::{Piece, Plane};
use crate::Result;

/// A subcell in the yank buffer, bounding box in canonical coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct YankCell {
    pub cell: CellUse,
    /// How far the use has been pushed so far.
    pub moved: i32,
}

pub(crate) struct Yank {
    pub planes: Vec<Plane>,
    pub cells: Vec<YankCell>,
    /// Area copied so far.
    pub area: Rect,
    /// Bounding box of the def; nothing outside it is worth yanking.
    pub cell_bbox: Rect,
    pub trans: Transform,
    pub inverse: Transform,
    def: DefId,
}

impl Yank {
    /// Copy `area` (canonical coordinates) of `def`.
    pub fn load(
        db: &dyn LayoutDb,
        def: DefId,
        nplanes: usize,
        trans: Transform,
        area: Rect,
    ) -> Result<Self> {
        let inverse = trans.inverse();
        let cell_bbox = match db.bbox(def)? {
            Some(b) => trans.apply_rect(&b),
            None => area,
        };
        let (planes, cells) = copy(db, def, nplanes, &trans, &inverse, &area)?;
        tracing::trace!(area = %area, "yank");
        Ok(Self { planes, cells, area, cell_bbox, trans, inverse, def })
    }

    pub fn plane(&self, p: usize) -> &Plane {
        &self.planes[p]
    }

    pub fn cell(&self, id: UseId) -> Option<&YankCell> {
        self.cells.iter().find(|c| c.cell.id == id)
    }

    pub fn cell_mut(&mut self, id: UseId) -> Option<&mut YankCell> {
        self.cells.iter_mut().find(|c| c.cell.id == id)
    }

    /// Make sure `area`, grown by `halo` up and down and to the right and
    /// by `back` to the left, has been yanked. Returns true if the buffer
    /// was replaced, in which case every `TileId` into it is stale.
    pub fn more(&mut self, db: &dyn LayoutDb, area: &Rect, halo: i32, back: i32) -> Result<bool> {
        let grown = Rect::new(area.xbot - back, area.ybot - halo, area.xtop + halo, area.ytop + halo)
            .clip(&self.cell_bbox);
        if grown.is_null() || self.area.surrounds_strong(&grown) {
            return Ok(false);
        }

        let xsize = self.area.width() >> 1;
        let ysize = self.area.height() >> 1;
        let mut new_area = self.area;
        if grown.xbot <= new_area.xbot {
            new_area.xbot -= xsize >> 1;
        }
        if grown.xtop >= new_area.xtop {
            new_area.xtop += xsize;
        }
        if grown.ybot <= new_area.ybot {
            new_area.ybot -= ysize;
        }
        if grown.ytop >= new_area.ytop {
            new_area.ytop += ysize;
        }
        let new_area = new_area.union(&grown).clip(&self.cell_bbox).clamp_to_world();
        if self.area.surrounds(&new_area) {
            return Ok(false);
        }

        let (mut planes, mut cells) =
            copy(db, self.def, self.planes.len(), &self.trans, &self.inverse, &new_area)?;

        for c in &mut cells {
            if let Some(old) = self.cell(c.cell.id) {
                c.moved = old.moved;
            }
        }

        let mut old_area = self.area;
        old_area.xtop += 1;
        for (old, new) in self.planes.iter().zip(planes.iter_mut()) {
            transfer_trailing(old, new, &old_area);
        }

        tracing::trace!(from = %self.area, to = %new_area, "yank more");
        self.planes = planes;
        self.cells = cells;
        self.area = new_area;
        Ok(true)
    }
}

fn copy(
    db: &dyn LayoutDb,
    def: DefId,
    nplanes: usize,
    trans: &Transform,
    inverse: &Transform,
    area: &Rect,
) -> Result<(Vec<Plane>, Vec<YankCell>)> {
    let user_area = inverse.apply_rect(&area.clamp_to_world());
    let mut planes = Vec::with_capacity(nplanes);
    for p in 0..nplanes {
        let pieces = db
            .paint_in(def, p, &user_area)?
            .into_iter()
            .map(|(r, t)| Piece::new(trans.apply_rect(&r), t))
            .collect();
        planes.push(Plane::from_pieces(pieces));
    }
    let cells = db
        .cells_in(def, &user_area)?
        .into_iter()
        .map(|mut c| {
            c.bbox = trans.apply_rect(&c.bbox);
            YankCell { cell: c, moved: 0 }
        })
        .collect();
    Ok((planes, cells))
}

/// Copy the trailing coordinates of moved tiles of `old` inside `area`
/// onto the same material in `new`, splitting `new` where the tiles of
/// the two planes are cut differently.
fn transfer_trailing(old: &Plane, new: &mut Plane, area: &Rect) {
    for id in old.tiles_in(area, TypeMask::ALL) {
        let Some(trailing) = old.moved_trailing(id) else { continue };
        let t = &old[id];
        let (left, bottom, top, ttype) = (t.left(), t.bottom(), t.top(), t.ttype);

        let mut y = top - 1;
        loop {
            let mut sp = new.tile_at(Point::new(left, y));
            if new[sp].ttype == ttype {
                if new[sp].top() > top {
                    new.split_y(sp, top);
                }
                if new[sp].bottom() < bottom {
                    sp = new.split_y(sp, bottom);
                }
                new.set_trailing(sp, trailing);
            }
            y = new[sp].bottom() - 1;
            if y < bottom {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TileType;
    use crate::storage::MemoryDb;
    use pretty_assertions::assert_eq;

    const M: TileType = TileType(1);

    fn db_with(rects: &[Rect]) -> (MemoryDb, DefId) {
        let db = MemoryDb::new();
        let d = db.create_def("top").unwrap();
        for r in rects {
            db.paint_plane(d, 0, r, M).unwrap();
        }
        db.recompute_bbox(d).unwrap();
        (db, d)
    }

    #[test]
    fn test_load_copies_clipped_paint() {
        let (db, d) = db_with(&[Rect::new(0, 0, 100, 10)]);
        let y = Yank::load(&db, d, 1, Transform::IDENTITY, Rect::new(-5, -5, 20, 15)).unwrap();
        let t = y.plane(0).tile_at(Point::new(5, 5));
        assert_eq!(y.plane(0)[t].rect, Rect::new(0, 0, 20, 10));
    }

    #[test]
    fn test_load_applies_transform() {
        let (db, d) = db_with(&[Rect::new(0, 0, 4, 10)]);
        let trans = Transform::canonical(crate::model::Direction::North);
        let y = Yank::load(&db, d, 1, trans, Rect::new(-20, -20, 20, 20)).unwrap();
        let expect = trans.apply_rect(&Rect::new(0, 0, 4, 10));
        let t = y.plane(0).tile_at(expect.ll());
        assert_eq!(y.plane(0)[t].rect, expect);
    }

    #[test]
    fn test_more_is_noop_when_covered() {
        let (db, d) = db_with(&[Rect::new(0, 0, 100, 100)]);
        let mut y = Yank::load(&db, d, 1, Transform::IDENTITY, Rect::new(0, 0, 50, 50)).unwrap();
        assert!(!y.more(&db, &Rect::new(10, 10, 20, 20), 2, 1).unwrap());
        assert_eq!(y.area, Rect::new(0, 0, 50, 50));
    }

    #[test]
    fn test_more_grows_and_keeps_trailing() {
        let (db, d) = db_with(&[Rect::new(0, 0, 100, 10)]);
        let mut y = Yank::load(&db, d, 1, Transform::IDENTITY, Rect::new(-5, -5, 40, 15)).unwrap();
        let bar = y.plane(0).tile_at(Point::new(5, 5));
        y.planes[0].set_trailing(bar, 2);

        assert!(y.more(&db, &Rect::new(30, 0, 60, 10), 5, 1).unwrap());
        // grown, then clipped to the def's bounding box
        assert_eq!(y.area, Rect::new(0, 0, 65, 10));
        let moved = y.plane(0).tile_at(Point::new(50, 5));
        assert_eq!(y.plane(0)[moved].ttype, M);
        assert_eq!(y.plane(0).trailing(moved), 2);
    }

    #[test]
    fn test_more_keeps_cell_moves() {
        let (db, d) = db_with(&[Rect::new(0, 0, 100, 10)]);
        let u = db.add_use(d, "sub", Rect::new(30, 0, 35, 5)).unwrap();
        let mut y = Yank::load(&db, d, 1, Transform::IDENTITY, Rect::new(0, -5, 40, 15)).unwrap();
        y.cell_mut(u).unwrap().moved = 3;
        assert!(y.more(&db, &Rect::new(30, 0, 70, 10), 5, 1).unwrap());
        assert_eq!(y.cell(u).map(|c| c.moved), Some(3));
    }
}
