//! # Corner-Stitched Tile Plane
//!
//! A plane is a partition of the whole coordinate space into rectangular
//! tiles. Each tile carries a material type, a *trailing* coordinate used by
//! the plow (where its left edge is headed), and four corner stitches:
//!
//! | Stitch | Points to the tile containing |
//! |--------|-------------------------------|
//! | `tr`   | `(right, top - 1)`            |
//! | `rt`   | `(right - 1, top)`            |
//! | `bl`   | `(left - 1, bottom)`          |
//! | `lb`   | `(left, bottom - 1)`          |
//!
//! Stitches at the edge of the world are `None`.
//!
//! Tiles live in a generational arena. A [`TileId`] whose tile was joined
//! away or discarded by a rebuild no longer resolves: [`Plane::get`] returns
//! `None` and indexing panics, the same contract as a slot map.
//!
//! ## Limitations
//!
//! - **Painting rebuilds the plane**: `paint` collects every non-space tile,
//!   edits the rectangle list and recomputes the canonical maximal-horizontal-strip
//!   form. All previously issued ids become stale. Use `split_y`/`join_y` for
//!   incremental work.
//! - **Area enumeration is a linear scan** over live tiles.

use crate::model::{Point, Rect, TileType, TypeMask, INFINITY, MINFINITY};
use crate::{Error, Result};

// ============================================================================
// Handles and tiles
// ============================================================================

/// Generation-checked tile handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId {
    index: u32,
    generation: u32,
}

impl std::fmt::Display for TileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}.{}", self.index, self.generation)
    }
}

/// One tile of a plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub rect: Rect,
    pub ttype: TileType,
    trailing: Option<i32>,
    tr: Option<TileId>,
    rt: Option<TileId>,
    bl: Option<TileId>,
    lb: Option<TileId>,
}

impl Tile {
    pub fn left(&self) -> i32 {
        self.rect.xbot
    }

    pub fn right(&self) -> i32 {
        self.rect.xtop
    }

    pub fn bottom(&self) -> i32 {
        self.rect.ybot
    }

    pub fn top(&self) -> i32 {
        self.rect.ytop
    }

    /// Where this tile's left edge will be once plowing is done.
    pub fn trailing(&self) -> i32 {
        self.trailing.unwrap_or(self.rect.xbot)
    }
}

/// A rectangle of material used to build or rebuild a plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub rect: Rect,
    pub ttype: TileType,
    pub trailing: Option<i32>,
}

impl Piece {
    pub fn new(rect: Rect, ttype: TileType) -> Self {
        Self { rect, ttype, trailing: None }
    }

    fn explicit_trailing(&self) -> Option<i32> {
        self.trailing.filter(|t| *t != self.rect.xbot)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    tile: Option<Tile>,
}

// ============================================================================
// Plane
// ============================================================================

/// A single tile plane covering `[-INFINITY, INFINITY)` in both axes.
#[derive(Debug, Clone)]
pub struct Plane {
    slots: Vec<Slot>,
    free: Vec<u32>,
    hint: Option<TileId>,
}

impl Default for Plane {
    fn default() -> Self {
        Self::new()
    }
}

impl Plane {
    /// An empty plane: one space tile covering the world.
    pub fn new() -> Self {
        let mut plane = Self { slots: Vec::new(), free: Vec::new(), hint: None };
        plane.rebuild(Vec::new());
        plane
    }

    /// Build a plane from disjoint pieces; everything else is space.
    pub fn from_pieces(pieces: Vec<Piece>) -> Self {
        let mut plane = Self { slots: Vec::new(), free: Vec::new(), hint: None };
        plane.rebuild(pieces);
        plane
    }

    // ========================================================================
    // Handle resolution
    // ========================================================================

    pub fn get(&self, id: TileId) -> Option<&Tile> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.tile.as_ref())
    }

    fn tile_mut(&mut self, id: TileId) -> &mut Tile {
        match self.slots.get_mut(id.index as usize) {
            Some(Slot { generation, tile: Some(t) }) if *generation == id.generation => t,
            _ => panic!("stale tile handle {id}"),
        }
    }

    pub fn tr(&self, id: TileId) -> Option<TileId> {
        self[id].tr
    }

    pub fn rt(&self, id: TileId) -> Option<TileId> {
        self[id].rt
    }

    pub fn bl(&self, id: TileId) -> Option<TileId> {
        self[id].bl
    }

    pub fn lb(&self, id: TileId) -> Option<TileId> {
        self[id].lb
    }

    pub fn trailing(&self, id: TileId) -> i32 {
        self[id].trailing()
    }

    /// Trailing coordinate of the tile to the right, i.e. where this tile's
    /// right edge will be.
    pub fn leading(&self, id: TileId) -> i32 {
        match self[id].tr {
            Some(r) => self[r].trailing(),
            None => INFINITY,
        }
    }

    /// Trailing coordinate if the tile has been moved, `None` otherwise.
    pub fn moved_trailing(&self, id: TileId) -> Option<i32> {
        self[id].trailing
    }

    pub fn set_trailing(&mut self, id: TileId, x: i32) {
        let t = self.tile_mut(id);
        t.trailing = if x == t.rect.xbot { None } else { Some(x) };
    }

    /// Iterate over every live tile.
    pub fn tiles(&self) -> impl Iterator<Item = (TileId, &Tile)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.tile.as_ref().map(|t| {
                (TileId { index: i as u32, generation: s.generation }, t)
            })
        })
    }

    pub fn tile_count(&self) -> usize {
        self.slots.iter().filter(|s| s.tile.is_some()).count()
    }

    // ========================================================================
    // Point and area search
    // ========================================================================

    /// The tile containing `p` (clamped into the world).
    pub fn tile_at(&self, p: Point) -> TileId {
        let p = Point::new(p.x.clamp(MINFINITY, INFINITY - 1), p.y.clamp(MINFINITY, INFINITY - 1));
        let start = self
            .hint
            .filter(|h| self.get(*h).is_some())
            .or_else(|| self.tiles().next().map(|(id, _)| id));
        if let Some(start) = start {
            if let Some(found) = self.walk_to(start, p) {
                if self[found].rect.contains_point(p) {
                    return found;
                }
            }
        }
        self.scan_point(p)
    }

    /// Stitch walk from `t` to the tile containing `p`.
    fn walk_to(&self, mut t: TileId, p: Point) -> Option<TileId> {
        if p.y < self[t].bottom() {
            loop {
                t = self.lb(t)?;
                if p.y >= self[t].bottom() {
                    break;
                }
            }
        } else {
            while p.y >= self[t].top() {
                t = self.rt(t)?;
            }
        }

        if p.x < self[t].left() {
            loop {
                loop {
                    t = self.bl(t)?;
                    if p.x >= self[t].left() {
                        break;
                    }
                }
                if p.y < self[t].top() {
                    break;
                }
                loop {
                    t = self.rt(t)?;
                    if p.y < self[t].top() {
                        break;
                    }
                }
                if p.x >= self[t].left() {
                    break;
                }
            }
        } else {
            while p.x >= self[t].right() {
                loop {
                    t = self.tr(t)?;
                    if p.x < self[t].right() {
                        break;
                    }
                }
                if p.y >= self[t].bottom() {
                    break;
                }
                loop {
                    t = self.lb(t)?;
                    if p.y >= self[t].bottom() {
                        break;
                    }
                }
            }
        }
        Some(t)
    }

    fn scan_point(&self, p: Point) -> TileId {
        let mut first = None;
        for (id, t) in self.tiles() {
            if t.rect.contains_point(p) {
                return id;
            }
            first.get_or_insert(id);
        }
        tracing::warn!(point = %p, "tile plane does not cover point");
        first.unwrap_or(TileId { index: 0, generation: 0 })
    }

    /// Tiles of a type in `mask` overlapping `area`, ordered top to bottom
    /// and then left to right.
    ///
    /// A zero-width or zero-height area still finds tiles that strictly
    /// straddle it.
    pub fn tiles_in(&self, area: &Rect, mask: TypeMask) -> Vec<TileId> {
        let mut found: Vec<(TileId, Rect)> = self
            .tiles()
            .filter(|(_, t)| mask.has(t.ttype) && straddles(&t.rect, area))
            .map(|(id, t)| (id, t.rect))
            .collect();
        found.sort_by(|a, b| b.1.ytop.cmp(&a.1.ytop).then(a.1.xbot.cmp(&b.1.xbot)));
        found.into_iter().map(|(id, _)| id).collect()
    }

    /// Non-space material clipped to `area`, trailing coordinates dropped.
    pub fn pieces_in(&self, area: &Rect) -> Vec<Piece> {
        self.tiles()
            .filter(|(_, t)| !t.ttype.is_space() && t.rect.overlaps(area))
            .map(|(_, t)| Piece::new(t.rect.clip(area), t.ttype))
            .collect()
    }

    fn pieces(&self) -> Vec<Piece> {
        self.tiles()
            .filter(|(_, t)| !t.ttype.is_space())
            .map(|(_, t)| Piece { rect: t.rect, ttype: t.ttype, trailing: t.trailing })
            .collect()
    }

    // ========================================================================
    // Painting
    // ========================================================================

    /// Replace everything under `rect` with `ttype` (space erases).
    pub fn paint(&mut self, rect: &Rect, ttype: TileType) {
        let rect = rect.clamp_to_world();
        if rect.is_null() {
            return;
        }
        let mut pieces = Vec::new();
        for p in self.pieces() {
            if !p.rect.overlaps(&rect) {
                pieces.push(p);
                continue;
            }
            let r = p.rect;
            let keep = |pieces: &mut Vec<Piece>, part: Rect| {
                if !part.is_null() {
                    let trailing = if part.xbot == r.xbot { p.trailing } else { None };
                    pieces.push(Piece { rect: part, ttype: p.ttype, trailing });
                }
            };
            let mid_x0 = r.xbot.max(rect.xbot);
            let mid_x1 = r.xtop.min(rect.xtop);
            keep(&mut pieces, Rect::new(r.xbot, r.ybot, mid_x0, r.ytop));
            keep(&mut pieces, Rect::new(mid_x1, r.ybot, r.xtop, r.ytop));
            keep(&mut pieces, Rect::new(mid_x0, r.ybot, mid_x1, rect.ybot.min(r.ytop)));
            keep(&mut pieces, Rect::new(mid_x0, rect.ytop.max(r.ybot), mid_x1, r.ytop));
        }
        if !ttype.is_space() {
            pieces.push(Piece::new(rect, ttype));
        }
        self.rebuild(pieces);
    }

    pub fn erase(&mut self, rect: &Rect) {
        self.paint(rect, TileType::SPACE);
    }

    // ========================================================================
    // Canonical rebuild
    // ========================================================================

    /// Discard every tile and rebuild the maximal-horizontal-strip form of
    /// `pieces`. Pieces are assumed disjoint.
    pub fn rebuild(&mut self, pieces: Vec<Piece>) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.tile.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(i as u32);
            }
        }

        let world = Rect::world();
        let pieces: Vec<Piece> = pieces
            .into_iter()
            .map(|p| Piece { rect: p.rect.clip(&world), ..p })
            .filter(|p| !p.rect.is_null() && !p.ttype.is_space())
            .collect();

        let mut ys: Vec<i32> = pieces
            .iter()
            .flat_map(|p| [p.rect.ybot, p.rect.ytop])
            .chain([MINFINITY, INFINITY])
            .collect();
        ys.sort_unstable();
        ys.dedup();

        // Each band is a run list: (xbot, xtop, tile).
        let mut bands: Vec<(i32, Vec<(i32, i32, TileId)>)> = Vec::with_capacity(ys.len());
        let mut below: Vec<(i32, i32, TileType, Option<i32>, TileId)> = Vec::new();

        for w in ys.windows(2) {
            let (y0, y1) = (w[0], w[1]);
            let mut covering: Vec<&Piece> = pieces
                .iter()
                .filter(|p| p.rect.ybot <= y0 && p.rect.ytop >= y1)
                .collect();
            covering.sort_by_key(|p| p.rect.xbot);

            // Maximal horizontal runs, gaps filled with space.
            let mut runs: Vec<(i32, i32, TileType, Option<i32>)> = Vec::new();
            let mut x = MINFINITY;
            for p in covering {
                if p.rect.xbot > x {
                    push_run(&mut runs, (x, p.rect.xbot, TileType::SPACE, None));
                }
                push_run(&mut runs, (p.rect.xbot, p.rect.xtop, p.ttype, p.explicit_trailing()));
                x = p.rect.xtop;
            }
            if x < INFINITY {
                push_run(&mut runs, (x, INFINITY, TileType::SPACE, None));
            }

            let mut current = Vec::with_capacity(runs.len());
            let mut lookup = Vec::with_capacity(runs.len());
            for (x0, x1, ttype, trailing) in runs {
                let same = below
                    .binary_search_by_key(&x0, |r| r.0)
                    .ok()
                    .map(|i| below[i])
                    .filter(|r| r.1 == x1 && r.2 == ttype && r.3 == trailing);
                let id = match same {
                    Some(r) => {
                        self.tile_mut(r.4).rect.ytop = y1;
                        r.4
                    }
                    None => self.alloc(Tile {
                        rect: Rect::new(x0, y0, x1, y1),
                        ttype,
                        trailing,
                        tr: None,
                        rt: None,
                        bl: None,
                        lb: None,
                    }),
                };
                current.push((x0, x1, ttype, trailing, id));
                lookup.push((x0, x1, id));
            }
            bands.push((y0, lookup));
            below = current;
        }

        let locate = |p: Point| -> Option<TileId> {
            if p.x < MINFINITY || p.x >= INFINITY || p.y < MINFINITY || p.y >= INFINITY {
                return None;
            }
            let b = match bands.binary_search_by_key(&p.y, |b| b.0) {
                Ok(i) => i,
                Err(i) => i.checked_sub(1)?,
            };
            let runs = &bands[b].1;
            let r = match runs.binary_search_by_key(&p.x, |r| r.0) {
                Ok(i) => i,
                Err(i) => i.checked_sub(1)?,
            };
            Some(runs[r].2)
        };

        let ids: Vec<(TileId, Rect)> = self.tiles().map(|(id, t)| (id, t.rect)).collect();
        for (id, r) in &ids {
            let tr = locate(Point::new(r.xtop, r.ytop - 1));
            let rt = locate(Point::new(r.xtop - 1, r.ytop));
            let bl = locate(Point::new(r.xbot - 1, r.ybot));
            let lb = locate(Point::new(r.xbot, r.ybot - 1));
            let t = self.tile_mut(*id);
            t.tr = tr;
            t.rt = rt;
            t.bl = bl;
            t.lb = lb;
        }
        self.hint = ids.first().map(|(id, _)| *id);
    }

    fn alloc(&mut self, tile: Tile) -> TileId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.tile = Some(tile);
                TileId { index, generation: slot.generation }
            }
            None => {
                self.slots.push(Slot { generation: 0, tile: Some(tile) });
                TileId { index: (self.slots.len() - 1) as u32, generation: 0 }
            }
        }
    }

    fn release(&mut self, id: TileId) {
        let slot = &mut self.slots[id.index as usize];
        slot.tile = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
    }

    // ========================================================================
    // Incremental split / join
    // ========================================================================

    /// Split `id` horizontally at `y`. The original keeps the lower part;
    /// the returned tile is the upper part with the same type and trailing
    /// coordinate.
    pub fn split_y(&mut self, id: TileId, y: i32) -> TileId {
        let old = self[id].clone();
        debug_assert!(old.bottom() < y && y < old.top(), "split_y outside tile");

        let new_id = self.alloc(Tile {
            rect: Rect::new(old.left(), y, old.right(), old.top()),
            ttype: old.ttype,
            trailing: old.trailing,
            tr: old.tr,
            rt: old.rt,
            bl: None,
            lb: Some(id),
        });

        // Top edge
        let mut tp = old.rt;
        while let Some(t) = tp {
            if self[t].lb != Some(id) {
                break;
            }
            self.tile_mut(t).lb = Some(new_id);
            tp = self[t].bl;
        }

        // Right edge
        let mut tp = old.tr;
        while let Some(t) = tp {
            if self[t].bottom() < y {
                break;
            }
            self.tile_mut(t).bl = Some(new_id);
            tp = self[t].lb;
        }
        {
            let t = self.tile_mut(id);
            t.tr = tp;
            t.rt = Some(new_id);
            t.rect.ytop = y;
        }

        // Left edge
        let mut tp = old.bl;
        while let Some(t) = tp {
            if self[t].top() > y {
                break;
            }
            tp = self[t].rt;
        }
        self.tile_mut(new_id).bl = tp;
        while let Some(t) = tp {
            if self[t].tr != Some(id) {
                break;
            }
            self.tile_mut(t).tr = Some(new_id);
            tp = self[t].rt;
        }

        self.hint = Some(id);
        new_id
    }

    /// Join `gone` into its vertical neighbor `keep`. Both must have the
    /// same left and right coordinates and share a horizontal side.
    pub fn join_y(&mut self, keep: TileId, gone: TileId) {
        let g = self[gone].clone();
        debug_assert_eq!(self[keep].left(), g.left());
        debug_assert_eq!(self[keep].right(), g.right());

        // Right side of `gone`
        let mut tp = g.tr;
        while let Some(t) = tp {
            if self[t].bl != Some(gone) {
                break;
            }
            self.tile_mut(t).bl = Some(keep);
            tp = self[t].lb;
        }

        // Left side of `gone`
        let mut tp = g.bl;
        while let Some(t) = tp {
            if self[t].tr != Some(gone) {
                break;
            }
            self.tile_mut(t).tr = Some(keep);
            tp = self[t].rt;
        }

        if self[keep].bottom() < g.bottom() {
            // `gone` sits on top
            let mut tp = g.rt;
            while let Some(t) = tp {
                if self[t].lb != Some(gone) {
                    break;
                }
                self.tile_mut(t).lb = Some(keep);
                tp = self[t].bl;
            }
            let k = self.tile_mut(keep);
            k.rt = g.rt;
            k.tr = g.tr;
            k.rect.ytop = g.top();
        } else {
            let mut tp = g.lb;
            while let Some(t) = tp {
                if self[t].rt != Some(gone) {
                    break;
                }
                self.tile_mut(t).rt = Some(keep);
                tp = self[t].tr;
            }
            let k = self.tile_mut(keep);
            k.lb = g.lb;
            k.bl = g.bl;
            k.rect.ybot = g.bottom();
        }

        self.release(gone);
        self.hint = Some(keep);
    }

    // ========================================================================
    // Consistency checks
    // ========================================================================

    /// Verify that tiles cover the world without overlap and that every
    /// stitch points where its definition says.
    pub fn check_stitches(&self) -> Result<()> {
        let tiles: Vec<(TileId, &Tile)> = self.tiles().collect();
        let area: i128 = tiles
            .iter()
            .map(|(_, t)| t.rect.width() as i128 * t.rect.height() as i128)
            .sum();
        let world = Rect::world();
        if area != world.width() as i128 * world.height() as i128 {
            return Err(Error::InvariantViolation(format!(
                "tiles cover {area} units, world is {}",
                world.width() as i128 * world.height() as i128
            )));
        }
        let owner = |p: Point| tiles.iter().find(|(_, t)| t.rect.contains_point(p)).map(|(id, _)| *id);
        for (id, t) in &tiles {
            let r = t.rect;
            let expect = [
                ("tr", t.tr, r.xtop < INFINITY, Point::new(r.xtop, r.ytop - 1)),
                ("rt", t.rt, r.ytop < INFINITY, Point::new(r.xtop - 1, r.ytop)),
                ("bl", t.bl, r.xbot > MINFINITY, Point::new(r.xbot - 1, r.ybot)),
                ("lb", t.lb, r.ybot > MINFINITY, Point::new(r.xbot, r.ybot - 1)),
            ];
            for (name, got, inside, p) in expect {
                let want = if inside { owner(p) } else { None };
                if got != want {
                    return Err(Error::InvariantViolation(format!(
                        "tile {id} {r}: stitch {name} is {got:?}, expected {want:?}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Verify that no two vertically adjacent tiles could be joined.
    pub fn check_merged(&self) -> Result<()> {
        for (id, t) in self.tiles() {
            let Some(up) = t.rt else { continue };
            let u = &self[up];
            if u.ttype == t.ttype
                && u.left() == t.left()
                && u.right() == t.right()
                && u.trailing() == t.trailing()
                && self.leading(up) == self.leading(id)
            {
                return Err(Error::InvariantViolation(format!(
                    "tiles {} and {} should have been merged",
                    t.rect, u.rect
                )));
            }
        }
        Ok(())
    }
}

impl std::ops::Index<TileId> for Plane {
    type Output = Tile;

    fn index(&self, id: TileId) -> &Tile {
        match self.get(id) {
            Some(t) => t,
            None => panic!("stale tile handle {id}"),
        }
    }
}

/// Area-search overlap test; degenerate areas match tiles that straddle them.
fn straddles(tile: &Rect, area: &Rect) -> bool {
    tile.xbot < area.xtop && tile.xtop > area.xbot && tile.ybot < area.ytop && tile.ytop > area.ybot
}

fn push_run(
    runs: &mut Vec<(i32, i32, TileType, Option<i32>)>,
    run: (i32, i32, TileType, Option<i32>),
) {
    if let Some(last) = runs.last_mut() {
        if last.2 == run.2 && last.1 == run.0 && run.3.is_none() {
            last.1 = run.1;
            return;
        }
    }
    runs.push(run);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const M: TileType = TileType(1);
    const P: TileType = TileType(2);

    fn plane_with(rects: &[(Rect, TileType)]) -> Plane {
        let mut plane = Plane::new();
        for (r, t) in rects {
            plane.paint(r, *t);
        }
        plane
    }

    #[test]
    fn test_empty_plane_is_one_space_tile() {
        let plane = Plane::new();
        assert_eq!(plane.tile_count(), 1);
        let t = plane.tile_at(Point::new(0, 0));
        assert_eq!(plane[t].rect, Rect::world());
        plane.check_stitches().unwrap();
    }

    #[test]
    fn test_paint_single_rect() {
        let plane = plane_with(&[(Rect::new(0, 0, 10, 10), M)]);
        // above, below, left strip, rect, right strip
        assert_eq!(plane.tile_count(), 5);
        let t = plane.tile_at(Point::new(5, 5));
        assert_eq!(plane[t].rect, Rect::new(0, 0, 10, 10));
        assert_eq!(plane[t].ttype, M);
        plane.check_stitches().unwrap();
        plane.check_merged().unwrap();
    }

    #[test]
    fn test_abutting_same_type_merges() {
        let plane = plane_with(&[(Rect::new(0, 0, 10, 10), M), (Rect::new(10, 0, 20, 10), M)]);
        let t = plane.tile_at(Point::new(12, 3));
        assert_eq!(plane[t].rect, Rect::new(0, 0, 20, 10));
        plane.check_stitches().unwrap();
    }

    #[test]
    fn test_erase_splits_material() {
        let mut plane = plane_with(&[(Rect::new(0, 0, 30, 10), M)]);
        plane.erase(&Rect::new(10, 0, 20, 10));
        let left = plane.tile_at(Point::new(5, 5));
        let mid = plane.tile_at(Point::new(15, 5));
        assert_eq!(plane[left].rect, Rect::new(0, 0, 10, 10));
        assert!(plane[mid].ttype.is_space());
        plane.check_stitches().unwrap();
    }

    #[test]
    fn test_split_and_join_keep_stitches() {
        let mut plane = plane_with(&[(Rect::new(0, 0, 10, 10), M), (Rect::new(10, 4, 20, 6), P)]);
        let t = plane.tile_at(Point::new(5, 5));
        let upper = plane.split_y(t, 5);
        assert_eq!(plane[t].rect, Rect::new(0, 0, 10, 5));
        assert_eq!(plane[upper].rect, Rect::new(0, 5, 10, 10));
        plane.check_stitches().unwrap();

        plane.join_y(t, upper);
        assert!(plane.get(upper).is_none());
        assert_eq!(plane[t].rect, Rect::new(0, 0, 10, 10));
        plane.check_stitches().unwrap();
    }

    #[test]
    fn test_rebuild_invalidates_handles() {
        let mut plane = plane_with(&[(Rect::new(0, 0, 10, 10), M)]);
        let t = plane.tile_at(Point::new(1, 1));
        plane.paint(&Rect::new(50, 50, 60, 60), P);
        assert!(plane.get(t).is_none());
    }

    #[test]
    fn test_trailing_blocks_vertical_merge() {
        let mut plane = plane_with(&[(Rect::new(0, 0, 10, 10), M)]);
        let t = plane.tile_at(Point::new(5, 5));
        let upper = plane.split_y(t, 5);
        plane.set_trailing(upper, 3);
        assert_eq!(plane.trailing(upper), 3);
        assert_eq!(plane.trailing(t), 0);
        plane.check_merged().unwrap();

        // The space to the left still ends beside the upper half until it
        // is split at the same height.
        let left = plane.bl(t).unwrap();
        assert_eq!(plane.leading(left), 3);
        let left_upper = plane.split_y(left, 5);
        assert_eq!(plane.leading(left), 0);
        assert_eq!(plane.leading(left_upper), 3);
        plane.check_stitches().unwrap();
    }

    #[test]
    fn test_tiles_in_orders_top_down() {
        let plane = plane_with(&[(Rect::new(0, 0, 10, 10), M), (Rect::new(0, 20, 10, 30), M)]);
        let found = plane.tiles_in(&Rect::new(0, 0, 10, 30), TypeMask::only(M));
        let rects: Vec<Rect> = found.iter().map(|id| plane[*id].rect).collect();
        assert_eq!(rects, vec![Rect::new(0, 20, 10, 30), Rect::new(0, 0, 10, 10)]);
    }

    #[test]
    fn test_degenerate_area_finds_straddling_tile() {
        let plane = plane_with(&[(Rect::new(0, 0, 10, 10), M)]);
        let found = plane.tiles_in(&Rect::new(5, 0, 5, 10), TypeMask::only(M));
        assert_eq!(found.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_paint_keeps_plane_consistent(
            rects in proptest::collection::vec((0i32..40, 0i32..40, 1i32..15, 1i32..15, 0u16..3), 1..8)
        ) {
            let mut plane = Plane::new();
            for (x, y, w, h, t) in &rects {
                plane.paint(&Rect::new(*x, *y, x + w, y + h), TileType(*t));
            }
            prop_assert!(plane.check_stitches().is_ok());
            prop_assert!(plane.check_merged().is_ok());
            // the last painted rect is fully its type
            let (x, y, w, h, t) = rects[rects.len() - 1];
            let inside = plane.tile_at(Point::new(x + w / 2, y + h / 2));
            prop_assert_eq!(plane[inside].ttype, TileType(t));
        }

        #[test]
        fn prop_point_walk_matches_scan(px in -5i32..50, py in -5i32..50) {
            let plane = plane_with(&[
                (Rect::new(0, 0, 10, 30), M),
                (Rect::new(15, 5, 25, 12), P),
                (Rect::new(20, 20, 40, 25), M),
            ]);
            let p = Point::new(px, py);
            let t = plane.tile_at(p);
            prop_assert!(plane[t].rect.contains_point(p));
        }
    }
}
