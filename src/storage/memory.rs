//! In-memory layout database.
//!
//! This is the reference implementation of `LayoutDb`. Each def keeps one
//! [`Plane`] per technology plane plus its subcell uses and labels, all
//! behind `parking_lot` locks.
//!
//! ## Limitations
//!
//! - **No undo of geometry**: only plow parameter changes are logged.
//! - **Planes grow on demand**: painting plane `p` creates planes `0..=p`.
//!   The def does not know the technology.
//! - **Collaborator requests are recorded, not acted on**: redisplay and
//!   DRC requests are appended to lists that tests can inspect.
//!
//! Use this backend for:
//! - Testing the plow engine end to end
//! - Embedding the engine where no editor database exists

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::model::*;
use crate::tech::Technology;
use crate::tiles::Plane;
use crate::undo::UndoRecord;
use crate::{Error, Result};
use super::{DefId, LayoutDb, Selection};

// ============================================================================
// MemoryDb
// ============================================================================

/// In-memory cell definitions.
#[derive(Clone)]
pub struct MemoryDb {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    defs: RwLock<HashMap<DefId, DefData>>,
    names: RwLock<HashMap<String, DefId>>,
    redisplay: RwLock<Vec<(DefId, Rect)>>,
    drc: RwLock<Vec<(DefId, Rect)>>,
    undo: RwLock<Vec<UndoRecord>>,
    interrupt: AtomicBool,
    /// Polls left before the interrupt fires; negative disables the countdown.
    interrupt_countdown: AtomicI64,
    next_def_id: AtomicU64,
    next_use_id: AtomicU64,
    next_label_id: AtomicU64,
}

#[derive(Debug, Clone, Default)]
struct DefData {
    planes: Vec<Plane>,
    cells: HashMap<UseId, CellUse>,
    labels: HashMap<LabelId, Label>,
    selection: Selection,
    bbox: Option<Rect>,
}

impl DefData {
    fn plane_mut(&mut self, plane: usize) -> &mut Plane {
        if self.planes.len() <= plane {
            self.planes.resize_with(plane + 1, Plane::new);
        }
        &mut self.planes[plane]
    }

    fn compute_bbox(&self) -> Option<Rect> {
        let mut acc = None;
        for plane in &self.planes {
            for (_, t) in plane.tiles() {
                if !t.ttype.is_space() {
                    include(&mut acc, &t.rect);
                }
            }
        }
        for c in self.cells.values() {
            include(&mut acc, &c.bbox);
        }
        for l in self.labels.values() {
            include(&mut acc, &l.rect);
        }
        acc
    }
}

impl Default for MemoryDb {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDb {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                defs: RwLock::new(HashMap::new()),
                names: RwLock::new(HashMap::new()),
                redisplay: RwLock::new(Vec::new()),
                drc: RwLock::new(Vec::new()),
                undo: RwLock::new(Vec::new()),
                interrupt: AtomicBool::new(false),
                interrupt_countdown: AtomicI64::new(-1),
                next_def_id: AtomicU64::new(1),
                next_use_id: AtomicU64::new(1),
                next_label_id: AtomicU64::new(1),
            }),
        }
    }

    // ========================================================================
    // Building defs
    // ========================================================================

    pub fn create_def(&self, name: &str) -> Result<DefId> {
        let mut names = self.inner.names.write();
        if names.contains_key(name) {
            return Err(Error::InvalidArgument(format!("def \"{name}\" already exists")));
        }
        let id = DefId(self.inner.next_def_id.fetch_add(1, Ordering::Relaxed));
        names.insert(name.to_string(), id);
        self.inner
            .defs
            .write()
            .insert(id, DefData::default());
        Ok(id)
    }

    /// Paint `ttype` on every plane it lives on.
    pub fn paint(&self, def: DefId, tech: &Technology, area: &Rect, ttype: TileType) -> Result<()> {
        for plane in tech.planes_of(ttype) {
            self.paint_plane(def, plane, area, ttype)?;
        }
        self.recompute_bbox(def)?;
        Ok(())
    }

    pub fn add_use(&self, def: DefId, name: &str, bbox: Rect) -> Result<UseId> {
        let id = UseId(self.inner.next_use_id.fetch_add(1, Ordering::Relaxed));
        self.with_def_mut(def, |d| {
            d.cells.insert(id, CellUse::new(id, name, bbox));
            d.bbox = d.compute_bbox();
        })?;
        Ok(id)
    }

    pub fn add_label(&self, def: DefId, text: &str, rect: Rect, ttype: TileType) -> Result<LabelId> {
        let id = LabelId(self.inner.next_label_id.fetch_add(1, Ordering::Relaxed));
        self.with_def_mut(def, |d| {
            d.labels.insert(id, Label { id, text: text.to_string(), rect, ttype });
            d.bbox = d.compute_bbox();
        })?;
        Ok(id)
    }

    pub fn set_selection(&self, def: DefId, selection: Selection) -> Result<()> {
        self.with_def_mut(def, |d| d.selection = selection)
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Type of the tile containing `p` on `plane`.
    pub fn type_at(&self, def: DefId, plane: usize, p: Point) -> Result<TileType> {
        self.with_def(def, |d| match d.planes.get(plane) {
            Some(pl) => pl[pl.tile_at(p)].ttype,
            None => TileType::SPACE,
        })
    }

    pub fn cell(&self, def: DefId, id: UseId) -> Result<CellUse> {
        self.with_def(def, |d| d.cells.get(&id).cloned())?
            .ok_or_else(|| Error::NotFound(format!("cell use {id}")))
    }

    pub fn label(&self, def: DefId, id: LabelId) -> Result<Label> {
        self.with_def(def, |d| d.labels.get(&id).cloned())?
            .ok_or_else(|| Error::NotFound(format!("label {}", id.0)))
    }

    /// Maximal non-space tiles of one plane, sorted for stable comparison.
    pub fn tiles(&self, def: DefId, plane: usize) -> Result<Vec<(Rect, TileType)>> {
        self.with_def(def, |d| {
            let mut out: Vec<(Rect, TileType)> = d
                .planes
                .get(plane)
                .map(|pl| {
                    pl.tiles()
                        .filter(|(_, t)| !t.ttype.is_space())
                        .map(|(_, t)| (t.rect, t.ttype))
                        .collect()
                })
                .unwrap_or_default();
            out.sort_by_key(|(r, t)| (r.ybot, r.xbot, r.ytop, r.xtop, *t));
            out
        })
    }

    pub fn redisplay_requests(&self) -> Vec<(DefId, Rect)> {
        self.inner.redisplay.read().clone()
    }

    pub fn drc_requests(&self) -> Vec<(DefId, Rect)> {
        self.inner.drc.read().clone()
    }

    pub fn undo_log(&self) -> Vec<UndoRecord> {
        self.inner.undo.read().clone()
    }

    pub fn set_interrupt(&self, on: bool) {
        self.inner.interrupt.store(on, Ordering::Relaxed);
    }

    /// Fire the interrupt on the `polls`-th call to `interrupted()`.
    pub fn interrupt_after(&self, polls: i64) {
        self.inner.interrupt_countdown.store(polls, Ordering::Relaxed);
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn with_def<T>(&self, def: DefId, f: impl FnOnce(&DefData) -> T) -> Result<T> {
        let defs = self.inner.defs.read();
        let d = defs.get(&def).ok_or_else(|| Error::NotFound(format!("def {def}")))?;
        Ok(f(d))
    }

    fn with_def_mut<T>(&self, def: DefId, f: impl FnOnce(&mut DefData) -> T) -> Result<T> {
        let mut defs = self.inner.defs.write();
        let d = defs.get_mut(&def).ok_or_else(|| Error::NotFound(format!("def {def}")))?;
        Ok(f(d))
    }
}

// ============================================================================
// LayoutDb impl
// ============================================================================

impl LayoutDb for MemoryDb {
    fn def_by_name(&self, name: &str) -> Result<DefId> {
        self.inner
            .names
            .read()
            .get(name)
            .copied()
            .ok_or_else(|| Error::NotFound(format!("def \"{name}\"")))
    }

    fn bbox(&self, def: DefId) -> Result<Option<Rect>> {
        self.with_def(def, |d| d.bbox)
    }

    fn paint_in(&self, def: DefId, plane: usize, area: &Rect) -> Result<Vec<(Rect, TileType)>> {
        self.with_def(def, |d| {
            d.planes
                .get(plane)
                .map(|pl| pl.pieces_in(area).into_iter().map(|p| (p.rect, p.ttype)).collect())
                .unwrap_or_default()
        })
    }

    fn cells_in(&self, def: DefId, area: &Rect) -> Result<Vec<CellUse>> {
        self.with_def(def, |d| {
            let mut uses: Vec<CellUse> = d
                .cells
                .values()
                .filter(|c| c.bbox.overlaps(area))
                .cloned()
                .collect();
            uses.sort_by_key(|c| c.id);
            uses
        })
    }

    fn labels(&self, def: DefId) -> Result<Vec<Label>> {
        self.with_def(def, |d| {
            let mut labels: Vec<Label> = d.labels.values().cloned().collect();
            labels.sort_by_key(|l| l.id);
            labels
        })
    }

    fn selection(&self, def: DefId) -> Result<Selection> {
        self.with_def(def, |d| d.selection.clone())
    }

    fn paint_plane(&self, def: DefId, plane: usize, area: &Rect, ttype: TileType) -> Result<()> {
        self.with_def_mut(def, |d| d.plane_mut(plane).paint(area, ttype))
    }

    fn erase_plane(&self, def: DefId, plane: usize, area: &Rect) -> Result<()> {
        self.with_def_mut(def, |d| {
            if let Some(pl) = d.planes.get_mut(plane) {
                pl.erase(area);
            }
        })
    }

    fn move_use(&self, def: DefId, id: UseId, bbox: Rect) -> Result<()> {
        self.with_def_mut(def, |d| match d.cells.get_mut(&id) {
            Some(c) => {
                c.bbox = bbox;
                Ok(())
            }
            None => Err(Error::NotFound(format!("cell use {id}"))),
        })?
    }

    fn move_label(&self, def: DefId, id: LabelId, rect: Rect) -> Result<()> {
        self.with_def_mut(def, |d| match d.labels.get_mut(&id) {
            Some(l) => {
                l.rect = rect;
                Ok(())
            }
            None => Err(Error::NotFound(format!("label {}", id.0))),
        })?
    }

    fn recompute_bbox(&self, def: DefId) -> Result<Option<Rect>> {
        self.with_def_mut(def, |d| {
            d.bbox = d.compute_bbox();
            d.bbox
        })
    }

    fn request_redisplay(&self, def: DefId, area: &Rect) {
        self.inner.redisplay.write().push((def, *area));
    }

    fn request_drc(&self, def: DefId, area: &Rect) {
        self.inner.drc.write().push((def, *area));
    }

    fn interrupted(&self) -> bool {
        if self.inner.interrupt.load(Ordering::Relaxed) {
            return true;
        }
        let left = self.inner.interrupt_countdown.load(Ordering::Relaxed);
        if left < 0 {
            return false;
        }
        if left <= 1 {
            self.inner.interrupt.store(true, Ordering::Relaxed);
            self.inner.interrupt_countdown.store(-1, Ordering::Relaxed);
            return true;
        }
        self.inner.interrupt_countdown.store(left - 1, Ordering::Relaxed);
        false
    }

    fn log_undo(&self, record: UndoRecord) {
        self.inner.undo.write().push(record);
    }

    fn pop_undo(&self) -> Option<UndoRecord> {
        self.inner.undo.write().pop()
    }
}
