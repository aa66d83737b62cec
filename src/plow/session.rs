//! # Plow Session
//!
//! One plow, selection plow or straighten call. A session borrows the
//! technology, the database, the settings and the boundary for the length
//! of the call and owns everything else: the yank buffer, the queue and
//! the engine are built fresh for every pass.
//!
//! ## Boundary loop
//!
//! With boundary checking on, a pass that tries to push anything past the
//! boundary is thrown away, the plow is shortened by the overshoot and the
//! pass is repeated. The outcome reports whether the request was met as
//! given and, if not, what was actually achieved.

use serde::{Deserialize, Serialize};

use crate::model::{include, Direction, Rect, Transform, TypeMask};
use crate::storage::{DefId, LayoutDb};
use crate::tech::Technology;
use crate::Result;

use super::boundary::canonical_area;
use super::commit::commit;
use super::edge::Edge;
use super::engine::Engine;
use super::jogs::cleanup_jogs;
use super::search::{shadow, shadow_initial};
use super::yank::Yank;
use super::{Boundary, JogHorizon, PlowStats};

// ============================================================================
// Configuration
// ============================================================================

/// Settings that persist between plows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlowConfig {
    pub jog_horizon: JogHorizon,
    /// Straighten jogs in the changed area after every plow.
    pub straighten: bool,
    /// Honor the boundary, if one is set.
    pub check_boundary: bool,
    /// Yank the whole def up front instead of growing the buffer on demand.
    pub yank_all: bool,
}

impl Default for PlowConfig {
    fn default() -> Self {
        Self { jog_horizon: JogHorizon::default(), straighten: false, check_boundary: false, yank_all: false }
    }
}

impl PlowConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Result of one plow or selection plow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlowOutcome {
    /// False when the boundary forced a smaller plow than requested.
    pub completed: bool,
    /// The plow rectangle actually used, in def coordinates. For a
    /// selection plow, the selection's bounding box.
    pub achieved: Option<Rect>,
    /// Distance actually plowed.
    pub distance: i32,
    /// Area of the def that was rewritten, if any.
    pub changed: Option<Rect>,
    /// Counters from the final pass.
    pub stats: PlowStats,
    /// Propagation passes run, one more than the number of reductions.
    pub passes: usize,
    pub interrupted: bool,
}

/// State left behind by one propagation pass.
struct Pass<'a> {
    engine: Engine<'a>,
}

impl Pass<'_> {
    fn too_far(&self) -> i32 {
        self.engine.too_far
    }
}

// ============================================================================
// PlowSession
// ============================================================================

pub struct PlowSession<'a> {
    tech: &'a Technology,
    db: &'a dyn LayoutDb,
    config: &'a PlowConfig,
    boundary: Option<&'a Boundary>,
}

impl<'a> PlowSession<'a> {
    pub fn new(
        tech: &'a Technology,
        db: &'a dyn LayoutDb,
        config: &'a PlowConfig,
        boundary: Option<&'a Boundary>,
    ) -> Self {
        Self { tech, db, config, boundary }
    }

    /// Plow `rect` of `def` in `dir`, seeing only `layers` at first. The
    /// plow's extent in `dir` is the distance.
    pub fn plow(&self, def: DefId, rect: Rect, layers: TypeMask, dir: Direction) -> Result<PlowOutcome> {
        let trans = Transform::canonical(dir);
        tracing::debug!(%def, %rect, %dir, "plow");

        let mut user_rect = rect;
        let mut passes = 0;
        let pass = loop {
            passes += 1;
            let Some(pass) = self.propagate_rect(def, &user_rect, layers, &trans)? else {
                break None;
            };
            let too_far = pass.too_far();
            if too_far == 0 || pass.engine.interrupted {
                break Some(pass);
            }
            let mut r = trans.apply_rect(&user_rect);
            r.xtop = (r.xtop - too_far).max(r.xbot);
            user_rect = trans.inverse().apply_rect(&r);
            tracing::warn!(%user_rect, too_far, "reduced plow size to stay inside boundary");
        };

        let distance = trans.apply_rect(&user_rect).width();
        let mut outcome = PlowOutcome {
            completed: passes == 1,
            achieved: Some(user_rect),
            distance,
            changed: None,
            stats: PlowStats::default(),
            passes,
            interrupted: false,
        };
        if let Some(pass) = pass {
            self.finish(def, dir, pass, &mut outcome)?;
        }
        Ok(outcome)
    }

    /// Plow everything selected in `def` by `distance` in `dir`.
    pub fn plow_selection(&self, def: DefId, distance: i32, dir: Direction) -> Result<PlowOutcome> {
        let trans = Transform::canonical(dir);
        tracing::debug!(%def, distance, %dir, "plow selection");

        let mut distance = distance;
        let mut passes = 0;
        let mut achieved = None;
        let pass = loop {
            if distance <= 0 {
                break None;
            }
            passes += 1;
            let Some((pass, sel_box)) = self.propagate_selection(def, distance, &trans)? else {
                break None;
            };
            achieved = Some(sel_box);
            let too_far = pass.too_far();
            if too_far == 0 || pass.engine.interrupted {
                break Some(pass);
            }
            distance -= too_far;
            tracing::warn!(distance, too_far, "reduced plow distance to stay inside boundary");
        };

        let mut outcome = PlowOutcome {
            completed: passes <= 1,
            achieved,
            distance: distance.max(0),
            changed: None,
            stats: PlowStats::default(),
            passes,
            interrupted: false,
        };
        if let Some(pass) = pass {
            self.finish(def, dir, pass, &mut outcome)?;
        }
        Ok(outcome)
    }

    /// Remove jogs in `area` of `def` that no design rule needs, pulling
    /// them in `dir`. Returns the area rewritten, if any.
    pub fn straighten(&self, def: DefId, area: Rect, dir: Direction) -> Result<Option<Rect>> {
        let trans = Transform::canonical(dir);
        let jog_area = trans.apply_rect(&area);
        if jog_area.is_null() {
            return Ok(None);
        }
        let halo = self.tech.halo();
        let yank = Yank::load(self.db, def, self.tech.plane_count(), trans, jog_area.bloat(halo))?;
        let mut eng = Engine::new(self.tech, self.db, def, yank, jog_area.width(), 0, None);
        cleanup_jogs(&mut eng, &jog_area)?;

        let Some(changed) = eng.changed else {
            tracing::debug!(%def, %area, "no jogs to straighten");
            return Ok(None);
        };
        let yank = &eng.yank;
        let user = yank.inverse.apply_rect(&changed).clamp_to_world();
        for p in 0..yank.planes.len() {
            self.db.erase_plane(def, p, &user)?;
            let plane = yank.plane(p);
            for (_, t) in plane.tiles() {
                if t.ttype.is_space() || !t.rect.overlaps(&changed) {
                    continue;
                }
                let r = yank.inverse.apply_rect(&t.rect.clip(&changed));
                self.db.paint_plane(def, p, &r, t.ttype)?;
            }
        }
        self.db.recompute_bbox(def)?;
        self.db.request_redisplay(def, &user);
        self.db.request_drc(def, &user);
        tracing::debug!(%def, area = %user, "jogs straightened");
        Ok(Some(user))
    }

    // ========================================================================
    // Passes
    // ========================================================================

    fn boundary_area(&self, def: DefId, trans: &Transform) -> Option<Rect> {
        if !self.config.check_boundary {
            return None;
        }
        canonical_area(self.boundary, def, trans)
    }

    fn yank_area(&self, def: DefId, trans: &Transform, wanted: Rect) -> Result<Rect> {
        if !self.config.yank_all {
            return Ok(wanted);
        }
        Ok(match self.db.bbox(def)? {
            Some(b) => trans.apply_rect(&b.bloat(1)),
            None => wanted,
        })
    }

    fn engine(&self, def: DefId, trans: &Transform, area: Rect, distance: i32) -> Result<Engine<'a>> {
        let yank = Yank::load(self.db, def, self.tech.plane_count(), *trans, area)?;
        Ok(Engine::new(
            self.tech,
            self.db,
            def,
            yank,
            distance,
            self.config.jog_horizon.distance(),
            self.boundary_area(def, trans),
        ))
    }

    fn propagate_rect(
        &self,
        def: DefId,
        user_rect: &Rect,
        layers: TypeMask,
        trans: &Transform,
    ) -> Result<Option<Pass<'a>>> {
        let cell_plow = trans.apply_rect(user_rect);
        if cell_plow.xbot >= cell_plow.xtop {
            return Ok(None);
        }
        // Back off by one to catch edges under the plow's back
        let mut plow = cell_plow;
        plow.xbot -= 1;

        let halo = self.tech.halo();
        let area = self.yank_area(def, trans, plow.bloat(halo))?;
        let mut eng = self.engine(def, trans, area, plow.width())?;

        let ok = layers.complement();
        for p in 0..eng.nplanes() {
            for e in shadow_initial(eng.yank.plane(p), p, &plow, ok) {
                eng.add_initial(e, plow.xtop);
            }
        }

        let cells: Vec<_> = eng
            .yank
            .cells
            .iter()
            .filter(|c| c.cell.bbox.overlaps(&cell_plow))
            .map(|c| (c.cell.id, c.cell.bbox))
            .collect();
        for (id, bbox) in cells {
            let xmove = if bbox.xbot < cell_plow.xbot {
                if bbox.xtop >= cell_plow.xtop {
                    continue;
                }
                // Dragged by its front face
                cell_plow.xtop - bbox.xtop
            } else {
                cell_plow.width()
            };
            eng.add_initial(Edge::cell(id, &bbox, bbox.xtop), bbox.xtop + xmove);
        }

        eng.run()?;
        Ok(Some(Pass { engine: eng }))
    }

    fn propagate_selection(
        &self,
        def: DefId,
        distance: i32,
        trans: &Transform,
    ) -> Result<Option<(Pass<'a>, Rect)>> {
        let sel = self.db.selection(def)?;
        let uses = if sel.cells.is_empty() { Vec::new() } else { self.db.cells_in(def, &Rect::world())? };
        let sel_cells: Vec<_> = uses.into_iter().filter(|u| sel.cells.contains(&u.id)).collect();

        let mut sel_box = None;
        for (r, _) in &sel.paint {
            include(&mut sel_box, r);
        }
        for u in &sel_cells {
            include(&mut sel_box, &u.bbox);
        }
        let Some(sel_box) = sel_box else {
            return Ok(None);
        };

        let halo = self.tech.halo();
        let mut wanted = trans.apply_rect(&sel_box);
        wanted.xtop += distance + halo;
        wanted.xbot -= halo;
        wanted.ybot -= halo;
        wanted.ytop += halo;
        let area = self.yank_area(def, trans, wanted)?;
        let mut eng = self.engine(def, trans, area, distance)?;

        for (r, t) in &sel.paint {
            let Some(p) = self.tech.planes_of(*t).next() else {
                tracing::warn!(ttype = %self.tech.type_name(*t), "selected type has no plane");
                continue;
            };
            let r = trans.apply_rect(r);

            let lhs = Rect::new(r.xbot - 1, r.ybot, r.xbot + distance, r.ytop);
            for e in shadow(eng.yank.plane(p), p, &lhs, TypeMask::EMPTY) {
                eng.add_initial(e, lhs.xtop);
            }
            let rhs = Rect::new(r.xtop - 1, r.ybot, r.xtop + distance, r.ytop);
            for e in shadow(eng.yank.plane(p), p, &rhs, TypeMask::only(*t)) {
                eng.add_initial(e, rhs.xtop);
            }
        }
        for u in &sel_cells {
            let Some(bbox) = eng.yank.cell(u.id).map(|c| c.cell.bbox) else { continue };
            eng.queue.add(&Edge::cell(u.id, &bbox, bbox.xtop + distance));
        }

        eng.run()?;
        Ok(Some((Pass { engine: eng }, sel_box)))
    }

    // ========================================================================
    // Commit
    // ========================================================================

    fn finish(&self, def: DefId, dir: Direction, pass: Pass<'a>, outcome: &mut PlowOutcome) -> Result<()> {
        let eng = pass.engine;
        outcome.stats = eng.stats;
        outcome.interrupted = eng.interrupted;
        if eng.interrupted {
            tracing::info!(%def, "plow interrupted, def left unchanged");
            return Ok(());
        }
        let Some(changed) = eng.changed else {
            return Ok(());
        };
        let wb = commit(self.db, self.tech, def, &eng.yank, &changed)?;
        outcome.changed = Some(wb.area);
        tracing::debug!(
            queued = eng.stats.queued,
            processed = eng.stats.processed,
            moved = eng.stats.moved,
            "plow finished"
        );

        if self.config.straighten && !self.db.interrupted() {
            if let Some(more) = self.straighten(def, wb.area, dir)? {
                outcome.changed = Some(wb.area.union(&more));
            }
        }
        Ok(())
    }
}
