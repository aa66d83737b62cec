//! # Propagation Engine
//!
//! Drains the edge queue leftmost-first. Each paint edge that really has
//! to move is checked against every applicable rule in the table, which
//! may queue more edges, and is then moved in the yank buffer. Subcell
//! edges drag the paint and cells in front of them.
//!
//! The engine has two sinks for the edges rules produce. A normal plow
//! queues them. Jog straightening instead runs the rules in a trial mode
//! that only records whether anything outside the jog would have moved.

use smallvec::SmallVec;

use super::boundary::past_boundary;
use super::edge::Edge;
use super::queue::EdgeQueue;
use super::rules::{RuleEntry, RuleKind, RuleProc, rule_table};
use super::search::atomize;
use super::width::find_width;
use super::yank::Yank;
use super::PlowStats;
use crate::model::{include, Point, Rect, TileType};
use crate::storage::{DefId, LayoutDb};
use crate::tech::{PlowRule, Technology};
use crate::Result;

/// Where propagated edges go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sink {
    Queue,
    /// Straightening: an edge counts as a move unless it lies on the jog
    /// itself or on the face of the material behind it.
    JogTrial { jog: Edge, lhs: Option<Rect>, moved: bool },
}

pub(crate) struct Engine<'a> {
    pub tech: &'a Technology,
    pub db: &'a dyn LayoutDb,
    pub def: DefId,
    pub yank: Yank,
    pub queue: EdgeQueue,
    pub sink: Sink,
    /// Jog horizon in layout units, zero when disabled.
    pub horizon: i32,
    /// Legal area in canonical coordinates.
    pub boundary: Option<Rect>,
    /// How far the worst edge tried to move past the boundary.
    pub too_far: i32,
    pub stats: PlowStats,
    /// Canonical area touched by moved edges.
    pub changed: Option<Rect>,
    pub interrupted: bool,
    table: Vec<RuleEntry>,
}

impl<'a> Engine<'a> {
    pub fn new(
        tech: &'a Technology,
        db: &'a dyn LayoutDb,
        def: DefId,
        yank: Yank,
        distance: i32,
        horizon: i32,
        boundary: Option<Rect>,
    ) -> Self {
        Self {
            tech,
            db,
            def,
            yank,
            queue: EdgeQueue::new(tech.plane_count(), distance),
            sink: Sink::Queue,
            horizon,
            boundary,
            too_far: 0,
            stats: PlowStats::default(),
            changed: None,
            interrupted: false,
            table: rule_table(tech),
        }
    }

    pub fn nplanes(&self) -> usize {
        self.tech.plane_count()
    }

    /// Queue an edge found by the plow itself.
    pub fn add_initial(&mut self, mut edge: Edge, newx: i32) {
        edge.newx = newx;
        edge.flags |= super::E_INITIAL;
        self.queue.add(&edge);
    }

    // ========================================================================
    // Propagation
    // ========================================================================

    /// Hand an edge produced by a rule to the current sink.
    pub fn propagate(&mut self, edge: &Edge) {
        if edge.ybot >= edge.ytop {
            return;
        }
        match &mut self.sink {
            Sink::Queue => self.queue.add(edge),
            Sink::JogTrial { jog, lhs, moved } => {
                if *moved {
                    return;
                }
                let on_jog = edge.cell.is_none()
                    && edge.plane == jog.plane
                    && ((edge.x == jog.x && jog.ybot <= edge.ybot && edge.ytop <= jog.ytop)
                        || lhs.is_some_and(|r| {
                            edge.x == r.xbot
                                && r.ybot <= edge.ybot
                                && edge.ytop <= r.ytop
                                && edge.ltype == TileType::SPACE
                                && edge.rtype == jog.ltype
                        }));
                if !on_jog {
                    *moved = true;
                }
            }
        }
    }

    pub fn propagate_all(&mut self, edges: impl IntoIterator<Item = Edge>) {
        for e in edges {
            self.propagate(&e);
        }
    }

    /// Propagate every edge along the left side of `rect` on plane `pnum`
    /// that does not yet trail to `rect.xtop`.
    pub fn atomize_propagate(&mut self, pnum: usize, rect: &Rect) {
        if rect.xbot >= rect.xtop || rect.ybot >= rect.ytop {
            return;
        }
        let edges = atomize(self.yank.plane(pnum), pnum, rect);
        self.propagate_all(edges);
    }

    /// Push `imp` far enough from `mov` to keep at most `dist` of the
    /// original separation between them.
    pub fn apply_rule(&mut self, mov: &Edge, imp: &Edge, dist: i32) {
        let newsep = dist.min(imp.x - mov.x);
        let newx = mov.newx + newsep;
        if newx > imp.newx {
            let mut e = *imp;
            e.newx = newx;
            self.propagate(&e);
        }
    }

    pub fn yank_more(&mut self, area: &Rect, halo: i32, back: i32) -> Result<bool> {
        self.yank.more(self.db, area, halo, back)
    }

    // ========================================================================
    // Main loop
    // ========================================================================

    /// Process queued edges until the queue is empty or the user interrupts.
    pub fn run(&mut self) -> Result<()> {
        while let Some(edge) = self.queue.pop_leftmost() {
            if edge.x == edge.newx {
                continue;
            }
            if let Some(area) = self.boundary {
                if past_boundary(&area, &edge, &mut self.too_far) {
                    continue;
                }
            }
            if self.db.interrupted() {
                tracing::info!(def = %self.def, pending = self.queue.len(), "plow interrupted");
                self.interrupted = true;
                break;
            }
            self.process_edge(edge)?;
        }
        self.stats.queued = self.queue.added;
        self.stats.clamped = self.queue.clamped;
        Ok(())
    }

    fn process_edge(&mut self, mut edge: Edge) -> Result<()> {
        self.stats.processed += 1;
        tracing::trace!(edge = %edge, "process");

        if let Some(id) = edge.cell {
            return self.process_cell(edge, id);
        }

        if !self.needs_move(&edge) {
            return Ok(());
        }
        self.stats.moved += 1;
        if self.horizon > 0 {
            super::jogs::extend_jog_horizon(self, &mut edge)?;
        }
        include(&mut self.changed, &edge.rect());
        self.apply_search_rules(&edge)?;
        super::mover::move_edge(&mut self.yank.planes[edge.plane], &edge)
    }

    /// True if some tile along the right side of `edge` trails short of
    /// `edge.newx`.
    fn needs_move(&self, edge: &Edge) -> bool {
        let plane = self.yank.plane(edge.plane);
        let mut tp = plane.tile_at(Point::new(edge.x, edge.ytop - 1));
        loop {
            if plane[tp].top() <= edge.ybot {
                return false;
            }
            if plane.trailing(tp) < edge.newx {
                return true;
            }
            match plane.lb(tp) {
                Some(next) => tp = next,
                None => return false,
            }
        }
    }

    fn process_cell(&mut self, edge: Edge, id: crate::model::UseId) -> Result<()> {
        let amount = edge.distance();
        let Some(moved) = self.yank.cell(id).map(|c| c.moved) else {
            tracing::debug!(cell = %id, "cell edge for use outside the yank");
            return Ok(());
        };
        if amount <= moved {
            return Ok(());
        }

        include(&mut self.changed, &edge.rect());
        let mut reach = edge.rect();
        if let Some(c) = self.yank.cell(id) {
            reach = reach.union(&c.cell.bbox);
        }
        let halo = self.tech.halo();
        self.yank_more(&reach, halo, 1)?;

        let Some(c) = self.yank.cell_mut(id) else { return Ok(()) };
        c.moved = amount;
        let bbox = c.cell.bbox;
        include(&mut self.changed, &bbox.translate(amount, 0));
        self.stats.moved += 1;
        super::rules::cells::pr_cell(self, &edge, &bbox)
    }

    // ========================================================================
    // Rules
    // ========================================================================

    /// Run every rule in the table that applies to the types of `edge`.
    pub fn apply_search_rules(&mut self, edge: &Edge) -> Result<()> {
        let tech = self.tech;
        let mut halo = tech.halo();
        let real = self.build_width_rules(edge, &mut halo)?;
        self.yank_more(&edge.rect(), halo, 1)?;

        for i in 0..self.table.len() {
            let entry = self.table[i];
            if !entry.ltypes.has(edge.ltype) || !entry.rtypes.has(edge.rtype) {
                continue;
            }
            let rules: &[PlowRule] = match entry.kind {
                RuleKind::Null => &[],
                RuleKind::RealWidth => real.as_slice(),
                RuleKind::MinWidth => tech.width_rules(edge.ltype, edge.rtype),
                RuleKind::Spacing => tech.spacing_rules(edge.ltype, edge.rtype),
                RuleKind::NoSpacing => {
                    if !tech.spacing_rules(edge.ltype, edge.rtype).is_empty() {
                        continue;
                    }
                    &[]
                }
            };
            tracing::trace!(rule = entry.name, edge = %edge, "apply");
            self.dispatch(entry.proc_, edge, rules)?;
        }
        Ok(())
    }

    fn dispatch(&mut self, proc_: RuleProc, edge: &Edge, rules: &[PlowRule]) -> Result<()> {
        use super::rules::{cells, cover, fixed, insliver, sliver, umbra};
        match proc_ {
            RuleProc::ClearUmbra => umbra::clear_umbra(self, edge),
            RuleProc::Umbra => umbra::umbra(self, edge, rules),
            RuleProc::PenumbraTop => umbra::penumbra_top(self, edge, rules),
            RuleProc::PenumbraBot => umbra::penumbra_bot(self, edge, rules),
            RuleProc::FixedPenumbraTop => fixed::fixed_penumbra_top(self, edge),
            RuleProc::FixedPenumbraBot => fixed::fixed_penumbra_bot(self, edge),
            RuleProc::SliverTop => sliver::sliver_top(self, edge, rules),
            RuleProc::SliverBot => sliver::sliver_bot(self, edge, rules),
            RuleProc::InSliver => insliver::in_sliver(self, edge),
            RuleProc::IllegalTop => cover::illegal_top(self, edge),
            RuleProc::IllegalBot => cover::illegal_bot(self, edge),
            RuleProc::CoverTop => cover::cover_top(self, edge),
            RuleProc::CoverBot => cover::cover_bot(self, edge),
            RuleProc::FixedLhs => return fixed::fixed_lhs(self, edge),
            RuleProc::FixedRhs => return fixed::fixed_rhs(self, edge),
            RuleProc::DragStubs => return fixed::drag_stubs(self, edge),
            RuleProc::ContactLhs => fixed::contact(self, edge, edge.ltype),
            RuleProc::ContactRhs => fixed::contact(self, edge, edge.rtype),
            RuleProc::FindCells => cells::find_cells(self, edge),
        }
        Ok(())
    }

    /// Width rules for `edge` with each distance raised to the real width
    /// of the material to its right. Widens `halo` to cover the widest
    /// material seen.
    fn build_width_rules(&mut self, edge: &Edge, halo: &mut i32) -> Result<SmallVec<[PlowRule; 8]>> {
        let tech = self.tech;
        'retry: loop {
            let mut real = SmallVec::new();
            for rule in tech.width_rules(edge.ltype, edge.rtype) {
                let (width, measured) =
                    find_width(self.yank.plane(edge.plane), edge, rule.oktypes, &self.yank.cell_bbox);
                if self.yank_more(&measured, 1, 1)? {
                    continue 'retry;
                }
                let mut r = *rule;
                r.dist = width.max(rule.dist);
                *halo = (*halo).max(width);
                real.push(r);
            }
            return Ok(real);
        }
    }
}
