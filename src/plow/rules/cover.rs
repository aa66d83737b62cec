//! Covering and illegal-adjacency rules.
//!
//! Covered material (for instance diffusion under a gate) must stay under
//! whatever covers it: when the covering edge moves, the material above
//! and below its ends is held within rule distance. An illegal adjacency
//! is a pair of types that may not touch; when a moving edge would bring
//! one against the other, the offending material is dragged clear.

use crate::model::{Direction, Point, Rect, TileType, TypeMask};
use crate::plow::edge::Edge;
use crate::plow::engine::Engine;
use crate::plow::search::{shadow, trace_outline, Outline};
use crate::tech::Technology;
use crate::tiles::Plane;

pub(crate) fn cover_top(eng: &mut Engine<'_>, edge: &Edge) {
    let plane = eng.yank.plane(edge.plane);
    let tp = plane.tile_at(Point::new(edge.x - 1, edge.ytop));
    let above = plane[tp].ttype;
    if above == TileType::SPACE {
        return;
    }
    cover(eng, edge, above, |dist| Rect::new(edge.x - 1, edge.ytop, edge.newx, edge.ytop + dist));
}

pub(crate) fn cover_bot(eng: &mut Engine<'_>, edge: &Edge) {
    let plane = eng.yank.plane(edge.plane);
    let tp = plane.tile_at(Point::new(edge.x - 1, edge.ybot - 1));
    let below = plane[tp].ttype;
    if below == TileType::SPACE {
        return;
    }
    cover(eng, edge, below, |dist| Rect::new(edge.x - 1, edge.ybot - dist, edge.newx, edge.ybot));
}

fn cover(eng: &mut Engine<'_>, edge: &Edge, other: TileType, area_for: impl Fn(i32) -> Rect) {
    let tech = eng.tech;
    let rules = tech
        .width_rules(edge.ltype, other)
        .iter()
        .chain(tech.spacing_rules(edge.ltype, other));
    for rule in rules {
        let area = area_for(rule.dist);
        let found = shadow(eng.yank.plane(edge.plane), edge.plane, &area, rule.oktypes);
        for imp in found {
            eng.apply_rule(edge, &imp, 0);
        }
    }
}

// ============================================================================
// Illegal adjacency
// ============================================================================

struct IllegalScan {
    sliv: Option<TileType>,
    mustmove: i32,
    clip: Point,
}

/// How far above or below the edge the offending material must be moved
/// away from what lies to its left.
fn clearance(tech: &Technology, ltype: TileType, left: TileType, bad: TileType) -> i32 {
    tech.spacing_rules(ltype, left)
        .iter()
        .filter(|r| !r.oktypes.has(bad))
        .map(|r| r.dist)
        .fold(1, i32::max)
}

pub(crate) fn illegal_top(eng: &mut Engine<'_>, edge: &Edge) {
    let tech = eng.tech;
    let mut st = IllegalScan { sliv: None, mustmove: edge.x, clip: Point::new(edge.newx, 0) };
    {
        let plane = eng.yank.plane(edge.plane);
        trace_outline(
            plane,
            Point::new(edge.x, edge.ytop),
            TypeMask::only(edge.rtype).complement(),
            Direction::North,
            &[Direction::North, Direction::South, Direction::East, Direction::West],
            |o| {
                if o.dir != Direction::East || o.rect.xbot >= st.clip.x {
                    return true;
                }
                let bad = plane[o.inside].ttype;
                if !tech.is_illegal(edge.ltype, bad) || plane[o.inside].left() < edge.x {
                    return false;
                }
                let left = plane.bl(o.inside).map_or(TileType::SPACE, |t| plane[t].ttype);
                st.sliv = Some(bad);
                st.mustmove = o.rect.xbot;
                st.clip.y = edge.ytop + clearance(tech, edge.ltype, left, bad);
                true
            },
        );
    }
    let Some(sliv) = st.sliv else { return };

    let plane = eng.yank.plane(edge.plane);
    let mut drag = Vec::new();
    trace_outline(
        plane,
        Point::new(st.mustmove, edge.ytop),
        TypeMask::only(sliv).complement(),
        Direction::North,
        &[Direction::West, Direction::North, Direction::South],
        |o| cover_top_segment(plane, edge, st.clip, o, &mut drag),
    );
    eng.propagate_all(drag);
}

pub(crate) fn illegal_bot(eng: &mut Engine<'_>, edge: &Edge) {
    let tech = eng.tech;
    let mut st = IllegalScan { sliv: None, mustmove: edge.x, clip: Point::new(edge.newx, 0) };
    {
        let plane = eng.yank.plane(edge.plane);
        trace_outline(
            plane,
            Point::new(edge.x, edge.ybot),
            TypeMask::only(edge.rtype),
            Direction::South,
            &[Direction::North, Direction::South, Direction::East, Direction::West],
            |o| {
                if o.dir != Direction::East || o.rect.xbot >= st.clip.x {
                    return true;
                }
                let bad = plane[o.outside].ttype;
                if !tech.is_illegal(edge.ltype, bad) || plane[o.outside].left() < edge.x {
                    return false;
                }
                let mut left = plane.bl(o.outside);
                while let Some(t) = left {
                    if plane[t].top() >= o.rect.ybot {
                        break;
                    }
                    left = plane.rt(t);
                }
                let left = left.map_or(TileType::SPACE, |t| plane[t].ttype);
                st.sliv = Some(bad);
                st.mustmove = o.rect.xbot;
                st.clip.y = edge.ybot - clearance(tech, edge.ltype, left, bad);
                true
            },
        );
    }
    let Some(sliv) = st.sliv else { return };

    let plane = eng.yank.plane(edge.plane);
    let mut drag = Vec::new();
    trace_outline(
        plane,
        Point::new(st.mustmove, edge.ybot),
        TypeMask::only(sliv),
        Direction::South,
        &[Direction::West, Direction::North, Direction::South],
        |o| cover_bot_segment(plane, edge, st.clip, o, &mut drag),
    );
    eng.propagate_all(drag);
}

/// Drag a north-going segment of the offending material's outline to the
/// moving edge's new position, up to `clip.y`.
fn cover_top_segment(plane: &Plane, edge: &Edge, clip: Point, o: &Outline, drag: &mut Vec<Edge>) -> bool {
    if o.dir != Direction::North || o.rect.xbot >= clip.x {
        return true;
    }
    let mut r = o.rect;
    let mut stop = false;
    if r.ytop >= clip.y {
        r.ytop = clip.y;
        stop = true;
    }
    if r.ytop > r.ybot && plane.trailing(o.outside) < edge.newx {
        drag.push(Edge::paint(
            edge.plane,
            r.xbot,
            edge.newx,
            r.ybot,
            r.ytop,
            plane[o.inside].ttype,
            plane[o.outside].ttype,
        ));
    }
    stop
}

fn cover_bot_segment(plane: &Plane, edge: &Edge, clip: Point, o: &Outline, drag: &mut Vec<Edge>) -> bool {
    if o.dir != Direction::South || o.rect.xbot >= clip.x {
        return true;
    }
    let mut r = o.rect;
    let mut stop = false;
    if r.ybot <= clip.y {
        r.ybot = clip.y;
        stop = true;
    }
    if r.ytop > r.ybot && plane.trailing(o.inside) < edge.newx {
        drag.push(Edge::paint(
            edge.plane,
            r.xbot,
            edge.newx,
            r.ybot,
            r.ytop,
            plane[o.outside].ttype,
            plane[o.inside].ttype,
        ));
    }
    stop
}
