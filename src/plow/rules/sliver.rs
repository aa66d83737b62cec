//! Sliver prevention.
//!
//! When an edge moves, material next to its top or bottom end can be left
//! as a thin strip between the moved edge and something further away. If
//! that strip would violate a width or spacing rule, the material beyond
//! it is dragged along so the strip disappears.
//!
//! Each side takes two outline walks. The first finds how far the strip
//! would reach (`mustmove`); the second drags every edge of the outline
//! that trails short of that point.

use crate::model::{Direction, Point, TileType};
use crate::plow::edge::Edge;
use crate::plow::engine::Engine;
use crate::plow::search::{trace_outline, Outline};
use crate::tech::{PlowRule, Technology};
use crate::tiles::Plane;

struct SliverScan {
    /// Type of the strip that would be left behind, once one is found.
    sliv: Option<TileType>,
    lastx: i32,
    mustmove: i32,
    clip: Point,
}

/// True if a strip of `sliv` next to `near`, with `far` at `far_dist`
/// beyond it, would break a rule.
fn violates(tech: &Technology, near: TileType, sliv: TileType, far: TileType, far_dist: i32) -> bool {
    tech.width_rules(near, sliv)
        .iter()
        .chain(tech.spacing_rules(near, sliv))
        .any(|r| r.dist > far_dist && !r.oktypes.has(far))
}

fn extent_top(tech: &Technology, plane: &Plane, edge: &Edge, st: &mut SliverScan, o: &Outline) -> bool {
    let ret;
    let xmove;
    match o.dir {
        Direction::North => {
            let newx = plane.trailing(o.outside);
            if newx < st.lastx {
                return true;
            }
            ret = newx >= st.clip.x || o.rect.ytop >= st.clip.y;
            if o.rect.ybot == edge.ytop {
                st.sliv = Some(plane[o.outside].ttype);
            }
            let jogged = o.prev == Direction::West || (o.prev == Direction::North && newx > st.lastx);
            st.lastx = newx;
            if !jogged {
                return ret;
            }
            xmove = newx.min(st.clip.x);
        }
        Direction::East => {
            ret = o.rect.xtop >= st.clip.x;
            if st.sliv.is_none() {
                return ret;
            }
            let mut x = st.clip.x;
            if o.next == Direction::North {
                x = x.min(plane.trailing(o.next_out));
            }
            xmove = x;
        }
        _ => return true,
    }

    let Some(sliv) = st.sliv else { return ret };
    if violates(tech, edge.ltype, sliv, plane[o.inside].ttype, o.rect.ybot - edge.ytop) {
        st.mustmove = xmove;
    }
    ret
}

fn extent_bot(tech: &Technology, plane: &Plane, edge: &Edge, st: &mut SliverScan, o: &Outline) -> bool {
    let ret;
    let xmove;
    match o.dir {
        Direction::South => {
            let newx = plane.trailing(o.inside);
            if newx < st.lastx {
                return true;
            }
            ret = newx >= st.clip.x || o.rect.ybot <= st.clip.y;
            if o.rect.ytop == edge.ybot {
                st.sliv = Some(plane[o.inside].ttype);
            }
            let jogged = o.prev == Direction::West || (o.prev == Direction::South && newx > st.lastx);
            st.lastx = newx;
            if !jogged {
                return ret;
            }
            xmove = newx.min(st.clip.x);
        }
        Direction::East => {
            ret = o.rect.xtop >= st.clip.x;
            if st.sliv.is_none() {
                return ret;
            }
            let mut x = st.clip.x;
            if o.next == Direction::South {
                x = x.min(plane.trailing(o.next_in));
            }
            xmove = x;
        }
        _ => return true,
    }

    let Some(sliv) = st.sliv else { return ret };
    if violates(tech, edge.ltype, sliv, plane[o.outside].ttype, edge.ybot - o.rect.ytop) {
        st.mustmove = xmove;
    }
    ret
}

pub(crate) fn sliver_top(eng: &mut Engine<'_>, edge: &Edge, rules: &[PlowRule]) {
    let tech = eng.tech;
    let reach = tech.max_dist(edge.ltype);
    if reach == 0 {
        return;
    }
    let start = Point::new(edge.x, edge.ytop);

    for rule in rules {
        let plane = eng.yank.plane(edge.plane);
        let mut st = SliverScan {
            sliv: None,
            lastx: edge.x,
            mustmove: edge.x,
            clip: Point::new(edge.newx, edge.ytop + reach),
        };
        trace_outline(
            plane,
            start,
            rule.ltypes,
            Direction::North,
            &[Direction::North, Direction::East, Direction::South],
            |o| extent_top(tech, plane, edge, &mut st, o),
        );
        if st.mustmove <= edge.x {
            continue;
        }

        let mut drag = Vec::new();
        trace_outline(
            plane,
            start,
            rule.ltypes,
            Direction::North,
            &[Direction::South, Direction::North],
            |o| {
                if o.dir == Direction::South || plane.trailing(o.outside) >= st.mustmove {
                    return true;
                }
                let rtype = plane[o.outside].ttype;
                let mut newx = st.mustmove;
                if tech.fixed.has(rtype) {
                    newx = newx.min(o.rect.xbot + edge.distance());
                }
                drag.push(Edge::paint(
                    edge.plane,
                    o.rect.xbot,
                    newx,
                    o.rect.ybot,
                    o.rect.ytop,
                    plane[o.inside].ttype,
                    rtype,
                ));
                false
            },
        );
        eng.propagate_all(drag);
    }
}

pub(crate) fn sliver_bot(eng: &mut Engine<'_>, edge: &Edge, rules: &[PlowRule]) {
    let tech = eng.tech;
    let reach = tech.max_dist(edge.ltype);
    if reach == 0 {
        return;
    }
    let start = Point::new(edge.x, edge.ybot);

    for rule in rules {
        let plane = eng.yank.plane(edge.plane);
        let inside = rule.ltypes.complement();
        let mut st = SliverScan {
            sliv: None,
            lastx: edge.x,
            mustmove: edge.x,
            clip: Point::new(edge.newx, edge.ybot - reach),
        };
        trace_outline(
            plane,
            start,
            inside,
            Direction::South,
            &[Direction::North, Direction::East, Direction::South],
            |o| extent_bot(tech, plane, edge, &mut st, o),
        );
        if st.mustmove <= edge.x {
            continue;
        }

        let mut drag = Vec::new();
        trace_outline(
            plane,
            start,
            inside,
            Direction::South,
            &[Direction::South, Direction::North],
            |o| {
                if o.dir == Direction::North || plane.trailing(o.inside) >= st.mustmove {
                    return true;
                }
                let rtype = plane[o.inside].ttype;
                let mut newx = st.mustmove;
                if tech.fixed.has(rtype) {
                    newx = newx.min(o.rect.xbot + edge.distance());
                }
                drag.push(Edge::paint(
                    edge.plane,
                    o.rect.xbot,
                    newx,
                    o.rect.ybot,
                    o.rect.ytop,
                    plane[o.outside].ttype,
                    rtype,
                ));
                false
            },
        );
        eng.propagate_all(drag);
    }
}
