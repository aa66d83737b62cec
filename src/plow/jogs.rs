//! # Jogs
//!
//! Two jobs share this module.
//!
//! **Jog horizon.** While plowing, an edge that moves is stretched up and
//! down to the nearest place its left-hand material already changes
//! direction, as long as that lies within the horizon. This keeps the plow
//! from introducing a new jog a few units from an existing one.
//!
//! **Straightening.** After a plow, the changed area is swept right to left
//! looking for steps in the right-hand side of material that can be pulled
//! flush without forcing anything else to move. Rules are run in trial
//! mode (see [`Sink::JogTrial`]); only if nothing outside the jog itself
//! would move is the step repainted.

use crate::model::{include, Direction, Point, Rect, TileType, TypeMask};
use crate::plow::edge::Edge;
use crate::plow::engine::{Engine, Sink};
use crate::plow::queue::EdgeQueue;
use crate::plow::search::{atomize, shadow_back, trace_outline};
use crate::plow::width::find_width_back;
use crate::tiles::Plane;
use crate::Result;

// ============================================================================
// Jog horizon
// ============================================================================

/// Stretch `edge` to the closest natural jogs within the horizon above and
/// below it. Where the right-hand type changes before the jog, the part
/// beyond the change is queued as a separate edge.
pub(crate) fn extend_jog_horizon(eng: &mut Engine<'_>, edge: &mut Edge) -> Result<()> {
    if eng.horizon == 0 {
        return Ok(());
    }
    let horizon_top = edge.ytop.saturating_add(eng.horizon);
    let horizon_bot = edge.ybot.saturating_sub(eng.horizon);
    let p = edge.plane;
    let mut new_r = edge.rect();

    // Upwards along the left-hand material
    let (reach_top, rhs_top) = 'top: loop {
        let mut r = Rect::new(edge.x - 1, edge.ytop, edge.x + 1, edge.ytop);
        let mut rhs_changed = None;
        let mut tpl = eng.yank.plane(p).tile_at(Point::new(edge.x - 1, edge.ytop));
        loop {
            let plane = eng.yank.plane(p);
            let t = &plane[tpl];
            if t.right() != edge.x || t.ttype != edge.ltype || t.bottom() >= horizon_top {
                break;
            }
            r.ytop = t.top();
            if eng.yank_more(&r, 1, 1)? {
                continue 'top;
            }
            let plane = eng.yank.plane(p);
            if rhs_changed.is_none() {
                let mut tpr = plane.tr(tpl);
                while let Some(tr) = tpr.filter(|tr| plane[*tr].top() > r.ybot) {
                    if plane[tr].ttype != edge.rtype {
                        rhs_changed = Some(plane[tr].bottom());
                    }
                    tpr = plane.lb(tr);
                }
            }
            match plane.rt(tpl) {
                Some(next) => tpl = next,
                None => break,
            }
            r.ybot = r.ytop;
        }
        break (r.ytop, rhs_changed);
    };
    if reach_top <= horizon_top && reach_top > edge.ytop {
        new_r.ytop = reach_top;
        edge.ytop = rhs_top.map_or(reach_top, |y| y.max(edge.ytop));
    }

    // Downwards along the right-hand side
    let (reach_bot, rhs_bot) = 'bot: loop {
        let mut r = Rect::new(edge.x - 1, edge.ybot, edge.x + 1, edge.ybot);
        let mut rhs_changed = None;
        let mut tpr = eng.yank.plane(p).tile_at(Point::new(edge.x, edge.ybot - 1));
        loop {
            let plane = eng.yank.plane(p);
            let t = &plane[tpr];
            if t.left() != edge.x || t.top() <= horizon_bot {
                break;
            }
            r.ybot = t.bottom();
            if eng.yank_more(&r, 1, 1)? {
                continue 'bot;
            }
            let plane = eng.yank.plane(p);
            let t = &plane[tpr];
            if rhs_changed.is_none() && t.ttype != edge.rtype {
                rhs_changed = Some(t.top());
            }
            let mut tpl = plane.bl(tpr);
            while let Some(l) = tpl.filter(|l| plane[*l].bottom() < r.ytop) {
                if plane[l].ttype != edge.ltype {
                    r.ybot = plane[l].top();
                }
                tpl = plane.rt(l);
            }
            if r.ybot > t.bottom() {
                break;
            }
            match plane.lb(tpr) {
                Some(next) => tpr = next,
                None => break,
            }
            r.ytop = r.ybot;
        }
        break (r.ybot, rhs_changed);
    };
    if reach_bot >= horizon_bot && reach_bot < edge.ybot {
        new_r.ybot = reach_bot;
        edge.ybot = rhs_bot.map_or(reach_bot, |y| y.min(edge.ybot));
    }

    let mut extra = Vec::new();
    if new_r.ytop > edge.ytop {
        let r = Rect::new(new_r.xbot, edge.ytop, new_r.xtop, new_r.ytop);
        extra.extend(atomize(eng.yank.plane(p), p, &r));
    }
    if new_r.ybot < edge.ybot {
        let r = Rect::new(new_r.xbot, new_r.ybot, new_r.xtop, edge.ybot);
        extra.extend(atomize(eng.yank.plane(p), p, &r));
    }
    for e in extra {
        eng.queue.add(&e);
    }
    Ok(())
}

// ============================================================================
// Straightening
// ============================================================================

/// How the outline of a candidate jog ends above or below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JogEnd {
    /// Kept going vertically, or left the area that way.
    Vertical,
    /// Ran east until the area's right side.
    East,
    /// Turned back west.
    West,
    /// Ran east, then continued away from the edge.
    Step,
    /// Ran east, then turned back toward the edge.
    Return,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct End {
    kind: JogEnd,
    at: Point,
}

/// Follow the outline of the material left of `edge` above and below it.
fn jog_ends(plane: &Plane, edge: &Edge, area: &Rect) -> (End, End) {
    let space = TileType::SPACE;
    let inside = TypeMask::only(edge.ltype);

    let mut top = End { kind: JogEnd::Vertical, at: Point::new(edge.x, edge.ytop) };
    trace_outline(
        plane,
        top.at,
        inside,
        Direction::North,
        &[Direction::North, Direction::West, Direction::East],
        |o| {
            if plane[o.outside].ttype != space {
                return true;
            }
            match o.dir {
                Direction::West => {
                    top.kind = JogEnd::West;
                    true
                }
                Direction::North => {
                    top.at = o.rect.ur();
                    top.kind = JogEnd::Vertical;
                    if o.rect.ytop > area.ytop {
                        top.at.y = area.ytop;
                        return true;
                    }
                    false
                }
                Direction::East => {
                    top.at = o.rect.ur();
                    top.kind = JogEnd::East;
                    if o.rect.xtop >= area.xtop {
                        top.at.x = area.xtop;
                        return true;
                    }
                    match o.next {
                        Direction::North => {
                            top.kind = JogEnd::Step;
                            true
                        }
                        Direction::South => {
                            top.kind = JogEnd::Return;
                            true
                        }
                        _ => false,
                    }
                }
                Direction::South => false,
            }
        },
    );

    let mut bot = End { kind: JogEnd::Vertical, at: Point::new(edge.x, edge.ybot) };
    trace_outline(
        plane,
        bot.at,
        inside.complement(),
        Direction::South,
        &[Direction::South, Direction::West, Direction::East],
        |o| {
            if plane[o.inside].ttype != space {
                return true;
            }
            match o.dir {
                Direction::West => {
                    bot.kind = JogEnd::West;
                    true
                }
                Direction::South => {
                    bot.at = o.rect.ll();
                    bot.kind = JogEnd::Vertical;
                    if o.rect.ybot < area.ybot {
                        bot.at.y = area.ybot;
                        return true;
                    }
                    false
                }
                Direction::East => {
                    bot.at = o.rect.ur();
                    bot.kind = JogEnd::East;
                    if o.rect.xtop >= area.xtop {
                        bot.at.x = area.xtop;
                        return true;
                    }
                    // Mirrored: heading south below the edge is "away"
                    match o.next {
                        Direction::South => {
                            bot.kind = JogEnd::Step;
                            true
                        }
                        Direction::North => {
                            bot.kind = JogEnd::Return;
                            true
                        }
                        _ => false,
                    }
                }
                Direction::North => false,
            }
        },
    );
    (top, bot)
}

/// Straighten every jog in `area` (canonical coordinates) of the yank
/// buffer that can be removed without moving anything else. Changed areas
/// accumulate in `eng.changed`.
pub(crate) fn cleanup_jogs(eng: &mut Engine<'_>, area: &Rect) -> Result<()> {
    eng.queue = EdgeQueue::new(eng.nplanes(), area.width());
    let space = TileType::SPACE;
    for p in 0..eng.nplanes() {
        let side = Edge::paint(p, area.xtop, area.xtop, area.ybot, area.ytop, space, space);
        process_jog(eng, &side, area)?;
    }
    while let Some(edge) = eng.queue.pop_rightmost() {
        process_jog(eng, &edge, area)?;
    }
    eng.sink = Sink::Queue;
    Ok(())
}

/// Remove jogs visible looking left from `edge`, then queue the next layer
/// of space-to-material edges further left.
fn process_jog(eng: &mut Engine<'_>, edge: &Edge, area: &Rect) -> Result<()> {
    let p = edge.plane;
    let r = Rect::new(area.xbot, edge.ybot, edge.x, edge.ytop);
    if r.is_null() {
        return Ok(());
    }

    'again: loop {
        let found = shadow_back(eng.yank.plane(p), p, &r, TypeMask::space());
        for e in found {
            if straighten_jog(eng, &e, area)? {
                continue 'again;
            }
        }
        break;
    }

    for mut e in shadow_back(eng.yank.plane(p), p, &r, TypeMask::all_but_space()) {
        e.newx = e.x;
        if e.ltype == TileType::SPACE && e.rtype != TileType::SPACE {
            eng.queue.add(&e);
        }
    }
    Ok(())
}

fn trial_moved(eng: &Engine<'_>) -> bool {
    matches!(eng.sink, Sink::JogTrial { moved: true, .. })
}

/// Try to pull the jog containing `edge` (material on the left, space on
/// the right) flush. Returns true if the yank buffer was repainted.
fn straighten_jog(eng: &mut Engine<'_>, edge: &Edge, area: &Rect) -> Result<bool> {
    let (top, bot) = jog_ends(eng.yank.plane(edge.plane), edge, area);

    if top.kind == JogEnd::Vertical || bot.kind == JogEnd::Vertical {
        return Ok(false);
    }
    if top.kind != JogEnd::Step && bot.kind != JogEnd::Step {
        return Ok(false);
    }
    if top.kind == JogEnd::Return && top.at.x <= bot.at.x {
        return Ok(false);
    }
    if bot.kind == JogEnd::Return && bot.at.x <= top.at.x {
        return Ok(false);
    }

    // C-shaped jogs move as far as the nearer end, Z-shaped ones the farther
    let mut jog = *edge;
    jog.ybot = bot.at.y;
    jog.ytop = top.at.y;
    jog.newx = if top.kind == JogEnd::West || bot.kind == JogEnd::West {
        top.at.x.max(bot.at.x)
    } else {
        top.at.x.min(bot.at.x)
    };
    if jog.newx <= jog.x || !area.surrounds(&jog.rect()) {
        return Ok(false);
    }
    tracing::trace!(jog = %jog, "candidate jog");

    eng.sink = Sink::JogTrial { jog, lhs: None, moved: false };
    eng.apply_search_rules(&jog)?;
    if trial_moved(eng) {
        return Ok(false);
    }

    // The left side of the wire comes along by the same amount
    let ltype = TypeMask::only(edge.ltype);
    let (width, _) = find_width_back(eng.yank.plane(jog.plane), &jog, ltype, area);
    let mut r = Rect::new(jog.x - width - 1, jog.ybot, jog.x, jog.ytop);
    if top.kind != JogEnd::West {
        r.ytop += width;
    }
    if bot.kind != JogEnd::West {
        r.ybot -= width;
    }
    if !area.surrounds(&r) {
        return Ok(false);
    }
    let mut lhs = r;
    lhs.xbot += 1;
    eng.sink = Sink::JogTrial { jog, lhs: Some(lhs), moved: false };

    let mut erase = Vec::new();
    for mut e in shadow_back(eng.yank.plane(jog.plane), jog.plane, &r, ltype) {
        if e.ltype != TileType::SPACE {
            continue;
        }
        e.newx = jog.newx - width;
        if let Sink::JogTrial { moved, .. } = &mut eng.sink {
            *moved = false;
        }
        eng.apply_search_rules(&e)?;
        if trial_moved(eng) {
            return Ok(false);
        }
        erase.push(e.rect());
    }

    let plane = &mut eng.yank.planes[jog.plane];
    plane.paint(&jog.rect(), jog.ltype);
    include(&mut eng.changed, &jog.rect());
    for r in erase {
        plane.erase(&r);
        include(&mut eng.changed, &r);
    }
    tracing::debug!(jog = %jog, width, "jog straightened");
    Ok(true)
}
