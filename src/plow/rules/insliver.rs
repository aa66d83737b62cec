//! Slivers created inside the plow.
//!
//! A short initial edge can leave a thin strip of the material above or
//! below it when it moves. Anything within rule distance of that strip,
//! on the far side of the edge, is dragged along.

use crate::model::{Rect, TileType, TypeMask};
use crate::plow::edge::Edge;
use crate::plow::engine::Engine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Look {
    /// The strip lies above the edge; look down from its top.
    Down,
    /// The strip lies below; look up from its bottom.
    Up,
}

pub(crate) fn in_sliver(eng: &mut Engine<'_>, edge: &Edge) {
    if !edge.is_initial() || edge.height() >= eng.tech.halo() {
        return;
    }
    let above = Rect::new(edge.x - 1, edge.ytop, edge.newx, edge.ytop + 1);
    side(eng, edge, &above, Look::Down);
    let below = Rect::new(edge.x - 1, edge.ybot - 1, edge.newx, edge.ybot);
    side(eng, edge, &below, Look::Up);
}

/// Walk the one-unit strip `border` left to right and scan under the
/// material types found along it.
fn side(eng: &mut Engine<'_>, edge: &Edge, border: &Rect, look: Look) {
    let plane = eng.yank.plane(edge.plane);
    let mut tiles: Vec<(i32, TileType, i32)> = plane
        .tiles_in(border, TypeMask::ALL)
        .into_iter()
        .map(|t| (plane[t].left(), plane[t].ttype, plane.leading(t)))
        .collect();
    tiles.sort_by_key(|t| t.0);

    let mut area = match look {
        Look::Down => Rect::new(0, 0, 0, edge.ybot),
        Look::Up => Rect::new(0, edge.ytop, 0, 0),
    };
    let mut t0: Option<TileType> = None;

    for (_, ttype, leading) in tiles {
        match t0 {
            None => {
                t0 = Some(ttype);
                area.xbot = edge.x;
                area.xtop = edge.newx.min(leading);
                if leading >= edge.newx {
                    scan(eng, edge, &mut area, ttype, look);
                    return;
                }
            }
            Some(t) if t == ttype => {
                area.xtop = area.xtop.max(edge.newx.min(leading));
                if leading >= edge.newx {
                    scan(eng, edge, &mut area, t, look);
                    return;
                }
            }
            Some(t) => {
                let covered = eng.tech.covered;
                let blocked = (edge.ltype != TileType::SPACE && edge.rtype != TileType::SPACE)
                    || covered.has(t)
                    || covered.has(ttype)
                    || t != edge.ltype
                    || ttype != edge.rtype;
                scan(eng, edge, &mut area, t, look);
                if !blocked {
                    area.xbot = area.xtop;
                    area.xtop = edge.newx;
                    scan(eng, edge, &mut area, ttype, look);
                }
                return;
            }
        }
    }
}

/// Drag everything within rule distance of a `ttype` strip over
/// `area.xbot..area.xtop`.
fn scan(eng: &mut Engine<'_>, edge: &Edge, area: &mut Rect, ttype: TileType, look: Look) {
    let tech = eng.tech;
    let height = edge.height();
    let rules = tech
        .spacing_rules(ttype, edge.ltype)
        .iter()
        .chain(tech.width_rules(ttype, edge.ltype));

    for rule in rules {
        if rule.dist <= height {
            continue;
        }
        match look {
            Look::Down => area.ybot = edge.ytop - rule.dist,
            Look::Up => area.ytop = edge.ybot + rule.dist,
        }

        let plane = eng.yank.plane(rule.plane);
        let mut atoms = Vec::new();
        for t in plane.tiles_in(area, rule.oktypes.complement()) {
            let tile = &plane[t];
            // already behind the strip; nothing to drag
            if tile.left() < area.xbot {
                continue;
            }
            atoms.push(Rect::new(
                tile.left(),
                tile.bottom().max(area.ybot),
                edge.newx,
                tile.top().min(area.ytop),
            ));
        }
        for atom in atoms {
            eng.atomize_propagate(rule.plane, &atom);
        }
    }
}
