//! Umbra and penumbra rules.
//!
//! The umbra of a moving edge is the area it sweeps, widened by a rule's
//! distance. The penumbra is the area above and below the umbra that is
//! still within that distance of the material behind the edge; it is
//! found by following the outline of that material.

use crate::model::{Direction, Point, Rect, TypeMask};
use crate::plow::edge::Edge;
use crate::plow::engine::Engine;
use crate::plow::search::{shadow, trace_outline};
use crate::tech::PlowRule;

/// Anything in the swept area that is not the edge's own right-hand
/// material moves to the edge's new position.
pub(crate) fn clear_umbra(eng: &mut Engine<'_>, edge: &Edge) {
    let found = shadow(
        eng.yank.plane(edge.plane),
        edge.plane,
        &edge.rect(),
        TypeMask::only(edge.rtype),
    );
    for imp in found {
        eng.apply_rule(edge, &imp, 0);
    }
}

pub(crate) fn umbra(eng: &mut Engine<'_>, edge: &Edge, rules: &[PlowRule]) {
    for rule in rules {
        let area = Rect::new(edge.x, edge.ybot, edge.newx + rule.dist, edge.ytop);
        let found = shadow(eng.yank.plane(rule.plane), rule.plane, &area, rule.oktypes);
        for imp in found {
            eng.apply_rule(edge, &imp, rule.dist);
        }
    }
}

/// Edges in a corner area only count when the material to their left is
/// what the rule protects.
fn penumbra_hits(found: &mut Vec<Edge>, edges: Vec<Edge>, rule: &PlowRule) {
    found.extend(edges.into_iter().filter(|imp| rule.oktypes.has(imp.ltype)));
}

pub(crate) fn penumbra_top(eng: &mut Engine<'_>, edge: &Edge, rules: &[PlowRule]) {
    for rule in rules {
        let clip = Point::new(edge.newx + rule.dist, edge.ytop + rule.dist);
        let mut found = Vec::new();
        let plane = eng.yank.plane(edge.plane);
        let rplane = eng.yank.plane(rule.plane);

        trace_outline(
            plane,
            Point::new(edge.x, edge.ytop),
            rule.ltypes,
            Direction::North,
            &[Direction::West, Direction::North, Direction::South],
            |o| {
                if o.dir == Direction::South || o.rect.xbot >= clip.x {
                    return true;
                }
                if o.dir == Direction::West {
                    if o.rect.ytop < clip.y {
                        let area = Rect::new(o.rect.xtop - 1, o.rect.ytop, clip.x, clip.y);
                        penumbra_hits(&mut found, shadow(rplane, rule.plane, &area, rule.oktypes), rule);
                    }
                    return true;
                }
                let mut search = o.rect;
                let mut stop = false;
                if search.ytop >= clip.y {
                    search.ytop = clip.y;
                    stop = true;
                }
                search.xtop = clip.x;
                found.extend(shadow(rplane, rule.plane, &search, rule.oktypes));
                stop
            },
        );

        for imp in found {
            eng.apply_rule(edge, &imp, rule.dist);
        }
    }
}

pub(crate) fn penumbra_bot(eng: &mut Engine<'_>, edge: &Edge, rules: &[PlowRule]) {
    for rule in rules {
        let clip = Point::new(edge.newx + rule.dist, edge.ybot - rule.dist);
        let mut found = Vec::new();
        let plane = eng.yank.plane(edge.plane);
        let rplane = eng.yank.plane(rule.plane);

        trace_outline(
            plane,
            Point::new(edge.x, edge.ybot),
            rule.ltypes.complement(),
            Direction::South,
            &[Direction::West, Direction::North, Direction::South],
            |o| {
                if o.dir == Direction::North || o.rect.xbot >= clip.x {
                    return true;
                }
                if o.dir == Direction::West {
                    if o.rect.ybot > clip.y {
                        let area = Rect::new(o.rect.xtop - 1, clip.y, clip.x, o.rect.ybot);
                        penumbra_hits(&mut found, shadow(rplane, rule.plane, &area, rule.oktypes), rule);
                    }
                    return true;
                }
                let mut search = o.rect;
                let mut stop = false;
                if search.ybot <= clip.y {
                    search.ybot = clip.y;
                    stop = true;
                }
                search.xtop = clip.x;
                found.extend(shadow(rplane, rule.plane, &search, rule.oktypes));
                stop
            },
        );

        for imp in found {
            eng.apply_rule(edge, &imp, rule.dist);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plow::testutil::{db_with, engine, tech, ty};
    use crate::model::TileType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_clear_umbra_pushes_material_in_the_swept_area() {
        let t = tech();
        let (db, def) = db_with(&t, &[(Rect::new(0, 0, 4, 10), "poly"), (Rect::new(8, 0, 12, 10), "poly")]);
        let mut eng = engine(&t, &db, def, Rect::new(-20, -20, 40, 30), 20);
        let poly = ty(&t, "poly");
        let e = Edge::paint(0, 4, 10, 0, 10, poly, TileType::SPACE);
        clear_umbra(&mut eng, &e);
        let moved = eng.queue.pop_leftmost().unwrap();
        assert_eq!((moved.x, moved.newx, moved.ltype), (8, 10, TileType::SPACE));
    }

    #[test]
    fn test_umbra_keeps_spacing_to_next_wire() {
        let t = tech();
        let (db, def) = db_with(&t, &[(Rect::new(0, 0, 4, 10), "poly"), (Rect::new(8, 0, 12, 10), "poly")]);
        let mut eng = engine(&t, &db, def, Rect::new(-20, -20, 40, 30), 20);
        let poly = ty(&t, "poly");
        let e = Edge::paint(0, 4, 7, 0, 10, poly, TileType::SPACE);
        let rules = t.spacing_rules(poly, TileType::SPACE).to_vec();
        umbra(&mut eng, &e, &rules);
        let moved = eng.queue.pop_leftmost().unwrap();
        // separation 4 is kept down to the rule distance 2
        assert_eq!((moved.x, moved.newx), (8, 9));
    }

    #[test]
    fn test_umbra_ignores_material_beyond_reach() {
        let t = tech();
        let (db, def) = db_with(&t, &[(Rect::new(0, 0, 4, 10), "poly"), (Rect::new(20, 0, 24, 10), "poly")]);
        let mut eng = engine(&t, &db, def, Rect::new(-20, -20, 40, 30), 20);
        let poly = ty(&t, "poly");
        let e = Edge::paint(0, 4, 7, 0, 10, poly, TileType::SPACE);
        let rules = t.spacing_rules(poly, TileType::SPACE).to_vec();
        umbra(&mut eng, &e, &rules);
        assert!(eng.queue.is_empty());
    }

    #[test]
    fn test_penumbra_top_reaches_material_above_the_edge() {
        let t = tech();
        // wire above and to the right of the moving bar, within spacing of its corner
        let (db, def) = db_with(&t, &[(Rect::new(0, 0, 4, 10), "poly"), (Rect::new(6, 11, 10, 20), "poly")]);
        let mut eng = engine(&t, &db, def, Rect::new(-20, -20, 40, 40), 20);
        let poly = ty(&t, "poly");
        let e = Edge::paint(0, 4, 8, 0, 10, poly, TileType::SPACE);
        let rules = t.spacing_rules(poly, TileType::SPACE).to_vec();
        penumbra_top(&mut eng, &e, &rules);
        let moved = eng.queue.pop_leftmost().expect("corner wire must move");
        assert_eq!((moved.x, moved.newx), (6, 10));
    }
}
