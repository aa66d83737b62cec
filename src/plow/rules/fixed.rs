//! Rules for material that keeps its width.
//!
//! Fixed-width types (contacts, transistors and whatever the technology
//! lists) move as a block: when one of their edges moves, the opposite
//! edge moves by the same amount. Contacts also drag their images on the
//! other planes they connect, and stubs of draggable material hanging off
//! a moving edge come along with it.

use smallvec::SmallVec;

use crate::model::{Point, Rect, TileType, INFINITY};
use crate::plow::edge::Edge;
use crate::plow::engine::Engine;
use crate::plow::search::{atomize, shadow};
use crate::tiles::TileId;
use crate::Result;

// ============================================================================
// Penumbra of fixed material
// ============================================================================

pub(crate) fn fixed_penumbra_top(eng: &mut Engine<'_>, edge: &Edge) {
    let tp = eng.yank.plane(edge.plane).tile_at(Point::new(edge.x - 1, edge.ytop));
    let above = eng.yank.plane(edge.plane)[tp].ttype;
    fixed_penumbra(eng, edge, above, |dist| Rect::new(edge.x - 1, edge.ytop, edge.newx, edge.ytop + dist));
}

pub(crate) fn fixed_penumbra_bot(eng: &mut Engine<'_>, edge: &Edge) {
    let tp = eng.yank.plane(edge.plane).tile_at(Point::new(edge.x - 1, edge.ybot - 1));
    let below = eng.yank.plane(edge.plane)[tp].ttype;
    fixed_penumbra(eng, edge, below, |dist| Rect::new(edge.x - 1, edge.ybot - dist, edge.newx, edge.ybot));
}

fn fixed_penumbra(eng: &mut Engine<'_>, edge: &Edge, corner: TileType, area_for: impl Fn(i32) -> Rect) {
    let tech = eng.tech;
    for rule in tech.spacing_rules(edge.ltype, corner) {
        let area = area_for(rule.dist);
        let found = shadow(eng.yank.plane(rule.plane), rule.plane, &area, rule.oktypes);
        for imp in found {
            eng.apply_rule(edge, &imp, 0);
        }
    }
}

// ============================================================================
// Fixed left and right sides
// ============================================================================

/// The material to the left of the edge is fixed: its left side moves too.
pub(crate) fn fixed_lhs(eng: &mut Engine<'_>, edge: &Edge) -> Result<()> {
    for atom in left_faces(eng, edge)? {
        eng.atomize_propagate(edge.plane, &atom);
    }
    Ok(())
}

/// Stubs of draggable material to the left of the edge follow it, as long
/// as they are no wider than the rules would allow as a gap.
pub(crate) fn drag_stubs(eng: &mut Engine<'_>, edge: &Edge) -> Result<()> {
    let halo = eng.tech.halo();
    for atom in left_faces(eng, edge)? {
        let found = atomize(eng.yank.plane(edge.plane), edge.plane, &atom);
        for lhs in found {
            drag_edge(eng, &lhs, edge, halo);
        }
    }
    Ok(())
}

/// The left sides of the tiles behind `edge` that trail short of where
/// they would be if they moved with it, each as the area its edges sweep.
fn left_faces(eng: &mut Engine<'_>, edge: &Edge) -> Result<SmallVec<[Rect; 4]>> {
    let distance = edge.distance();
    'restart: loop {
        let mut faces = SmallVec::new();
        let mut tpl = eng.yank.plane(edge.plane).tile_at(Point::new(edge.x - 1, edge.ybot));
        loop {
            let t = &eng.yank.plane(edge.plane)[tpl];
            if t.bottom() >= edge.ytop {
                break;
            }
            let atom = Rect::new(t.left(), t.bottom(), t.left() + distance, t.top());
            if eng.yank_more(&atom, 1, 1)? {
                continue 'restart;
            }
            let plane = eng.yank.plane(edge.plane);
            if plane.trailing(tpl) < atom.xtop {
                faces.push(atom);
            }
            match plane.rt(tpl) {
                Some(next) => tpl = next,
                None => break,
            }
        }
        return Ok(faces);
    }
}

fn drag_edge(eng: &mut Engine<'_>, lhs: &Edge, moving: &Edge, halo: i32) {
    if lhs.ltype != TileType::SPACE || lhs.x + halo < moving.x {
        return;
    }
    let tech = eng.tech;
    let width = tech
        .width_rules(lhs.ltype, lhs.rtype)
        .iter()
        .chain(
            tech.spacing_rules(moving.rtype, moving.ltype)
                .iter()
                .filter(|r| !r.oktypes.has(TileType::SPACE)),
        )
        .map(|r| r.dist)
        .fold(INFINITY, i32::min);
    if width == INFINITY {
        return;
    }
    if moving.x - lhs.x <= width {
        eng.propagate(lhs);
    }
}

/// The material to the right of the edge is fixed: its right side moves,
/// and so do the left sides of fixed tiles stacked on top of and under it.
pub(crate) fn fixed_rhs(eng: &mut Engine<'_>, edge: &Edge) -> Result<()> {
    let distance = edge.distance();
    'restart: loop {
        let mut atoms: SmallVec<[Rect; 8]> = SmallVec::new();
        let plane = eng.yank.plane(edge.plane);
        let face = |tp: TileId| {
            let t = &plane[tp];
            Rect::new(t.left(), t.bottom(), t.left() + distance, t.top())
        };

        let mut tpr = plane.tile_at(Point::new(edge.x, edge.ytop - 1));
        while plane[tpr].top() > edge.ybot {
            let t = &plane[tpr];
            let atom = Rect::new(t.right(), t.bottom(), t.right() + distance, t.top());
            if plane.leading(tpr) < atom.xtop {
                atoms.push(atom);
            }

            let mut above = plane.rt(tpr);
            while let Some(tp) = above.filter(|tp| plane[*tp].right() > t.left()) {
                if eng.tech.fixed.has(plane[tp].ttype) && plane.trailing(tp) < face(tp).xtop {
                    atoms.push(face(tp));
                }
                above = plane.bl(tp);
            }
            let mut below = plane.lb(tpr);
            while let Some(tp) = below.filter(|tp| plane[*tp].left() < t.right()) {
                if eng.tech.fixed.has(plane[tp].ttype) && plane.trailing(tp) < face(tp).xtop {
                    atoms.push(face(tp));
                }
                below = plane.tr(tp);
            }

            match plane.lb(tpr) {
                Some(next) => tpr = next,
                None => break,
            }
        }

        for atom in &atoms {
            if eng.yank_more(atom, 1, 1)? {
                continue 'restart;
            }
        }
        for atom in atoms {
            eng.atomize_propagate(edge.plane, &atom);
        }
        return Ok(());
    }
}

// ============================================================================
// Contacts
// ============================================================================

/// Move the images of `contact` on every other plane it connects.
pub(crate) fn contact(eng: &mut Engine<'_>, edge: &Edge, contact: TileType) {
    let planes: SmallVec<[usize; 4]> = eng.tech.planes_of(contact).filter(|p| *p != edge.plane).collect();
    let rect = edge.rect();
    for p in planes {
        eng.atomize_propagate(p, &rect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plow::testutil::{db_with, engine, tech, ty};
    use crate::tech::Technology;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_contact_moves_image_on_other_plane() {
        let t = tech();
        let (db, def) = db_with(&t, &[(Rect::new(0, 0, 4, 4), "pcontact")]);
        let mut eng = engine(&t, &db, def, Rect::new(-20, -20, 40, 30), 20);
        let pc = ty(&t, "pcontact");
        let e = Edge::paint(0, 4, 6, 0, 4, pc, TileType::SPACE);
        contact(&mut eng, &e, pc);
        let moved = eng.queue.pop_leftmost().unwrap();
        assert_eq!((moved.plane, moved.x, moved.newx, moved.ltype), (1, 4, 6, pc));
        assert!(eng.queue.is_empty());
    }

    #[test]
    fn test_fixed_lhs_drags_left_side_of_contact() {
        let t = tech();
        let (db, def) = db_with(&t, &[(Rect::new(0, 0, 4, 4), "pcontact")]);
        let mut eng = engine(&t, &db, def, Rect::new(-20, -20, 40, 30), 20);
        let pc = ty(&t, "pcontact");
        let e = Edge::paint(0, 4, 6, 0, 4, pc, TileType::SPACE);
        fixed_lhs(&mut eng, &e).unwrap();
        let moved = eng.queue.pop_leftmost().unwrap();
        assert_eq!((moved.x, moved.newx, moved.ltype, moved.rtype), (0, 2, TileType::SPACE, pc));
    }

    #[test]
    fn test_fixed_rhs_drags_right_side_of_contact() {
        let t = tech();
        let (db, def) = db_with(&t, &[(Rect::new(4, 0, 8, 4), "pcontact")]);
        let mut eng = engine(&t, &db, def, Rect::new(-20, -20, 40, 30), 20);
        let pc = ty(&t, "pcontact");
        let e = Edge::paint(0, 4, 7, 0, 4, TileType::SPACE, pc);
        fixed_rhs(&mut eng, &e).unwrap();
        let moved = eng.queue.pop_leftmost().unwrap();
        assert_eq!((moved.x, moved.newx, moved.ltype, moved.rtype), (8, 11, pc, TileType::SPACE));
    }

    const FIXED_TECH: &str = r#"{
        "planes": ["active"],
        "types": [
            {"name": "a", "plane": "active"},
            {"name": "b", "plane": "active"},
            {"name": "f", "plane": "active"}
        ],
        "spacing": [{"layers1": ["a"], "layers2": ["b", "f"], "distance": 2, "adjacency": "touching_ok"}],
        "fixed": ["f"]
    }"#;

    const DRAG_TECH: &str = r#"{
        "planes": ["active"],
        "types": [
            {"name": "poly", "plane": "active"},
            {"name": "gate", "plane": "active"}
        ],
        "width": [{"layers": ["poly"], "distance": 2}],
        "drag": ["gate"]
    }"#;

    #[test]
    fn test_fixed_penumbra_top_pushes_material_above_corner() {
        let t = Technology::from_json(FIXED_TECH).unwrap();
        let (db, def) = db_with(
            &t,
            &[(Rect::new(0, 0, 10, 4), "a"), (Rect::new(10, 0, 14, 4), "f"), (Rect::new(11, 5, 20, 8), "b")],
        );
        let mut eng = engine(&t, &db, def, Rect::new(-20, -20, 40, 30), 20);
        let (a, b, f) = (ty(&t, "a"), ty(&t, "b"), ty(&t, "f"));
        fixed_penumbra_top(&mut eng, &Edge::paint(0, 10, 13, 0, 4, a, f));
        let moved = eng.queue.pop_leftmost().unwrap();
        assert_eq!(
            (moved.x, moved.newx, moved.ybot, moved.ytop, moved.ltype, moved.rtype),
            (11, 13, 5, 6, TileType::SPACE, b)
        );
        assert!(eng.queue.is_empty());
    }

    #[test]
    fn test_fixed_penumbra_bot_pushes_material_below_corner() {
        let t = Technology::from_json(FIXED_TECH).unwrap();
        let (db, def) = db_with(
            &t,
            &[(Rect::new(0, 4, 10, 8), "a"), (Rect::new(10, 4, 14, 8), "f"), (Rect::new(11, 0, 20, 3), "b")],
        );
        let mut eng = engine(&t, &db, def, Rect::new(-20, -20, 40, 30), 20);
        let (a, b, f) = (ty(&t, "a"), ty(&t, "b"), ty(&t, "f"));
        fixed_penumbra_bot(&mut eng, &Edge::paint(0, 10, 13, 4, 8, a, f));
        let moved = eng.queue.pop_leftmost().unwrap();
        assert_eq!(
            (moved.x, moved.newx, moved.ybot, moved.ytop, moved.ltype, moved.rtype),
            (11, 13, 2, 3, TileType::SPACE, b)
        );
        assert!(eng.queue.is_empty());
    }

    #[test]
    fn test_drag_stubs_pulls_narrow_stub() {
        let t = Technology::from_json(DRAG_TECH).unwrap();
        let (db, def) = db_with(&t, &[(Rect::new(8, 0, 10, 4), "poly"), (Rect::new(10, 0, 20, 4), "gate")]);
        let mut eng = engine(&t, &db, def, Rect::new(-20, -20, 40, 30), 20);
        let (poly, gate) = (ty(&t, "poly"), ty(&t, "gate"));
        drag_stubs(&mut eng, &Edge::paint(0, 10, 13, 0, 4, poly, gate)).unwrap();
        let moved = eng.queue.pop_leftmost().unwrap();
        assert_eq!(
            (moved.x, moved.newx, moved.ybot, moved.ytop, moved.ltype, moved.rtype),
            (8, 11, 0, 4, TileType::SPACE, poly)
        );
        assert!(eng.queue.is_empty());
    }

    #[test]
    fn test_drag_stubs_leaves_wide_stub() {
        let t = Technology::from_json(DRAG_TECH).unwrap();
        let (db, def) = db_with(&t, &[(Rect::new(4, 0, 10, 4), "poly"), (Rect::new(10, 0, 20, 4), "gate")]);
        let mut eng = engine(&t, &db, def, Rect::new(-20, -20, 40, 30), 20);
        let (poly, gate) = (ty(&t, "poly"), ty(&t, "gate"));
        drag_stubs(&mut eng, &Edge::paint(0, 10, 13, 0, 4, poly, gate)).unwrap();
        assert!(eng.queue.is_empty());
    }
}
