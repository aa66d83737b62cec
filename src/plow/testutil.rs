//! Fixtures shared by the plow unit tests.

use super::engine::Engine;
use super::yank::Yank;
use crate::model::{Rect, TileType, Transform};
use crate::storage::{DefId, LayoutDb, MemoryDb};
use crate::tech::Technology;

pub(crate) const TECH_JSON: &str = r#"{
    "planes": ["active", "metal"],
    "types": [
        {"name": "poly", "plane": "active"},
        {"name": "diff", "plane": "active"},
        {"name": "metal", "plane": "metal"},
        {"name": "pcontact", "plane": "active", "contact": ["metal"]}
    ],
    "width": [
        {"layers": ["poly"], "distance": 2},
        {"layers": ["metal", "pcontact"], "distance": 3}
    ],
    "spacing": [
        {"layers1": ["poly"], "layers2": ["poly"], "distance": 2, "adjacency": "touching_ok"},
        {"layers1": ["poly"], "layers2": ["diff"], "distance": 1, "adjacency": "touching_illegal"},
        {"layers1": ["metal"], "layers2": ["metal"], "distance": 3, "adjacency": "touching_ok"}
    ],
    "covered": ["diff"]
}"#;

pub(crate) fn tech() -> Technology {
    Technology::from_json(TECH_JSON).unwrap()
}

pub(crate) fn ty(tech: &Technology, name: &str) -> TileType {
    tech.type_named(name).unwrap()
}

/// A def holding `paint`, with its bounding box up to date.
pub(crate) fn db_with(tech: &Technology, paint: &[(Rect, &str)]) -> (MemoryDb, DefId) {
    let db = MemoryDb::new();
    let def = db.create_def("top").unwrap();
    for (r, name) in paint {
        db.paint(def, tech, r, ty(tech, name)).unwrap();
    }
    db.recompute_bbox(def).unwrap();
    (db, def)
}

/// An east-plowing engine over `area` of `def`, no boundary, no jog horizon.
pub(crate) fn engine<'a>(
    tech: &'a Technology,
    db: &'a MemoryDb,
    def: DefId,
    area: Rect,
    distance: i32,
) -> Engine<'a> {
    let yank = Yank::load(db, def, tech.plane_count(), Transform::IDENTITY, area).unwrap();
    Engine::new(tech, db, def, yank, distance, 0, None)
}
