//! End-to-end tests for the command surface and parameter undo.
//!
//! Commands run through `Plower::execute()` against an `EditContext`, the
//! way an editor front end would drive them.

use plow_rs::{
    DefId, EditContext, Error, JogHorizon, LayoutDb, MemoryDb, ParamChange, Plower, Point, Rect, Selection,
    Technology, TileType,
};
use pretty_assertions::assert_eq;

const TECH: &str = r#"{
    "planes": ["active", "metal"],
    "types": [
        {"name": "poly", "plane": "active"},
        {"name": "metal", "plane": "metal"}
    ],
    "width": [
        {"layers": ["poly"], "distance": 2},
        {"layers": ["metal"], "distance": 3}
    ],
    "spacing": [
        {"layers1": ["poly"], "layers2": ["poly"], "distance": 2, "adjacency": "touching_ok"},
        {"layers1": ["metal"], "layers2": ["metal"], "distance": 3, "adjacency": "touching_ok"}
    ]
}"#;

fn setup(paint: &[(Rect, &str)]) -> (Plower<MemoryDb>, DefId) {
    let tech = Technology::from_json(TECH).unwrap();
    let plower = Plower::open_memory(tech);
    let def = plower.db().create_def("top").unwrap();
    for (r, name) in paint {
        let t = plower.tech().type_named(name).unwrap();
        plower.db().paint(def, plower.tech(), r, t).unwrap();
    }
    plower.db().recompute_bbox(def).unwrap();
    (plower, def)
}

fn poly(p: &Plower<MemoryDb>) -> TileType {
    p.tech().type_named("poly").unwrap()
}

// ============================================================================
// 1. Settings
// ============================================================================

#[test]
fn test_horizon_commands() {
    let (mut p, def) = setup(&[]);
    let mut ctx = EditContext::new(def);

    assert_eq!(p.execute(&mut ctx, "plow horizon").unwrap(), "Jog horizon set to 5 units.");
    assert_eq!(p.execute(&mut ctx, "plow horizon 12").unwrap(), "Jog horizon set to 12 units.");
    assert_eq!(p.config().jog_horizon, JogHorizon::Units(12));
    assert_eq!(p.execute(&mut ctx, "plow nojogs").unwrap(), "Jog insertion disabled.");
    assert_eq!(p.config().jog_horizon, JogHorizon::Infinite);
    assert_eq!(p.execute(&mut ctx, "plow horizon").unwrap(), "Jog horizon set to infinity.");
    assert_eq!(p.execute(&mut ctx, "plow jogs").unwrap(), "Jog insertion re-enabled (horizon 0).");
    assert_eq!(p.config().jog_horizon, JogHorizon::Units(0));
}

#[test]
fn test_straighten_toggles() {
    let (mut p, def) = setup(&[]);
    let mut ctx = EditContext::new(def);
    assert_eq!(p.execute(&mut ctx, "plow straighten").unwrap(), "Jogs will be straightened after each plow.");
    assert!(p.config().straighten);
    assert_eq!(p.execute(&mut ctx, "plow nostr").unwrap(), "Jogs will not be straightened automatically.");
    assert!(!p.config().straighten);
}

#[test]
fn test_help_lists_options() {
    let (mut p, def) = setup(&[]);
    let help = p.execute(&mut EditContext::new(def), "plow help").unwrap();
    for name in ["boundary", "horizon", "selection", "nostraighten"] {
        assert!(help.contains(name), "help is missing {name}");
    }
}

// ============================================================================
// 2. Plowing through commands
// ============================================================================

#[test]
fn test_plow_command_uses_box() {
    let (mut p, def) = setup(&[(Rect::new(0, 0, 10, 10), "poly")]);
    let mut ctx = EditContext::new(def).with_box(Rect::new(10, 0, 15, 10));
    assert_eq!(p.execute(&mut ctx, "plow east").unwrap(), "");
    assert_eq!(ctx.edit_box, Some(Rect::new(10, 0, 15, 10)));
    assert_eq!(p.db().tiles(def, 0).unwrap(), vec![(Rect::new(0, 0, 15, 10), poly(&p))]);
}

#[test]
fn test_plow_command_with_layers_misses_other_layers() {
    let (mut p, def) = setup(&[(Rect::new(0, 0, 10, 10), "poly")]);
    let mut ctx = EditContext::new(def).with_box(Rect::new(10, 0, 15, 10));
    // The plow only sees metal, so the poly edge is left behind
    p.execute(&mut ctx, "plow e metal").unwrap();
    assert_eq!(p.db().tiles(def, 0).unwrap(), vec![(Rect::new(0, 0, 10, 10), poly(&p))]);
}

#[test]
fn test_boundary_command_reduces_box() {
    let (mut p, def) = setup(&[(Rect::new(0, 0, 10, 10), "poly")]);
    let mut ctx = EditContext::new(def).with_box(Rect::new(-10, -10, 13, 20));
    let msg = p.execute(&mut ctx, "plow boundary").unwrap();
    assert!(msg.starts_with("Plowing restricted"));
    assert_eq!(p.boundary().map(|b| b.area), Some(Rect::new(-10, -10, 13, 20)));

    ctx.edit_box = Some(Rect::new(10, 0, 20, 10));
    assert_eq!(
        p.execute(&mut ctx, "plow east").unwrap(),
        "Reduced plow size to stay within the boundary."
    );
    assert_eq!(ctx.edit_box, Some(Rect::new(10, 0, 13, 10)));
    assert_eq!(p.db().tiles(def, 0).unwrap(), vec![(Rect::new(0, 0, 13, 10), poly(&p))]);

    p.execute(&mut ctx, "plow noboundary").unwrap();
    assert!(p.boundary().is_none());
    assert!(!p.config().check_boundary);
}

#[test]
fn test_selection_command_moves_box() {
    let (mut p, def) = setup(&[(Rect::new(0, 0, 4, 10), "poly")]);
    let sel = Selection { paint: vec![(Rect::new(0, 0, 4, 10), poly(&p))], cells: vec![] };
    p.db().set_selection(def, sel).unwrap();

    let mut ctx = EditContext::new(def).with_box(Rect::new(0, 0, 4, 10));
    assert_eq!(p.execute(&mut ctx, "plow selection east 3").unwrap(), "");
    assert_eq!(ctx.edit_box, Some(Rect::new(3, 0, 7, 10)));
    assert_eq!(p.db().tiles(def, 0).unwrap(), vec![(Rect::new(3, 0, 7, 10), poly(&p))]);
}

#[test]
fn test_selection_command_uses_point_displacement() {
    let (mut p, def) = setup(&[(Rect::new(0, 0, 4, 10), "poly")]);
    let sel = Selection { paint: vec![(Rect::new(0, 0, 4, 10), poly(&p))], cells: vec![] };
    p.db().set_selection(def, sel).unwrap();

    // Point is 3 right and 1 up of the box's lower-left: horizontal wins
    let mut ctx = EditContext::new(def).with_box(Rect::new(0, 0, 4, 10)).with_point(Point::new(3, 1));
    p.execute(&mut ctx, "plow selection").unwrap();
    assert_eq!(ctx.edit_box, Some(Rect::new(3, 0, 7, 10)));
    assert_eq!(p.db().tiles(def, 0).unwrap(), vec![(Rect::new(3, 0, 7, 10), poly(&p))]);
}

#[test]
fn test_straighten_command_on_plain_layout() {
    let (mut p, def) = setup(&[(Rect::new(0, 0, 10, 10), "poly")]);
    let mut ctx = EditContext::new(def).with_box(Rect::new(-5, -5, 20, 20));
    assert_eq!(p.execute(&mut ctx, "straighten east").unwrap(), "");
    assert_eq!(p.db().tiles(def, 0).unwrap(), vec![(Rect::new(0, 0, 10, 10), poly(&p))]);
}

// ============================================================================
// 3. Errors
// ============================================================================

#[test]
fn test_command_errors() {
    let (mut p, def) = setup(&[]);
    let mut ctx = EditContext::new(def);

    assert!(matches!(p.execute(&mut ctx, "plow sideways"), Err(Error::SyntaxError { .. })));
    assert!(matches!(p.execute(&mut ctx, "plow no"), Err(Error::SyntaxError { .. })));
    assert!(matches!(p.execute(&mut ctx, "plow east"), Err(Error::InvalidArgument(_))));
    assert!(matches!(p.execute(&mut ctx, "plow selection"), Err(Error::InvalidArgument(_))));

    ctx.edit_box = Some(Rect::new(0, 0, 5, 5));
    assert!(matches!(p.execute(&mut ctx, "plow east nosuchlayer"), Err(Error::NotFound(_))));
}

// ============================================================================
// 4. Undo
// ============================================================================

#[test]
fn test_undo_reverts_parameters_in_order() {
    let (mut p, def) = setup(&[]);
    p.set_jog_horizon(JogHorizon::Infinite).unwrap();
    p.set_straighten(true);
    p.set_boundary(def, Rect::new(0, 0, 100, 100)).unwrap();
    assert_eq!(p.db().undo_log().len(), 3);

    let undone = p.undo_last().unwrap();
    assert!(matches!(undone.change, ParamChange::Boundary { old: None, .. }));
    assert!(p.boundary().is_none());
    assert!(!p.config().check_boundary);

    p.undo_last().unwrap();
    assert!(!p.config().straighten);

    p.undo_last().unwrap();
    assert_eq!(p.config().jog_horizon, JogHorizon::Units(5));

    assert!(p.undo_last().is_none());
}

#[test]
fn test_negative_horizon_is_rejected_and_not_logged() {
    let (mut p, _) = setup(&[]);
    assert!(matches!(p.set_jog_horizon(JogHorizon::Units(-1)), Err(Error::InvalidArgument(_))));
    assert!(p.db().undo_log().is_empty());
}
