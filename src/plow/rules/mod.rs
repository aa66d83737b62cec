//! # Rule Table
//!
//! Every moving paint edge is offered to the entries below, in order. An
//! entry applies when the edge's left type is in `ltypes` and its right
//! type in `rtypes`; its `kind` picks the design rules it is handed.
//!
//! | Kind | Rules passed |
//! |------|--------------|
//! | `Null` | none |
//! | `RealWidth` | width rules, distances raised to the actual material width |
//! | `MinWidth` | width rules as written |
//! | `Spacing` | spacing rules for the edge's type pair |
//! | `NoSpacing` | none, and only when the pair has no spacing rules |
//!
//! Subcell edges bypass the table and go straight to [`cells::pr_cell`].

pub(crate) mod cells;
pub(crate) mod cover;
pub(crate) mod fixed;
pub(crate) mod insliver;
pub(crate) mod sliver;
pub(crate) mod umbra;

use crate::model::{TileType, TypeMask};
use crate::tech::Technology;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RuleKind {
    Null,
    RealWidth,
    MinWidth,
    Spacing,
    NoSpacing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RuleProc {
    ClearUmbra,
    Umbra,
    PenumbraTop,
    PenumbraBot,
    FixedPenumbraTop,
    FixedPenumbraBot,
    SliverTop,
    SliverBot,
    InSliver,
    IllegalTop,
    IllegalBot,
    CoverTop,
    CoverBot,
    FixedLhs,
    FixedRhs,
    DragStubs,
    ContactLhs,
    ContactRhs,
    FindCells,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RuleEntry {
    pub name: &'static str,
    pub kind: RuleKind,
    pub proc_: RuleProc,
    pub ltypes: TypeMask,
    pub rtypes: TypeMask,
}

/// Build the ordered rule table for `tech`.
pub(crate) fn rule_table(tech: &Technology) -> Vec<RuleEntry> {
    use RuleKind::*;
    use RuleProc::*;

    let all = TypeMask::ALL;
    let not_fixed = tech.fixed.complement();
    let undraggable = tech.drag.complement().without(TileType::SPACE);

    let entry = |name, kind, proc_, ltypes, rtypes| RuleEntry { name, kind, proc_, ltypes, rtypes };
    vec![
        entry("clear umbra", Null, ClearUmbra, all, TypeMask::all_but_space()),
        entry("umbra width", RealWidth, Umbra, tech.width_l, tech.width_r),
        entry("umbra spacing", Spacing, Umbra, tech.space_l, tech.space_r),
        entry("penumbra top width", RealWidth, PenumbraTop, tech.width_l, tech.width_r),
        entry("penumbra top spacing", Spacing, PenumbraTop, tech.space_l, tech.space_r),
        entry("penumbra bottom width", RealWidth, PenumbraBot, tech.width_l, tech.width_r),
        entry("penumbra bottom spacing", Spacing, PenumbraBot, tech.space_l, tech.space_r),
        entry("fixed penumbra top", NoSpacing, FixedPenumbraTop, all, tech.fixed),
        entry("fixed penumbra bottom", NoSpacing, FixedPenumbraBot, all, tech.fixed),
        entry("sliver top width", MinWidth, SliverTop, tech.width_l, tech.width_r),
        entry("sliver top spacing", Spacing, SliverTop, tech.space_l, tech.space_r),
        entry("sliver bottom width", MinWidth, SliverBot, tech.width_l, tech.width_r),
        entry("sliver bottom spacing", Spacing, SliverBot, tech.space_l, tech.space_r),
        entry("in sliver", Null, InSliver, not_fixed, not_fixed),
        entry("illegal top", Null, IllegalTop, all, all),
        entry("illegal bottom", Null, IllegalBot, all, all),
        entry("cover top", Null, CoverTop, tech.covered, all),
        entry("cover bottom", Null, CoverBot, tech.covered, all),
        entry("fixed lhs", Null, FixedLhs, tech.fixed, all),
        entry("fixed rhs", Null, FixedRhs, all, tech.fixed),
        entry("drag stubs", Null, DragStubs, undraggable, tech.drag),
        entry("contact lhs", Null, ContactLhs, tech.contacts, all),
        entry("contact rhs", Null, ContactRhs, all, tech.contacts),
        entry("find cells", Null, FindCells, all, all),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use crate::plow::testutil::tech;

    #[test]
    fn test_table_order_starts_with_umbra_and_ends_with_cells() {
        let table = rule_table(&tech());
        assert_eq!(table.len(), 24);
        assert_eq!(table[0].proc_, RuleProc::ClearUmbra);
        assert_eq!(table[23].proc_, RuleProc::FindCells);
    }

    #[test]
    fn test_clear_umbra_skips_space_on_right() {
        let table = rule_table(&tech());
        assert!(!table[0].rtypes.has(TileType::SPACE));
        assert!(table[0].ltypes.has(TileType::SPACE));
    }

    #[test]
    fn test_drag_stubs_never_matches_space_on_left() {
        let t = tech();
        let table = rule_table(&t);
        let stubs = table.iter().find(|e| e.proc_ == RuleProc::DragStubs).unwrap();
        assert!(!stubs.ltypes.has(TileType::SPACE));
        assert_eq!(stubs.rtypes, t.drag);
    }
}
