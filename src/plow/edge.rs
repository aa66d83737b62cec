//! The unit of plow work: a vertical edge that must move right.

use crate::model::{Rect, TileType, UseId};

/// Edge found by the plow itself rather than by a rule.
pub const E_INITIAL: u8 = 0x01;

/// A vertical segment `x` from `ybot` to `ytop` on one plane that must end
/// up at `newx`. Cell edges carry the use they belong to and sit on no
/// paint plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub plane: usize,
    pub x: i32,
    pub newx: i32,
    pub ybot: i32,
    pub ytop: i32,
    pub ltype: TileType,
    pub rtype: TileType,
    pub cell: Option<UseId>,
    pub flags: u8,
}

impl Edge {
    /// A paint edge with no flags set.
    pub fn paint(plane: usize, x: i32, newx: i32, ybot: i32, ytop: i32, ltype: TileType, rtype: TileType) -> Self {
        Self { plane, x, newx, ybot, ytop, ltype, rtype, cell: None, flags: 0 }
    }

    /// The leading face of a subcell whose bounding box is `bbox`.
    pub fn cell(id: UseId, bbox: &Rect, newx: i32) -> Self {
        Self {
            plane: 0,
            x: bbox.xtop,
            newx,
            ybot: bbox.ybot,
            ytop: bbox.ytop,
            ltype: TileType::CELL,
            rtype: TileType::CELL,
            cell: Some(id),
            flags: 0,
        }
    }

    /// The area swept by the edge: `[x, newx] × [ybot, ytop]`.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.ybot, self.newx, self.ytop)
    }

    pub fn height(&self) -> i32 {
        self.ytop - self.ybot
    }

    /// How far the edge has to move.
    pub fn distance(&self) -> i32 {
        self.newx - self.x
    }

    pub fn is_initial(&self) -> bool {
        self.flags & E_INITIAL != 0
    }

    /// Same left and right material.
    pub fn same_types(&self, other: &Edge) -> bool {
        self.ltype == other.ltype && self.rtype == other.rtype
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.cell {
            Some(id) => write!(f, "cell {id} x={}->{} y=[{}, {}]", self.x, self.newx, self.ybot, self.ytop),
            None => write!(
                f,
                "p{} {}|{} x={}->{} y=[{}, {}]",
                self.plane, self.ltype, self.rtype, self.x, self.newx, self.ybot, self.ytop
            ),
        }
    }
}
