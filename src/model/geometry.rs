//! Integer points and rectangles in layout units.

use serde::{Deserialize, Serialize};

/// Coordinates at or beyond this magnitude are treated as the edge of the world.
pub const INFINITY: i32 = 1 << 28;
pub const MINFINITY: i32 = -INFINITY;

/// A point in layout coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned rectangle, half-open on the top and right.
///
/// A rectangle with `xbot >= xtop` or `ybot >= ytop` covers no area;
/// [`Rect::is_null`] is the test used by the changed-area accumulators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub xbot: i32,
    pub ybot: i32,
    pub xtop: i32,
    pub ytop: i32,
}

impl Rect {
    pub const fn new(xbot: i32, ybot: i32, xtop: i32, ytop: i32) -> Self {
        Self { xbot, ybot, xtop, ytop }
    }

    /// The whole tile plane.
    pub const fn world() -> Self {
        Self::new(MINFINITY, MINFINITY, INFINITY, INFINITY)
    }

    pub fn width(&self) -> i32 {
        self.xtop - self.xbot
    }

    pub fn height(&self) -> i32 {
        self.ytop - self.ybot
    }

    pub fn ll(&self) -> Point {
        Point::new(self.xbot, self.ybot)
    }

    pub fn ur(&self) -> Point {
        Point::new(self.xtop, self.ytop)
    }

    /// True when the rectangle has no area.
    pub fn is_null(&self) -> bool {
        self.xbot >= self.xtop || self.ybot >= self.ytop
    }

    /// Shared interior area (not merely a shared side).
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.xbot < other.xtop
            && other.xbot < self.xtop
            && self.ybot < other.ytop
            && other.ybot < self.ytop
    }

    /// Overlap or shared boundary.
    pub fn touches(&self, other: &Rect) -> bool {
        self.xbot <= other.xtop
            && other.xbot <= self.xtop
            && self.ybot <= other.ytop
            && other.ybot <= self.ytop
    }

    /// `other` lies inside `self`, boundaries allowed to coincide.
    pub fn surrounds(&self, other: &Rect) -> bool {
        self.xbot <= other.xbot
            && self.xtop >= other.xtop
            && self.ybot <= other.ybot
            && self.ytop >= other.ytop
    }

    /// `other` lies strictly inside `self` with no shared side.
    pub fn surrounds_strong(&self, other: &Rect) -> bool {
        self.xbot < other.xbot
            && self.xtop > other.xtop
            && self.ybot < other.ybot
            && self.ytop > other.ytop
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.xbot && p.x < self.xtop && p.y >= self.ybot && p.y < self.ytop
    }

    /// Intersection. The result may be null.
    pub fn clip(&self, other: &Rect) -> Rect {
        Rect::new(
            self.xbot.max(other.xbot),
            self.ybot.max(other.ybot),
            self.xtop.min(other.xtop),
            self.ytop.min(other.ytop),
        )
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::new(
            self.xbot.min(other.xbot),
            self.ybot.min(other.ybot),
            self.xtop.max(other.xtop),
            self.ytop.max(other.ytop),
        )
    }

    pub fn bloat(&self, amount: i32) -> Rect {
        Rect::new(
            self.xbot - amount,
            self.ybot - amount,
            self.xtop + amount,
            self.ytop + amount,
        )
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.xbot + dx, self.ybot + dy, self.xtop + dx, self.ytop + dy)
    }

    /// Clamp every coordinate into the tile plane.
    pub fn clamp_to_world(&self) -> Rect {
        self.clip(&Rect::world())
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}; {}, {}]", self.xbot, self.ybot, self.xtop, self.ytop)
    }
}

/// Grow an optional accumulator to include `r`.
///
/// `None` stands for "nothing changed yet".
pub fn include(acc: &mut Option<Rect>, r: &Rect) {
    *acc = Some(match acc {
        Some(a) => a.union(r),
        None => *r,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_overlap_vs_touch() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(10, 0, 20, 10);
        assert!(!a.overlaps(&b));
        assert!(a.touches(&b));
        assert!(a.overlaps(&Rect::new(9, 9, 11, 11)));
    }

    #[test]
    fn test_surrounds_strong_needs_margin() {
        let outer = Rect::new(0, 0, 10, 10);
        assert!(outer.surrounds(&Rect::new(0, 0, 10, 10)));
        assert!(!outer.surrounds_strong(&Rect::new(0, 0, 10, 10)));
        assert!(outer.surrounds_strong(&Rect::new(1, 1, 9, 9)));
    }

    #[test]
    fn test_include_accumulates() {
        let mut acc = None;
        include(&mut acc, &Rect::new(0, 0, 1, 1));
        include(&mut acc, &Rect::new(5, -2, 6, 0));
        assert_eq!(acc, Some(Rect::new(0, -2, 6, 1)));
    }

    proptest! {
        #[test]
        fn prop_clip_is_inside_both(
            ax in -50i32..50, ay in -50i32..50, aw in 1i32..40, ah in 1i32..40,
            bx in -50i32..50, by in -50i32..50, bw in 1i32..40, bh in 1i32..40,
        ) {
            let a = Rect::new(ax, ay, ax + aw, ay + ah);
            let b = Rect::new(bx, by, bx + bw, by + bh);
            let c = a.clip(&b);
            prop_assert_eq!(c.is_null(), !a.overlaps(&b));
            if !c.is_null() {
                prop_assert!(a.surrounds(&c) && b.surrounds(&c));
            }
            let u = a.union(&b);
            prop_assert!(u.surrounds(&a) && u.surrounds(&b));
        }
    }
}
