//! Plow directions and the canonical transform.
//!
//! The engine only ever plows east. Every other direction is handled by
//! rotating the layout so that the requested direction becomes east,
//! plowing, and rotating the result back with the exact inverse.

use serde::{Deserialize, Serialize};

use super::{Point, Rect};
use crate::{Error, Result};

/// One of the four cardinal plow directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Parse a direction name as typed at the command line.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "n" | "north" | "u" | "up" | "top" => Ok(Direction::North),
            "s" | "south" | "d" | "down" | "bottom" => Ok(Direction::South),
            "e" | "east" | "r" | "right" => Ok(Direction::East),
            "w" | "west" | "l" | "left" => Ok(Direction::West),
            other => Err(Error::InvalidArgument(format!(
                "bad direction \"{other}\""
            ))),
        }
    }

    /// Displacement of one unit in this direction.
    pub fn unit(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, 1),
            Direction::South => (0, -1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }

    /// Displacement of `amount` units in this direction.
    pub fn offset(&self, amount: i32) -> (i32, i32) {
        let (dx, dy) = self.unit();
        (dx * amount, dy * amount)
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        };
        f.write_str(s)
    }
}

/// Integer affine transform: `x' = a*x + b*y + c`, `y' = d*x + e*y + f`.
///
/// Only the eight Manhattan orientations (plus translation) are ever built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transform {
    pub a: i32,
    pub b: i32,
    pub c: i32,
    pub d: i32,
    pub e: i32,
    pub f: i32,
}

impl Transform {
    pub const IDENTITY: Transform = Transform { a: 1, b: 0, c: 0, d: 0, e: 1, f: 0 };
    /// Clockwise quarter turn: north becomes east.
    pub const ROT90: Transform = Transform { a: 0, b: 1, c: 0, d: -1, e: 0, f: 0 };
    /// Half turn: west becomes east.
    pub const ROT180: Transform = Transform { a: -1, b: 0, c: 0, d: 0, e: -1, f: 0 };
    /// Counter-clockwise quarter turn: south becomes east.
    pub const ROT270: Transform = Transform { a: 0, b: -1, c: 0, d: 1, e: 0, f: 0 };

    /// Transform taking `dir` to canonical east.
    pub fn canonical(dir: Direction) -> Transform {
        match dir {
            Direction::East => Self::IDENTITY,
            Direction::North => Self::ROT90,
            Direction::South => Self::ROT270,
            Direction::West => Self::ROT180,
        }
    }

    pub fn translation(dx: i32, dy: i32) -> Transform {
        Transform { c: dx, f: dy, ..Self::IDENTITY }
    }

    /// Exact inverse. The linear part is orthonormal, so it is its transpose.
    pub fn inverse(&self) -> Transform {
        let (a, b, d, e) = (self.a, self.d, self.b, self.e);
        Transform {
            a,
            b,
            c: -(a * self.c + b * self.f),
            d,
            e,
            f: -(d * self.c + e * self.f),
        }
    }

    pub fn apply_point(&self, p: Point) -> Point {
        Point::new(
            self.a * p.x + self.b * p.y + self.c,
            self.d * p.x + self.e * p.y + self.f,
        )
    }

    /// Transform both corners and renormalize.
    pub fn apply_rect(&self, r: &Rect) -> Rect {
        let p1 = self.apply_point(r.ll());
        let p2 = self.apply_point(r.ur());
        Rect::new(p1.x.min(p2.x), p1.y.min(p2.y), p1.x.max(p2.x), p1.y.max(p2.y))
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_each_direction_maps_to_east() {
        for dir in [Direction::North, Direction::South, Direction::East, Direction::West] {
            let t = Transform::canonical(dir);
            let (dx, dy) = dir.unit();
            assert_eq!(t.apply_point(Point::new(dx, dy)), Point::new(1, 0), "{dir}");
        }
    }

    #[test]
    fn test_inverse_round_trips_rects() {
        let r = Rect::new(-3, 2, 7, 11);
        for dir in [Direction::North, Direction::South, Direction::East, Direction::West] {
            let t = Transform::canonical(dir);
            assert_eq!(t.inverse().apply_rect(&t.apply_rect(&r)), r);
        }
        let shift = Transform::translation(4, -9);
        assert_eq!(shift.inverse().apply_rect(&shift.apply_rect(&r)), r);
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(Direction::parse("up").ok(), Some(Direction::North));
        assert_eq!(Direction::parse("W").ok(), Some(Direction::West));
        assert!(Direction::parse("sideways").is_err());
    }
}
