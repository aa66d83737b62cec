//! Tile types and type masks.

use serde::{Deserialize, Serialize};

/// Largest number of distinct tile types a technology may declare,
/// space and the cell pseudo-type included.
pub const MAX_TYPES: usize = 64;

/// A material type. Index 0 is space on every plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileType(pub u16);

impl TileType {
    pub const SPACE: TileType = TileType(0);
    /// Pseudo-type used for the faces of subcell bounding boxes.
    pub const CELL: TileType = TileType((MAX_TYPES - 1) as u16);

    pub fn is_space(&self) -> bool {
        *self == Self::SPACE
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for TileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bit set over [`TileType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TypeMask(pub u64);

impl TypeMask {
    pub const EMPTY: TypeMask = TypeMask(0);
    pub const ALL: TypeMask = TypeMask(u64::MAX);

    pub fn only(t: TileType) -> Self {
        TypeMask(1u64 << t.0)
    }

    pub fn space() -> Self {
        Self::only(TileType::SPACE)
    }

    /// Every type except space.
    pub fn all_but_space() -> Self {
        Self::ALL.without(TileType::SPACE)
    }

    pub fn has(&self, t: TileType) -> bool {
        (t.0 as usize) < MAX_TYPES && self.0 & (1u64 << t.0) != 0
    }

    pub fn insert(&mut self, t: TileType) {
        self.0 |= 1u64 << t.0;
    }

    pub fn with(self, t: TileType) -> Self {
        TypeMask(self.0 | (1u64 << t.0))
    }

    pub fn without(self, t: TileType) -> Self {
        TypeMask(self.0 & !(1u64 << t.0))
    }

    pub fn union(self, other: TypeMask) -> Self {
        TypeMask(self.0 | other.0)
    }

    pub fn intersect(self, other: TypeMask) -> Self {
        TypeMask(self.0 & other.0)
    }

    pub fn minus(self, other: TypeMask) -> Self {
        TypeMask(self.0 & !other.0)
    }

    pub fn complement(self) -> Self {
        TypeMask(!self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = TileType> + '_ {
        (0..MAX_TYPES as u16)
            .map(TileType)
            .filter(move |t| self.has(*t))
    }
}

impl FromIterator<TileType> for TypeMask {
    fn from_iter<I: IntoIterator<Item = TileType>>(iter: I) -> Self {
        let mut m = TypeMask::EMPTY;
        for t in iter {
            m.insert(t);
        }
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_ops() {
        let a: TypeMask = [TileType(1), TileType(3)].into_iter().collect();
        assert!(a.has(TileType(3)));
        assert!(!a.has(TileType::SPACE));
        assert!(a.complement().has(TileType::SPACE));
        assert!(TypeMask::all_but_space().has(TileType::CELL));
        assert_eq!(a.minus(TypeMask::only(TileType(1))), TypeMask::only(TileType(3)));
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![TileType(1), TileType(3)]);
    }
}
