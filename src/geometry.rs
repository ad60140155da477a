//! Coordinate helpers and the unit translations a piece may slide along.
//!
//! A 2D board slides pieces along 4 directions, a 3D board along 6. The
//! enumeration order of [`DIRECTIONS`] is part of the engine's determinism:
//! move lists, and therefore state ids, depend on it.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pieces::Coord;

/// An axis-aligned unit translation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "+x")]
    PosX,
    #[serde(rename = "-x")]
    NegX,
    #[serde(rename = "+y")]
    PosY,
    #[serde(rename = "-y")]
    NegY,
    #[serde(rename = "+z")]
    PosZ,
    #[serde(rename = "-z")]
    NegZ,
}

/// All six directions in enumeration order.
///
/// The first four are the planar directions, so a 2D board uses the prefix
/// `DIRECTIONS[..4]`.
pub const DIRECTIONS: [Direction; 6] = [
    Direction::PosX,
    Direction::NegX,
    Direction::PosY,
    Direction::NegY,
    Direction::PosZ,
    Direction::NegZ,
];

impl Direction {
    /// Directions available on a board, planar or spatial.
    #[inline]
    pub fn all(three_d: bool) -> &'static [Direction] {
        if three_d {
            &DIRECTIONS
        } else {
            &DIRECTIONS[..4]
        }
    }

    /// The unit vector of this direction.
    #[inline(always)]
    pub const fn delta(self) -> Coord {
        match self {
            Direction::PosX => (1, 0, 0),
            Direction::NegX => (-1, 0, 0),
            Direction::PosY => (0, 1, 0),
            Direction::NegY => (0, -1, 0),
            Direction::PosZ => (0, 0, 1),
            Direction::NegZ => (0, 0, -1),
        }
    }

    pub const fn opposite(self) -> Direction {
        match self {
            Direction::PosX => Direction::NegX,
            Direction::NegX => Direction::PosX,
            Direction::PosY => Direction::NegY,
            Direction::NegY => Direction::PosY,
            Direction::PosZ => Direction::NegZ,
            Direction::NegZ => Direction::PosZ,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Direction::PosX => "+x",
            Direction::NegX => "-x",
            Direction::PosY => "+y",
            Direction::NegY => "-y",
            Direction::PosZ => "+z",
            Direction::NegZ => "-z",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Componentwise sum of two coordinates.
#[inline(always)]
pub const fn translate(coord: Coord, delta: Coord) -> Coord {
    (coord.0 + delta.0, coord.1 + delta.1, coord.2 + delta.2)
}

/// Componentwise sum, or `None` if any component leaves the `i32` range.
#[inline]
pub fn checked_translate(coord: Coord, delta: Coord) -> Option<Coord> {
    Some((
        coord.0.checked_add(delta.0)?,
        coord.1.checked_add(delta.1)?,
        coord.2.checked_add(delta.2)?,
    ))
}

/// Compares coordinates by z, then y, then x.
///
/// This is the fixed total order used for shape signatures and for sorting
/// anchors inside a canonical key.
#[inline]
pub fn zyx_cmp(a: &Coord, b: &Coord) -> Ordering {
    (a.2, a.1, a.0).cmp(&(b.2, b.1, b.0))
}

/// Sorts coordinates in z, y, x order.
pub fn sort_zyx(coords: &mut [Coord]) {
    coords.sort_unstable_by(zyx_cmp);
}

/// Translates coordinates so the minimum x, y, z values are all zero, then
/// sorts them in z, y, x order.
///
/// Two cell-sets that differ only by translation normalize to the same list.
pub fn normalize_to_origin(mut coords: Vec<Coord>) -> Vec<Coord> {
    let Some(min) = coords
        .iter()
        .copied()
        .reduce(|a, b| (a.0.min(b.0), a.1.min(b.1), a.2.min(b.2)))
    else {
        return coords;
    };

    for (x, y, z) in &mut coords {
        *x -= min.0;
        *y -= min.1;
        *z -= min.2;
    }

    sort_zyx(&mut coords);
    coords
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_cancels_delta() {
        for direction in DIRECTIONS {
            let there = translate((3, 4, 5), direction.delta());
            let back = translate(there, direction.opposite().delta());
            assert_eq!(back, (3, 4, 5), "{direction} should be undone by its opposite");
        }
    }

    #[test]
    fn test_planar_prefix() {
        assert_eq!(Direction::all(false).len(), 4);
        assert!(!Direction::all(false).contains(&Direction::PosZ));
        assert_eq!(Direction::all(true).len(), 6);
    }

    #[test]
    fn test_normalize_to_origin_sorts_zyx() {
        let normalized = normalize_to_origin(vec![(5, 3, 0), (4, 4, 0), (4, 3, 0)]);
        assert_eq!(normalized, vec![(0, 0, 0), (1, 0, 0), (0, 1, 0)]);
    }

    #[test]
    fn test_normalize_translated_copies_agree() {
        let piece = vec![(0, 0, 0), (1, 0, 0), (1, 1, 1)];
        let shifted: Vec<Coord> = piece.iter().map(|&c| translate(c, (-2, 7, 3))).collect();
        assert_eq!(normalize_to_origin(piece), normalize_to_origin(shifted));
    }
}
