//! Built-in puzzles.
//!
//! Each preset is a starting placement plus an optional goal. Coordinates put
//! `y = 0` on the bottom row.

use crate::config::Goal;
use crate::error::{PuzzleError, Result};
use crate::grid::{Extent, Placement, PlacementBuilder};
use crate::pieces::{Coord, PieceId, Shape};

/// A named starting configuration.
pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    pub goal: Option<Goal>,
    build: fn() -> Result<Placement>,
}

impl Preset {
    pub fn placement(&self) -> Result<Placement> {
        (self.build)()
    }
}

/// Cells of the cup piece: a U opening downward, four cells wide.
const CUP: [Coord; 6] = [(0, 0, 0), (0, 1, 0), (1, 1, 0), (2, 1, 0), (3, 1, 0), (3, 0, 0)];

pub const PRESETS: &[Preset] = &[
    Preset {
        name: "line",
        description: "3x1 board, two unit blocks",
        goal: None,
        build: line,
    },
    Preset {
        name: "pair",
        description: "2x2 board, two unit blocks that can circle each other",
        goal: None,
        build: pair,
    },
    Preset {
        name: "huarong",
        description: "classic 4x5 Klotski (Huarong Dao); free the 2x2 block through the bottom",
        goal: Some(Goal {
            piece: PieceId(0),
            anchor: (1, 0, 0),
        }),
        build: huarong,
    },
    Preset {
        name: "cup",
        description: "5x2 board, a U-shaped cup interlocked with a domino",
        goal: None,
        build: cup,
    },
    Preset {
        name: "cube",
        description: "2x2x2 board, seven unit cubes and one hole",
        goal: None,
        build: cube,
    },
    Preset {
        name: "ring",
        description: "3x3 board with a forbidden centre, one unit block",
        goal: Some(Goal {
            piece: PieceId(0),
            anchor: (2, 2, 0),
        }),
        build: ring,
    },
];

/// Name of the preset explored when none is given.
pub const DEFAULT_PRESET: &str = "huarong";

pub fn find(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|preset| preset.name == name)
}

/// Like [`find`], but reports unknown names as an error.
pub fn lookup(name: &str) -> Result<&'static Preset> {
    find(name).ok_or_else(|| PuzzleError::UnknownPreset {
        name: name.to_string(),
    })
}

fn line() -> Result<Placement> {
    PlacementBuilder::new(Extent::planar(3, 1))
        .piece((0, 0, 0), Shape::unit())
        .piece((1, 0, 0), Shape::unit())
        .build()
}

fn pair() -> Result<Placement> {
    PlacementBuilder::new(Extent::planar(2, 2))
        .piece((0, 0, 0), Shape::unit())
        .piece((1, 0, 0), Shape::unit())
        .build()
}

fn huarong() -> Result<Placement> {
    PlacementBuilder::new(Extent::planar(4, 5))
        // the 2x2 block
        .piece((1, 3, 0), Shape::planar_box(2, 2))
        // four vertical 1x2 blocks
        .piece((0, 3, 0), Shape::planar_box(1, 2))
        .piece((3, 3, 0), Shape::planar_box(1, 2))
        .piece((0, 1, 0), Shape::planar_box(1, 2))
        .piece((3, 1, 0), Shape::planar_box(1, 2))
        // horizontal 2x1 block
        .piece((1, 2, 0), Shape::planar_box(2, 1))
        // four unit blocks
        .piece((1, 1, 0), Shape::unit())
        .piece((2, 1, 0), Shape::unit())
        .piece((0, 0, 0), Shape::unit())
        .piece((3, 0, 0), Shape::unit())
        .build()
}

fn cup() -> Result<Placement> {
    PlacementBuilder::new(Extent::planar(5, 2))
        .piece((0, 0, 0), Shape::Cells(CUP.to_vec()))
        .piece((1, 0, 0), Shape::planar_box(2, 1))
        .build()
}

fn cube() -> Result<Placement> {
    let mut builder = PlacementBuilder::new(Extent::new(2, 2, 2));
    for z in 0..2 {
        for y in 0..2 {
            for x in 0..2 {
                if (x, y, z) != (1, 1, 1) {
                    builder = builder.piece((x, y, z), Shape::unit());
                }
            }
        }
    }
    builder.build()
}

fn ring() -> Result<Placement> {
    PlacementBuilder::new(Extent::planar(3, 3))
        .forbid((1, 1, 0))
        .piece((0, 0, 0), Shape::unit())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::format_placement;

    #[test]
    fn test_every_preset_is_well_formed() {
        for preset in PRESETS {
            let placement = preset.placement();
            assert!(placement.is_ok(), "preset {} failed: {:?}", preset.name, placement.err());
        }
    }

    #[test]
    fn test_preset_names_are_unique() {
        for (i, preset) in PRESETS.iter().enumerate() {
            assert!(
                PRESETS[i + 1..].iter().all(|other| other.name != preset.name),
                "duplicate preset {}",
                preset.name
            );
        }
    }

    #[test]
    fn test_lookup_unknown() {
        assert!(find(DEFAULT_PRESET).is_some());
        assert!(matches!(lookup("nope"), Err(PuzzleError::UnknownPreset { .. })));
    }

    #[test]
    fn test_huarong_layout() {
        let placement = lookup("huarong").unwrap().placement().unwrap();
        insta::assert_snapshot!(format_placement(&placement), @r"
        1002
        1002
        3554
        3674
        8..9
        ");
    }
}
