//! Exploration settings, goals and the JSON puzzle file format.
//!
//! A puzzle file looks like:
//!
//! ```json
//! {
//!   "board": { "width": 4, "height": 5 },
//!   "forbidden": [[0, 4]],
//!   "pieces": [
//!     { "anchor": [1, 3], "box": [2, 2] },
//!     { "id": 7, "anchor": [0, 0], "cells": [[0, 0], [1, 0], [0, 1]] }
//!   ],
//!   "goal": { "piece": 0, "anchor": [1, 0] },
//!   "explore": { "max_states": 50000 }
//! }
//! ```
//!
//! Coordinates and extents take two or three components; the third defaults
//! to 0 for coordinates and 1 for extents. Pieces without an id are numbered
//! after the largest explicit id.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{PuzzleError, Result};
use crate::geometry::translate;
use crate::grid::{Board, Extent, Placement};
use crate::pieces::{Coord, Piece, PieceId, PieceIdAllocator, Shape};

/// Parameters of one state-space exploration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExploreConfig {
    /// Upper bound on discovered states.
    pub max_states: usize,
    /// Keep piece identity in state keys instead of collapsing same-shape
    /// pieces.
    pub identity_preserving: bool,
    /// Expanded placements between progress reports.
    pub progress_interval: usize,
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self {
            max_states: 100_000,
            identity_preserving: false,
            progress_interval: 4096,
        }
    }
}

impl ExploreConfig {
    pub fn with_max_states(mut self, max_states: usize) -> Self {
        self.max_states = max_states;
        self
    }

    pub fn with_identity_preserving(mut self, identity_preserving: bool) -> Self {
        self.identity_preserving = identity_preserving;
        self
    }

    pub fn with_progress_interval(mut self, progress_interval: usize) -> Self {
        self.progress_interval = progress_interval;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_states == 0 {
            return Err(PuzzleError::ZeroStateLimit);
        }
        if self.progress_interval == 0 {
            return Err(PuzzleError::ZeroProgressInterval);
        }
        Ok(())
    }
}

/// Target position for one shape of piece.
///
/// A placement meets the goal when any piece shaped like `piece` sits at
/// `anchor`. Matching by shape keeps the goal meaningful when interchangeable
/// pieces have traded places.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub piece: PieceId,
    pub anchor: Coord,
}

impl Goal {
    pub fn is_met(&self, placement: &Placement) -> bool {
        let Some(target) = placement.piece(self.piece) else {
            return false;
        };
        let position = translate(self.anchor, target.footprint().origin());
        placement
            .pieces()
            .iter()
            .any(|piece| piece.position() == position && piece.signature() == target.signature())
    }

    /// The goal as a predicate over placements.
    pub fn predicate(self) -> impl Fn(&Placement) -> bool {
        move |placement| self.is_met(placement)
    }
}

/// A coordinate or extent written with two or three components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Triple<T> {
    Planar([T; 2]),
    Spatial([T; 3]),
}

impl Triple<i32> {
    pub fn coord(self) -> Coord {
        match self {
            Triple::Planar([x, y]) => (x, y, 0),
            Triple::Spatial([x, y, z]) => (x, y, z),
        }
    }
}

impl Triple<u32> {
    pub fn extents(self) -> (u32, u32, u32) {
        match self {
            Triple::Planar([w, h]) => (w, h, 1),
            Triple::Spatial([w, h, d]) => (w, h, d),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    pub anchor: Triple<i32>,
    #[serde(rename = "box", default, skip_serializing_if = "Option::is_none")]
    pub box_extents: Option<Triple<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cells: Option<Vec<Triple<i32>>>,
}

impl PieceSpec {
    fn shape(&self, index: usize, board: Extent) -> Result<Shape> {
        match (&self.box_extents, &self.cells) {
            (Some(extents), None) => {
                let (w, h, d) = extents.extents();
                if w > board.width || h > board.height || d > board.depth {
                    return Err(PuzzleError::InvalidPieceSpec {
                        index,
                        message: format!("box {w}x{h}x{d} is larger than the board"),
                    });
                }
                Ok(Shape::Box(w, h, d))
            }
            (None, Some(cells)) => Ok(Shape::Cells(cells.iter().map(|c| c.coord()).collect())),
            _ => Err(PuzzleError::InvalidPieceSpec {
                index,
                message: "exactly one of \"box\" or \"cells\" is required".to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalSpec {
    pub piece: u32,
    pub anchor: Triple<i32>,
}

/// On-disk puzzle description.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleFile {
    pub board: Extent,
    #[serde(default)]
    pub forbidden: Vec<Triple<i32>>,
    pub pieces: Vec<PieceSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<GoalSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explore: Option<ExploreConfig>,
}

impl PuzzleFile {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Builds the validated starting placement.
    pub fn placement(&self) -> Result<Placement> {
        let board = Board::new(self.board, self.forbidden.iter().map(|c| c.coord()))?;

        let explicit = self.pieces.iter().filter_map(|spec| spec.id.map(PieceId));
        let mut ids = PieceIdAllocator::after(explicit);

        let pieces = self
            .pieces
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                let id = spec.id.map(PieceId).unwrap_or_else(|| ids.next_id());
                Piece::new(id, spec.anchor.coord(), spec.shape(index, self.board)?)
            })
            .collect::<Result<Vec<_>>>()?;

        Placement::new(Arc::new(board), pieces)
    }

    /// The declared goal, checked against the piece list.
    pub fn goal(&self, placement: &Placement) -> Result<Option<Goal>> {
        let Some(spec) = &self.goal else {
            return Ok(None);
        };
        let piece = PieceId(spec.piece);
        if placement.piece(piece).is_none() {
            return Err(PuzzleError::UnknownGoalPiece { id: piece });
        }
        Ok(Some(Goal {
            piece,
            anchor: spec.anchor.coord(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "board": { "width": 4, "height": 2 },
        "forbidden": [[3, 1]],
        "pieces": [
            { "anchor": [0, 0], "box": [2, 1] },
            { "id": 5, "anchor": [0, 1, 0], "cells": [[0, 0], [1, 0]] },
            { "anchor": [3, 0], "box": [1, 1, 1] }
        ],
        "goal": { "piece": 6, "anchor": [0, 1] },
        "explore": { "max_states": 10 }
    }"#;

    #[test]
    fn test_puzzle_file_builds_placement() {
        let file = PuzzleFile::from_json(SAMPLE).unwrap();
        let placement = file.placement().unwrap();

        let ids: Vec<u32> = placement.pieces().iter().map(|p| p.id().0).collect();
        assert_eq!(ids, vec![5, 6, 7]);
        assert_eq!(placement.extent(), Extent::planar(4, 2));
        assert_eq!(placement.board().forbidden(), &[(3, 1, 0)]);
        assert_eq!(placement.piece(PieceId(7)).unwrap().anchor(), (3, 0, 0));

        let explore = file.explore.unwrap();
        assert_eq!(explore.max_states, 10);
        assert_eq!(explore.progress_interval, ExploreConfig::default().progress_interval);
    }

    #[test]
    fn test_goal_matches_by_shape() {
        let file = PuzzleFile::from_json(SAMPLE).unwrap();
        let placement = file.placement().unwrap();

        // piece 5 is a solid two-cell row, the same shape as the domino 6
        let goal = file.goal(&placement).unwrap().unwrap();
        assert_eq!(goal.piece, PieceId(6));
        assert!(goal.is_met(&placement));

        let unit_goal = Goal {
            piece: PieceId(7),
            anchor: (2, 0, 0),
        };
        assert!(!unit_goal.is_met(&placement));
        let moved = Placement::new(
            Arc::clone(placement.board()),
            placement
                .pieces()
                .iter()
                .map(|p| if p.id() == PieceId(7) { p.with_anchor((2, 0, 0)) } else { p.clone() })
                .collect(),
        )
        .unwrap();
        assert!(unit_goal.predicate()(&moved));
    }

    #[test]
    fn test_piece_needs_exactly_one_shape() {
        let json = r#"{
            "board": { "width": 2, "height": 1 },
            "pieces": [{ "anchor": [0, 0] }]
        }"#;
        let file = PuzzleFile::from_json(json).unwrap();
        assert!(matches!(
            file.placement(),
            Err(PuzzleError::InvalidPieceSpec { index: 0, .. })
        ));
    }

    fn placement_of(pieces: &str) -> Result<Placement> {
        let json = format!(r#"{{ "board": {{ "width": 4, "height": 2 }}, "pieces": [{pieces}] }}"#);
        PuzzleFile::from_json(&json)?.placement()
    }

    #[test]
    fn test_extreme_coordinates_are_rejected() {
        // sparse cell-set whose bounding box volume exceeds i32
        assert!(matches!(
            placement_of(r#"{ "anchor": [0, 0], "cells": [[0, 0], [70000, 70000]] }"#),
            Err(PuzzleError::PieceOutOfBounds { cell: (70000, 70000, 0), .. })
        ));
        assert!(matches!(
            placement_of(r#"{ "anchor": [2147483647, 0], "box": [2, 1] }"#),
            Err(PuzzleError::PieceOutOfBounds { id: PieceId(0), cell: (i32::MAX, 0, 0) })
        ));
        assert!(matches!(
            placement_of(r#"{ "anchor": [0, -2147483648], "cells": [[0, -1], [0, 0]] }"#),
            Err(PuzzleError::PieceOutOfBounds { cell: (0, i32::MIN, 0), .. })
        ));
        assert!(matches!(
            placement_of(r#"{ "anchor": [0, 0], "cells": [[-2147483648, 0], [2147483647, 0]] }"#),
            Err(PuzzleError::ShapeOutOfRange)
        ));
        assert!(matches!(
            placement_of(r#"{ "anchor": [0, 0], "box": [4294967295, 1] }"#),
            Err(PuzzleError::InvalidPieceSpec { index: 0, .. })
        ));
    }

    #[test]
    fn test_goal_with_unknown_piece() {
        let json = r#"{
            "board": { "width": 2, "height": 1 },
            "pieces": [{ "anchor": [0, 0], "box": [1, 1] }],
            "goal": { "piece": 3, "anchor": [1, 0] }
        }"#;
        let file = PuzzleFile::from_json(json).unwrap();
        let placement = file.placement().unwrap();
        assert!(matches!(
            file.goal(&placement),
            Err(PuzzleError::UnknownGoalPiece { id: PieceId(3) })
        ));
    }

    #[test]
    fn test_config_validation() {
        assert!(ExploreConfig::default().validate().is_ok());
        assert!(matches!(
            ExploreConfig::default().with_max_states(0).validate(),
            Err(PuzzleError::ZeroStateLimit)
        ));
        assert!(matches!(
            ExploreConfig::default().with_progress_interval(0).validate(),
            Err(PuzzleError::ZeroProgressInterval)
        ));
    }
}
