//! Move descriptions and single-piece move generation.
//!
//! A single move slides one piece by one cell. Its target cells must be on
//! the board, not forbidden, and free of every other piece; the moving
//! piece's own cells do not block it. Moves are enumerated by piece id, then
//! by direction in [`DIRECTIONS`](crate::geometry::DIRECTIONS) order, so the
//! same placement always yields the same list.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::Direction;
use crate::grid::{Occupant, OccupancyIndex, Placement};
use crate::interlock;
use crate::pieces::PieceId;

/// A unit translation of one piece or of a rigid group of pieces.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Move {
    Single {
        piece: PieceId,
        direction: Direction,
    },
    /// Members sorted by id.
    Compound {
        pieces: Vec<PieceId>,
        direction: Direction,
    },
}

impl Move {
    pub fn direction(&self) -> Direction {
        match self {
            Move::Single { direction, .. } | Move::Compound { direction, .. } => *direction,
        }
    }

    /// Ids of the pieces this move translates.
    pub fn piece_ids(&self) -> &[PieceId] {
        match self {
            Move::Single { piece, .. } => std::slice::from_ref(piece),
            Move::Compound { pieces, .. } => pieces,
        }
    }

    pub fn is_compound(&self) -> bool {
        matches!(self, Move::Compound { .. })
    }

    /// The placement produced by this move.
    ///
    /// Returns `None` if the move names a piece the placement does not
    /// contain. Legality is not rechecked.
    pub fn apply(&self, placement: &Placement) -> Option<Placement> {
        let slots = self
            .piece_ids()
            .iter()
            .map(|&id| placement.slot_of(id))
            .collect::<Option<Vec<usize>>>()?;
        Some(placement.slide(&slots, self.direction()))
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Single { piece, direction } => write!(f, "{piece}{direction}"),
            Move::Compound { pieces, direction } => {
                f.write_str("{")?;
                for (i, piece) in pieces.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{piece}")?;
                }
                write!(f, "}}{direction}")
            }
        }
    }
}

/// Whether the piece at `slot` can slide one cell along `direction`.
#[inline]
pub fn can_slide(
    placement: &Placement,
    occupancy: &OccupancyIndex,
    slot: usize,
    direction: Direction,
) -> bool {
    placement.pieces()[slot]
        .shifted_cells(direction.delta())
        .all(|cell| match occupancy.at(cell) {
            Some(Occupant::Empty) => true,
            Some(Occupant::Piece(other)) => other == slot,
            Some(Occupant::Forbidden) | None => false,
        })
}

/// Legal single-piece moves of a placement.
pub fn single_moves(placement: &Placement) -> Vec<Move> {
    single_moves_with(placement, &placement.occupancy())
}

pub(crate) fn single_moves_with(placement: &Placement, occupancy: &OccupancyIndex) -> Vec<Move> {
    single_slides(placement, occupancy)
        .into_iter()
        .map(|(slot, direction)| Move::Single {
            piece: placement.pieces()[slot].id(),
            direction,
        })
        .collect()
}

/// `(slot, direction)` of every legal single move, in enumeration order.
fn single_slides(placement: &Placement, occupancy: &OccupancyIndex) -> Vec<(usize, Direction)> {
    let directions = placement.extent().directions();
    let mut slides = Vec::new();

    for slot in 0..placement.pieces().len() {
        for &direction in directions {
            if can_slide(placement, occupancy, slot, direction) {
                slides.push((slot, direction));
            }
        }
    }

    slides
}

/// Every legal move paired with the placement it produces: single moves
/// first, then compound moves.
///
/// `identity_preserving` selects the key used to discard compound moves that
/// duplicate a single move's result.
pub fn successors(placement: &Placement, identity_preserving: bool) -> Vec<(Move, Placement)> {
    let occupancy = placement.occupancy();

    let mut out: Vec<(Move, Placement)> = single_slides(placement, &occupancy)
        .into_iter()
        .map(|(slot, direction)| {
            let mv = Move::Single {
                piece: placement.pieces()[slot].id(),
                direction,
            };
            (mv, placement.slide(&[slot], direction))
        })
        .collect();

    let compound =
        interlock::compound_successors(placement, &occupancy, &out, identity_preserving);
    out.extend(compound);
    out
}

/// Legal single and compound moves of a placement.
pub fn legal_moves(placement: &Placement, identity_preserving: bool) -> Vec<Move> {
    successors(placement, identity_preserving)
        .into_iter()
        .map(|(mv, _)| mv)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Extent, PlacementBuilder};
    use crate::pieces::Shape;

    fn single(piece: u32, direction: Direction) -> Move {
        Move::Single {
            piece: PieceId(piece),
            direction,
        }
    }

    #[test]
    fn test_line_single_moves() {
        let placement = PlacementBuilder::new(Extent::planar(3, 1))
            .piece((0, 0, 0), Shape::unit())
            .piece((1, 0, 0), Shape::unit())
            .build()
            .unwrap();
        assert_eq!(single_moves(&placement), vec![single(1, Direction::PosX)]);
    }

    #[test]
    fn test_own_cells_do_not_block() {
        let placement = PlacementBuilder::new(Extent::planar(4, 1))
            .piece((0, 0, 0), Shape::planar_box(3, 1))
            .build()
            .unwrap();
        assert_eq!(single_moves(&placement), vec![single(0, Direction::PosX)]);
    }

    #[test]
    fn test_forbidden_cells_block() {
        let placement = PlacementBuilder::new(Extent::planar(3, 3))
            .forbid((1, 1, 0))
            .piece((1, 0, 0), Shape::unit())
            .build()
            .unwrap();
        assert_eq!(
            single_moves(&placement),
            vec![single(0, Direction::PosX), single(0, Direction::NegX)]
        );
    }

    #[test]
    fn test_3d_board_uses_z_directions() {
        let placement = PlacementBuilder::new(Extent::new(1, 1, 2))
            .piece((0, 0, 0), Shape::unit())
            .build()
            .unwrap();
        assert_eq!(single_moves(&placement), vec![single(0, Direction::PosZ)]);
    }

    #[test]
    fn test_enumeration_is_repeatable() {
        let placement = crate::presets::find("huarong").unwrap().placement().unwrap();
        assert_eq!(legal_moves(&placement, false), legal_moves(&placement, false));
        assert!(!legal_moves(&placement, false).is_empty());
    }

    #[test]
    fn test_apply_moves_named_pieces_only() {
        let placement = PlacementBuilder::new(Extent::planar(3, 1))
            .piece((0, 0, 0), Shape::unit())
            .piece((1, 0, 0), Shape::unit())
            .build()
            .unwrap();
        let next = single(1, Direction::PosX).apply(&placement).unwrap();
        assert_eq!(next.piece(PieceId(0)).unwrap().anchor(), (0, 0, 0));
        assert_eq!(next.piece(PieceId(1)).unwrap().anchor(), (2, 0, 0));
        assert!(single(9, Direction::PosX).apply(&placement).is_none());
    }

    #[test]
    fn test_move_display() {
        assert_eq!(single(3, Direction::NegY).to_string(), "3-y");
        let compound = Move::Compound {
            pieces: vec![PieceId(0), PieceId(1)],
            direction: Direction::PosX,
        };
        assert_eq!(compound.to_string(), "{0,1}+x");
    }
}
