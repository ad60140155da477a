//! Error type shared by puzzle construction, puzzle files and graph
//! interchange.
//!
//! Move generation, hashing and exploration never fail; everything here is
//! raised while building or loading inputs.

use thiserror::Error;

use crate::pieces::{Coord, PieceId};

pub type Result<T> = std::result::Result<T, PuzzleError>;

#[derive(Debug, Error)]
pub enum PuzzleError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("board extent must be non-zero, got {width}x{height}x{depth}")]
    EmptyBoard { width: u32, height: u32, depth: u32 },

    #[error("forbidden cell {cell:?} lies outside the board")]
    ForbiddenOutOfBounds { cell: Coord },

    #[error("shape has no cells")]
    EmptyShape,

    #[error("shape does not fit in the coordinate range")]
    ShapeOutOfRange,

    #[error("shape lists offset {offset:?} more than once")]
    DuplicateOffset { offset: Coord },

    #[error("duplicate piece id {id}")]
    DuplicatePieceId { id: PieceId },

    #[error("piece {id} covers cell {cell:?} outside the board")]
    PieceOutOfBounds { id: PieceId, cell: Coord },

    #[error("piece {id} covers forbidden cell {cell:?}")]
    PieceOnForbidden { id: PieceId, cell: Coord },

    #[error("pieces {first} and {second} overlap at {cell:?}")]
    Overlap {
        first: PieceId,
        second: PieceId,
        cell: Coord,
    },

    #[error("invalid piece #{index} in puzzle file: {message}")]
    InvalidPieceSpec { index: usize, message: String },

    #[error("state limit must be positive")]
    ZeroStateLimit,

    #[error("progress interval must be positive")]
    ZeroProgressInterval,

    #[error("unknown preset: {name}")]
    UnknownPreset { name: String },

    #[error("goal refers to unknown piece {id}")]
    UnknownGoalPiece { id: PieceId },

    #[error("corrupt state graph: {message}")]
    CorruptGraph { message: String },
}

impl PuzzleError {
    #[must_use]
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::CorruptGraph {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_message_names_both_pieces() {
        let error = PuzzleError::Overlap {
            first: PieceId(1),
            second: PieceId(4),
            cell: (2, 0, 0),
        };
        assert_eq!(error.to_string(), "pieces 1 and 4 overlap at (2, 0, 0)");
    }

    #[test]
    fn test_corrupt_constructor_wraps_message() {
        let error = PuzzleError::corrupt("edge 3 points nowhere");
        assert_eq!(error.to_string(), "corrupt state graph: edge 3 points nowhere");
    }
}
