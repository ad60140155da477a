//! Sliding-block puzzle state spaces.
//!
//! Models Klotski-style puzzles on planar or volumetric grids, generates
//! single-piece and interlocked group moves, and builds the graph of every
//! placement reachable from a starting one. Pieces of the same shape are
//! interchangeable unless identity-preserving hashing is requested.

pub mod canonical;
pub mod config;
pub mod error;
pub mod explorer;
pub mod geometry;
pub mod grid;
pub mod interlock;
pub mod movegen;
pub mod persistence;
pub mod pieces;
pub mod presets;

pub use canonical::{canonical_key, CanonicalKey};
pub use config::{ExploreConfig, Goal, PuzzleFile};
pub use error::{PuzzleError, Result};
pub use explorer::{build, Explorer, Progress, StateId, StateSpace, Termination};
pub use geometry::Direction;
pub use grid::{classify_empty_space, format_placement, Board, Extent, Placement, PlacementBuilder};
pub use movegen::{legal_moves, Move};
pub use pieces::{Coord, Piece, PieceId, Shape};
