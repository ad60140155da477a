//! Piece definitions: shapes, shape signatures and anchored pieces.
//!
//! A shape is either an axis-aligned box or an explicit set of cell offsets
//! relative to the piece's anchor. Shapes never change once a piece exists;
//! sliding a piece only moves its anchor, so every copy of a piece produced by
//! the move generator shares the same [`Footprint`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{PuzzleError, Result};
use crate::geometry::{checked_translate, normalize_to_origin, sort_zyx, translate};

/// A grid coordinate `(x, y, z)`. Planar boards keep `z == 0`.
pub type Coord = (i32, i32, i32);

/// Stable identity of a piece within one puzzle.
///
/// Ids order the move enumeration and key the identity-preserving hash; the
/// default canonical hash ignores them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PieceId(pub u32);

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The geometry of a piece as supplied by the caller.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    /// Box extents `(width, height, depth)`.
    Box(u32, u32, u32),
    /// Cell offsets relative to the anchor, in any order.
    Cells(Vec<Coord>),
}

impl Shape {
    /// A planar box of `width` by `height` cells.
    pub const fn planar_box(width: u32, height: u32) -> Self {
        Shape::Box(width, height, 1)
    }

    /// A single cell.
    pub const fn unit() -> Self {
        Shape::Box(1, 1, 1)
    }
}

/// Identifies a shape up to translation.
///
/// Boxes compare by extents, cell-sets by their offsets normalized to a
/// minimum-corner origin and sorted by z, y, x. A cell-set that exactly fills
/// its bounding box is given the box signature, so congruent pieces agree no
/// matter how they were declared.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapeSignature {
    Box(u32, u32, u32),
    Cells(Vec<Coord>),
}

impl fmt::Display for ShapeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeSignature::Box(w, h, d) => write!(f, "box{w}x{h}x{d}"),
            ShapeSignature::Cells(cells) => {
                f.write_str("cells[")?;
                for (i, (x, y, z)) in cells.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{x},{y},{z}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Expanded, validated form of a [`Shape`].
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Footprint {
    shape: Shape,
    /// Cell offsets relative to the anchor, sorted by z, y, x.
    offsets: Box<[Coord]>,
    /// Minimum corner of the offsets' bounding box.
    origin: Coord,
    signature: Arc<ShapeSignature>,
}

impl Footprint {
    pub fn new(shape: Shape) -> Result<Self> {
        let offsets: Vec<Coord> = match &shape {
            Shape::Box(w, h, d) => {
                if *w == 0 || *h == 0 || *d == 0 {
                    return Err(PuzzleError::EmptyShape);
                }
                let axis = |len: u32| i32::try_from(len).map_err(|_| PuzzleError::ShapeOutOfRange);
                let (w, h, d) = (axis(*w)?, axis(*h)?, axis(*d)?);
                // z-major iteration already yields z, y, x order
                (0..d)
                    .flat_map(|z| (0..h).flat_map(move |y| (0..w).map(move |x| (x, y, z))))
                    .collect()
            }
            Shape::Cells(cells) => {
                if cells.is_empty() {
                    return Err(PuzzleError::EmptyShape);
                }
                let mut sorted = cells.clone();
                sort_zyx(&mut sorted);
                if let Some(pair) = sorted.windows(2).find(|pair| pair[0] == pair[1]) {
                    return Err(PuzzleError::DuplicateOffset { offset: pair[0] });
                }
                if !spans_fit(&sorted) {
                    return Err(PuzzleError::ShapeOutOfRange);
                }
                sorted
            }
        };

        let origin = offsets
            .iter()
            .copied()
            .reduce(|a, b| (a.0.min(b.0), a.1.min(b.1), a.2.min(b.2)))
            .unwrap_or((0, 0, 0));
        let signature = match &shape {
            Shape::Box(w, h, d) => ShapeSignature::Box(*w, *h, *d),
            Shape::Cells(_) => cell_signature(offsets.clone()),
        };

        Ok(Self {
            shape,
            offsets: offsets.into_boxed_slice(),
            origin,
            signature: Arc::new(signature),
        })
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[inline]
    pub fn offsets(&self) -> &[Coord] {
        &self.offsets
    }

    #[inline]
    pub fn origin(&self) -> Coord {
        self.origin
    }

    #[inline]
    pub fn signature(&self) -> &Arc<ShapeSignature> {
        &self.signature
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.offsets.len()
    }
}

/// Whether the offsets span less than `i32::MAX` cells along every axis, so
/// they can be shifted to the origin.
fn spans_fit(offsets: &[Coord]) -> bool {
    let axes: [fn(&Coord) -> i32; 3] = [|c| c.0, |c| c.1, |c| c.2];
    axes.iter().all(|axis| {
        let (min, max) = offsets
            .iter()
            .map(axis)
            .fold((i32::MAX, i32::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
        i64::from(max) - i64::from(min) < i64::from(i32::MAX)
    })
}

/// Signature of an explicit cell-set, collapsing solid boxes to `Box`.
fn cell_signature(offsets: Vec<Coord>) -> ShapeSignature {
    let normalized = normalize_to_origin(offsets);
    let (max_x, max_y, max_z) = normalized
        .iter()
        .fold((0, 0, 0), |acc, c| (acc.0.max(c.0), acc.1.max(c.1), acc.2.max(c.2)));
    let (w, h, d) = (max_x as u32 + 1, max_y as u32 + 1, max_z as u32 + 1);

    let volume = u64::from(w)
        .checked_mul(u64::from(h))
        .and_then(|wh| wh.checked_mul(u64::from(d)));
    if volume == Some(normalized.len() as u64) {
        ShapeSignature::Box(w, h, d)
    } else {
        ShapeSignature::Cells(normalized)
    }
}

/// A piece at a concrete anchor position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "PieceRecord", try_from = "PieceRecord")]
pub struct Piece {
    id: PieceId,
    anchor: Coord,
    footprint: Arc<Footprint>,
}

impl Piece {
    /// Builds a piece, rejecting shapes and anchors whose cells would leave
    /// the `i32` coordinate range.
    pub fn new(id: PieceId, anchor: Coord, shape: Shape) -> Result<Self> {
        let piece = Self {
            id,
            anchor,
            footprint: Arc::new(Footprint::new(shape)?),
        };
        if piece.checked_cells().is_none() {
            return Err(PuzzleError::PieceOutOfBounds { id, cell: anchor });
        }
        Ok(piece)
    }

    #[inline]
    pub fn id(&self) -> PieceId {
        self.id
    }

    #[inline]
    pub fn anchor(&self) -> Coord {
        self.anchor
    }

    /// Minimum corner of the cells this piece covers.
    ///
    /// Equals the anchor unless a cell-set shape was declared with offsets
    /// away from the origin. Two pieces with the same signature cover the same
    /// cells exactly when their positions match.
    #[inline]
    pub fn position(&self) -> Coord {
        translate(self.anchor, self.footprint.origin())
    }

    #[inline]
    pub fn footprint(&self) -> &Arc<Footprint> {
        &self.footprint
    }

    #[inline]
    pub fn signature(&self) -> &Arc<ShapeSignature> {
        self.footprint.signature()
    }

    /// Absolute cells covered by this piece at its current anchor.
    #[inline]
    pub fn cells(&self) -> impl Iterator<Item = Coord> + '_ {
        self.footprint
            .offsets()
            .iter()
            .map(move |&offset| translate(self.anchor, offset))
    }

    /// Absolute cells, or `None` if any of them overflows a coordinate.
    pub fn checked_cells(&self) -> Option<Vec<Coord>> {
        self.footprint
            .offsets()
            .iter()
            .map(|&offset| checked_translate(self.anchor, offset))
            .collect()
    }

    /// Absolute cells this piece would cover after moving by `delta`.
    #[inline]
    pub fn shifted_cells(&self, delta: Coord) -> impl Iterator<Item = Coord> + '_ {
        let anchor = translate(self.anchor, delta);
        self.footprint
            .offsets()
            .iter()
            .map(move |&offset| translate(anchor, offset))
    }

    /// The same piece with its anchor moved by `delta`.
    #[inline]
    pub fn translated(&self, delta: Coord) -> Piece {
        Piece {
            id: self.id,
            anchor: translate(self.anchor, delta),
            footprint: Arc::clone(&self.footprint),
        }
    }

    /// The same piece placed at another anchor.
    pub fn with_anchor(&self, anchor: Coord) -> Piece {
        Piece {
            id: self.id,
            anchor,
            footprint: Arc::clone(&self.footprint),
        }
    }
}

/// Absolute cells a piece occupies, in z, y, x order of its offsets.
pub fn cells_of(piece: &Piece) -> Vec<Coord> {
    piece.cells().collect()
}

/// Translation-invariant identity of a piece's shape.
pub fn shape_signature(piece: &Piece) -> &ShapeSignature {
    piece.signature()
}

/// Serialized form of a [`Piece`].
#[derive(Clone, Debug, Serialize, Deserialize)]
struct PieceRecord {
    id: PieceId,
    anchor: Coord,
    shape: Shape,
}

impl From<Piece> for PieceRecord {
    fn from(piece: Piece) -> Self {
        Self {
            id: piece.id,
            anchor: piece.anchor,
            shape: piece.footprint.shape().clone(),
        }
    }
}

impl TryFrom<PieceRecord> for Piece {
    type Error = PuzzleError;

    fn try_from(record: PieceRecord) -> Result<Self> {
        Piece::new(record.id, record.anchor, record.shape)
    }
}

/// Hands out sequential piece ids for one editing or loading session.
#[derive(Debug, Default, Clone)]
pub struct PieceIdAllocator {
    next: u32,
}

impl PieceIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// An allocator whose first id is one past every id in `taken`.
    pub fn after<I: IntoIterator<Item = PieceId>>(taken: I) -> Self {
        let next = taken.into_iter().map(|id| id.0 + 1).max().unwrap_or(0);
        Self { next }
    }

    pub fn next_id(&mut self) -> PieceId {
        let id = PieceId(self.next);
        self.next += 1;
        id
    }
}
