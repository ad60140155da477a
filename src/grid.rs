//! Boards, placements and the per-placement occupancy index.
//!
//! Cells are stored in a flat array indexed x-fastest:
//! `idx = (z * height + y) * width + x`. A [`Board`] keeps a template of that
//! array with its forbidden cells already marked, so building an
//! [`OccupancyIndex`] is a copy of the template plus one write per occupied
//! cell.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{PuzzleError, Result};
use crate::geometry::{sort_zyx, translate, Direction};
use crate::pieces::{Coord, Piece, PieceId, PieceIdAllocator, Shape};

fn one() -> u32 {
    1
}

/// Board dimensions. A depth of 1 makes the board planar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
    #[serde(default = "one")]
    pub depth: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    pub const fn planar(width: u32, height: u32) -> Self {
        Self::new(width, height, 1)
    }

    #[inline]
    pub const fn is_3d(&self) -> bool {
        self.depth > 1
    }

    #[inline]
    pub const fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize * self.depth as usize
    }

    /// Directions pieces may slide along on this board.
    #[inline]
    pub fn directions(&self) -> &'static [Direction] {
        Direction::all(self.is_3d())
    }

    #[inline(always)]
    pub fn contains(&self, (x, y, z): Coord) -> bool {
        x >= 0
            && y >= 0
            && z >= 0
            && (x as u32) < self.width
            && (y as u32) < self.height
            && (z as u32) < self.depth
    }

    /// Flat index of a cell, or `None` outside the board.
    #[inline(always)]
    pub fn index_of(&self, coord: Coord) -> Option<usize> {
        if !self.contains(coord) {
            return None;
        }
        let (x, y, z) = (coord.0 as usize, coord.1 as usize, coord.2 as usize);
        let (w, h) = (self.width as usize, self.height as usize);
        Some((z * h + y) * w + x)
    }

    #[inline]
    pub fn coord_of(&self, index: usize) -> Coord {
        let (w, h) = (self.width as usize, self.height as usize);
        (
            (index % w) as i32,
            ((index / w) % h) as i32,
            (index / (w * h)) as i32,
        )
    }

    /// Whether a cell lies on an outer face of the board.
    ///
    /// The z faces only count on 3D boards.
    pub fn on_boundary(&self, (x, y, z): Coord) -> bool {
        let (w, h, d) = (self.width as i32, self.height as i32, self.depth as i32);
        x == 0
            || y == 0
            || x == w - 1
            || y == h - 1
            || (self.is_3d() && (z == 0 || z == d - 1))
    }
}

/// What covers a cell of a placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Occupant {
    Empty,
    Forbidden,
    /// Index of the piece in [`Placement::pieces`].
    Piece(usize),
}

/// Board extent plus obstacle cells. Shared by every placement of a puzzle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "BoardRecord", try_from = "BoardRecord")]
pub struct Board {
    extent: Extent,
    /// Sorted by z, y, x without duplicates.
    forbidden: Vec<Coord>,
    template: Vec<Occupant>,
}

impl Board {
    pub fn new<I: IntoIterator<Item = Coord>>(extent: Extent, forbidden: I) -> Result<Self> {
        if extent.cell_count() == 0 {
            return Err(PuzzleError::EmptyBoard {
                width: extent.width,
                height: extent.height,
                depth: extent.depth,
            });
        }

        let mut template = vec![Occupant::Empty; extent.cell_count()];
        let mut cells: Vec<Coord> = Vec::new();
        for cell in forbidden {
            let index = extent
                .index_of(cell)
                .ok_or(PuzzleError::ForbiddenOutOfBounds { cell })?;
            template[index] = Occupant::Forbidden;
            cells.push(cell);
        }
        sort_zyx(&mut cells);
        cells.dedup();

        Ok(Self {
            extent,
            forbidden: cells,
            template,
        })
    }

    #[inline]
    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn forbidden(&self) -> &[Coord] {
        &self.forbidden
    }

    #[inline]
    pub fn is_forbidden(&self, coord: Coord) -> bool {
        self.extent
            .index_of(coord)
            .is_some_and(|index| self.template[index] == Occupant::Forbidden)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct BoardRecord {
    #[serde(flatten)]
    extent: Extent,
    #[serde(default)]
    forbidden: Vec<Coord>,
}

impl From<Board> for BoardRecord {
    fn from(board: Board) -> Self {
        Self {
            extent: board.extent,
            forbidden: board.forbidden,
        }
    }
}

impl TryFrom<BoardRecord> for Board {
    type Error = PuzzleError;

    fn try_from(record: BoardRecord) -> Result<Self> {
        Board::new(record.extent, record.forbidden)
    }
}

/// One arrangement of every piece on a board.
///
/// Pieces are kept sorted by id. A placement is never mutated; moves build a
/// new one that shares the board and the piece footprints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "PlacementRecord", try_from = "PlacementRecord")]
pub struct Placement {
    board: Arc<Board>,
    pieces: Vec<Piece>,
}

impl Placement {
    /// Builds a placement, rejecting overlapping, out-of-bounds or
    /// forbidden-cell pieces and duplicate ids.
    pub fn new(board: Arc<Board>, mut pieces: Vec<Piece>) -> Result<Self> {
        pieces.sort_by_key(Piece::id);
        if let Some(pair) = pieces.windows(2).find(|pair| pair[0].id() == pair[1].id()) {
            return Err(PuzzleError::DuplicatePieceId { id: pair[0].id() });
        }

        let extent = board.extent();
        let mut owners: Vec<Option<PieceId>> = vec![None; extent.cell_count()];
        for piece in &pieces {
            let cells = piece.checked_cells().ok_or(PuzzleError::PieceOutOfBounds {
                id: piece.id(),
                cell: piece.anchor(),
            })?;
            for cell in cells {
                let index = extent.index_of(cell).ok_or(PuzzleError::PieceOutOfBounds {
                    id: piece.id(),
                    cell,
                })?;
                if board.is_forbidden(cell) {
                    return Err(PuzzleError::PieceOnForbidden {
                        id: piece.id(),
                        cell,
                    });
                }
                if let Some(first) = owners[index] {
                    return Err(PuzzleError::Overlap {
                        first,
                        second: piece.id(),
                        cell,
                    });
                }
                owners[index] = Some(piece.id());
            }
        }

        Ok(Self { board, pieces })
    }

    /// Builds a placement from pieces already known to be well formed and
    /// sorted by id.
    pub(crate) fn from_sorted_unchecked(board: Arc<Board>, pieces: Vec<Piece>) -> Self {
        debug_assert!(pieces.windows(2).all(|pair| pair[0].id() < pair[1].id()));
        Self { board, pieces }
    }

    #[inline]
    pub fn board(&self) -> &Arc<Board> {
        &self.board
    }

    #[inline]
    pub fn extent(&self) -> Extent {
        self.board.extent()
    }

    #[inline]
    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    /// Position of a piece in [`Placement::pieces`].
    pub fn slot_of(&self, id: PieceId) -> Option<usize> {
        self.pieces.binary_search_by_key(&id, Piece::id).ok()
    }

    pub fn piece(&self, id: PieceId) -> Option<&Piece> {
        self.slot_of(id).map(|slot| &self.pieces[slot])
    }

    pub fn occupancy(&self) -> OccupancyIndex {
        OccupancyIndex::new(self)
    }

    /// A new placement with the pieces at `slots` moved one step along
    /// `direction`. Legality is the caller's concern.
    pub(crate) fn slide(&self, slots: &[usize], direction: Direction) -> Placement {
        let delta = direction.delta();
        let mut pieces = self.pieces.clone();
        for &slot in slots {
            pieces[slot] = pieces[slot].translated(delta);
        }
        Placement::from_sorted_unchecked(Arc::clone(&self.board), pieces)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct PlacementRecord {
    board: Board,
    pieces: Vec<Piece>,
}

impl From<Placement> for PlacementRecord {
    fn from(placement: Placement) -> Self {
        Self {
            board: Arc::unwrap_or_clone(placement.board),
            pieces: placement.pieces,
        }
    }
}

impl TryFrom<PlacementRecord> for Placement {
    type Error = PuzzleError;

    fn try_from(record: PlacementRecord) -> Result<Self> {
        Placement::new(Arc::new(record.board), record.pieces)
    }
}

/// Incrementally assembles a placement, allocating piece ids as it goes.
#[derive(Debug)]
pub struct PlacementBuilder {
    extent: Extent,
    forbidden: Vec<Coord>,
    pieces: Vec<(PieceId, Coord, Shape)>,
    ids: PieceIdAllocator,
}

impl PlacementBuilder {
    pub fn new(extent: Extent) -> Self {
        Self {
            extent,
            forbidden: Vec::new(),
            pieces: Vec::new(),
            ids: PieceIdAllocator::new(),
        }
    }

    pub fn forbid(mut self, cell: Coord) -> Self {
        self.forbidden.push(cell);
        self
    }

    /// Adds a piece under the next free id.
    pub fn piece(mut self, anchor: Coord, shape: Shape) -> Self {
        let id = self.ids.next_id();
        self.pieces.push((id, anchor, shape));
        self
    }

    pub fn build(self) -> Result<Placement> {
        let board = Arc::new(Board::new(self.extent, self.forbidden)?);
        let pieces = self
            .pieces
            .into_iter()
            .map(|(id, anchor, shape)| Piece::new(id, anchor, shape))
            .collect::<Result<Vec<_>>>()?;
        Placement::new(board, pieces)
    }
}

/// Cell lookup table for one placement.
#[derive(Clone, Debug)]
pub struct OccupancyIndex {
    extent: Extent,
    cells: Vec<Occupant>,
}

impl OccupancyIndex {
    pub fn new(placement: &Placement) -> Self {
        let extent = placement.extent();
        let mut cells = placement.board.template.clone();
        for (slot, piece) in placement.pieces.iter().enumerate() {
            for cell in piece.cells() {
                if let Some(index) = extent.index_of(cell) {
                    cells[index] = Occupant::Piece(slot);
                }
            }
        }
        Self { extent, cells }
    }

    #[inline]
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// What covers `coord`, or `None` outside the board.
    #[inline(always)]
    pub fn at(&self, coord: Coord) -> Option<Occupant> {
        self.extent.index_of(coord).map(|index| self.cells[index])
    }

    /// Slot of the piece covering `coord`, if any.
    #[inline]
    pub fn piece_at(&self, coord: Coord) -> Option<usize> {
        match self.at(coord) {
            Some(Occupant::Piece(slot)) => Some(slot),
            _ => None,
        }
    }

    /// Splits empty cells into those connected to the board boundary and
    /// sealed cavities.
    ///
    /// A multi-source flood fill starts from every empty boundary cell and
    /// spreads through face-adjacent empty cells. Remaining empty cells are
    /// grouped into connected cavities, numbered in scan order.
    pub fn classify_empty_space(&self) -> EmptySpace {
        let extent = self.extent;
        let directions = extent.directions();
        let mut regions: Vec<Option<Region>> = vec![None; self.cells.len()];
        let mut queue: VecDeque<usize> = VecDeque::new();

        for (index, occupant) in self.cells.iter().enumerate() {
            if *occupant == Occupant::Empty && extent.on_boundary(extent.coord_of(index)) {
                regions[index] = Some(Region::Open);
                queue.push_back(index);
            }
        }
        self.flood(&mut regions, &mut queue, Region::Open, directions);

        let mut cavities: Vec<Vec<Coord>> = Vec::new();
        for index in 0..self.cells.len() {
            if self.cells[index] != Occupant::Empty || regions[index].is_some() {
                continue;
            }
            let region = Region::Cavity(cavities.len());
            regions[index] = Some(region);
            queue.push_back(index);
            self.flood(&mut regions, &mut queue, region, directions);

            let mut members: Vec<Coord> = regions
                .iter()
                .enumerate()
                .filter(|(_, r)| **r == Some(region))
                .map(|(i, _)| extent.coord_of(i))
                .collect();
            sort_zyx(&mut members);
            cavities.push(members);
        }

        EmptySpace {
            extent,
            regions,
            cavities,
        }
    }

    fn flood(
        &self,
        regions: &mut [Option<Region>],
        queue: &mut VecDeque<usize>,
        region: Region,
        directions: &[Direction],
    ) {
        while let Some(index) = queue.pop_front() {
            let coord = self.extent.coord_of(index);
            for direction in directions {
                let Some(next) = self.extent.index_of(translate(coord, direction.delta())) else {
                    continue;
                };
                if self.cells[next] == Occupant::Empty && regions[next].is_none() {
                    regions[next] = Some(region);
                    queue.push_back(next);
                }
            }
        }
    }
}

/// Builds the occupancy index of a placement.
pub fn occupancy_index(placement: &Placement) -> OccupancyIndex {
    OccupancyIndex::new(placement)
}

/// Classifies the empty cells of a placement into open space and cavities.
pub fn classify_empty_space(placement: &Placement) -> EmptySpace {
    placement.occupancy().classify_empty_space()
}

/// Connectivity class of an empty cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Region {
    /// Reachable from the board boundary through empty cells.
    Open,
    /// Sealed pocket, numbered by discovery order.
    Cavity(usize),
}

/// Result of [`classify_empty_space`].
#[derive(Clone, Debug)]
pub struct EmptySpace {
    extent: Extent,
    regions: Vec<Option<Region>>,
    cavities: Vec<Vec<Coord>>,
}

impl EmptySpace {
    /// Region of an empty cell; `None` for covered or out-of-bounds cells.
    pub fn region_at(&self, coord: Coord) -> Option<Region> {
        self.extent.index_of(coord).and_then(|index| self.regions[index])
    }

    pub fn cavities(&self) -> &[Vec<Coord>] {
        &self.cavities
    }

    pub fn cavity_count(&self) -> usize {
        self.cavities.len()
    }

    pub fn open_cell_count(&self) -> usize {
        self.regions
            .iter()
            .filter(|r| **r == Some(Region::Open))
            .count()
    }
}

/// Label character for a piece id: 0-9, then A-Z, then a-z.
fn piece_char(id: PieceId) -> char {
    match id.0 {
        n @ 0..=9 => char::from(b'0' + n as u8),
        n @ 10..=35 => char::from(b'A' + (n - 10) as u8),
        n @ 36..=61 => char::from(b'a' + (n - 36) as u8),
        _ => '*',
    }
}

/// Formats a placement as a human-readable grid.
///
/// Rows run from the top (`y = height - 1`) to the bottom. 3D boards show
/// their z-slices side by side under a `z=` header. Empty cells print as
/// `.`, forbidden cells as `#`, pieces by id.
pub fn format_placement(placement: &Placement) -> String {
    let extent = placement.extent();
    let occupancy = placement.occupancy();
    let (w, h, d) = (extent.width as i32, extent.height as i32, extent.depth as i32);

    let mut output = String::new();
    if extent.is_3d() {
        for z in 0..d {
            if z > 0 {
                output.push_str("  ");
            }
            output.push_str(&format!("z={:<width$}", z, width = (w as usize).saturating_sub(2)));
        }
        output.push('\n');
    }

    for y in (0..h).rev() {
        for z in 0..d {
            if z > 0 {
                output.push_str("  ");
            }
            for x in 0..w {
                let display_char = match occupancy.at((x, y, z)) {
                    Some(Occupant::Piece(slot)) => piece_char(placement.pieces[slot].id()),
                    Some(Occupant::Forbidden) => '#',
                    _ => '.',
                };
                output.push(display_char);
            }
        }
        output.push('\n');
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(id: u32, anchor: Coord) -> Piece {
        Piece::new(PieceId(id), anchor, Shape::unit()).unwrap()
    }

    #[test]
    fn test_index_roundtrip_3d() {
        let extent = Extent::new(3, 4, 2);
        for index in 0..extent.cell_count() {
            let coord = extent.coord_of(index);
            assert!(extent.contains(coord), "coord_of({index}) left the board");
            assert_eq!(extent.index_of(coord), Some(index));
        }
        assert_eq!(extent.index_of((3, 0, 0)), None);
        assert_eq!(extent.index_of((0, -1, 0)), None);
    }

    #[test]
    fn test_placement_rejects_overlap() {
        let board = Arc::new(Board::new(Extent::planar(3, 1), []).unwrap());
        let err = Placement::new(board, vec![unit(0, (1, 0, 0)), unit(1, (1, 0, 0))]).unwrap_err();
        assert!(matches!(
            err,
            PuzzleError::Overlap {
                first: PieceId(0),
                second: PieceId(1),
                cell: (1, 0, 0)
            }
        ));
    }

    #[test]
    fn test_placement_rejects_out_of_bounds_and_forbidden() {
        let board = Arc::new(Board::new(Extent::planar(3, 1), [(2, 0, 0)]).unwrap());
        assert!(matches!(
            Placement::new(Arc::clone(&board), vec![unit(0, (3, 0, 0))]),
            Err(PuzzleError::PieceOutOfBounds { .. })
        ));
        assert!(matches!(
            Placement::new(board, vec![unit(0, (2, 0, 0))]),
            Err(PuzzleError::PieceOnForbidden { .. })
        ));
    }

    #[test]
    fn test_placement_sorts_pieces_by_id() {
        let board = Arc::new(Board::new(Extent::planar(3, 1), []).unwrap());
        let placement = Placement::new(board, vec![unit(7, (0, 0, 0)), unit(2, (2, 0, 0))]).unwrap();
        let ids: Vec<u32> = placement.pieces().iter().map(|p| p.id().0).collect();
        assert_eq!(ids, vec![2, 7]);
        assert_eq!(placement.slot_of(PieceId(7)), Some(1));
        assert_eq!(placement.slot_of(PieceId(3)), None);
    }

    #[test]
    fn test_occupancy_lookup() {
        let placement = PlacementBuilder::new(Extent::planar(3, 2))
            .forbid((2, 1, 0))
            .piece((0, 0, 0), Shape::planar_box(2, 1))
            .build()
            .unwrap();
        let occupancy = occupancy_index(&placement);
        assert_eq!(occupancy.at((1, 0, 0)), Some(Occupant::Piece(0)));
        assert_eq!(occupancy.at((2, 1, 0)), Some(Occupant::Forbidden));
        assert_eq!(occupancy.at((2, 0, 0)), Some(Occupant::Empty));
        assert_eq!(occupancy.at((3, 0, 0)), None);
    }

    #[test]
    fn test_cavity_inside_ring() {
        let ring: Vec<Coord> = (0..3)
            .flat_map(|y| (0..3).map(move |x| (x, y, 0)))
            .filter(|&c| c != (1, 1, 0))
            .collect();
        let placement = PlacementBuilder::new(Extent::planar(5, 3))
            .piece((0, 0, 0), Shape::Cells(ring))
            .build()
            .unwrap();
        let space = classify_empty_space(&placement);
        assert_eq!(space.cavity_count(), 1);
        assert_eq!(space.cavities()[0], vec![(1, 1, 0)]);
        assert_eq!(space.region_at((1, 1, 0)), Some(Region::Cavity(0)));
        assert_eq!(space.region_at((4, 1, 0)), Some(Region::Open));
        assert_eq!(space.region_at((0, 0, 0)), None);
        assert_eq!(space.open_cell_count(), 6);
    }

    #[test]
    fn test_3d_interior_hole_is_cavity() {
        let shell: Vec<Coord> = (0..3)
            .flat_map(|z| (0..3).flat_map(move |y| (0..3).map(move |x| (x, y, z))))
            .filter(|&c| c != (1, 1, 1))
            .collect();
        let placement = PlacementBuilder::new(Extent::new(3, 3, 3))
            .piece((0, 0, 0), Shape::Cells(shell))
            .build()
            .unwrap();
        let space = classify_empty_space(&placement);
        assert_eq!(space.cavities(), &[vec![(1, 1, 1)]]);
    }

    #[test]
    fn test_format_placement_2d() {
        let placement = PlacementBuilder::new(Extent::planar(4, 3))
            .forbid((3, 2, 0))
            .piece((0, 1, 0), Shape::planar_box(2, 2))
            .piece((2, 0, 0), Shape::unit())
            .build()
            .unwrap();
        insta::assert_snapshot!(format_placement(&placement), @r"
        00.#
        00..
        ..1.
        ");
    }

    #[test]
    fn test_format_placement_3d_slices() {
        let placement = PlacementBuilder::new(Extent::new(2, 2, 2))
            .piece((0, 0, 0), Shape::Box(1, 1, 2))
            .piece((1, 1, 1), Shape::unit())
            .build()
            .unwrap();
        insta::assert_snapshot!(format_placement(&placement), @r"
        z=0  z=1
        ..  .1
        0.  0.
        ");
    }
}
