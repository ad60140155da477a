//! Compound moves: rigid groups of interlocked pieces sliding together.
//!
//! Some pieces block each other in a direction so that neither can slide
//! alone, yet both can slide as one body (a cup holding a block, two hooks).
//! For each direction the generator:
//!
//! 1. builds a dependency graph with an edge `P -> Q` when P's shifted cells
//!    hit Q *and* Q's shifted cells hit P; pieces whose shifted cells leave
//!    the board or hit a forbidden cell are anchored,
//! 2. finds its strongly connected components,
//! 3. closes reachability over the component DAG; the candidate group of a
//!    component is every piece it reaches, and a group reaching an anchored
//!    piece is anchored,
//! 4. keeps groups whose combined translation lands on free cells,
//! 5. keeps groups in which no member could slide alone,
//! 6. drops groups whose result equals the result of some single move.

use rustc_hash::FxHashSet;
use tracing::trace;

use crate::canonical::{canonical_key, CanonicalKey};
use crate::geometry::Direction;
use crate::grid::{Occupant, OccupancyIndex, Placement};
use crate::movegen::{self, can_slide, Move};

/// Compound moves of a placement, in direction order.
pub fn compound_moves(placement: &Placement, identity_preserving: bool) -> Vec<Move> {
    movegen::successors(placement, identity_preserving)
        .into_iter()
        .filter(|(mv, _)| mv.is_compound())
        .map(|(mv, _)| mv)
        .collect()
}

/// Compound moves with their resulting placements.
///
/// `singles` holds the single-move successors of the same placement; their
/// keys feed the novelty filter and are only computed if some group survives
/// the geometric filters.
pub(crate) fn compound_successors(
    placement: &Placement,
    occupancy: &OccupancyIndex,
    singles: &[(Move, Placement)],
    identity_preserving: bool,
) -> Vec<(Move, Placement)> {
    let pieces = placement.pieces();
    if pieces.len() < 2 {
        return Vec::new();
    }

    let mut single_keys: Option<FxHashSet<CanonicalKey>> = None;
    let mut out = Vec::new();

    for &direction in placement.extent().directions() {
        for group in interlocked_groups(placement, occupancy, direction) {
            let next = placement.slide(&group, direction);
            let keys = single_keys.get_or_insert_with(|| {
                singles
                    .iter()
                    .map(|(_, result)| canonical_key(result, identity_preserving))
                    .collect()
            });
            if keys.contains(&canonical_key(&next, identity_preserving)) {
                continue;
            }

            let mv = Move::Compound {
                pieces: group.iter().map(|&slot| pieces[slot].id()).collect(),
                direction,
            };
            trace!(%mv, "compound move");
            out.push((mv, next));
        }
    }

    out
}

/// Per-direction blocking relation between pieces.
struct DependencyGraph {
    /// `edges[p]` lists the slots mutually blocking slot `p`.
    edges: Vec<Vec<usize>>,
    anchored: Vec<bool>,
}

impl DependencyGraph {
    fn build(placement: &Placement, occupancy: &OccupancyIndex, direction: Direction) -> Self {
        let delta = direction.delta();
        let pieces = placement.pieces();
        let mut edges: Vec<Vec<usize>> = vec![Vec::new(); pieces.len()];
        let mut anchored = vec![false; pieces.len()];

        for (slot, piece) in pieces.iter().enumerate() {
            for cell in piece.shifted_cells(delta) {
                match occupancy.at(cell) {
                    None | Some(Occupant::Forbidden) => anchored[slot] = true,
                    Some(Occupant::Piece(other)) if other != slot => {
                        if edges[slot].contains(&other) {
                            continue;
                        }
                        // an obstacle that could itself step away is not an interlock
                        let mutual = pieces[other]
                            .shifted_cells(delta)
                            .any(|back| occupancy.piece_at(back) == Some(slot));
                        if mutual {
                            edges[slot].push(other);
                        }
                    }
                    _ => {}
                }
            }
        }

        Self { edges, anchored }
    }
}

/// Candidate groups (sorted slot lists) that pass the geometric filters for
/// one direction: anchoring, group feasibility and the interlock test.
fn interlocked_groups(
    placement: &Placement,
    occupancy: &OccupancyIndex,
    direction: Direction,
) -> Vec<Vec<usize>> {
    let piece_count = placement.pieces().len();
    let graph = DependencyGraph::build(placement, occupancy, direction);
    let components = strongly_connected_components(&graph.edges);

    let mut component_of = vec![0usize; piece_count];
    for (index, members) in components.iter().enumerate() {
        for &slot in members {
            component_of[slot] = index;
        }
    }

    // Tarjan emits a component only after every component it reaches, so a
    // single pass in emission order sees each successor's closure finished.
    let mut closure: Vec<ComponentSet> = Vec::with_capacity(components.len());
    let mut anchored: Vec<bool> = Vec::with_capacity(components.len());
    for (index, members) in components.iter().enumerate() {
        let mut reach = ComponentSet::new(components.len());
        reach.insert(index);
        let mut is_anchored = false;
        for &slot in members {
            is_anchored |= graph.anchored[slot];
            for &next in &graph.edges[slot] {
                let target = component_of[next];
                if target != index {
                    reach.union_with(&closure[target]);
                    is_anchored |= anchored[target];
                }
            }
        }
        closure.push(reach);
        anchored.push(is_anchored);
    }

    let mut seen: FxHashSet<Vec<usize>> = FxHashSet::default();
    let mut in_group = vec![false; piece_count];
    let mut groups = Vec::new();

    for index in 0..components.len() {
        if anchored[index] {
            continue;
        }
        let mut group: Vec<usize> = closure[index]
            .iter()
            .flat_map(|component| components[component].iter().copied())
            .collect();
        if group.len() < 2 {
            continue;
        }
        group.sort_unstable();
        if !seen.insert(group.clone()) {
            continue;
        }

        for &slot in &group {
            in_group[slot] = true;
        }
        let feasible = group_can_slide(placement, occupancy, &group, &in_group, direction);
        for &slot in &group {
            in_group[slot] = false;
        }
        if !feasible {
            continue;
        }

        let interlocked = group
            .iter()
            .all(|&slot| !can_slide(placement, occupancy, slot, direction));
        if interlocked {
            groups.push(group);
        }
    }

    groups
}

/// Whether every member can shift by one cell once the group's own cells are
/// treated as free.
fn group_can_slide(
    placement: &Placement,
    occupancy: &OccupancyIndex,
    group: &[usize],
    in_group: &[bool],
    direction: Direction,
) -> bool {
    let delta = direction.delta();
    group.iter().all(|&slot| {
        placement.pieces()[slot]
            .shifted_cells(delta)
            .all(|cell| match occupancy.at(cell) {
                Some(Occupant::Empty) => true,
                Some(Occupant::Piece(other)) => in_group[other],
                Some(Occupant::Forbidden) | None => false,
            })
    })
}

/// Strongly connected components of a directed graph given as adjacency
/// lists over `0..n`.
///
/// Tarjan's algorithm with an explicit call stack. Components come out in
/// reverse topological order: every component appears after all components
/// it has edges into. Members of a component are in pop order.
pub fn strongly_connected_components(adjacency: &[Vec<usize>]) -> Vec<Vec<usize>> {
    const UNVISITED: usize = usize::MAX;

    let node_count = adjacency.len();
    let mut index = vec![UNVISITED; node_count];
    let mut lowlink = vec![0usize; node_count];
    let mut on_stack = vec![false; node_count];
    let mut stack: Vec<usize> = Vec::new();
    let mut components: Vec<Vec<usize>> = Vec::new();
    let mut next_index = 0usize;

    // (node, position of the next edge to follow)
    let mut call_stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..node_count {
        if index[root] != UNVISITED {
            continue;
        }

        index[root] = next_index;
        lowlink[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;
        call_stack.push((root, 0));

        while let Some(frame) = call_stack.last_mut() {
            let node = frame.0;
            if let Some(&next) = adjacency[node].get(frame.1) {
                frame.1 += 1;
                if index[next] == UNVISITED {
                    index[next] = next_index;
                    lowlink[next] = next_index;
                    next_index += 1;
                    stack.push(next);
                    on_stack[next] = true;
                    call_stack.push((next, 0));
                } else if on_stack[next] {
                    lowlink[node] = lowlink[node].min(index[next]);
                }
                continue;
            }

            call_stack.pop();
            if let Some(&(parent, _)) = call_stack.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[node]);
            }

            if lowlink[node] == index[node] {
                let mut component = Vec::new();
                while let Some(member) = stack.pop() {
                    on_stack[member] = false;
                    component.push(member);
                    if member == node {
                        break;
                    }
                }
                components.push(component);
            }
        }
    }

    components
}

/// Fixed-size bitset over component indices.
#[derive(Clone, Debug)]
struct ComponentSet {
    words: Vec<u64>,
}

impl ComponentSet {
    fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
        }
    }

    #[inline]
    fn insert(&mut self, index: usize) {
        self.words[index / 64] |= 1 << (index % 64);
    }

    #[inline]
    fn union_with(&mut self, other: &ComponentSet) {
        for (word, other_word) in self.words.iter_mut().zip(&other.words) {
            *word |= *other_word;
        }
    }

    fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(word_index, &word)| {
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let bit = bits.trailing_zeros() as usize;
                // clear the lowest set bit
                bits &= bits - 1;
                Some(word_index * 64 + bit)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Extent, PlacementBuilder};
    use crate::movegen::{legal_moves, single_moves};
    use crate::pieces::{Coord, PieceId, Shape};
    use crate::presets;

    fn sorted_components(adjacency: &[Vec<usize>]) -> Vec<Vec<usize>> {
        let mut components: Vec<Vec<usize>> = strongly_connected_components(adjacency)
            .into_iter()
            .map(|mut c| {
                c.sort_unstable();
                c
            })
            .collect();
        components.sort();
        components
    }

    #[test]
    fn test_scc_cycle_and_tail() {
        // 0 -> 1 -> 2 -> 0, 2 -> 3
        let adjacency = vec![vec![1], vec![2], vec![0, 3], vec![]];
        assert_eq!(sorted_components(&adjacency), vec![vec![0, 1, 2], vec![3]]);
    }

    #[test]
    fn test_scc_reverse_topological_order() {
        // 0 -> 1 -> 2, no cycles
        let components = strongly_connected_components(&[vec![1], vec![2], vec![]]);
        assert_eq!(components, vec![vec![2], vec![1], vec![0]]);
    }

    #[test]
    fn test_scc_deep_chain_does_not_overflow() {
        let n = 200_000;
        let mut adjacency: Vec<Vec<usize>> = (0..n).map(|i| vec![(i + 1) % n]).collect();
        adjacency[n - 1].clear();
        assert_eq!(strongly_connected_components(&adjacency).len(), n);

        adjacency[n - 1].push(0);
        assert_eq!(strongly_connected_components(&adjacency).len(), 1);
    }

    #[test]
    fn test_component_set_iterates_members() {
        let mut set = ComponentSet::new(130);
        for index in [0, 63, 64, 129] {
            set.insert(index);
        }
        let mut other = ComponentSet::new(130);
        other.insert(5);
        set.union_with(&other);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 5, 63, 64, 129]);
    }

    #[test]
    fn test_cup_slides_as_one_body() {
        let placement = presets::find("cup").unwrap().placement().unwrap();
        assert!(single_moves(&placement).is_empty());
        assert_eq!(
            compound_moves(&placement, false),
            vec![Move::Compound {
                pieces: vec![PieceId(0), PieceId(1)],
                direction: Direction::PosX,
            }]
        );
    }

    #[test]
    fn test_cup_against_wall_only_slides_back() {
        let cup = vec![(0, 0, 0), (0, 1, 0), (1, 1, 0), (2, 1, 0), (3, 1, 0), (3, 0, 0)];
        let placement = PlacementBuilder::new(Extent::planar(5, 2))
            .piece((1, 0, 0), Shape::Cells(cup))
            .piece((2, 0, 0), Shape::planar_box(2, 1))
            .build()
            .unwrap();
        let moves = compound_moves(&placement, false);
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].direction(), Direction::NegX);
    }

    #[test]
    fn test_plain_obstruction_is_not_an_interlock() {
        // units flank a domino; only the right unit has room
        let placement = PlacementBuilder::new(Extent::planar(5, 1))
            .piece((0, 0, 0), Shape::unit())
            .piece((1, 0, 0), Shape::planar_box(2, 1))
            .piece((3, 0, 0), Shape::unit())
            .build()
            .unwrap();
        assert!(compound_moves(&placement, false).is_empty());
        assert_eq!(
            legal_moves(&placement, false),
            vec![Move::Single {
                piece: PieceId(2),
                direction: Direction::PosX,
            }]
        );
    }

    #[test]
    fn test_jammed_row_has_no_moves() {
        let placement = PlacementBuilder::new(Extent::planar(4, 1))
            .piece((0, 0, 0), Shape::unit())
            .piece((1, 0, 0), Shape::planar_box(2, 1))
            .piece((3, 0, 0), Shape::unit())
            .build()
            .unwrap();
        assert!(legal_moves(&placement, false).is_empty());
    }

    #[test]
    fn test_two_separate_interlocks_yield_two_groups() {
        let cup = vec![(0, 0, 0), (0, 1, 0), (1, 1, 0), (2, 1, 0), (3, 1, 0), (3, 0, 0)];
        let placement = PlacementBuilder::new(Extent::planar(5, 4))
            .piece((0, 0, 0), Shape::Cells(cup.clone()))
            .piece((1, 0, 0), Shape::planar_box(2, 1))
            .piece((0, 2, 0), Shape::Cells(cup))
            .piece((1, 2, 0), Shape::planar_box(2, 1))
            .build()
            .unwrap();
        let moves = compound_moves(&placement, false);
        let groups: Vec<&[PieceId]> = moves.iter().map(Move::piece_ids).collect();
        assert_eq!(
            groups,
            vec![&[PieceId(0), PieceId(1)][..], &[PieceId(2), PieceId(3)][..]]
        );
        assert!(moves.iter().all(|mv| mv.direction() == Direction::PosX));
    }

    #[test]
    fn test_extruded_cup_on_3d_board() {
        let cup: Vec<Coord> = [(0, 0), (0, 1), (1, 1), (2, 1), (3, 1), (3, 0)]
            .into_iter()
            .flat_map(|(x, y)| [(x, y, 0), (x, y, 1)])
            .collect();
        let placement = PlacementBuilder::new(Extent::new(5, 2, 2))
            .piece((0, 0, 0), Shape::Cells(cup))
            .piece((1, 0, 0), Shape::Box(2, 1, 2))
            .build()
            .unwrap();
        assert!(single_moves(&placement).is_empty());
        let moves = compound_moves(&placement, false);
        assert_eq!(moves.len(), 1, "only +x is open: {moves:?}");
        assert_eq!(moves[0].direction(), Direction::PosX);
    }
}
