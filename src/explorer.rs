//! Breadth-first construction of the state graph.
//!
//! States are numbered in discovery order starting from the initial placement
//! (id 0). The frontier is FIFO and move enumeration order is fixed, so a
//! given initial placement, cap and hashing mode always yield the same ids,
//! edges and neighbor lists.

use std::collections::VecDeque;
use std::fmt;
use std::ops::ControlFlow;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::canonical::{canonical_key, CanonicalKey};
use crate::config::ExploreConfig;
use crate::error::{PuzzleError, Result};
use crate::grid::Placement;
use crate::movegen::successors;

/// Index of a state in discovery order.
pub type StateId = usize;

/// A directed transition `(source, target)`.
pub type Edge = (StateId, StateId);

/// Why a build stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Termination {
    /// Every reachable state was discovered and expanded.
    Exhausted,
    /// The state cap was hit; the graph is a prefix of the reachable set.
    Truncated,
    /// The progress callback asked to stop.
    Cancelled,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Termination::Exhausted => "exhausted",
            Termination::Truncated => "truncated",
            Termination::Cancelled => "cancelled",
        })
    }
}

/// Snapshot handed to the progress callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub expanded: usize,
    pub discovered: usize,
    pub frontier: usize,
    pub edges: usize,
}

/// The graph of placements reachable from an initial one.
#[derive(Clone, Debug)]
pub struct StateSpace {
    states: Vec<Placement>,
    index: FxHashMap<CanonicalKey, StateId>,
    edges: Vec<Edge>,
    neighbors: Vec<Vec<StateId>>,
    identity_preserving: bool,
    max_states: usize,
    termination: Termination,
}

impl StateSpace {
    fn start(initial: &Placement, identity_preserving: bool, max_states: usize) -> Self {
        let mut index = FxHashMap::default();
        index.insert(canonical_key(initial, identity_preserving), 0);
        Self {
            states: vec![initial.clone()],
            index,
            edges: Vec::new(),
            neighbors: vec![Vec::new()],
            identity_preserving,
            max_states,
            termination: Termination::Exhausted,
        }
    }

    /// Reassembles a graph from stored parts, rebuilding the key index.
    pub(crate) fn from_parts(
        states: Vec<Placement>,
        neighbors: Vec<Vec<StateId>>,
        edges: Vec<Edge>,
        identity_preserving: bool,
        max_states: usize,
        termination: Termination,
    ) -> Result<Self> {
        if states.is_empty() {
            return Err(PuzzleError::corrupt("graph has no states"));
        }
        if neighbors.len() != states.len() {
            return Err(PuzzleError::corrupt(format!(
                "{} neighbor lists for {} states",
                neighbors.len(),
                states.len()
            )));
        }
        let count = states.len();
        if let Some(&(source, target)) = edges
            .iter()
            .find(|&&(source, target)| source >= count || target >= count)
        {
            return Err(PuzzleError::corrupt(format!(
                "edge {source}->{target} leaves the graph"
            )));
        }
        for (id, list) in neighbors.iter().enumerate() {
            if let Some(&bad) = list.iter().find(|&&n| n >= count) {
                return Err(PuzzleError::corrupt(format!(
                    "state {id} lists unknown neighbor {bad}"
                )));
            }
        }

        let mut index = FxHashMap::default();
        for (id, state) in states.iter().enumerate() {
            if let Some(first) = index.insert(canonical_key(state, identity_preserving), id) {
                return Err(PuzzleError::corrupt(format!(
                    "states {first} and {id} are the same placement"
                )));
            }
        }

        Ok(Self {
            states,
            index,
            edges,
            neighbors,
            identity_preserving,
            max_states,
            termination,
        })
    }

    /// Always 0.
    pub fn initial(&self) -> StateId {
        0
    }

    pub fn states(&self) -> &[Placement] {
        &self.states
    }

    pub fn state(&self, id: StateId) -> Option<&Placement> {
        self.states.get(id)
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Every recorded transition, in discovery order. Two moves between the
    /// same pair of states give two entries.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Distinct successors of `id` in first-seen order.
    pub fn neighbors(&self, id: StateId) -> &[StateId] {
        self.neighbors.get(id).map_or(&[], Vec::as_slice)
    }

    pub fn identity_preserving(&self) -> bool {
        self.identity_preserving
    }

    pub fn max_states(&self) -> usize {
        self.max_states
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    pub fn is_truncated(&self) -> bool {
        self.termination == Termination::Truncated
    }

    /// Id of the state equivalent to `placement` under this graph's hashing
    /// mode.
    pub fn find(&self, placement: &Placement) -> Option<StateId> {
        self.index
            .get(&canonical_key(placement, self.identity_preserving))
            .copied()
    }

    /// Ids of every state accepted by `predicate`, ascending.
    pub fn states_matching<F>(&self, predicate: F) -> Vec<StateId>
    where
        F: Fn(&Placement) -> bool,
    {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, state)| predicate(state))
            .map(|(id, _)| id)
            .collect()
    }
}

type ProgressFn<'a> = Box<dyn FnMut(Progress) -> ControlFlow<()> + 'a>;

/// Configurable state-space builder.
pub struct Explorer<'a> {
    config: ExploreConfig,
    progress: Option<ProgressFn<'a>>,
}

impl<'a> Explorer<'a> {
    pub fn new(config: ExploreConfig) -> Self {
        Self {
            config,
            progress: None,
        }
    }

    /// Installs a callback run every `progress_interval` expanded
    /// placements. Returning `ControlFlow::Break` stops the build and marks
    /// the result [`Termination::Cancelled`].
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: FnMut(Progress) -> ControlFlow<()> + 'a,
    {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Runs the breadth-first build from `initial`.
    ///
    /// A zero cap is treated as 1: the initial placement is always a state.
    pub fn explore(&mut self, initial: &Placement) -> StateSpace {
        let cap = self.config.max_states.max(1);
        let interval = self.config.progress_interval.max(1);
        let identity_preserving = self.config.identity_preserving;

        info!(
            pieces = initial.pieces().len(),
            max_states = cap,
            identity_preserving,
            "building state space"
        );

        let mut space = StateSpace::start(initial, identity_preserving, cap);
        let mut frontier: VecDeque<StateId> = VecDeque::from([0]);
        let mut expanded = 0usize;
        let mut dropped = false;

        while space.states.len() < cap {
            let Some(current) = frontier.pop_front() else {
                break;
            };

            let moves = successors(&space.states[current], identity_preserving);
            for (_, next) in moves {
                let key = canonical_key(&next, identity_preserving);
                let target = match space.index.get(&key) {
                    Some(&id) => id,
                    None if space.states.len() < cap => {
                        let id = space.states.len();
                        space.index.insert(key, id);
                        space.states.push(next);
                        space.neighbors.push(Vec::new());
                        frontier.push_back(id);
                        id
                    }
                    None => {
                        dropped = true;
                        continue;
                    }
                };

                space.edges.push((current, target));
                let list = &mut space.neighbors[current];
                if !list.contains(&target) {
                    list.push(target);
                }
            }

            expanded += 1;
            if expanded % interval == 0 {
                let snapshot = Progress {
                    expanded,
                    discovered: space.states.len(),
                    frontier: frontier.len(),
                    edges: space.edges.len(),
                };
                debug!(
                    expanded,
                    discovered = snapshot.discovered,
                    frontier = snapshot.frontier,
                    "exploring"
                );
                if let Some(callback) = self.progress.as_mut() {
                    if callback(snapshot).is_break() {
                        space.termination = Termination::Cancelled;
                        break;
                    }
                }
            }
        }

        if space.termination != Termination::Cancelled && (dropped || !frontier.is_empty()) {
            space.termination = Termination::Truncated;
        }

        info!(
            states = space.states.len(),
            edges = space.edges.len(),
            termination = %space.termination,
            "state space built"
        );

        space
    }
}

/// Builds the state graph reachable from `initial`, keeping at most
/// `max_states` states.
pub fn build(initial: &Placement, max_states: usize, identity_preserving: bool) -> StateSpace {
    let config = ExploreConfig::default()
        .with_max_states(max_states)
        .with_identity_preserving(identity_preserving);
    Explorer::new(config).explore(initial)
}
