//! Saving and loading state graphs.
//!
//! Graphs are stored as JSON:
//! - `state_count`, `initial`, `identity_preserving`, `max_states`,
//!   `termination`
//! - `board`: extent and forbidden cells, shared by every state
//! - `states`: `{ id, pieces, neighbors }` in id order
//! - `edges`: `[source, target]` pairs in discovery order
//!
//! [`save`] also writes a text listing next to the JSON file.

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{PuzzleError, Result};
use crate::explorer::{Edge, StateId, StateSpace, Termination};
use crate::grid::{format_placement, Board, Placement};
use crate::pieces::Piece;

/// Default file name used by the command line tool.
pub const DEFAULT_GRAPH_FILE: &str = "states.json";

#[derive(Serialize, Deserialize)]
struct GraphRecord {
    state_count: usize,
    initial: StateId,
    identity_preserving: bool,
    max_states: usize,
    termination: Termination,
    board: Board,
    states: Vec<StateRecord>,
    edges: Vec<Edge>,
}

#[derive(Serialize, Deserialize)]
struct StateRecord {
    id: StateId,
    pieces: Vec<Piece>,
    neighbors: Vec<StateId>,
}

/// The one field of a graph file read by [`count`].
#[derive(Deserialize)]
struct GraphHeader {
    state_count: usize,
}

fn record_of(space: &StateSpace) -> GraphRecord {
    let board = Board::clone(space.states()[space.initial()].board());
    let states = space
        .states()
        .iter()
        .enumerate()
        .map(|(id, state)| StateRecord {
            id,
            pieces: state.pieces().to_vec(),
            neighbors: space.neighbors(id).to_vec(),
        })
        .collect();

    GraphRecord {
        state_count: space.state_count(),
        initial: space.initial(),
        identity_preserving: space.identity_preserving(),
        max_states: space.max_states(),
        termination: space.termination(),
        board,
        states,
        edges: space.edges().to_vec(),
    }
}

fn space_of(record: GraphRecord) -> Result<StateSpace> {
    if record.state_count != record.states.len() {
        return Err(PuzzleError::corrupt(format!(
            "header says {} states, found {}",
            record.state_count,
            record.states.len()
        )));
    }
    if record.initial != 0 {
        return Err(PuzzleError::corrupt(format!(
            "initial state must be 0, got {}",
            record.initial
        )));
    }

    let board = Arc::new(record.board);
    let mut states = Vec::with_capacity(record.states.len());
    let mut neighbors = Vec::with_capacity(record.states.len());
    for (expected, state) in record.states.into_iter().enumerate() {
        if state.id != expected {
            return Err(PuzzleError::corrupt(format!(
                "state ids are not contiguous: expected {expected}, got {}",
                state.id
            )));
        }
        states.push(Placement::new(Arc::clone(&board), state.pieces)?);
        neighbors.push(state.neighbors);
    }

    StateSpace::from_parts(
        states,
        neighbors,
        record.edges,
        record.identity_preserving,
        record.max_states,
        record.termination,
    )
}

/// Serializes a graph to a JSON string.
pub fn export(space: &StateSpace) -> Result<String> {
    Ok(serde_json::to_string(&record_of(space))?)
}

/// Rebuilds a graph from [`export`] output, checking that ids, neighbor
/// lists and edges are consistent.
pub fn import(json: &str) -> Result<StateSpace> {
    space_of(serde_json::from_str(json)?)
}

/// Path of the text listing written next to a graph file.
pub fn summary_path(path: &Path) -> PathBuf {
    path.with_extension("txt")
}

/// Writes the graph as JSON to `path` and a text listing beside it.
pub fn save(space: &StateSpace, path: &Path) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut file, &record_of(space))?;
    file.flush()?;
    save_text(space, &summary_path(path))?;
    Ok(())
}

fn save_text(space: &StateSpace, path: &Path) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    writeln!(file, "{}", format_summary(space))?;
    for (id, state) in space.states().iter().enumerate() {
        writeln!(file, "State {id} -> {:?}:", space.neighbors(id))?;
        write!(file, "{}", format_placement(state))?;
        writeln!(file)?;
    }
    file.flush()?;
    Ok(())
}

pub fn load(path: &Path) -> Result<StateSpace> {
    import(&fs::read_to_string(path)?)
}

/// The state count of a saved graph.
///
/// The file is streamed through a buffered reader and only `state_count` is
/// decoded; states and edges are skipped, not built.
pub fn count(path: &Path) -> Result<usize> {
    let header: GraphHeader = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    Ok(header.state_count)
}

/// Short description of a graph: sizes, termination and the initial
/// placement.
pub fn format_summary(space: &StateSpace) -> String {
    let mut output = String::new();
    let hashing = if space.identity_preserving() {
        "identity-preserving"
    } else {
        "interchangeable"
    };
    let _ = writeln!(
        output,
        "{} states (cap {}, {})",
        space.state_count(),
        space.max_states(),
        space.termination()
    );
    let _ = writeln!(output, "{} edges", space.edge_count());
    let _ = writeln!(output, "hashing: {hashing}");
    output.push_str("initial:\n");
    output.push_str(&format_placement(&space.states()[space.initial()]));
    output
}
