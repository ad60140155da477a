//! Sliding-Block State Explorer
//!
//! Builds the graph of every placement reachable from a starting sliding-block
//! puzzle (built-in preset or JSON puzzle file), saves it to disk and
//! provides an interactive 3D browser for the saved states.

mod visualization;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use tracing::Level;

use slidegraph::config::{ExploreConfig, Goal, PuzzleFile};
use slidegraph::explorer::{Explorer, StateSpace};
use slidegraph::grid::Placement;
use slidegraph::persistence::{self, DEFAULT_GRAPH_FILE};
use slidegraph::presets::{self, DEFAULT_PRESET, PRESETS};
use slidegraph::Result;

/// Explores the state space of sliding-block puzzles.
#[derive(Parser)]
#[command(name = "slidegraph")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Build the state graph and save it to disk.
    Explore(ExploreArgs),
    /// Show the number of states in a saved graph.
    Count {
        #[arg(long, default_value = DEFAULT_GRAPH_FILE)]
        input: PathBuf,
    },
    /// Browse a saved graph in an interactive 3D viewer.
    Display {
        #[arg(long, default_value = DEFAULT_GRAPH_FILE)]
        input: PathBuf,
    },
    /// List the built-in puzzles.
    Presets,
}

#[derive(Args, Default)]
struct ExploreArgs {
    /// Built-in puzzle to start from.
    #[arg(long, conflicts_with = "puzzle")]
    preset: Option<String>,
    /// JSON puzzle file to start from.
    #[arg(long)]
    puzzle: Option<PathBuf>,
    /// Stop after discovering this many states.
    #[arg(long)]
    max_states: Option<usize>,
    /// Treat same-shaped pieces as distinct.
    #[arg(long)]
    identity: bool,
    /// Where to write the graph.
    #[arg(long, default_value = DEFAULT_GRAPH_FILE)]
    output: PathBuf,
}

/// Starting point of an exploration.
struct Start {
    placement: Placement,
    goal: Option<Goal>,
    config: ExploreConfig,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Command::Explore(args)) => run_explore(&args),
        Some(Command::Count { input }) => run_count(&input),
        Some(Command::Display { input }) => run_display(&input),
        Some(Command::Presets) => {
            run_presets();
            Ok(())
        }
        None => {
            // default: explore the default preset without saving
            resolve_start(&ExploreArgs::default()).map(|start| {
                let space = explore(&start);
                report(&space, start.goal.as_ref());
            })
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolves the puzzle, goal and settings, applying command line overrides.
fn resolve_start(args: &ExploreArgs) -> Result<Start> {
    let mut start = match &args.puzzle {
        Some(path) => {
            let file = PuzzleFile::load(path)?;
            let placement = file.placement()?;
            let goal = file.goal(&placement)?;
            Start {
                placement,
                goal,
                config: file.explore.unwrap_or_default(),
            }
        }
        None => {
            let preset = presets::lookup(args.preset.as_deref().unwrap_or(DEFAULT_PRESET))?;
            Start {
                placement: preset.placement()?,
                goal: preset.goal,
                config: ExploreConfig::default(),
            }
        }
    };

    if let Some(max_states) = args.max_states {
        start.config = start.config.with_max_states(max_states);
    }
    if args.identity {
        start.config = start.config.with_identity_preserving(true);
    }
    start.config.validate()?;
    Ok(start)
}

fn explore(start: &Start) -> StateSpace {
    Explorer::new(start.config).explore(&start.placement)
}

/// Prints the summary, a truncation note and goal hits.
fn report(space: &StateSpace, goal: Option<&Goal>) {
    print!("{}", persistence::format_summary(space));
    if space.is_truncated() {
        println!(
            "Stopped at the cap of {} states; raise --max-states for the full graph",
            space.max_states()
        );
    }
    if let Some(goal) = goal {
        let hits = space.states_matching(goal.predicate());
        match hits.first() {
            Some(first) => println!("{} states meet the goal (first: {first})", hits.len()),
            None => println!("No explored state meets the goal"),
        }
    }
}

fn run_explore(args: &ExploreArgs) -> Result<()> {
    let start = resolve_start(args)?;
    let space = explore(&start);
    report(&space, start.goal.as_ref());

    persistence::save(&space, &args.output)?;
    println!(
        "Wrote {} and {}",
        args.output.display(),
        persistence::summary_path(&args.output).display()
    );
    Ok(())
}

fn run_count(input: &Path) -> Result<()> {
    let count = persistence::count(input)?;
    println!("{count} states");
    Ok(())
}

fn run_display(input: &Path) -> Result<()> {
    let space = persistence::load(input)?;
    println!("Loaded {} states", space.state_count());
    println!("Controls: Left/Right navigate, N follow edge, Up/Down explode, R reset");
    visualization::display(space);
    Ok(())
}

fn run_presets() {
    for preset in PRESETS {
        let marker = if preset.name == DEFAULT_PRESET { " (default)" } else { "" };
        println!("{:<8} {}{marker}", preset.name, preset.description);
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    fn args(preset: &str) -> ExploreArgs {
        ExploreArgs {
            preset: Some(preset.to_string()),
            ..ExploreArgs::default()
        }
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_explore_flags_parse() {
        let cli = Cli::try_parse_from([
            "slidegraph",
            "-v",
            "explore",
            "--preset",
            "cup",
            "--max-states",
            "50",
            "--identity",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        let Some(Command::Explore(args)) = cli.command else {
            panic!("expected the explore command");
        };
        assert_eq!(args.preset.as_deref(), Some("cup"));
        assert_eq!(args.max_states, Some(50));
        assert!(args.identity);
        assert_eq!(args.output, PathBuf::from(DEFAULT_GRAPH_FILE));

        let clash = ["slidegraph", "explore", "--preset", "cup", "--puzzle", "p.json"];
        assert!(Cli::try_parse_from(clash).is_err());
    }

    #[test]
    fn test_overrides_apply() {
        let mut explore_args = args("huarong");
        explore_args.max_states = Some(25);
        explore_args.identity = true;
        let start = resolve_start(&explore_args).unwrap();
        assert_eq!(start.config.max_states, 25);
        assert!(start.config.identity_preserving);
        assert!(start.goal.is_some());

        explore_args.max_states = Some(0);
        assert!(resolve_start(&explore_args).is_err());
        assert!(resolve_start(&args("missing")).is_err());
    }

    #[test]
    fn test_line_summary_snapshot() {
        let space = explore(&resolve_start(&args("line")).unwrap());
        insta::assert_snapshot!(persistence::format_summary(&space), @r"
        3 states (cap 100000, exhausted)
        4 edges
        hashing: interchangeable
        initial:
        01.
        ");
    }

    #[test]
    fn test_cube_state_count() {
        let space = explore(&resolve_start(&args("cube")).unwrap());
        assert_eq!(space.state_count(), 8);
    }
}
