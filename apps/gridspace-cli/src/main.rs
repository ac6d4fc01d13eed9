use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use gridspace_common::WorldPoint;
use gridspace_grid::{AreaOfInterest, GridConfig, WorldGrid};
use gridspace_sim::{AgentKind, Simulation};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gridspace-cli", about = "CLI tool for gridspace operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Grid config file (.yaml, .yml or .json); defaults to a 100x100 world of 10x10 cells
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate versions
    Info,
    /// Describe the grid layout
    Layout {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Populate a world and list agents visited by a neighborhood query
    Query {
        /// Focus point as X,Y in world units
        #[arg(long, default_value = "50,50")]
        at: Coord,
        /// Radius in cells (values <= 0 mean 1)
        #[arg(short, long, default_value = "1")]
        radius: i32,
        /// Number of agents to scatter
        #[arg(short, long, default_value = "200")]
        agents: usize,
        /// RNG seed used to scatter agents
        #[arg(short, long, default_value = "42")]
        seed: u64,
    },
    /// Print the cell span between two world points
    Span {
        /// Source point as X,Y
        #[arg(long)]
        from: Coord,
        /// Target point as X,Y
        #[arg(long)]
        to: Coord,
    },
    /// Run a random-walk simulation and track a view around the first agent
    Simulate {
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "100")]
        ticks: u64,
        /// Number of agents to spawn
        #[arg(short, long, default_value = "100")]
        agents: usize,
        /// RNG seed for deterministic replay
        #[arg(short, long, default_value = "42")]
        seed: u64,
        /// View radius in cells
        #[arg(short, long, default_value = "1")]
        radius: i32,
    },
}

/// An `X,Y` pair parsed from the command line.
#[derive(Debug, Clone, Copy)]
struct Coord(WorldPoint);

impl FromStr for Coord {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| format!("expected X,Y, got {s:?}"))?;
        let x = x.trim().parse().map_err(|e| format!("bad X in {s:?}: {e}"))?;
        let y = y.trim().parse().map_err(|e| format!("bad Y in {s:?}: {e}"))?;
        Ok(Coord(WorldPoint::new(x, y)))
    }
}

#[derive(Serialize)]
struct LayoutReport {
    config: GridConfig,
    cell_count_x: i32,
    cell_count_y: i32,
    cells: usize,
    last_cell: Option<gridspace_grid::CellBounds>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config = match &cli.config {
        Some(path) => GridConfig::load(path)
            .with_context(|| format!("loading grid config from {}", path.display()))?,
        None => GridConfig::default(),
    };

    match cli.command {
        Commands::Info => {
            println!("gridspace-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("grid: {}", gridspace_grid::crate_info());
        }
        Commands::Layout { json } => {
            let grid: WorldGrid<gridspace_sim::Agent> = WorldGrid::new(config)?;
            let report = LayoutReport {
                config: *grid.config(),
                cell_count_x: grid.cell_count_x(),
                cell_count_y: grid.cell_count_y(),
                cells: grid.len(),
                last_cell: grid.cells().last().map(|c| c.bounds()),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let c = report.config;
                println!("world: {}x{}", c.world_width, c.world_height);
                println!("cell: {}x{}", c.cell_width, c.cell_height);
                println!(
                    "cells: {}x{} = {}",
                    report.cell_count_x, report.cell_count_y, report.cells
                );
                if let Some(b) = report.last_cell {
                    println!(
                        "last cell: x=[{}, {}] y=[{}, {}]",
                        b.min_x, b.max_x, b.min_y, b.max_y
                    );
                }
            }
        }
        Commands::Query {
            at,
            radius,
            agents,
            seed,
        } => {
            let sim = scatter(config, agents, seed)?;
            let focus = at.0;
            let focus_cell = sim
                .grid()
                .cell_at(&focus)
                .with_context(|| format!("focus {focus} is outside the world"))?;
            let ids = sim.nearby(&focus, radius);
            println!(
                "Query at {focus} (cell {}), radius {radius}: {} of {} agents",
                focus_cell.id(),
                ids.len(),
                sim.agent_count()
            );
            for id in ids {
                if let (Some(pos), Some(agent)) = (sim.position(id), sim.agent(id)) {
                    println!("  {id} {:?} at {pos}", agent.kind);
                }
            }
        }
        Commands::Span { from, to } => {
            let grid: WorldGrid<gridspace_sim::Agent> = WorldGrid::new(config)?;
            let span = grid.cell_span(&from.0, &to.0);
            let rendered: Vec<String> = span
                .iter()
                .map(|c| c.map_or_else(|| "-".to_string(), |c| c.id().to_string()))
                .collect();
            println!("Span {} -> {}: {} entries", from.0, to.0, span.len());
            println!("{}", rendered.join(" "));
        }
        Commands::Simulate {
            ticks,
            agents,
            seed,
            radius,
        } => {
            let mut sim = scatter(config, agents, seed)?;
            let observer = sim.agent_ids().next();
            let mut view = AreaOfInterest::new(radius);
            let mut entered = 0usize;
            let mut left = 0usize;

            for _ in 0..ticks {
                sim.step()?;
                if let Some(pos) = observer.and_then(|id| sim.position(id)) {
                    let delta = view.update(sim.grid(), &pos);
                    entered += delta.entered.len();
                    left += delta.left.len();
                }
            }

            let replayed = Simulation::replay(config, sim.events())?;
            println!(
                "Simulated {ticks} ticks: agents={}, seed={:#x}, hash={:#x}",
                sim.agent_count(),
                sim.seed(),
                sim.state_hash()
            );
            if let Some(id) = observer {
                println!(
                    "Observer {id}: visible={}, entered={entered}, left={left}",
                    view.visible().len()
                );
            }
            println!(
                "Replay: {}",
                if replayed.state_hash() == sim.state_hash() {
                    "OK"
                } else {
                    "MISMATCH"
                }
            );
        }
    }

    Ok(())
}

/// Build a simulation with `count` agents at seeded pseudo-random positions.
fn scatter(config: GridConfig, count: usize, seed: u64) -> anyhow::Result<Simulation> {
    let mut sim = Simulation::new(config, seed)?;
    let (w, h) = (sim.grid().width() as u64, sim.grid().height() as u64);
    let mut state = seed;
    for i in 0..count {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        let x = ((state >> 33) % w) as i32;
        let y = ((state >> 11) % h) as i32;
        sim.spawn(AgentKind::ALL[i % AgentKind::ALL.len()], WorldPoint::new(x, y))?;
    }
    tracing::info!(agents = count, seed, "world populated");
    Ok(sim)
}
