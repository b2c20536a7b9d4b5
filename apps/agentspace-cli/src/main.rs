use std::path::{Path, PathBuf};
use std::sync::Arc;

use agentspace_common::{Agent, Coordinate, HazardCategory, Identified, Task};
use agentspace_kernel::{Allocation, SessionConfig, WorldState};
use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agentspace-cli", about = "CLI driver for agentspace session state")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML file with session configuration overrides
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate info and the effective session configuration
    Info,
    /// Drive a session with concurrent handlers and a tick loop
    Simulate {
        /// Number of simulation ticks
        #[arg(short, long, default_value = "100")]
        ticks: u64,
        /// Number of concurrent handler threads
        #[arg(long, default_value = "4")]
        handlers: usize,
        /// Requests issued by each handler
        #[arg(long, default_value = "50")]
        hits: usize,
        /// Print the final snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Register one transient hazard hit and report when it expires
    Decay {
        /// Maximum number of ticks to run
        #[arg(short, long, default_value = "2000")]
        ticks: u64,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SessionConfig> {
    let Some(path) = path else {
        return Ok(SessionConfig::default());
    };
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening config {}", path.display()))?;
    let config = serde_yaml::from_reader(file)
        .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}

/// Spread request locations around a centre so handlers hit distinct cells.
fn request_location(centre: Coordinate, handler: usize, request: usize) -> Coordinate {
    Coordinate::new(
        centre.latitude + handler as f64 * 0.001,
        centre.longitude + request as f64 * 0.0002,
    )
}

fn simulate(world: &Arc<WorldState>, ticks: u64, handlers: usize, hits: usize) {
    let centre = Coordinate::new(50.9355, -1.3960);
    world.set_game_id("cli-simulation");
    world.set_game_centre(centre);
    world.set_in_progress(true);

    std::thread::scope(|s| {
        for handler in 0..handlers {
            let world = Arc::clone(world);
            s.spawn(move || {
                for request in 0..hits {
                    let location = request_location(centre, handler, request);
                    let agent = Agent::new(location, (request * 15 % 360) as f64);
                    let task = Task::new(location);
                    let pair = Allocation::from([(agent.id().to_string(), task.id().to_string())]);
                    if let Err(err) = world.add_agent(agent) {
                        tracing::error!(%err, "handler failed to add agent");
                    }
                    if let Err(err) = world.add_task(task) {
                        tracing::error!(%err, "handler failed to add task");
                    }
                    // Codes cycle through -1, 0, 1 and one unrecognized value.
                    let code = (request % 4) as i32 - 1;
                    world.add_hazard_hit(code, location);
                    world.set_temp_allocation(Some(pair));
                }
            });
        }

        let world = Arc::clone(world);
        s.spawn(move || {
            let mut expired = 0;
            for _ in 0..ticks {
                world.increment_time(1.0);
                expired += world.decay_hazard_hits();
            }
            info!(ticks, expired, "tick driver finished");
        });
    });

    world.set_allocation(world.temp_allocation());
    world.set_temp_allocation(None);
    world.set_in_progress(false);
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Info => {
            println!("agentspace-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("kernel: {}", agentspace_kernel::crate_info());
            println!("transient decay rate: {}", config.transient_decay_rate);
            println!(
                "default allocation method: {}",
                config.default_allocation_method
            );
            println!("grid precision: {} decimal places", config.grid_precision);
        }
        Commands::Simulate {
            ticks,
            handlers,
            hits,
            json,
        } => {
            println!("Simulating: handlers={handlers}, requests/handler={hits}, ticks={ticks}");
            let world = Arc::new(WorldState::with_config(config));
            simulate(&world, ticks, handlers, hits);

            let snap = world.snapshot();
            println!(
                "time={}, agents={}, tasks={}, confirmed allocations={}",
                snap.time,
                snap.agents.len(),
                snap.tasks.len(),
                snap.allocation.len()
            );
            for category in HazardCategory::ALL {
                println!(
                    "hazard hits [{:>2}] {:?}: {}",
                    category.code(),
                    category,
                    snap.hazard_hits.category(category).len()
                );
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&snap)?);
            }

            world.reset();
            println!(
                "After reset: agents={}, hits={}",
                world.agents().len(),
                world.hazard_hits().total()
            );
        }
        Commands::Decay { ticks } => {
            let world = WorldState::with_config(config);
            let location = Coordinate::new(10.00001, 20.00009);
            world.add_hazard_hit(HazardCategory::Transient.code(), location);
            println!("Registered transient hit at {location:?}");

            let expired_at = (1..=ticks).find(|_| world.decay_hazard_hits() > 0);
            match expired_at {
                Some(tick) => println!("Hit expired after {tick} ticks"),
                None => {
                    let weight = world.hazard_hits().transient.first().map(|h| h.weight);
                    println!("Hit still live after {ticks} ticks (weight {weight:?})");
                }
            }
        }
    }

    Ok(())
}
