//! npcsim - headless driver for autonomous agents.
//!
//! - `npcsim run` - fixed-rate simulation of the demo scene
//! - `npcsim config` - print the effective configuration
//! - `npcsim init` - write a default configuration file

mod console;
mod heuristic;
mod scene;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::{fmt, EnvFilter};

use npc_brain::{Orchestrator, SimConfig};
use npc_sandbox::BodyHandle;

use crate::console::{ConsoleRequest, Speaker};
use crate::heuristic::HeuristicPlanner;
use crate::scene::Scene;

const PLAYER_NAME: &str = "Sam";

/// Seconds between periodic status lines in the log.
const REPORT_EVERY_SECS: u64 = 10;

#[derive(Parser)]
#[command(name = "npcsim")]
#[command(about = "Headless simulation of autonomous survival agents", version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = "npcsim.yaml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulation
    Run {
        /// Stop after this many ticks (0 runs until interrupted)
        #[arg(long, default_value_t = 0)]
        ticks: u64,

        /// Agent to spawn; repeat for more (overrides the config list)
        #[arg(short, long = "agent")]
        agents: Vec<String>,

        /// Print one JSON summary at the end instead of periodic status lines
        #[arg(long)]
        once: bool,

        /// Tick as fast as possible instead of at the configured rate
        #[arg(long)]
        fast: bool,

        /// Read console commands from stdin
        #[arg(short, long)]
        interactive: bool,
    },

    /// Print the effective configuration as YAML
    Config,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt().with_env_filter(filter).with_target(false).init();

    match cli.command {
        Some(Commands::Run {
            ticks,
            agents,
            once,
            fast,
            interactive,
        }) => {
            let mut config = SimConfig::load_or_default(&cli.config)?;
            if !agents.is_empty() {
                config.agents = agents;
            }
            run_simulation(
                config,
                RunOptions {
                    ticks,
                    once,
                    fast,
                    interactive,
                },
            )
            .await
        }
        Some(Commands::Config) => {
            let config = SimConfig::load_or_default(&cli.config)?;
            print!("{}", config.to_yaml()?);
            Ok(())
        }
        Some(Commands::Init { force }) => {
            init_config(&cli.config, force)?;
            println!("Wrote default configuration to {}", cli.config.display());
            Ok(())
        }
        None => {
            println!("npcsim - autonomous agent simulation");
            println!();
            println!("Usage: npcsim <COMMAND>");
            println!();
            println!("Commands:");
            println!("  run     Run the simulation");
            println!("  config  Print the effective configuration");
            println!("  init    Write a default configuration file");
            println!();
            println!("Run 'npcsim --help' for more information.");
            Ok(())
        }
    }
}

struct RunOptions {
    ticks: u64,
    once: bool,
    fast: bool,
    interactive: bool,
}

async fn run_simulation(config: SimConfig, options: RunOptions) -> Result<()> {
    if config.tick_hz == 0 {
        bail!("tick_hz must be positive");
    }
    if config.agents.is_empty() {
        bail!("no agents to spawn; pass --agent or list them in the config");
    }
    tracing::info!(
        agents = ?config.agents,
        tick_hz = config.tick_hz,
        ticks = options.ticks,
        "Starting simulation"
    );

    let planner = Arc::new(HeuristicPlanner::new(config.planner.clone(), config.seed));
    let mut orchestrator: Orchestrator<BodyHandle> = Orchestrator::new(
        config.clone(),
        tokio::runtime::Handle::current(),
        planner,
    );

    let mut scene = Scene::new(PLAYER_NAME);
    let mut bodies = Vec::with_capacity(config.agents.len());
    for name in &config.agents {
        let body = scene.spawn_agent(name);
        orchestrator.spawn_agent(name, body, 0, &scene.world);
        bodies.push((name.clone(), body));
    }

    let (requests_tx, mut requests) = mpsc::unbounded_channel();
    if options.interactive {
        console::spawn_reader(
            Speaker {
                name: scene.player_name.clone(),
                entity: scene.player,
            },
            orchestrator.commands(),
            requests_tx,
        )
        .context("Failed to start console")?;
    } else {
        drop(requests_tx);
    }

    let period = if options.fast {
        Duration::from_millis(1)
    } else {
        Duration::from_secs_f64(1.0 / f64::from(config.tick_hz))
    };
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let report_every = u64::from(config.tick_hz) * REPORT_EVERY_SECS;

    let mut tick = 0u64;
    loop {
        if options.ticks > 0 && tick >= options.ticks {
            break;
        }
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!(tick, "Interrupted");
                break;
            }
            Some(request) = requests.recv() => {
                match request {
                    ConsoleRequest::Status => print_status(&orchestrator),
                    ConsoleRequest::Quit => break,
                }
                continue;
            }
        }

        tick += 1;
        scene.advance(tick);
        orchestrator.tick(tick, &mut scene.world);

        for (name, body) in &bodies {
            let goal = orchestrator
                .brain(name)
                .and_then(|brain| brain.state.goal.clone());
            for (item, count) in scene.work(tick, *body, goal.as_deref()) {
                orchestrator.record_gathered(name, item, u64::from(count));
            }
        }

        if !options.once && tick % report_every == 0 {
            for status in orchestrator.statuses() {
                tracing::info!(
                    tick,
                    agent = %status.name,
                    mode = ?status.mode,
                    goal = status.goal.as_deref().unwrap_or("-"),
                    activity = status.activity.as_deref().unwrap_or("-"),
                    error = status.last_error.as_deref().unwrap_or("-"),
                    "status"
                );
            }
        }
    }

    if options.once {
        let summary = serde_json::json!({
            "ticks": tick,
            "agents": orchestrator.statuses(),
            "chat": scene.world.chat_log(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    for name in orchestrator.agent_names() {
        orchestrator.despawn(&name);
    }
    tracing::info!(tick, "Simulation stopped");
    Ok(())
}

fn print_status(orchestrator: &Orchestrator<BodyHandle>) {
    println!("Agents: {}", orchestrator.len());
    for status in orchestrator.statuses() {
        println!(
            "  {} - mode: {:?}, goal: {} ({} ticks left), activity: {}",
            status.name,
            status.mode,
            status.goal.as_deref().unwrap_or("none"),
            status.goal_lock_remaining_ticks,
            status.activity.as_deref().unwrap_or("none"),
        );
        if let Some(thought) = &status.last_thought {
            println!("      thought: {thought}");
        }
        if let Some(error) = &status.last_error {
            println!("      error: {error}");
        }
    }
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    let yaml = SimConfig::default().to_yaml()?;
    std::fs::write(path, yaml)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_loadable_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("npcsim.yaml");

        init_config(&path, false).expect("init");
        let loaded = SimConfig::load(&path).expect("load");
        assert_eq!(loaded, SimConfig::default());

        assert!(init_config(&path, false).is_err());
        init_config(&path, true).expect("forced init");
    }

    #[test]
    fn cli_parses_run_flags() {
        let cli = Cli::parse_from([
            "npcsim", "run", "--ticks", "200", "-a", "Alex", "-a", "Steve", "--once",
        ]);
        match cli.command {
            Some(Commands::Run {
                ticks,
                agents,
                once,
                fast,
                interactive,
            }) => {
                assert_eq!(ticks, 200);
                assert_eq!(agents, vec!["Alex".to_string(), "Steve".to_string()]);
                assert!(once);
                assert!(!fast);
                assert!(!interactive);
            }
            _ => panic!("expected run"),
        }
    }
}
