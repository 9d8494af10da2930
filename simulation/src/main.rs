//! Gradient routing simulator
//!
//! Runs gradient construction and data forwarding over simulated sensor
//! deployments, either as a discrete-event simulation or in real time.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use gradient_core::NodeId;
use gradient_logging::{FileConfig, GradientSubscriberBuilder};

use gradient_simulation::{
    Deployment, DeploymentBuilder, SimConfig, Simulation, live, print_stats, scenarios,
};

#[derive(Parser)]
#[command(
    name = "gradient-sim",
    about = "Gradient routing simulation for wireless sensor networks",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Also write logs to rolling files in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Simulation configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the random seed
    #[arg(short, long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured protocol over a chosen deployment
    Run {
        /// Deployment: line, grid, random
        #[arg(short, long, default_value = "line")]
        topology: String,

        /// Number of nodes
        #[arg(short, long, default_value = "10")]
        nodes: u32,

        /// Radio range (spacing between neighbours is 10)
        #[arg(short, long, default_value = "10.0")]
        range: f64,
    },

    /// Sink at one end of a line, origin at the other
    Line {
        #[arg(short, long, default_value = "6")]
        nodes: u32,
    },

    /// Square grid with diagonal links
    Grid {
        /// Nodes per side
        #[arg(long, default_value = "5")]
        side: u32,
    },

    /// Random field over a lossy radio
    Lossy {
        #[arg(short, long, default_value = "30")]
        nodes: u32,

        /// Per-receiver loss probability
        #[arg(short, long, default_value = "0.2")]
        loss: f64,
    },

    /// Origination faster than relays can drain
    Congestion,

    /// Two equal-length paths to the sink
    Diamond,

    /// Create and visualize a deployment
    Topology {
        /// Deployment: line, grid, random
        #[arg(short, long, default_value = "grid")]
        topology: String,

        #[arg(short, long, default_value = "9")]
        nodes: u32,

        #[arg(short, long, default_value = "10.0")]
        range: f64,
    },

    /// Run every node as a tokio task on the wall clock
    Live {
        #[arg(short, long, default_value = "5")]
        nodes: u32,

        /// Seconds to run
        #[arg(long, default_value = "60")]
        secs: u64,
    },

    /// Print the default configuration as TOML
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut logging = GradientSubscriberBuilder::new()
        .with_level(if cli.verbose { "debug" } else { "info" })
        .with_json_console(cli.json_logs);
    if let Some(directory) = &cli.log_dir {
        logging = logging.with_file_output(FileConfig {
            directory: directory.clone(),
            ..FileConfig::default()
        });
    }
    let _log_guard = logging.init()?;

    let mut config = match &cli.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    let seed = config.seed;

    match cli.command {
        Commands::Run {
            topology,
            nodes,
            range,
        } => {
            let deployment = build_deployment(&topology, nodes, range, seed);
            println!("{}", deployment.visualize());
            let mut sim = Simulation::new(deployment, config)?;
            sim.run();
            println!("\n  {}", sim.state_summary());
            print_stats(&sim);
        }
        Commands::Line { nodes } => {
            scenarios::run_line_scenario(nodes, seed)?;
        }
        Commands::Grid { side } => {
            scenarios::run_grid_scenario(side, seed)?;
        }
        Commands::Lossy { nodes, loss } => {
            scenarios::run_lossy_scenario(nodes, loss, seed)?;
        }
        Commands::Congestion => {
            scenarios::run_congestion_scenario(seed)?;
        }
        Commands::Diamond => {
            scenarios::run_diamond_scenario(seed)?;
        }
        Commands::Topology {
            topology,
            nodes,
            range,
        } => {
            let deployment = build_deployment(&topology, nodes, range, seed);
            println!("{}", deployment.visualize());
            for (node, hops) in deployment.hop_distances(NodeId::SINK) {
                println!("  {:>3}: {} hops from sink", node, hops);
            }
        }
        Commands::Live { nodes, secs } => {
            let deployment = DeploymentBuilder::new(nodes.max(2)).line();
            if cli.config.is_none() {
                config.protocol.origin = Some(NodeId(nodes.max(2) - 1));
            }
            let runtime = tokio::runtime::Runtime::new()?;
            let report = runtime.block_on(live::run_live(
                &deployment,
                &config,
                Duration::from_secs(secs),
            ))?;

            println!("\n=== Live Run ===");
            println!("  Deliveries: {}", report.deliveries.len());
            for record in &report.deliveries {
                println!(
                    "  seq {} from {} via {} in {:?}",
                    record.sequence, record.origin, record.last_hop, record.latency
                );
            }
            for node_report in &report.reports {
                println!("  {}", node_report);
            }
        }
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn build_deployment(topology: &str, nodes: u32, range: f64, seed: u64) -> Deployment {
    let builder = DeploymentBuilder::new(nodes).range(range);
    match topology {
        "line" => builder.line(),
        "grid" => {
            let columns = (f64::from(nodes).sqrt().ceil() as u32).max(1);
            builder.grid(columns)
        }
        "random" => builder.random(f64::from(nodes) * 5.0, seed),
        _ => {
            eprintln!("Unknown topology: {}. Using line.", topology);
            DeploymentBuilder::new(nodes).range(range).line()
        }
    }
}
