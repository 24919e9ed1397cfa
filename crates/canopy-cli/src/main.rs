//! Canopy unified CLI.
//!
//! Hierarchical Byzantine fault-tolerant atomic multicast.
//!
//! # Quick Start
//!
//! ```bash
//! # Validate a topology file
//! canopy topology check ./topology.json
//!
//! # Run an in-process cluster with an interactive prompt
//! canopy cluster run ./topology.json
//!
//! # Drive a timed workload and write latency stats
//! canopy bench ./topology.json --clients 8 --runtime-secs 120
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Canopy - hierarchical Byzantine fault-tolerant atomic multicast.
#[derive(Parser)]
#[command(name = "canopy")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version information.
    Version,

    /// Inspect a topology file.
    #[command(subcommand)]
    Topology(TopologyCommands),

    /// Run an in-process cluster.
    #[command(subcommand)]
    Cluster(ClusterCommands),

    /// Drive a timed workload against an in-process cluster.
    Bench {
        /// Path to the topology file.
        topology: String,

        /// Concurrent client threads.
        #[arg(short, long, default_value = "8")]
        clients: usize,

        /// Full-load run duration in seconds.
        #[arg(long, default_value = "120")]
        runtime_secs: u64,

        /// Targets drawn for each client.
        #[arg(long, default_value = "2")]
        targets: usize,

        /// Directory for the stats files.
        #[arg(long, default_value = ".")]
        stats_dir: String,

        /// Copies each forwarded dispatch delivers downstream.
        #[arg(long, default_value = "4")]
        redundancy: u32,

        /// Forwarded copies required before a request is processed.
        #[arg(long, default_value = "3")]
        threshold: u32,
    },

    /// Manage per-group configuration directories.
    #[command(subcommand)]
    GroupConfig(GroupConfigCommands),
}

#[derive(Subcommand)]
enum TopologyCommands {
    /// Validate a topology file and print its shape.
    Check {
        /// Path to the topology file.
        topology: String,
    },

    /// Print the relay path between two groups.
    Route {
        /// Path to the topology file.
        topology: String,

        /// Group the path starts from.
        from: u64,

        /// Group the path ends at.
        to: u64,
    },

    /// Print the entry group for a target set.
    Lca {
        /// Path to the topology file.
        topology: String,

        /// Target group ids.
        targets: Vec<u64>,
    },
}

#[derive(Subcommand)]
enum ClusterCommands {
    /// Boot every group in-process and take requests interactively.
    Run {
        /// Path to the topology file.
        topology: String,

        /// Copies each forwarded dispatch delivers downstream.
        #[arg(long, default_value = "4")]
        redundancy: u32,

        /// Forwarded copies required before a request is processed.
        #[arg(long, default_value = "3")]
        threshold: u32,
    },
}

#[derive(Subcommand)]
enum GroupConfigCommands {
    /// Create the gNN directory skeleton for every group in a topology.
    Init {
        /// Path to the topology file.
        topology: String,

        /// Configuration home to create group directories under.
        #[arg(long, default_value = ".")]
        home: String,

        /// First replica port to assign.
        #[arg(long, default_value = "10000")]
        base_port: u16,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            commands::version::run();
            Ok(())
        }
        Commands::Topology(cmd) => match cmd {
            TopologyCommands::Check { topology } => commands::topology::check(&topology),
            TopologyCommands::Route { topology, from, to } => {
                commands::topology::route(&topology, from, to)
            }
            TopologyCommands::Lca { topology, targets } => {
                commands::topology::lca(&topology, &targets)
            }
        },
        Commands::Cluster(cmd) => match cmd {
            ClusterCommands::Run {
                topology,
                redundancy,
                threshold,
            } => commands::cluster::run(&topology, redundancy, threshold),
        },
        Commands::Bench {
            topology,
            clients,
            runtime_secs,
            targets,
            stats_dir,
            redundancy,
            threshold,
        } => commands::bench::run(
            &topology,
            clients,
            runtime_secs,
            targets,
            &stats_dir,
            redundancy,
            threshold,
        ),
        Commands::GroupConfig(cmd) => match cmd {
            GroupConfigCommands::Init {
                topology,
                home,
                base_port,
            } => commands::group_config::init(&topology, &home, base_port),
        },
    }
}
