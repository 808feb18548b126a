//! MPI benchmark cluster CLI
//!
//! Controls the containerised MPI cluster, runs matrix multiplication
//! benchmarks in it and inspects the results.
//!
//! Usage:
//!   mpibench <subcommand> [options]
//!
//! Available subcommands:
//!   cluster     - Start, stop and inspect the cluster nodes
//!   run         - Run a serial, parallel or comparison benchmark
//!   results     - List, show and export saved results
//!   serve       - JSON dashboard API
//!   init        - Write the default configuration
//!   completions - Shell completions

mod cli;
mod commands;
mod context;
mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Commands};
use context::AppContext;
use mpi_bench::BenchConfig;
use server::DashboardState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = if let Some(ref path) = cli.config {
        BenchConfig::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path))?
    } else {
        BenchConfig::load().unwrap_or_default()
    };

    let Some(command) = cli.command else {
        println!("mpibench v{}", mpi_bench::VERSION);
        println!();
        println!("Use 'mpibench --help' for usage information.");
        println!();
        println!("Quick start:");
        println!("  mpibench cluster start            Start the four-node cluster");
        println!("  mpibench run --mode compare-all   Compare serial and parallel runs");
        println!("  mpibench results list             List saved results");
        return Ok(());
    };

    match command {
        Commands::Cluster(cmd) => cmd.execute(&AppContext::connect(config), cli.format).await,
        Commands::Run(args) => args.execute(&AppContext::connect(config), cli.format).await,
        Commands::Results(cmd) => cmd.execute(&AppContext::connect(config), cli.format).await,
        Commands::Serve { bind } => {
            let ctx = AppContext::connect(config);
            let bind_addr = bind.unwrap_or_else(|| ctx.config.server.bind_addr.clone());
            let state = Arc::new(DashboardState::from_context(&ctx));
            println!("Dashboard API listening on http://{}", bind_addr);
            server::start_server(state, &bind_addr)
                .await
                .context("Dashboard server failed")
        }
        Commands::Init => init_config(),
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    }
}

/// Write the default configuration file if there is none
fn init_config() -> Result<()> {
    println!("Initializing mpibench configuration");
    println!("===================================");
    println!();

    let config_path = BenchConfig::config_path();
    if !config_path.exists() {
        BenchConfig::default()
            .save()
            .context("Failed to write configuration")?;
        println!("Created default configuration: {:?}", config_path);
    } else {
        println!("Configuration already exists: {:?}", config_path);
    }

    println!();
    println!("Next steps:");
    println!("  mpibench cluster start    Start the cluster");
    println!("  mpibench run --save       Run a comparison and save it");
    println!("  mpibench serve            Serve the dashboard API");

    Ok(())
}

fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    clap_complete::generate(shell, &mut Cli::command(), "mpibench", &mut std::io::stdout());
}
