//! MPI benchmark CLI structure
//!
//! Root command with subcommands for cluster control, benchmark runs,
//! saved results and the dashboard API.

use clap::{Parser, Subcommand};

use crate::commands::{ClusterCommands, ResultsCommands, RunArgs};

/// mpibench - MPI matrix multiplication benchmark cluster
///
/// Start and stop the containerised MPI cluster, run serial and parallel
/// benchmarks in it, and inspect or export the results.
#[derive(Parser)]
#[command(name = "mpibench")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,

    /// Configuration file path
    #[arg(short, long, global = true, env = "MPIBENCH_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Cluster control (status, start, stop, logs)
    #[command(subcommand)]
    Cluster(ClusterCommands),

    /// Run a benchmark
    Run(RunArgs),

    /// Saved results (list, show, export, charts)
    #[command(subcommand)]
    Results(ResultsCommands),

    /// Serve the JSON dashboard API
    Serve {
        /// Address to bind (overrides the configuration)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Write the default configuration file
    Init,

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from([
            "mpibench",
            "-vv",
            "--format",
            "json",
            "run",
            "--mode",
            "compare-all",
            "--size",
            "500",
            "--processes",
            "4",
            "--save",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.format, OutputFormat::Json);
        let Some(Commands::Run(args)) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.size, 500);
        assert!(args.save);
    }

    #[test]
    fn test_parse_cluster_start() {
        let cli = Cli::parse_from(["mpibench", "cluster", "start", "--nodes", "2"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Cluster(ClusterCommands::Start { nodes: 2 }))
        ));
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(Cli::try_parse_from(["mpibench", "run", "--size", "0"]).is_err());
    }
}
