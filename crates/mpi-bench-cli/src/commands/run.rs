//! Benchmark run command

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use console::style;
use mpi_bench::{BenchmarkRequest, RunMode};
use tracing::info;

use super::print_json;
use super::results::print_document;
use crate::cli::OutputFormat;
use crate::context::AppContext;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RunModeArg {
    Serial,
    SingleNode,
    MultiNode,
    CompareAll,
}

impl From<RunModeArg> for RunMode {
    fn from(arg: RunModeArg) -> Self {
        match arg {
            RunModeArg::Serial => RunMode::Serial,
            RunModeArg::SingleNode => RunMode::SingleNode,
            RunModeArg::MultiNode => RunMode::MultiNode,
            RunModeArg::CompareAll => RunMode::CompareAll,
        }
    }
}

/// Run a benchmark in the cluster
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Execution mode
    #[arg(short, long, value_enum, default_value = "compare-all")]
    pub mode: RunModeArg,

    /// Matrix dimension N (N x N)
    #[arg(short, long, default_value = "500", value_parser = clap::value_parser!(u32).range(1..))]
    pub size: u32,

    /// Number of MPI processes
    #[arg(short, long, default_value = "4", value_parser = clap::value_parser!(u32).range(1..))]
    pub processes: u32,

    /// Runs per mode; metrics are averaged
    #[arg(short, long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pub repeat: u32,

    /// Save the result to the results directory
    #[arg(long)]
    pub save: bool,

    /// Result file name (implies --save)
    #[arg(long)]
    pub name: Option<String>,

    /// Include raw program output
    #[arg(long)]
    pub show_output: bool,
}

impl RunArgs {
    pub fn request(&self) -> BenchmarkRequest {
        BenchmarkRequest::new(self.mode.into(), self.size, self.processes).with_repeat(self.repeat)
    }

    pub async fn execute(self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let request = self.request();
        info!(
            "Running {:?} benchmark: size={} processes={} repeat={}",
            request.mode, request.matrix_size, request.num_processes, request.repeat
        );

        if format == OutputFormat::Table {
            println!(
                "{} Running benchmark ({}x{} matrix, {} processes)...",
                style("→").cyan().bold(),
                self.size,
                self.size,
                self.processes
            );
        }

        let document = ctx
            .runner
            .execute(request)
            .await
            .context("Benchmark failed")?;

        match format {
            OutputFormat::Json => print_json(&document)?,
            OutputFormat::Table => print_document(&document, self.show_output),
        }

        if self.save || self.name.is_some() {
            let path = ctx
                .store
                .save(&document, self.name.as_deref())
                .context("Failed to save result")?;
            if format == OutputFormat::Table {
                println!();
                println!("{} Saved to {:?}", style("✓").green().bold(), path);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mpi_bench::{BenchConfig, CommandResult, MockRuntime};
    use std::sync::Arc;

    fn context(dir: &std::path::Path) -> (AppContext, Arc<MockRuntime>) {
        let mock = MockRuntime::new()
            .with_running_nodes(["hpchead", "node01", "node02", "node03"])
            .respond(
                "serial",
                CommandResult::new(0, "Total Time Elapsed is 2.0 seconds\nGFLOPS: 0.13\n"),
            )
            .respond(
                "hpchead:",
                CommandResult::new(0, "Total Time Elapsed is 0.55 seconds\nGFLOPS: 0.45\n"),
            )
            .respond(
                "--host hpchead ",
                CommandResult::new(0, "Total Time Elapsed is 0.6 seconds\nGFLOPS: 0.42\n"),
            );
        let mut config = BenchConfig::default();
        config.results.dir = dir.to_path_buf();
        let mock = Arc::new(mock);
        let ctx = AppContext::new(config, mock.clone());
        (ctx, mock)
    }

    fn args(mode: RunModeArg) -> RunArgs {
        RunArgs {
            mode,
            size: 100,
            processes: 4,
            repeat: 1,
            save: false,
            name: None,
            show_output: false,
        }
    }

    #[test]
    fn test_request_mapping() {
        let mut a = args(RunModeArg::MultiNode);
        a.repeat = 3;
        let request = a.request();
        assert_eq!(request.mode, RunMode::MultiNode);
        assert_eq!(request.matrix_size, 100);
        assert_eq!(request.repeat, 3);
    }

    #[tokio::test]
    async fn test_run_and_save_named() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _mock) = context(dir.path());

        let mut a = args(RunModeArg::CompareAll);
        a.name = Some("nightly".to_string());
        a.execute(&ctx, OutputFormat::Json).await.unwrap();

        let saved = ctx.store.list_saved().unwrap();
        assert_eq!(saved, vec!["nightly.json".to_string()]);
        let doc = ctx.store.load("nightly").unwrap();
        assert_eq!(doc.records().len(), 3);
    }

    #[tokio::test]
    async fn test_run_without_save_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, mock) = context(dir.path());

        args(RunModeArg::Serial)
            .execute(&ctx, OutputFormat::Json)
            .await
            .unwrap();
        assert!(ctx.store.list_saved().unwrap().is_empty());
        assert!(mock
            .executed()
            .iter()
            .any(|c| c.command.ends_with("serial 100")));
    }
}
