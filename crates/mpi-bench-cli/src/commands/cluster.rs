//! Cluster control commands

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use clap::Subcommand;
use console::style;
use mpi_bench::{ClusterHealth, NodeStatus};

use super::print_json;
use crate::cli::OutputFormat;
use crate::context::AppContext;

/// Cluster control commands
#[derive(Subcommand)]
pub enum ClusterCommands {
    /// Show the status of every node
    Status,

    /// Start the head node and workers
    Start {
        /// Number of nodes including the head (1-4)
        #[arg(short, long, default_value = "4")]
        nodes: usize,
    },

    /// Stop and remove every node
    Stop,

    /// Show recent output of a node
    Logs {
        /// Node name
        node: String,

        /// Number of lines
        #[arg(short, long, default_value = "50")]
        tail: usize,
    },
}

impl ClusterCommands {
    pub async fn execute(self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        match self {
            Self::Status => show_status(ctx, format).await,
            Self::Start { nodes } => start_cluster(ctx, nodes, format).await,
            Self::Stop => stop_cluster(ctx, format).await,
            Self::Logs { node, tail } => show_logs(ctx, &node, tail).await,
        }
    }
}

fn styled_status(status: NodeStatus) -> String {
    let text = status.to_string();
    match status {
        NodeStatus::Running => style(text).green().to_string(),
        NodeStatus::Exited | NodeStatus::NotFound => style(text).yellow().to_string(),
        NodeStatus::DockerUnavailable | NodeStatus::Error => style(text).red().to_string(),
        NodeStatus::Unknown => style(text).dim().to_string(),
    }
}

async fn show_status(ctx: &AppContext, format: OutputFormat) -> Result<()> {
    let report = ctx.controller.report().await;

    if format == OutputFormat::Json {
        return print_json(&report);
    }

    println!();
    println!("{}", style("MPI Cluster Status").cyan().bold());
    println!("{}", style("=".repeat(40)).dim());
    println!();
    println!(
        "{:<12} {:<20} {:<14} {}",
        style("NODE").bold().underlined(),
        style("STATUS").bold().underlined(),
        style("ID").bold().underlined(),
        style("STARTED").bold().underlined()
    );

    for (node, status) in &report.nodes {
        let (id, started) = match status {
            NodeStatus::Running => ctx
                .controller
                .node_details(node)
                .await
                .map(|d| (d.short_id, d.started_at.unwrap_or_default()))
                .unwrap_or_default(),
            _ => (String::new(), String::new()),
        };
        println!("{:<12} {:<20} {:<14} {}", node, styled_status(*status), id, started);
    }

    let health = match report.health {
        ClusterHealth::Healthy => style(report.health.as_str()).green(),
        ClusterHealth::Degraded => style(report.health.as_str()).yellow(),
        ClusterHealth::Offline => style(report.health.as_str()).red(),
    };
    println!();
    println!(
        "{}/{} nodes running, {} cores, cluster {}",
        style(report.running).bold(),
        report.total,
        report.capacity_cores,
        health
    );
    Ok(())
}

fn print_node_results(title: &str, results: &BTreeMap<String, bool>) {
    println!();
    println!("{}", style(title).cyan().bold());
    for (node, ok) in results {
        if *ok {
            println!("  {} {}", style("✓").green().bold(), node);
        } else {
            println!("  {} {}", style("✗").red().bold(), node);
        }
    }
    println!();
}

async fn start_cluster(ctx: &AppContext, nodes: usize, format: OutputFormat) -> Result<()> {
    let results = ctx
        .controller
        .start_cluster(nodes)
        .await
        .context("Failed to start cluster")?;

    if format == OutputFormat::Json {
        return print_json(&results);
    }
    print_node_results("Starting cluster", &results);

    let failed = results.values().filter(|ok| !**ok).count();
    if failed > 0 {
        println!(
            "{}",
            style(format!("{failed} node(s) failed to start. See 'mpibench cluster logs <node>'."))
                .yellow()
        );
    }
    Ok(())
}

async fn stop_cluster(ctx: &AppContext, format: OutputFormat) -> Result<()> {
    let results = ctx.controller.stop_cluster().await;

    if format == OutputFormat::Json {
        return print_json(&results);
    }
    print_node_results("Stopping cluster", &results);
    Ok(())
}

async fn show_logs(ctx: &AppContext, node: &str, tail: usize) -> Result<()> {
    let logs = ctx.controller.logs(node, tail).await;
    println!("{}", logs);
    Ok(())
}
