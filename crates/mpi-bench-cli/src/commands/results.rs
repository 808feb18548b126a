//! Saved result commands and result rendering

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use console::style;
use mpi_bench::report::{build_report, Insights, Recommendation};
use mpi_bench::{csv_file_name, csv_table, BenchmarkRecord, ExecutionMode, ResultDocument};

use super::print_json;
use crate::cli::OutputFormat;
use crate::context::AppContext;

/// Saved result commands
#[derive(Subcommand)]
pub enum ResultsCommands {
    /// List saved result files
    List,

    /// Show a saved result
    Show {
        /// Result file name
        file: String,

        /// Include raw program output
        #[arg(long)]
        show_output: bool,
    },

    /// Export a saved result as CSV
    Export {
        /// Result file name
        file: String,

        /// Output path (defaults to benchmark_results_<size>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print chart specifications for a saved result
    Charts {
        /// Result file name
        file: String,
    },
}

impl ResultsCommands {
    pub async fn execute(self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        match self {
            Self::List => list_results(ctx, format),
            Self::Show { file, show_output } => show_result(ctx, &file, show_output, format),
            Self::Export { file, output } => export_result(ctx, &file, output).map(|_| ()),
            Self::Charts { file } => show_charts(ctx, &file, format),
        }
    }
}

fn load(ctx: &AppContext, file: &str) -> Result<ResultDocument> {
    ctx.store
        .load(file)
        .with_context(|| format!("Failed to load result {}", file))
}

fn list_results(ctx: &AppContext, format: OutputFormat) -> Result<()> {
    let files = ctx.store.list_saved().context("Failed to list results")?;

    if format == OutputFormat::Json {
        return print_json(&files);
    }

    if files.is_empty() {
        println!();
        println!("{}", style("No saved results.").yellow());
        println!();
        println!("Run a benchmark with: mpibench run --mode compare-all --save");
        return Ok(());
    }

    println!();
    println!(
        "{} saved result(s) in {:?}",
        style(files.len()).bold(),
        ctx.store.dir()
    );
    for file in files {
        println!("  {}", file);
    }
    Ok(())
}

fn show_result(
    ctx: &AppContext,
    file: &str,
    show_output: bool,
    format: OutputFormat,
) -> Result<()> {
    let document = load(ctx, file)?;
    if format == OutputFormat::Json {
        return print_json(&document);
    }
    print_document(&document, show_output);
    Ok(())
}

/// Target of an export, `benchmark_results_<size>.csv` unless given
fn export_path(output: Option<PathBuf>, document: &ResultDocument) -> PathBuf {
    output.unwrap_or_else(|| PathBuf::from(csv_file_name(document.matrix_size())))
}

fn export_result(ctx: &AppContext, file: &str, output: Option<PathBuf>) -> Result<PathBuf> {
    let document = load(ctx, file)?;
    let csv = csv_table(&document).context("Failed to build CSV table")?;
    let path = export_path(output, &document);

    std::fs::write(&path, csv).with_context(|| format!("Failed to write {:?}", path))?;
    println!(
        "{} Exported {} to {:?}",
        style("✓").green().bold(),
        file,
        path
    );
    Ok(path)
}

fn show_charts(ctx: &AppContext, file: &str, format: OutputFormat) -> Result<()> {
    let report = build_report(&load(ctx, file)?);

    if format == OutputFormat::Json {
        return print_json(&report.charts);
    }

    for chart in &report.charts {
        println!();
        println!("{}", style(&chart.title).cyan().bold());
        println!("  {} vs {}", chart.y_label, chart.x_label);
        for series in &chart.series {
            let points: Vec<String> = series
                .x
                .iter()
                .zip(&series.y)
                .map(|(x, y)| format!("{x}: {y:.4}"))
                .collect();
            println!("  {:<12} {}", series.name, points.join(", "));
        }
        if let Some(line) = &chart.reference_line {
            println!("  {} at {:.1}", line.label, line.y);
        }
    }
    Ok(())
}

fn fmt_opt(value: Option<f64>, suffix: &str) -> String {
    value
        .map(|v| format!("{v:.2}{suffix}"))
        .unwrap_or_else(|| "-".to_string())
}

/// One table row; failed runs show the first line of their error
fn record_line(record: &BenchmarkRecord) -> String {
    match record.metrics() {
        Some(metrics) => format!(
            "{:<12} {:>10.4} {:>9} {:>11} {:>6} {:>8.2} {:>11.2}",
            record.mode.title(),
            metrics.execution_time,
            fmt_opt(record.speedup(), "x"),
            fmt_opt(record.efficiency().map(|e| e * 100.0), "%"),
            record.num_processes,
            metrics.gflops,
            metrics.memory_mb
        ),
        None => format!(
            "{:<12} {} {}",
            record.mode.title(),
            style("FAILED").red().bold(),
            record.error().unwrap_or_default().lines().next().unwrap_or_default()
        ),
    }
}

/// Human readable rendering of a result document
pub(crate) fn print_document(document: &ResultDocument, show_output: bool) {
    let report = build_report(document);

    println!();
    match document {
        ResultDocument::Comparison(c) => println!(
            "{}",
            style(format!(
                "Comparison: {}x{} matrix, {} processes",
                c.matrix_size, c.matrix_size, c.num_processes
            ))
            .cyan()
            .bold()
        ),
        ResultDocument::Single(r) => println!(
            "{}",
            style(format!(
                "{} run: {}x{} matrix, {} processes",
                r.mode.title(),
                r.matrix_size,
                r.matrix_size,
                r.num_processes
            ))
            .cyan()
            .bold()
        ),
    }
    println!("{}", style("=".repeat(60)).dim());
    println!();
    println!(
        "{:<12} {:>10} {:>9} {:>11} {:>6} {:>8} {:>11}",
        "MODE", "TIME (s)", "SPEEDUP", "EFFICIENCY", "PROCS", "GFLOPS", "MEMORY (MB)"
    );

    for record in document.records() {
        println!("{}", record_line(record));
    }

    let summary = &report.summary;
    println!();
    println!(
        "Best speedup: {}   Avg speedup: {}   Avg efficiency: {}",
        style(fmt_opt(summary.best_speedup, "x")).bold(),
        fmt_opt(summary.avg_speedup, "x"),
        fmt_opt(summary.avg_efficiency.map(|e| e * 100.0), "%")
    );

    if let Some(insights) = &report.insights {
        print_insights(insights);
    }

    if show_output {
        for record in document.records() {
            if let Some(output) = record.raw_output() {
                println!();
                println!("{}", style(format!("{} output", record.mode.title())).dim());
                println!("{}", output.trim_end());
            }
        }
    }
}

fn print_insights(insights: &Insights) {
    println!();
    println!("{}", style("Performance Insights").cyan().bold());

    if let Some(node) = &insights.node_comparison {
        let (winner, loser) = match node.faster {
            ExecutionMode::MultiNode => ("Multi-Node", "Single-Node"),
            _ => ("Single-Node", "Multi-Node"),
        };
        println!("  {} is {:.1}% faster than {}", winner, node.percent, loser);
    }

    match insights.time_saved {
        Some(saved) => println!(
            "  Parallel processing saved {:.2} seconds ({} at {:.2}x)",
            saved,
            insights.best_mode.title(),
            insights.best_speedup
        ),
        None => println!(
            "  {}",
            style("No speedup achieved - serial execution was faster").yellow()
        ),
    }

    let headline = match insights.recommendation {
        Recommendation::Good => style(insights.recommendation.headline()).green(),
        _ => style(insights.recommendation.headline()).yellow(),
    };
    println!();
    println!("{}", headline.bold());
    for advice in insights.recommendation.advice() {
        println!("  - {}", advice);
    }
}
