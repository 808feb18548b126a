//! Result presentation
//!
//! Flattens result documents into one row per successful run and derives
//! everything a front end shows from those rows: summary statistics, chart
//! specifications, the CSV table and the comparison insights. Every
//! function here is pure.

pub mod charts;
pub mod csv;

pub use self::charts::{all_charts, ChartKind, ChartSpec, ReferenceLine, Series};
pub use self::csv::{csv_file_name, csv_table};

use crate::benchmark::{ComparisonRecord, ExecutionMode, ResultDocument};
use serde::{Deserialize, Serialize};

/// Speedup below which parallel runs are reported as ineffective
const LOW_SPEEDUP: f64 = 2.0;
/// Mean efficiency below which process count is reported as too high
const LOW_EFFICIENCY: f64 = 0.5;

/// One successful run in tabular form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub mode: ExecutionMode,
    pub matrix_size: u32,
    pub num_processes: u32,
    pub execution_time: f64,
    /// 1.0 when no ratio was derived
    pub speedup: f64,
    /// 1.0 when no ratio was derived
    pub efficiency: f64,
    pub gflops: f64,
    pub memory_mb: f64,
}

/// Rows for every successful run, in mode order
pub fn flatten(document: &ResultDocument) -> Vec<ResultRow> {
    document
        .records()
        .into_iter()
        .filter_map(|record| {
            let metrics = record.metrics()?;
            Some(ResultRow {
                mode: record.mode,
                matrix_size: document.matrix_size(),
                num_processes: record.num_processes,
                execution_time: metrics.execution_time,
                speedup: record.speedup().unwrap_or(1.0),
                efficiency: record.efficiency().unwrap_or(1.0),
                gflops: metrics.gflops,
                memory_mb: metrics.memory_mb,
            })
        })
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

fn max(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.fold(None, |best: Option<f64>, v| {
        Some(best.map_or(v, |b| b.max(v)))
    })
}

/// Summary statistics over flattened rows
///
/// Statistics over an empty set are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub best_speedup: Option<f64>,
    /// Mean over parallel rows
    pub avg_speedup: Option<f64>,
    pub best_efficiency: Option<f64>,
    /// Mean over parallel rows
    pub avg_efficiency: Option<f64>,
    pub total_tests: usize,
    pub avg_execution_time: Option<f64>,
}

pub fn summarize(rows: &[ResultRow]) -> Summary {
    let parallel = || rows.iter().filter(|r| r.mode.is_parallel());
    Summary {
        best_speedup: max(rows.iter().map(|r| r.speedup)),
        avg_speedup: mean(parallel().map(|r| r.speedup)),
        best_efficiency: max(rows.iter().map(|r| r.efficiency)),
        avg_efficiency: mean(parallel().map(|r| r.efficiency)),
        total_tests: rows.len(),
        avg_execution_time: mean(rows.iter().map(|r| r.execution_time)),
    }
}

/// Advice derived from a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// Best speedup below 2x; the matrix is likely too small
    LowSpeedup,
    /// Mean efficiency below 50%; too many processes for the problem
    LowEfficiency,
    Good,
}

impl Recommendation {
    pub fn headline(&self) -> &'static str {
        match self {
            Self::LowSpeedup => "Low Speedup Detected",
            Self::LowEfficiency => "Low Parallel Efficiency",
            Self::Good => "Good Performance",
        }
    }

    pub fn advice(&self) -> &'static [&'static str] {
        match self {
            Self::LowSpeedup => &[
                "Matrix size too small (communication overhead dominates)",
                "Increase matrix size to 2000+ for better parallel efficiency",
                "Verify all cluster nodes are operational",
            ],
            Self::LowEfficiency => &[
                "Reduce number of processes for better efficiency",
                "Increase problem size to improve computation/communication ratio",
                "Check network latency between nodes",
            ],
            Self::Good => &[
                "Test with larger matrices",
                "Explore different process configurations",
                "Evaluate alternative algorithms",
            ],
        }
    }
}

/// Which of the two parallel modes won, and by how much
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeComparison {
    pub faster: ExecutionMode,
    /// Time difference as a percentage of the single node time
    pub percent: f64,
}

/// Observations about one comparison run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    pub best_mode: ExecutionMode,
    /// At least 1.0
    pub best_speedup: f64,
    /// Mean over runs with a derived efficiency; 0 when there are none
    pub avg_efficiency: f64,
    pub node_comparison: Option<NodeComparison>,
    /// Seconds saved by the best parallel mode; `None` without any speedup
    pub time_saved: Option<f64>,
    pub recommendation: Recommendation,
}

pub fn insights(comparison: &ComparisonRecord) -> Insights {
    let mut best_mode = ExecutionMode::Serial;
    let mut best_speedup = 1.0;
    for (mode, record) in &comparison.tests {
        if let Some(speedup) = record.speedup() {
            if speedup > best_speedup {
                best_speedup = speedup;
                best_mode = *mode;
            }
        }
    }

    let avg_efficiency =
        mean(comparison.tests.values().filter_map(|r| r.efficiency())).unwrap_or(0.0);

    let time_of = |mode| comparison.get(mode).and_then(|r| r.execution_time());
    let node_comparison = match (
        time_of(ExecutionMode::SingleNode),
        time_of(ExecutionMode::MultiNode),
    ) {
        (Some(single), Some(multi)) if single > 0.0 => Some(NodeComparison {
            faster: if multi < single {
                ExecutionMode::MultiNode
            } else {
                ExecutionMode::SingleNode
            },
            percent: (single - multi).abs() / single * 100.0,
        }),
        _ => None,
    };

    let time_saved = match time_of(ExecutionMode::Serial) {
        Some(serial) if best_speedup > 1.0 => Some(serial - serial / best_speedup),
        _ => None,
    };

    let recommendation = if best_speedup < LOW_SPEEDUP {
        Recommendation::LowSpeedup
    } else if avg_efficiency < LOW_EFFICIENCY {
        Recommendation::LowEfficiency
    } else {
        Recommendation::Good
    };

    Insights {
        best_mode,
        best_speedup,
        avg_efficiency,
        node_comparison,
        time_saved,
        recommendation,
    }
}

/// Everything a front end renders for one result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub rows: Vec<ResultRow>,
    pub summary: Summary,
    pub charts: Vec<ChartSpec>,
    /// Only for comparisons
    pub insights: Option<Insights>,
}

pub fn build_report(document: &ResultDocument) -> Report {
    let rows = flatten(document);
    Report {
        summary: summarize(&rows),
        charts: all_charts(&rows),
        insights: document.as_comparison().map(insights),
        rows,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::benchmark::{BenchmarkRecord, ComparisonRecord, ExecutionMode, RunMetrics};

    pub fn run(mode: ExecutionMode, procs: u32, time: f64) -> BenchmarkRecord {
        BenchmarkRecord::completed(
            mode,
            "matrix_multiplication",
            500,
            procs,
            RunMetrics {
                execution_time: time,
                wall_time: time,
                gflops: 0.0,
                memory_mb: 0.0,
            },
            "",
        )
    }

    /// 500x500 with 4 processes: serial 2.0s, single 0.6s, multi 0.55s
    pub fn scenario() -> ComparisonRecord {
        let mut comparison = ComparisonRecord::new(500, 4);
        comparison
            .tests
            .insert(ExecutionMode::Serial, run(ExecutionMode::Serial, 1, 2.0));
        comparison
            .tests
            .insert(ExecutionMode::SingleNode, run(ExecutionMode::SingleNode, 4, 0.6));
        comparison
            .tests
            .insert(ExecutionMode::MultiNode, run(ExecutionMode::MultiNode, 4, 0.55));
        comparison.derive_ratios();
        comparison
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{run, scenario};
    use super::*;
    use crate::benchmark::BenchmarkRecord;

    #[test]
    fn test_flatten_comparison() {
        let rows = flatten(&scenario().into());

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].mode, ExecutionMode::Serial);
        assert_eq!(rows[0].speedup, 1.0);
        assert_eq!(rows[0].efficiency, 1.0);
        assert!((rows[1].speedup - 3.333).abs() < 0.001);
        assert!(rows.iter().all(|r| r.matrix_size == 500));
    }

    #[test]
    fn test_flatten_skips_failures() {
        let mut comparison = scenario();
        comparison.tests.insert(
            ExecutionMode::MultiNode,
            BenchmarkRecord::failed(ExecutionMode::MultiNode, "matrix_multiplication", 500, 4, "x"),
        );
        let rows = flatten(&comparison.into());
        assert_eq!(rows.len(), 2);

        let failed: ResultDocument =
            BenchmarkRecord::failed(ExecutionMode::Serial, "matrix_multiplication", 10, 1, "x")
                .into();
        assert!(flatten(&failed).is_empty());
    }

    #[test]
    fn test_summarize() {
        let summary = summarize(&flatten(&scenario().into()));

        assert_eq!(summary.total_tests, 3);
        assert!((summary.best_speedup.unwrap() - 2.0 / 0.55).abs() < 1e-12);
        let avg = (2.0 / 0.6 + 2.0 / 0.55) / 2.0;
        assert!((summary.avg_speedup.unwrap() - avg).abs() < 1e-12);
        assert_eq!(summary.best_efficiency, Some(1.0));
        assert!((summary.avg_execution_time.unwrap() - 3.15 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_summarize_without_parallel_rows() {
        let rows = flatten(&run(ExecutionMode::Serial, 1, 2.0).into());
        let summary = summarize(&rows);

        assert_eq!(summary.avg_speedup, None);
        assert_eq!(summary.avg_efficiency, None);
        assert_eq!(summary.best_speedup, Some(1.0));

        let empty = summarize(&[]);
        assert_eq!(empty.total_tests, 0);
        assert_eq!(empty.best_speedup, None);
        assert_eq!(empty.avg_execution_time, None);

        let json = serde_json::to_value(&empty).unwrap();
        assert!(json["avg_speedup"].is_null());
    }

    #[test]
    fn test_insights_scenario() {
        let insights = insights(&scenario());

        assert_eq!(insights.best_mode, ExecutionMode::MultiNode);
        let node = insights.node_comparison.unwrap();
        assert_eq!(node.faster, ExecutionMode::MultiNode);
        assert!((node.percent - 0.05 / 0.6 * 100.0).abs() < 1e-9);
        assert!((insights.time_saved.unwrap() - 1.45).abs() < 1e-9);
        assert_eq!(insights.recommendation, Recommendation::Good);
    }

    #[test]
    fn test_insights_recommendations() {
        let mut slow = ComparisonRecord::new(100, 4);
        slow.tests
            .insert(ExecutionMode::Serial, run(ExecutionMode::Serial, 1, 1.0));
        slow.tests
            .insert(ExecutionMode::SingleNode, run(ExecutionMode::SingleNode, 4, 0.8));
        slow.derive_ratios();
        assert_eq!(insights(&slow).recommendation, Recommendation::LowSpeedup);

        let mut wide = ComparisonRecord::new(2000, 16);
        wide.tests
            .insert(ExecutionMode::Serial, run(ExecutionMode::Serial, 1, 10.0));
        wide.tests
            .insert(ExecutionMode::MultiNode, run(ExecutionMode::MultiNode, 16, 2.5));
        wide.derive_ratios();
        let result = insights(&wide);
        assert_eq!(result.best_speedup, 4.0);
        assert_eq!(result.recommendation, Recommendation::LowEfficiency);
        assert!(result.node_comparison.is_none());
    }

    #[test]
    fn test_insights_without_speedup() {
        let mut comparison = ComparisonRecord::new(50, 4);
        comparison
            .tests
            .insert(ExecutionMode::Serial, run(ExecutionMode::Serial, 1, 0.1));
        comparison
            .tests
            .insert(ExecutionMode::SingleNode, run(ExecutionMode::SingleNode, 4, 0.3));
        comparison
            .tests
            .insert(ExecutionMode::MultiNode, run(ExecutionMode::MultiNode, 4, 0.4));
        comparison.derive_ratios();
        let result = insights(&comparison);

        assert_eq!(result.best_mode, ExecutionMode::Serial);
        assert_eq!(result.best_speedup, 1.0);
        assert!(result.time_saved.is_none());
        assert_eq!(result.node_comparison.unwrap().faster, ExecutionMode::SingleNode);
    }

    #[test]
    fn test_build_report() {
        let report = build_report(&scenario().into());
        assert_eq!(report.rows.len(), 3);
        assert_eq!(report.charts.len(), 4);
        assert!(report.insights.is_some());

        let single = build_report(&run(ExecutionMode::Serial, 1, 1.0).into());
        assert!(single.insights.is_none());
    }
}
