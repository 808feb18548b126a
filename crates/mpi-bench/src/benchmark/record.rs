//! Benchmark result records

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How a single benchmark run is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Serial,
    SingleNode,
    MultiNode,
}

impl ExecutionMode {
    pub const ALL: [ExecutionMode; 3] = [Self::Serial, Self::SingleNode, Self::MultiNode];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Serial => "serial",
            Self::SingleNode => "single_node",
            Self::MultiNode => "multi_node",
        }
    }

    /// Human readable label ("Single Node")
    pub fn title(&self) -> &'static str {
        match self {
            Self::Serial => "Serial",
            Self::SingleNode => "Single Node",
            Self::MultiNode => "Multi Node",
        }
    }

    pub fn is_parallel(&self) -> bool {
        !matches!(self, Self::Serial)
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a benchmark request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Serial,
    SingleNode,
    MultiNode,
    CompareAll,
}

impl RunMode {
    /// The single execution mode, or `None` for a comparison
    pub fn execution_mode(&self) -> Option<ExecutionMode> {
        match self {
            Self::Serial => Some(ExecutionMode::Serial),
            Self::SingleNode => Some(ExecutionMode::SingleNode),
            Self::MultiNode => Some(ExecutionMode::MultiNode),
            Self::CompareAll => None,
        }
    }
}

/// Metrics of one successful run
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Seconds; the program's own timer when it printed one, wall clock otherwise
    pub execution_time: f64,
    /// Seconds measured around the remote run command
    pub wall_time: f64,
    pub gflops: f64,
    pub memory_mb: f64,
}

impl RunMetrics {
    /// Arithmetic mean of every field; `None` for an empty slice
    pub fn mean(samples: &[RunMetrics]) -> Option<RunMetrics> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len() as f64;
        let sum = samples.iter().fold(RunMetrics::default(), |acc, m| RunMetrics {
            execution_time: acc.execution_time + m.execution_time,
            wall_time: acc.wall_time + m.wall_time,
            gflops: acc.gflops + m.gflops,
            memory_mb: acc.memory_mb + m.memory_mb,
        });
        Some(RunMetrics {
            execution_time: sum.execution_time / n,
            wall_time: sum.wall_time / n,
            gflops: sum.gflops / n,
            memory_mb: sum.memory_mb / n,
        })
    }
}

/// Success or failure of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Success {
        metrics: RunMetrics,
        raw_output: String,
        /// Present only inside a comparison with a successful serial run
        #[serde(default, skip_serializing_if = "Option::is_none")]
        speedup: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        efficiency: Option<f64>,
    },
    Failure {
        error: String,
    },
}

/// One benchmark run, the unit that is displayed and persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    pub mode: ExecutionMode,
    pub algorithm: String,
    pub matrix_size: u32,
    pub num_processes: u32,
    /// Epoch seconds
    pub timestamp: f64,
    #[serde(flatten)]
    pub outcome: RunOutcome,
}

/// Current time in epoch seconds with microsecond resolution
pub fn epoch_seconds() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

impl BenchmarkRecord {
    pub fn completed(
        mode: ExecutionMode,
        algorithm: impl Into<String>,
        matrix_size: u32,
        num_processes: u32,
        metrics: RunMetrics,
        raw_output: impl Into<String>,
    ) -> Self {
        Self {
            mode,
            algorithm: algorithm.into(),
            matrix_size,
            num_processes,
            timestamp: epoch_seconds(),
            outcome: RunOutcome::Success {
                metrics,
                raw_output: raw_output.into(),
                speedup: None,
                efficiency: None,
            },
        }
    }

    pub fn failed(
        mode: ExecutionMode,
        algorithm: impl Into<String>,
        matrix_size: u32,
        num_processes: u32,
        error: impl Into<String>,
    ) -> Self {
        Self {
            mode,
            algorithm: algorithm.into(),
            matrix_size,
            num_processes,
            timestamp: epoch_seconds(),
            outcome: RunOutcome::Failure {
                error: error.into(),
            },
        }
    }

    pub fn success(&self) -> bool {
        matches!(self.outcome, RunOutcome::Success { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            RunOutcome::Failure { error } => Some(error),
            RunOutcome::Success { .. } => None,
        }
    }

    pub fn metrics(&self) -> Option<&RunMetrics> {
        match &self.outcome {
            RunOutcome::Success { metrics, .. } => Some(metrics),
            RunOutcome::Failure { .. } => None,
        }
    }

    pub fn raw_output(&self) -> Option<&str> {
        match &self.outcome {
            RunOutcome::Success { raw_output, .. } => Some(raw_output),
            RunOutcome::Failure { .. } => None,
        }
    }

    pub fn speedup(&self) -> Option<f64> {
        match self.outcome {
            RunOutcome::Success { speedup, .. } => speedup,
            RunOutcome::Failure { .. } => None,
        }
    }

    pub fn efficiency(&self) -> Option<f64> {
        match self.outcome {
            RunOutcome::Success { efficiency, .. } => efficiency,
            RunOutcome::Failure { .. } => None,
        }
    }

    pub fn execution_time(&self) -> Option<f64> {
        self.metrics().map(|m| m.execution_time)
    }

    /// Attach derived ratios; no effect on a failed run
    pub(crate) fn set_derived(&mut self, new_speedup: f64, new_efficiency: f64) {
        if let RunOutcome::Success {
            speedup,
            efficiency,
            ..
        } = &mut self.outcome
        {
            *speedup = Some(new_speedup);
            *efficiency = Some(new_efficiency);
        }
    }
}

/// Serial, single node and multi node runs of one problem size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub matrix_size: u32,
    pub num_processes: u32,
    /// Only the modes that were run; serial sorts first
    pub tests: BTreeMap<ExecutionMode, BenchmarkRecord>,
}

impl ComparisonRecord {
    pub fn new(matrix_size: u32, num_processes: u32) -> Self {
        Self {
            matrix_size,
            num_processes,
            tests: BTreeMap::new(),
        }
    }

    pub fn get(&self, mode: ExecutionMode) -> Option<&BenchmarkRecord> {
        self.tests.get(&mode)
    }

    /// Attach speedup and efficiency to every successful parallel run
    ///
    /// Requires a successful serial run. A parallel run whose execution
    /// time is not positive gets no ratios.
    pub fn derive_ratios(&mut self) {
        let serial_time = match self
            .tests
            .get(&ExecutionMode::Serial)
            .and_then(BenchmarkRecord::execution_time)
        {
            Some(t) => t,
            None => return,
        };

        for (mode, record) in self.tests.iter_mut() {
            if !mode.is_parallel() {
                continue;
            }
            let Some(parallel_time) = record.execution_time() else {
                continue;
            };
            if parallel_time <= 0.0 || record.num_processes == 0 {
                continue;
            }
            let speedup = serial_time / parallel_time;
            let efficiency = speedup / record.num_processes as f64;
            record.set_derived(speedup, efficiency);
        }
    }
}

/// A saved or displayed result: a comparison or a single run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultDocument {
    Comparison(ComparisonRecord),
    Single(BenchmarkRecord),
}

impl ResultDocument {
    pub fn matrix_size(&self) -> u32 {
        match self {
            Self::Comparison(c) => c.matrix_size,
            Self::Single(r) => r.matrix_size,
        }
    }

    /// Records in mode order
    pub fn records(&self) -> Vec<&BenchmarkRecord> {
        match self {
            Self::Comparison(c) => c.tests.values().collect(),
            Self::Single(r) => vec![r],
        }
    }

    pub fn as_comparison(&self) -> Option<&ComparisonRecord> {
        match self {
            Self::Comparison(c) => Some(c),
            Self::Single(_) => None,
        }
    }
}

impl From<BenchmarkRecord> for ResultDocument {
    fn from(record: BenchmarkRecord) -> Self {
        Self::Single(record)
    }
}

impl From<ComparisonRecord> for ResultDocument {
    fn from(comparison: ComparisonRecord) -> Self {
        Self::Comparison(comparison)
    }
}
