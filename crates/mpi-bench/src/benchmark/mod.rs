//! Benchmark orchestration
//!
//! Builds compile and launch command lines for the serial and MPI matrix
//! programs, runs them on the head node through the cluster controller,
//! times them and turns their output into result records. Runs are strictly
//! sequential: each remote command is awaited before the next is issued.

pub mod parser;
pub mod record;

pub use parser::{parse_output, ParsedOutput};
pub use record::{
    epoch_seconds, BenchmarkRecord, ComparisonRecord, ExecutionMode, ResultDocument, RunMetrics,
    RunMode, RunOutcome,
};

use crate::cluster::{ClusterController, CommandResult};
use crate::config::BenchmarkSettings;
use crate::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Programs shipped on the shared volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Program {
    /// `serial.c`, built with gcc
    Serial,
    /// `matrix.c`, built with mpicc
    Mpi,
}

impl Program {
    /// Compile command for this program inside `dir`
    pub fn compile_command(&self, dir: &str) -> String {
        match self {
            Self::Serial => format!("gcc -o {dir}/serial {dir}/serial.c"),
            Self::Mpi => format!("mpicc -o {dir}/matrix {dir}/matrix.c -lm"),
        }
    }

    /// Path of the built binary inside `dir`
    pub fn binary(&self, dir: &str) -> String {
        match self {
            Self::Serial => format!("{dir}/serial"),
            Self::Mpi => format!("{dir}/matrix"),
        }
    }
}

/// A benchmark to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkRequest {
    pub mode: RunMode,
    pub matrix_size: u32,
    #[serde(default = "default_processes")]
    pub num_processes: u32,
    /// Runs per mode; metrics are averaged
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

fn default_processes() -> u32 {
    4
}

fn default_repeat() -> u32 {
    1
}

impl BenchmarkRequest {
    pub fn new(mode: RunMode, matrix_size: u32, num_processes: u32) -> Self {
        Self {
            mode,
            matrix_size,
            num_processes,
            repeat: 1,
        }
    }

    pub fn with_repeat(mut self, repeat: u32) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.matrix_size == 0 {
            return Err(BenchError::InvalidRequest(
                "matrix_size must be positive".to_string(),
            ));
        }
        if self.mode != RunMode::Serial {
            check_processes(self.num_processes)?;
        }
        if self.repeat == 0 {
            return Err(BenchError::InvalidRequest(
                "repeat must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_processes(num_processes: u32) -> Result<()> {
    if num_processes == 0 {
        return Err(BenchError::InvalidRequest(
            "num_processes must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Per-node process counts for a multi-node launch
///
/// Every used node gets `max(1, processes / nodes)` slots and only the first
/// `min(nodes, processes)` nodes are used. Remainders are not redistributed.
pub fn host_assignments(nodes: &[String], num_processes: u32) -> Vec<(String, u32)> {
    if nodes.is_empty() {
        return Vec::new();
    }
    let per_node = (num_processes / nodes.len() as u32).max(1);
    let used = nodes.len().min(num_processes as usize);
    nodes
        .iter()
        .take(used)
        .map(|node| (node.clone(), per_node))
        .collect()
}

/// `--host` argument for a multi-node launch
pub fn host_list(nodes: &[String], num_processes: u32) -> String {
    let hosts: Vec<String> = host_assignments(nodes, num_processes)
        .into_iter()
        .map(|(node, slots)| format!("{node}:{slots}"))
        .collect();
    format!("--host {}", hosts.join(","))
}

/// Runs benchmarks against the cluster
#[derive(Clone)]
pub struct BenchmarkRunner {
    controller: ClusterController,
    settings: BenchmarkSettings,
}

impl BenchmarkRunner {
    pub fn new(controller: ClusterController, settings: BenchmarkSettings) -> Self {
        Self {
            controller,
            settings,
        }
    }

    fn algorithm(&self) -> &str {
        &self.settings.algorithm
    }

    /// Compile a program on the head node
    pub async fn compile(&self, program: Program) -> CommandResult {
        let command = program.compile_command(&self.settings.program_dir);
        info!("Compiling {:?} program", program);
        let result = self
            .controller
            .run_command(self.controller.head_node(), &command)
            .await;
        if !result.succeeded() {
            warn!("Compilation of {:?} failed with exit code {}", program, result.exit_code);
        }
        result
    }

    /// Launch command for a mode
    pub fn run_command_for(
        &self,
        mode: ExecutionMode,
        matrix_size: u32,
        num_processes: u32,
    ) -> String {
        let dir = &self.settings.program_dir;
        match mode {
            ExecutionMode::Serial => {
                format!("{} {}", Program::Serial.binary(dir), matrix_size)
            }
            ExecutionMode::SingleNode => format!(
                "mpirun -np {} --host {} {} {}",
                num_processes,
                self.controller.head_node(),
                Program::Mpi.binary(dir),
                matrix_size
            ),
            ExecutionMode::MultiNode => format!(
                "mpirun -np {} {} {} {}",
                num_processes,
                host_list(&self.controller.node_names(), num_processes),
                Program::Mpi.binary(dir),
                matrix_size
            ),
        }
    }

    /// Compile, run and parse one benchmark
    async fn run_once(
        &self,
        mode: ExecutionMode,
        matrix_size: u32,
        num_processes: u32,
    ) -> BenchmarkRecord {
        let program = match mode {
            ExecutionMode::Serial => Program::Serial,
            _ => Program::Mpi,
        };

        let compiled = self.compile(program).await;
        if !compiled.succeeded() {
            return BenchmarkRecord::failed(
                mode,
                self.algorithm(),
                matrix_size,
                num_processes,
                format!("Compilation failed: {}", compiled.output),
            );
        }

        let command = self.run_command_for(mode, matrix_size, num_processes);
        let started = Instant::now();
        let result = self
            .controller
            .run_command(self.controller.head_node(), &command)
            .await;
        let wall_time = started.elapsed().as_secs_f64();

        if !result.succeeded() {
            warn!(
                "{} run of size {} failed with exit code {}",
                mode, matrix_size, result.exit_code
            );
            return BenchmarkRecord::failed(
                mode,
                self.algorithm(),
                matrix_size,
                num_processes,
                result.output,
            );
        }

        let parsed = parse_output(&result.output);
        if parsed.execution_time.is_none() {
            debug!("No elapsed time in {} output, using wall clock", mode);
        }
        let metrics = RunMetrics {
            execution_time: parsed.execution_time.unwrap_or(wall_time),
            wall_time,
            gflops: parsed.gflops.unwrap_or(0.0),
            memory_mb: parsed.memory_mb.unwrap_or(0.0),
        };

        info!(
            "{} run of size {} with {} processes took {:.4}s",
            mode, matrix_size, num_processes, metrics.execution_time
        );
        BenchmarkRecord::completed(
            mode,
            self.algorithm(),
            matrix_size,
            num_processes,
            metrics,
            result.output,
        )
    }

    /// Run a mode `repeat` times and average the metrics
    ///
    /// Stops at the first failing repetition and returns it.
    async fn run_repeated(
        &self,
        mode: ExecutionMode,
        matrix_size: u32,
        num_processes: u32,
        repeat: u32,
    ) -> BenchmarkRecord {
        let mut samples = Vec::with_capacity(repeat as usize);
        let mut last = None;

        for round in 1..=repeat.max(1) {
            if repeat > 1 {
                debug!("{} repetition {}/{}", mode, round, repeat);
            }
            let record = self.run_once(mode, matrix_size, num_processes).await;
            let Some(metrics) = record.metrics().copied() else {
                return record;
            };
            samples.push(metrics);
            last = Some(record);
        }

        match (last, RunMetrics::mean(&samples)) {
            (Some(mut record), Some(mean)) => {
                if let RunOutcome::Success { metrics, .. } = &mut record.outcome {
                    *metrics = mean;
                }
                record
            }
            _ => BenchmarkRecord::failed(
                mode,
                self.algorithm(),
                matrix_size,
                num_processes,
                "No benchmark runs were executed",
            ),
        }
    }

    /// Serial run on the head node
    pub async fn run_serial(&self, matrix_size: u32) -> BenchmarkRecord {
        info!("Running serial benchmark with matrix size {}", matrix_size);
        self.run_once(ExecutionMode::Serial, matrix_size, 1).await
    }

    /// MPI run on the head node only or spread over the cluster
    pub async fn run_parallel(
        &self,
        matrix_size: u32,
        num_processes: u32,
        mode: ExecutionMode,
    ) -> Result<BenchmarkRecord> {
        if !mode.is_parallel() {
            return Err(BenchError::InvalidRequest(
                "run_parallel needs single_node or multi_node".to_string(),
            ));
        }
        check_processes(num_processes)?;
        info!(
            "Running parallel benchmark: size={}, procs={}, mode={}",
            matrix_size, num_processes, mode
        );
        Ok(self.run_once(mode, matrix_size, num_processes).await)
    }

    /// Serial, single node and multi node runs with speedup and efficiency
    pub async fn run_comparison(&self, matrix_size: u32, num_processes: u32) -> ComparisonRecord {
        self.compare(matrix_size, num_processes, 1).await
    }

    async fn compare(&self, matrix_size: u32, num_processes: u32, repeat: u32) -> ComparisonRecord {
        info!(
            "Running comparison: size={}, procs={}, repeat={}",
            matrix_size, num_processes, repeat
        );
        let mut comparison = ComparisonRecord::new(matrix_size, num_processes);

        for mode in ExecutionMode::ALL {
            let processes = if mode.is_parallel() { num_processes } else { 1 };
            let record = self
                .run_repeated(mode, matrix_size, processes, repeat)
                .await;
            comparison.tests.insert(mode, record);
        }

        comparison.derive_ratios();
        comparison
    }

    /// Validate and run a request
    pub async fn execute(&self, request: BenchmarkRequest) -> Result<ResultDocument> {
        request.validate()?;

        let document = match request.mode.execution_mode() {
            Some(mode) => {
                let processes = if mode.is_parallel() {
                    request.num_processes
                } else {
                    1
                };
                self.run_repeated(mode, request.matrix_size, processes, request.repeat)
                    .await
                    .into()
            }
            None => self
                .compare(request.matrix_size, request.num_processes, request.repeat)
                .await
                .into(),
        };
        Ok(document)
    }
}
