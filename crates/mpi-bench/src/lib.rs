//! MPI Benchmark Library
//!
//! Controls a simulated MPI cluster made of Docker containers, runs serial
//! and MPI matrix multiplication benchmarks inside it, and turns their
//! output into records, reports and charts.

pub mod benchmark;
pub mod cluster;
pub mod config;
pub mod error;
pub mod report;
pub mod storage;

// Re-export main types
pub use benchmark::{
    BenchmarkRecord, BenchmarkRequest, BenchmarkRunner, ComparisonRecord, ExecutionMode,
    ResultDocument, RunMetrics, RunMode, RunOutcome,
};
pub use cluster::{
    ClusterController, ClusterHealth, ClusterReport, CommandResult, ContainerRuntime,
    DockerRuntime, MockRuntime, NodeDetails, NodeStatus, UnavailableRuntime,
};
pub use config::BenchConfig;
pub use error::{BenchError, Result};
pub use report::{build_report, csv_file_name, csv_table, flatten, insights, summarize, Report};
pub use storage::ResultStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
