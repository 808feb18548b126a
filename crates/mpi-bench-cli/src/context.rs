//! Shared application context
//!
//! Wires the configured container runtime into the controller, runner and
//! result store used by every command.

use std::sync::Arc;

use mpi_bench::{
    BenchConfig, BenchmarkRunner, ClusterController, ContainerRuntime, DockerRuntime,
    ResultStore, UnavailableRuntime,
};
use tracing::warn;

#[derive(Clone)]
pub struct AppContext {
    pub config: BenchConfig,
    pub controller: ClusterController,
    pub runner: BenchmarkRunner,
    pub store: ResultStore,
}

impl AppContext {
    pub fn new(config: BenchConfig, runtime: Arc<dyn ContainerRuntime>) -> Self {
        let controller = ClusterController::new(runtime, config.cluster.clone())
            .with_exec_timeout(config.benchmark.exec_timeout());
        let runner = BenchmarkRunner::new(controller.clone(), config.benchmark.clone());
        let store = ResultStore::new(config.results.dir.clone());

        Self {
            config,
            controller,
            runner,
            store,
        }
    }

    /// Context over the local Docker engine
    ///
    /// When no engine client can be built the context still works: status
    /// queries report the engine as unavailable.
    pub fn connect(config: BenchConfig) -> Self {
        let runtime: Arc<dyn ContainerRuntime> = match DockerRuntime::connect() {
            Ok(docker) => Arc::new(docker),
            Err(e) => {
                warn!("{}", e);
                Arc::new(UnavailableRuntime::new(e.to_string()))
            }
        };
        Self::new(config, runtime)
    }
}
