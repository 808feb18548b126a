//! Shared state for the dashboard API.

use mpi_bench::{BenchmarkRunner, ClusterController, ResultDocument, ResultStore};
use tokio::sync::{Mutex, RwLock};

use crate::context::AppContext;

/// State shared across all handlers.
///
/// Holds the result most recently produced or loaded. Benchmarks are
/// serialized through `run_lock` so two requests never run in the cluster
/// at the same time.
pub struct DashboardState {
    pub controller: ClusterController,
    pub runner: BenchmarkRunner,
    pub store: ResultStore,
    current: RwLock<Option<ResultDocument>>,
    run_lock: Mutex<()>,
}

impl DashboardState {
    pub fn new(controller: ClusterController, runner: BenchmarkRunner, store: ResultStore) -> Self {
        Self {
            controller,
            runner,
            store,
            current: RwLock::new(None),
            run_lock: Mutex::new(()),
        }
    }

    pub fn from_context(ctx: &AppContext) -> Self {
        Self::new(
            ctx.controller.clone(),
            ctx.runner.clone(),
            ctx.store.clone(),
        )
    }

    /// The current result, if any
    pub async fn current(&self) -> Option<ResultDocument> {
        self.current.read().await.clone()
    }

    pub async fn set_current(&self, document: ResultDocument) {
        *self.current.write().await = Some(document);
    }

    /// Guard held for the duration of a benchmark run
    pub async fn lock_run(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.run_lock.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mpi_bench::{BenchConfig, ComparisonRecord, MockRuntime};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_current_starts_empty_and_replaces() {
        let ctx = AppContext::new(BenchConfig::default(), Arc::new(MockRuntime::new()));
        let state = DashboardState::from_context(&ctx);
        assert!(state.current().await.is_none());

        state
            .set_current(ComparisonRecord::new(100, 4).into())
            .await;
        assert_eq!(state.current().await.map(|d| d.matrix_size()), Some(100));

        state
            .set_current(ComparisonRecord::new(200, 4).into())
            .await;
        assert_eq!(state.current().await.map(|d| d.matrix_size()), Some(200));
    }
}
