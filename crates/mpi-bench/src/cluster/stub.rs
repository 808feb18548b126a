//! Unavailable runtime
//!
//! Used when the Docker engine cannot be reached at startup. Every ping
//! fails, so status queries report `docker_unavailable` instead of the
//! process refusing to start.

use super::{CommandResult, ContainerInfo, ContainerRuntime, NodeSpec};
use crate::{BenchError, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Runtime that rejects every operation
pub struct UnavailableRuntime {
    /// Reason why no engine is available
    reason: String,
}

impl UnavailableRuntime {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn err<T>(&self) -> Result<T> {
        Err(BenchError::RuntimeUnavailable(self.reason.clone()))
    }
}

#[async_trait]
impl ContainerRuntime for UnavailableRuntime {
    async fn ping(&self) -> Result<()> {
        self.err()
    }

    async fn inspect(&self, _name: &str) -> Result<Option<ContainerInfo>> {
        self.err()
    }

    async fn create_and_start(&self, _spec: &NodeSpec) -> Result<()> {
        self.err()
    }

    async fn start(&self, _name: &str) -> Result<()> {
        self.err()
    }

    async fn stop(&self, _name: &str, _timeout: Duration) -> Result<()> {
        self.err()
    }

    async fn remove(&self, _name: &str) -> Result<()> {
        self.err()
    }

    async fn network_exists(&self, _name: &str) -> Result<bool> {
        self.err()
    }

    async fn create_network(&self, _name: &str, _driver: &str) -> Result<()> {
        self.err()
    }

    async fn volume_exists(&self, _name: &str) -> Result<bool> {
        self.err()
    }

    async fn create_volume(&self, _name: &str) -> Result<()> {
        self.err()
    }

    async fn exec(&self, _name: &str, _user: &str, _command: &str) -> Result<CommandResult> {
        self.err()
    }

    async fn logs(&self, _name: &str, _tail: usize) -> Result<String> {
        self.err()
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ClusterController, NodeStatus};
    use crate::config::ClusterSettings;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_unavailable_runtime_fails_ping() {
        let runtime = UnavailableRuntime::new("socket missing");
        let err = runtime.ping().await.unwrap_err();
        assert!(err.to_string().contains("socket missing"));
        assert_eq!(runtime.name(), "unavailable");
    }

    #[tokio::test]
    async fn test_controller_over_unavailable_runtime() {
        let ctl = ClusterController::new(
            Arc::new(UnavailableRuntime::new("no docker")),
            ClusterSettings::default(),
        );

        let status = ctl.cluster_status().await;
        assert!(status.values().all(|s| *s == NodeStatus::DockerUnavailable));

        let stopped = ctl.stop_cluster().await;
        assert!(stopped.values().all(|ok| !ok));

        let result = ctl.run_command("hpchead", "true").await;
        assert_eq!(result.exit_code, -1);
    }
}
