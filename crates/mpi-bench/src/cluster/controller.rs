//! Cluster controller
//!
//! Queries, starts and stops the fixed node set and runs commands inside
//! nodes. Per-node runtime failures are converted into status values or
//! `false` entries; they never escape to the caller.

use super::{
    ClusterReport, CommandResult, ContainerRuntime, NodeDetails, NodeSpec, NodeStatus,
};
use crate::config::ClusterSettings;
use crate::{BenchError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Driver used when the shared network has to be created
const NETWORK_DRIVER: &str = "bridge";

/// Controller for the simulated MPI cluster
#[derive(Clone)]
pub struct ClusterController {
    runtime: Arc<dyn ContainerRuntime>,
    settings: ClusterSettings,
    exec_timeout: Option<Duration>,
}

impl ClusterController {
    /// Create a controller over a container runtime
    pub fn new(runtime: Arc<dyn ContainerRuntime>, settings: ClusterSettings) -> Self {
        Self {
            runtime,
            settings,
            exec_timeout: None,
        }
    }

    /// Bound every `run_command` call; `None` waits indefinitely
    pub fn with_exec_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.exec_timeout = timeout;
        self
    }

    /// Head node name
    pub fn head_node(&self) -> &str {
        &self.settings.head_node
    }

    /// All node names, head first
    pub fn node_names(&self) -> Vec<String> {
        self.settings.node_names()
    }

    /// Check whether the container runtime answers a liveness ping
    pub async fn is_available(&self) -> bool {
        match self.runtime.ping().await {
            Ok(()) => true,
            Err(e) => {
                error!("Container runtime not available: {}", e);
                false
            }
        }
    }

    /// Status of a single node
    pub async fn node_status(&self, name: &str) -> NodeStatus {
        match self.runtime.inspect(name).await {
            Ok(Some(info)) => {
                let status = NodeStatus::from_engine_state(&info.state);
                if status == NodeStatus::Unknown {
                    debug!("Node {} in unmapped state '{}'", name, info.state);
                }
                status
            }
            Ok(None) => NodeStatus::NotFound,
            Err(e) => {
                error!("Error getting status for {}: {}", name, e);
                NodeStatus::Error
            }
        }
    }

    /// Status of every node
    ///
    /// When the runtime is unreachable every node reports
    /// `DockerUnavailable` without being queried individually.
    pub async fn cluster_status(&self) -> BTreeMap<String, NodeStatus> {
        let nodes = self.node_names();

        if !self.is_available().await {
            return nodes
                .into_iter()
                .map(|n| (n, NodeStatus::DockerUnavailable))
                .collect();
        }

        let mut status = BTreeMap::new();
        for node in nodes {
            let node_status = self.node_status(&node).await;
            status.insert(node, node_status);
        }
        status
    }

    /// Status of every node together with health and capacity figures
    pub async fn report(&self) -> ClusterReport {
        ClusterReport::from_statuses(self.cluster_status().await)
    }

    /// Start the head node and `node_count - 1` workers
    ///
    /// Returns per-node success. Fails with `RuntimeUnavailable` when the
    /// runtime cannot be reached, and with `ReadinessTimeout` when the head
    /// node never reaches the running state. When the shared network or
    /// volume cannot be prepared every requested node is reported `false`.
    pub async fn start_cluster(&self, node_count: usize) -> Result<BTreeMap<String, bool>> {
        if !self.is_available().await {
            return Err(BenchError::RuntimeUnavailable(
                "Docker is not available".to_string(),
            ));
        }

        let worker_count = node_count
            .clamp(1, 1 + self.settings.worker_nodes.len())
            .saturating_sub(1);
        let mut results = BTreeMap::new();

        if let Err(e) = self.ensure_shared_resources().await {
            error!("Failed to prepare network and volume: {}", e);
            results.insert(self.settings.head_node.clone(), false);
            for worker in self.settings.worker_nodes.iter().take(worker_count) {
                results.insert(worker.clone(), false);
            }
            return Ok(results);
        }

        let head = self.settings.head_node.clone();
        let head_started = self.start_node(&head).await;
        if head_started {
            self.wait_until_running(&head).await?;
        }
        results.insert(head, head_started);

        for worker in self.settings.worker_nodes.iter().take(worker_count) {
            let started = self.start_node(worker).await
                && match self.wait_until_running(worker).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("{}", e);
                        false
                    }
                };
            results.insert(worker.clone(), started);
        }

        info!(
            "Cluster start finished: {}/{} nodes up",
            results.values().filter(|ok| **ok).count(),
            results.len()
        );
        Ok(results)
    }

    /// Stop and remove every node; an absent node counts as stopped
    pub async fn stop_cluster(&self) -> BTreeMap<String, bool> {
        let mut results = BTreeMap::new();
        for node in self.node_names() {
            let stopped = match self.stop_node(&node).await {
                Ok(()) => true,
                Err(e) => {
                    error!("Error stopping {}: {}", node, e);
                    false
                }
            };
            results.insert(node, stopped);
        }
        results
    }

    /// Run a shell command inside a node as the configured user
    ///
    /// Runtime failures come back as exit code -1 with the error text as output.
    pub async fn run_command(&self, node: &str, command: &str) -> CommandResult {
        debug!("[{}] $ {}", node, command);
        let exec = self.runtime.exec(node, &self.settings.exec_user, command);

        let result = match self.exec_timeout {
            Some(limit) => match tokio::time::timeout(limit, exec).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Command in {} timed out after {:?}", node, limit);
                    return CommandResult::new(
                        -1,
                        format!("Command timed out after {:?}: {}", limit, command),
                    );
                }
            },
            None => exec.await,
        };

        match result {
            Ok(result) => {
                debug!("[{}] exit code {}", node, result.exit_code);
                result
            }
            Err(e) => {
                error!("Failed to execute command in {}: {}", node, e);
                CommandResult::new(-1, e.to_string())
            }
        }
    }

    /// Container id and start time of a node; `None` when it does not exist
    pub async fn node_details(&self, node: &str) -> Option<NodeDetails> {
        match self.runtime.inspect(node).await {
            Ok(Some(info)) => Some(NodeDetails {
                name: node.to_string(),
                short_id: info.id.chars().take(12).collect(),
                status: NodeStatus::from_engine_state(&info.state),
                started_at: info.started_at,
            }),
            Ok(None) => None,
            Err(e) => {
                error!("Failed to inspect {}: {}", node, e);
                None
            }
        }
    }

    /// Last `tail` lines of a node's output, or the error text
    pub async fn logs(&self, node: &str, tail: usize) -> String {
        match self.runtime.logs(node, tail).await {
            Ok(logs) => logs,
            Err(e) => {
                error!("Failed to get logs from {}: {}", node, e);
                format!("Error: {}", e)
            }
        }
    }

    async fn ensure_shared_resources(&self) -> Result<()> {
        self.ensure_network().await?;
        self.ensure_volume().await
    }

    async fn ensure_network(&self) -> Result<()> {
        let network = &self.settings.network;
        if !self.runtime.network_exists(network).await? {
            self.runtime.create_network(network, NETWORK_DRIVER).await?;
            info!("Created network: {}", network);
        }
        Ok(())
    }

    async fn ensure_volume(&self) -> Result<()> {
        let volume = &self.settings.volume;
        if !self.runtime.volume_exists(volume).await? {
            self.runtime.create_volume(volume).await?;
            info!("Created volume: {}", volume);
        }
        Ok(())
    }

    fn node_spec(&self, name: &str) -> NodeSpec {
        NodeSpec {
            name: name.to_string(),
            image: self.settings.image.clone(),
            network: self.settings.network.clone(),
            volume_bind: self.settings.volume_bind(),
        }
    }

    /// Resume, create or leave running a single node
    async fn start_node(&self, name: &str) -> bool {
        let outcome = match self.runtime.inspect(name).await {
            Ok(Some(info)) if info.state == "running" => {
                info!("Container {} already running", name);
                Ok(())
            }
            Ok(Some(_)) => self.runtime.start(name).await.map(|()| {
                info!("Started existing container: {}", name);
            }),
            Ok(None) => self
                .runtime
                .create_and_start(&self.node_spec(name))
                .await
                .map(|()| {
                    info!("Created and started new container: {}", name);
                }),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to start container {}: {}", name, e);
                false
            }
        }
    }

    async fn stop_node(&self, name: &str) -> Result<()> {
        let timeout = Duration::from_secs(self.settings.stop_timeout_secs);
        match self.runtime.stop(name, timeout).await {
            Ok(()) => {}
            Err(BenchError::NodeNotFound(_)) => {
                debug!("Node {} already absent", name);
                return Ok(());
            }
            Err(e) => return Err(e),
        }
        match self.runtime.remove(name).await {
            Ok(()) | Err(BenchError::NodeNotFound(_)) => {
                info!("Stopped and removed {}", name);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Poll a node with exponential backoff until it reports running
    async fn wait_until_running(&self, name: &str) -> Result<()> {
        let readiness = &self.settings.readiness;
        let timeout = readiness.timeout();
        let started = Instant::now();
        let mut attempt = 0;

        loop {
            if self.node_status(name).await.is_running() {
                debug!("Node {} ready after {} polls", name, attempt + 1);
                return Ok(());
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                return Err(BenchError::ReadinessTimeout {
                    node: name.to_string(),
                    waited: elapsed,
                });
            }

            let delay = readiness.delay_for(attempt).min(timeout - elapsed);
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
