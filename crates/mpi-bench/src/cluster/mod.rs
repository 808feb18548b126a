//! Cluster control
//!
//! The simulated MPI cluster is a fixed set of long-lived containers on one
//! Docker host: a head node plus workers, sharing a bridge network and a
//! volume holding the benchmark sources. This module provides:
//! - a runtime abstraction over the container engine (`ContainerRuntime`)
//! - the Docker implementation backed by bollard
//! - the controller that queries, starts and stops nodes and runs commands

pub mod controller;
pub mod docker;
pub mod mock;
pub mod stub;

pub use controller::ClusterController;
pub use docker::DockerRuntime;
pub use mock::MockRuntime;
pub use stub::UnavailableRuntime;

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// CPU cores each node contributes to the advertised capacity
pub const CORES_PER_NODE: usize = 4;

/// Container engine operations the controller relies on
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Liveness ping against the engine
    async fn ping(&self) -> Result<()>;

    /// Look up a container by name; `None` when it does not exist
    async fn inspect(&self, name: &str) -> Result<Option<ContainerInfo>>;

    /// Create a container from `spec` and start it
    async fn create_and_start(&self, spec: &NodeSpec) -> Result<()>;

    /// Start an existing container
    async fn start(&self, name: &str) -> Result<()>;

    /// Stop a container; `BenchError::NodeNotFound` when absent
    async fn stop(&self, name: &str, timeout: Duration) -> Result<()>;

    /// Remove a container; `BenchError::NodeNotFound` when absent
    async fn remove(&self, name: &str) -> Result<()>;

    async fn network_exists(&self, name: &str) -> Result<bool>;

    async fn create_network(&self, name: &str, driver: &str) -> Result<()>;

    async fn volume_exists(&self, name: &str) -> Result<bool>;

    async fn create_volume(&self, name: &str) -> Result<()>;

    /// Run `command` through a login shell of `user` inside the container
    async fn exec(&self, name: &str, user: &str, command: &str) -> Result<CommandResult>;

    /// Last `tail` lines of container output
    async fn logs(&self, name: &str, tail: usize) -> Result<String>;

    /// Name of this runtime for logging
    fn name(&self) -> &str;
}

/// Everything needed to create one node container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    /// Container name, also used as the network hostname
    pub name: String,
    pub image: String,
    pub network: String,
    /// Volume bind in `volume:path:mode` form
    pub volume_bind: String,
}

/// Raw container facts reported by the runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub id: String,
    /// Engine state string (`running`, `exited`, `created`, ...)
    pub state: String,
    pub started_at: Option<String>,
}

/// Status of one cluster node, recomputed on every query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Running,
    Exited,
    NotFound,
    DockerUnavailable,
    Error,
    Unknown,
}

impl NodeStatus {
    /// Map an engine state string onto a node status
    pub fn from_engine_state(state: &str) -> Self {
        match state {
            "running" => Self::Running,
            "exited" => Self::Exited,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Exited => "exited",
            Self::NotFound => "not_found",
            Self::DockerUnavailable => "docker_unavailable",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exit status and combined output of one command run inside a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub exit_code: i64,
    pub output: String,
}

impl CommandResult {
    pub fn new(exit_code: i64, output: impl Into<String>) -> Self {
        Self {
            exit_code,
            output: output.into(),
        }
    }

    /// Exit code zero
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Running details shown for a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDetails {
    pub name: String,
    pub short_id: String,
    pub status: NodeStatus,
    pub started_at: Option<String>,
}

/// Overall cluster health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterHealth {
    Healthy,
    Degraded,
    Offline,
}

impl ClusterHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Offline => "offline",
        }
    }
}

/// Summary of a status query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterReport {
    pub nodes: BTreeMap<String, NodeStatus>,
    pub running: usize,
    pub total: usize,
    pub health: ClusterHealth,
    pub capacity_cores: usize,
}

impl ClusterReport {
    pub fn from_statuses(nodes: BTreeMap<String, NodeStatus>) -> Self {
        let running = nodes.values().filter(|s| s.is_running()).count();
        let total = nodes.len();
        let health = if total > 0 && running == total {
            ClusterHealth::Healthy
        } else if running > 0 {
            ClusterHealth::Degraded
        } else {
            ClusterHealth::Offline
        };

        Self {
            nodes,
            running,
            total,
            health,
            capacity_cores: total * CORES_PER_NODE,
        }
    }
}
