//! Benchmark configuration management
//!
//! Handles loading and saving configuration from ~/.mpibench/config.toml

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BenchConfig {
    /// Container cluster settings
    #[serde(default)]
    pub cluster: ClusterSettings,

    /// Benchmark program settings
    #[serde(default)]
    pub benchmark: BenchmarkSettings,

    /// Result storage settings
    #[serde(default)]
    pub results: ResultsSettings,

    /// Dashboard API settings
    #[serde(default)]
    pub server: ServerSettings,
}

/// Container cluster settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterSettings {
    /// Image every node is created from
    #[serde(default = "default_image")]
    pub image: String,

    /// Shared bridge network name
    #[serde(default = "default_network")]
    pub network: String,

    /// Shared volume name
    #[serde(default = "default_volume")]
    pub volume: String,

    /// Mount point of the shared volume inside every node
    #[serde(default = "default_mount_path")]
    pub mount_path: String,

    /// Head node name (container name and hostname)
    #[serde(default = "default_head_node")]
    pub head_node: String,

    /// Worker node names, in start order
    #[serde(default = "default_worker_nodes")]
    pub worker_nodes: Vec<String>,

    /// Unprivileged user commands run as inside a node
    #[serde(default = "default_exec_user")]
    pub exec_user: String,

    /// Grace period before a stopping node is killed
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout_secs: u64,

    /// Node readiness polling
    #[serde(default)]
    pub readiness: ReadinessSettings,
}

fn default_image() -> String {
    "mpi-node".to_string()
}
fn default_network() -> String {
    "mpi-net".to_string()
}
fn default_volume() -> String {
    "mpi_home".to_string()
}
fn default_mount_path() -> String {
    "/home/faiz".to_string()
}
fn default_head_node() -> String {
    "hpchead".to_string()
}
fn default_worker_nodes() -> Vec<String> {
    vec![
        "node01".to_string(),
        "node02".to_string(),
        "node03".to_string(),
    ]
}
fn default_exec_user() -> String {
    "faiz".to_string()
}
fn default_stop_timeout() -> u64 {
    10
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            image: default_image(),
            network: default_network(),
            volume: default_volume(),
            mount_path: default_mount_path(),
            head_node: default_head_node(),
            worker_nodes: default_worker_nodes(),
            exec_user: default_exec_user(),
            stop_timeout_secs: default_stop_timeout(),
            readiness: ReadinessSettings::default(),
        }
    }
}

impl ClusterSettings {
    /// All node names, head first
    pub fn node_names(&self) -> Vec<String> {
        let mut nodes = Vec::with_capacity(1 + self.worker_nodes.len());
        nodes.push(self.head_node.clone());
        nodes.extend(self.worker_nodes.iter().cloned());
        nodes
    }

    /// Volume bind in Docker `name:path:mode` form
    pub fn volume_bind(&self) -> String {
        format!("{}:{}:rw", self.volume, self.mount_path)
    }
}

/// Backoff parameters for node readiness polling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadinessSettings {
    #[serde(default = "default_readiness_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_readiness_timeout() -> u64 {
    30
}
fn default_initial_delay() -> u64 {
    250
}
fn default_max_delay() -> u64 {
    2000
}
fn default_multiplier() -> f64 {
    2.0
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_readiness_timeout(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            multiplier: default_multiplier(),
        }
    }
}

impl ReadinessSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Delay before poll number `attempt` (zero based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = self.initial_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        let delay = delay.min(self.max_delay_ms as f64);
        Duration::from_millis(delay as u64)
    }
}

/// Benchmark program settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BenchmarkSettings {
    /// Directory holding `serial.c` and `matrix.c` inside the head node
    #[serde(default = "default_program_dir")]
    pub program_dir: String,

    /// Algorithm identifier recorded on every result
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    /// Per-command timeout; unset means wait indefinitely
    #[serde(default)]
    pub exec_timeout_secs: Option<u64>,
}

fn default_program_dir() -> String {
    "/home/faiz".to_string()
}
fn default_algorithm() -> String {
    "matrix_multiplication".to_string()
}

impl Default for BenchmarkSettings {
    fn default() -> Self {
        Self {
            program_dir: default_program_dir(),
            algorithm: default_algorithm(),
            exec_timeout_secs: None,
        }
    }
}

impl BenchmarkSettings {
    pub fn exec_timeout(&self) -> Option<Duration> {
        self.exec_timeout_secs.map(Duration::from_secs)
    }
}

/// Result storage settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultsSettings {
    #[serde(default = "default_results_dir")]
    pub dir: PathBuf,
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("data/results")
}

impl Default for ResultsSettings {
    fn default() -> Self {
        Self {
            dir: default_results_dir(),
        }
    }
}

/// Dashboard API settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8501".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

impl BenchConfig {
    /// Get the configuration directory path
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".mpibench")
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from the default location, or defaults if absent
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_path();
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Save configuration to a specific path, creating parent directories
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Example configuration file content
pub fn example_config() -> &'static str {
    r#"# MPI benchmark configuration
# Location: ~/.mpibench/config.toml

[cluster]
image = "mpi-node"
network = "mpi-net"
volume = "mpi_home"
mount_path = "/home/faiz"
head_node = "hpchead"
worker_nodes = ["node01", "node02", "node03"]
exec_user = "faiz"
stop_timeout_secs = 10

[cluster.readiness]
timeout_secs = 30
initial_delay_ms = 250
max_delay_ms = 2000
multiplier = 2.0

[benchmark]
program_dir = "/home/faiz"
algorithm = "matrix_multiplication"
# exec_timeout_secs = 600

[results]
dir = "data/results"

[server]
bind_addr = "127.0.0.1:8501"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = BenchConfig::default();
        assert_eq!(config.cluster.head_node, "hpchead");
        assert_eq!(
            config.cluster.node_names(),
            vec!["hpchead", "node01", "node02", "node03"]
        );
        assert_eq!(config.cluster.volume_bind(), "mpi_home:/home/faiz:rw");
        assert!(config.benchmark.exec_timeout().is_none());
    }

    #[test]
    fn test_example_config_parses() {
        let config: BenchConfig = toml::from_str(example_config()).unwrap();
        assert_eq!(config, BenchConfig::default());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: BenchConfig = toml::from_str(
            r#"
            [benchmark]
            exec_timeout_secs = 120
            "#,
        )
        .unwrap();
        assert_eq!(config.benchmark.exec_timeout(), Some(Duration::from_secs(120)));
        assert_eq!(config.cluster.image, "mpi-node");
        assert_eq!(config.results.dir, PathBuf::from("data/results"));
    }

    #[test]
    fn test_readiness_backoff() {
        let readiness = ReadinessSettings::default();
        assert_eq!(readiness.delay_for(0).as_millis(), 250);
        assert_eq!(readiness.delay_for(1).as_millis(), 500);
        assert_eq!(readiness.delay_for(2).as_millis(), 1000);
        assert_eq!(readiness.delay_for(3).as_millis(), 2000);
        assert_eq!(readiness.delay_for(4).as_millis(), 2000); // Capped
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = BenchConfig::default();
        config.server.bind_addr = "0.0.0.0:9000".to_string();
        config.save_to(&path).unwrap();

        let loaded = BenchConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
