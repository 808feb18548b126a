//! In-memory container runtime
//!
//! Simulates the engine without Docker so the controller, the benchmark
//! runner and the dashboard API can be exercised anywhere. Command
//! responses are scripted by substring match and every exec is recorded.

use super::{CommandResult, ContainerInfo, ContainerRuntime, NodeSpec};
use crate::{BenchError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Record of an executed command for verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedCommand {
    pub node: String,
    pub user: String,
    pub command: String,
}

#[derive(Default)]
struct MockState {
    containers: BTreeMap<String, ContainerInfo>,
    networks: BTreeSet<String>,
    volumes: BTreeSet<String>,
    created: Vec<NodeSpec>,
    started: Vec<String>,
    executed: Vec<ExecutedCommand>,
    /// (substring, queued responses); the last response repeats
    rules: Vec<(String, VecDeque<CommandResult>)>,
    logs: BTreeMap<String, String>,
}

/// Mock runtime for tests
pub struct MockRuntime {
    available: bool,
    state: Mutex<MockState>,
    inspect_failures: HashSet<String>,
    create_failures: HashSet<String>,
    stuck_nodes: HashSet<String>,
    network_failure: Option<String>,
    exec_delay: Option<Duration>,
    default_response: CommandResult,
    inspect_count: AtomicUsize,
    next_id: AtomicUsize,
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRuntime {
    /// Reachable runtime with no containers
    pub fn new() -> Self {
        Self {
            available: true,
            state: Mutex::new(MockState::default()),
            inspect_failures: HashSet::new(),
            create_failures: HashSet::new(),
            stuck_nodes: HashSet::new(),
            network_failure: None,
            exec_delay: None,
            default_response: CommandResult::new(0, ""),
            inspect_count: AtomicUsize::new(0),
            next_id: AtomicUsize::new(1),
        }
    }

    /// Runtime whose liveness ping fails
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Pre-existing container in the given engine state
    pub fn with_container(self, name: &str, state: &str) -> Self {
        let info = self.container_info(state);
        self.lock().containers.insert(name.to_string(), info);
        self
    }

    /// Every node of `names` already running
    pub fn with_running_nodes<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .fold(self, |rt, name| rt.with_container(name.as_ref(), "running"))
    }

    /// Inspecting this node fails with a runtime error
    pub fn with_inspect_failure(mut self, name: &str) -> Self {
        self.inspect_failures.insert(name.to_string());
        self
    }

    /// Creating this node fails
    pub fn with_create_failure(mut self, name: &str) -> Self {
        self.create_failures.insert(name.to_string());
        self
    }

    /// This node is created but never reaches the running state
    pub fn with_stuck_node(mut self, name: &str) -> Self {
        self.stuck_nodes.insert(name.to_string());
        self
    }

    /// Creating the shared network fails with this message
    pub fn with_network_failure(mut self, message: &str) -> Self {
        self.network_failure = Some(message.to_string());
        self
    }

    /// Every exec takes this long before answering
    pub fn with_exec_delay(mut self, delay: Duration) -> Self {
        self.exec_delay = Some(delay);
        self
    }

    /// Canned log output for a node
    pub fn with_logs(self, name: &str, logs: &str) -> Self {
        self.lock().logs.insert(name.to_string(), logs.to_string());
        self
    }

    /// Answer every command containing `pattern` with `result`
    pub fn respond(self, pattern: &str, result: CommandResult) -> Self {
        self.respond_sequence(pattern, vec![result])
    }

    /// Answer successive commands containing `pattern` in order, repeating the last
    pub fn respond_sequence(self, pattern: &str, results: Vec<CommandResult>) -> Self {
        self.lock()
            .rules
            .push((pattern.to_string(), results.into_iter().collect()));
        self
    }

    pub fn executed(&self) -> Vec<ExecutedCommand> {
        self.lock().executed.clone()
    }

    pub fn created_specs(&self) -> Vec<NodeSpec> {
        self.lock().created.clone()
    }

    /// Existing containers started through `start`
    pub fn started_names(&self) -> Vec<String> {
        self.lock().started.clone()
    }

    pub fn has_network(&self, name: &str) -> bool {
        self.lock().networks.contains(name)
    }

    pub fn has_volume(&self, name: &str) -> bool {
        self.lock().volumes.contains(name)
    }

    pub fn inspect_count(&self) -> usize {
        self.inspect_count.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A poisoned lock only means another test thread panicked
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn container_info(&self, state: &str) -> ContainerInfo {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        ContainerInfo {
            id: format!("{:064x}", 0xc0ffee_0000 + id),
            state: state.to_string(),
            started_at: Some("2024-01-01T00:00:00Z".to_string()),
        }
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available {
            Ok(())
        } else {
            Err(BenchError::RuntimeUnavailable("mock runtime offline".to_string()))
        }
    }

    fn state_after_start(&self, name: &str) -> &'static str {
        if self.stuck_nodes.contains(name) {
            "created"
        } else {
            "running"
        }
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn ping(&self) -> Result<()> {
        self.ensure_available()
    }

    async fn inspect(&self, name: &str) -> Result<Option<ContainerInfo>> {
        self.ensure_available()?;
        self.inspect_count.fetch_add(1, Ordering::SeqCst);
        if self.inspect_failures.contains(name) {
            return Err(BenchError::Runtime(format!("inspect of {name} failed")));
        }
        Ok(self.lock().containers.get(name).cloned())
    }

    async fn create_and_start(&self, spec: &NodeSpec) -> Result<()> {
        self.ensure_available()?;
        if self.create_failures.contains(&spec.name) {
            return Err(BenchError::Runtime(format!(
                "create of {} failed",
                spec.name
            )));
        }
        let info = self.container_info(self.state_after_start(&spec.name));
        let mut state = self.lock();
        state.containers.insert(spec.name.clone(), info);
        state.created.push(spec.clone());
        Ok(())
    }

    async fn start(&self, name: &str) -> Result<()> {
        self.ensure_available()?;
        let next = self.state_after_start(name);
        let mut state = self.lock();
        let info = state
            .containers
            .get_mut(name)
            .ok_or_else(|| BenchError::NodeNotFound(name.to_string()))?;
        info.state = next.to_string();
        state.started.push(name.to_string());
        Ok(())
    }

    async fn stop(&self, name: &str, _timeout: Duration) -> Result<()> {
        self.ensure_available()?;
        let mut state = self.lock();
        let info = state
            .containers
            .get_mut(name)
            .ok_or_else(|| BenchError::NodeNotFound(name.to_string()))?;
        info.state = "exited".to_string();
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<()> {
        self.ensure_available()?;
        self.lock()
            .containers
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| BenchError::NodeNotFound(name.to_string()))
    }

    async fn network_exists(&self, name: &str) -> Result<bool> {
        self.ensure_available()?;
        Ok(self.has_network(name))
    }

    async fn create_network(&self, name: &str, _driver: &str) -> Result<()> {
        self.ensure_available()?;
        if let Some(message) = &self.network_failure {
            return Err(BenchError::Runtime(message.clone()));
        }
        self.lock().networks.insert(name.to_string());
        Ok(())
    }

    async fn volume_exists(&self, name: &str) -> Result<bool> {
        self.ensure_available()?;
        Ok(self.has_volume(name))
    }

    async fn create_volume(&self, name: &str) -> Result<()> {
        self.ensure_available()?;
        self.lock().volumes.insert(name.to_string());
        Ok(())
    }

    async fn exec(&self, name: &str, user: &str, command: &str) -> Result<CommandResult> {
        self.ensure_available()?;
        if let Some(delay) = self.exec_delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        if !state.containers.contains_key(name) {
            return Err(BenchError::NodeNotFound(name.to_string()));
        }
        state.executed.push(ExecutedCommand {
            node: name.to_string(),
            user: user.to_string(),
            command: command.to_string(),
        });

        let response = state
            .rules
            .iter_mut()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .and_then(|(_, queue)| {
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            });

        Ok(response.unwrap_or_else(|| self.default_response.clone()))
    }

    async fn logs(&self, name: &str, tail: usize) -> Result<String> {
        self.ensure_available()?;
        let state = self.lock();
        if !state.containers.contains_key(name) {
            return Err(BenchError::NodeNotFound(name.to_string()));
        }
        let logs = state.logs.get(name).map(String::as_str).unwrap_or("");
        let lines: Vec<&str> = logs.lines().collect();
        let start = lines.len().saturating_sub(tail);
        Ok(lines[start..].join("\n"))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
