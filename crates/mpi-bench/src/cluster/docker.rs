//! Docker container runtime
//!
//! Talks to the local Docker engine through bollard. A 404 from the engine
//! is reported as "absent" (`Ok(None)`, `Ok(false)` or `NodeNotFound`) and
//! every other engine error becomes `BenchError::Runtime`.

use super::{CommandResult, ContainerInfo, ContainerRuntime, NodeSpec};
use crate::{BenchError, Result};
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, LogOutput, LogsOptions,
    RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::models::HostConfig;
use bollard::network::{CreateNetworkOptions, InspectNetworkOptions};
use bollard::volume::CreateVolumeOptions;
use bollard::Docker;
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Docker engine backed runtime
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect to the local Docker engine using platform defaults
    pub fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults().map_err(|e| {
            BenchError::RuntimeUnavailable(format!("Failed to connect to Docker: {e}"))
        })?;
        info!("Connected to local Docker engine");
        Ok(Self { docker })
    }
}

fn is_not_found(err: &DockerError) -> bool {
    matches!(
        err,
        DockerError::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}

fn is_not_modified(err: &DockerError) -> bool {
    matches!(
        err,
        DockerError::DockerResponseServerError {
            status_code: 304,
            ..
        }
    )
}

fn runtime_error(action: &str, err: DockerError) -> BenchError {
    BenchError::Runtime(format!("{action}: {err}"))
}

/// Map a container-level error, turning a 404 into `NodeNotFound`
fn container_error(name: &str, action: &str, err: DockerError) -> BenchError {
    if is_not_found(&err) {
        BenchError::NodeNotFound(name.to_string())
    } else {
        runtime_error(action, err)
    }
}

fn log_chunk(chunk: LogOutput) -> String {
    match chunk {
        LogOutput::StdOut { message }
        | LogOutput::StdErr { message }
        | LogOutput::Console { message } => String::from_utf8_lossy(&message).into_owned(),
        LogOutput::StdIn { .. } => String::new(),
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn ping(&self) -> Result<()> {
        self.docker
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| BenchError::RuntimeUnavailable(format!("Docker ping failed: {e}")))
    }

    async fn inspect(&self, name: &str) -> Result<Option<ContainerInfo>> {
        match self
            .docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
        {
            Ok(details) => {
                let state = details.state.unwrap_or_default();
                Ok(Some(ContainerInfo {
                    id: details.id.unwrap_or_default(),
                    state: state
                        .status
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "unknown".to_string()),
                    started_at: state.started_at,
                }))
            }
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(runtime_error("Failed to inspect container", e)),
        }
    }

    async fn create_and_start(&self, spec: &NodeSpec) -> Result<()> {
        let config = Config {
            image: Some(spec.image.clone()),
            hostname: Some(spec.name.clone()),
            tty: Some(true),
            host_config: Some(HostConfig {
                binds: Some(vec![spec.volume_bind.clone()]),
                network_mode: Some(spec.network.clone()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };

        let created = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| runtime_error("Failed to create container", e))?;

        for warning in &created.warnings {
            warn!("Docker warning for {}: {}", spec.name, warning);
        }

        self.start(&spec.name).await
    }

    async fn start(&self, name: &str) -> Result<()> {
        match self
            .docker
            .start_container(name, None::<StartContainerOptions<String>>)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if is_not_modified(&e) => {
                debug!("Container {} was already started", name);
                Ok(())
            }
            Err(e) => Err(container_error(name, "Failed to start container", e)),
        }
    }

    async fn stop(&self, name: &str, timeout: Duration) -> Result<()> {
        let options = StopContainerOptions {
            t: timeout.as_secs() as i64,
        };
        match self.docker.stop_container(name, Some(options)).await {
            Ok(()) => Ok(()),
            Err(e) if is_not_modified(&e) => {
                debug!("Container {} was already stopped", name);
                Ok(())
            }
            Err(e) => Err(container_error(name, "Failed to stop container", e)),
        }
    }

    async fn remove(&self, name: &str) -> Result<()> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        self.docker
            .remove_container(name, Some(options))
            .await
            .map_err(|e| container_error(name, "Failed to remove container", e))
    }

    async fn network_exists(&self, name: &str) -> Result<bool> {
        match self
            .docker
            .inspect_network(name, None::<InspectNetworkOptions<String>>)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(runtime_error("Failed to inspect network", e)),
        }
    }

    async fn create_network(&self, name: &str, driver: &str) -> Result<()> {
        let options = CreateNetworkOptions {
            name: name.to_string(),
            driver: driver.to_string(),
            ..Default::default()
        };
        self.docker
            .create_network(options)
            .await
            .map(|_| ())
            .map_err(|e| runtime_error("Failed to create network", e))
    }

    async fn volume_exists(&self, name: &str) -> Result<bool> {
        match self.docker.inspect_volume(name).await {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(runtime_error("Failed to inspect volume", e)),
        }
    }

    async fn create_volume(&self, name: &str) -> Result<()> {
        let options = CreateVolumeOptions {
            name: name.to_string(),
            ..Default::default()
        };
        self.docker
            .create_volume(options)
            .await
            .map(|_| ())
            .map_err(|e| runtime_error("Failed to create volume", e))
    }

    async fn exec(&self, name: &str, user: &str, command: &str) -> Result<CommandResult> {
        let options = CreateExecOptions::<String> {
            cmd: Some(vec![
                "su".to_string(),
                "-".to_string(),
                user.to_string(),
                "-c".to_string(),
                command.to_string(),
            ]),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let exec = self
            .docker
            .create_exec(name, options)
            .await
            .map_err(|e| container_error(name, "Failed to create exec", e))?;

        let mut output = String::new();
        match self
            .docker
            .start_exec(&exec.id, None)
            .await
            .map_err(|e| runtime_error("Failed to start exec", e))?
        {
            StartExecResults::Attached {
                output: mut stream, ..
            } => {
                while let Some(chunk) = stream.next().await {
                    match chunk {
                        Ok(chunk) => output.push_str(&log_chunk(chunk)),
                        Err(e) => {
                            warn!("Exec output stream error: {}", e);
                            break;
                        }
                    }
                }
            }
            StartExecResults::Detached => {}
        }

        let exit_code = self
            .docker
            .inspect_exec(&exec.id)
            .await
            .map_err(|e| runtime_error("Failed to inspect exec", e))?
            .exit_code
            .unwrap_or(-1);

        Ok(CommandResult::new(exit_code, output))
    }

    async fn logs(&self, name: &str, tail: usize) -> Result<String> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            tail: tail.to_string(),
            ..Default::default()
        };

        let mut stream = self.docker.logs(name, Some(options));
        let mut logs = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| container_error(name, "Failed to read logs", e))?;
            logs.push_str(&log_chunk(chunk));
        }
        Ok(logs)
    }

    fn name(&self) -> &str {
        "docker"
    }
}
