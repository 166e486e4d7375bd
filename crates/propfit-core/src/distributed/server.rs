//! Scoped management of the external estimation-server process.
//!
//! The server handle is acquired for the duration of a fit and torn down on
//! every exit path: `shutdown` for the orderly case, `Drop` for the rest.

use super::backend::SlurmBackendConfig;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Executable expected on PATH; owns scheduling and job submission.
pub const SERVER_EXECUTABLE: &str = "evaluator-server";

/// Configuration file written into the server's working directory.
pub const SERVER_CONFIG_FILE: &str = "server-config.json";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error for '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize the server configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to stop the estimation server: {0}")]
    Shutdown(std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluatorServerConfig {
    pub port: u16,
    pub working_directory: PathBuf,
    pub enable_data_caching: bool,
    pub calculation_backend: SlurmBackendConfig,
}

/// A running estimation server. Dropping the handle stops the process.
#[derive(Debug)]
pub struct EvaluatorServer {
    child: Child,
    config_path: PathBuf,
}

impl EvaluatorServer {
    /// Materializes the working directory, writes the configuration, and
    /// starts [`SERVER_EXECUTABLE`] against it.
    pub fn start(config: &EvaluatorServerConfig) -> Result<Self, ServerError> {
        Self::start_program(SERVER_EXECUTABLE, config)
    }

    fn start_program(program: &str, config: &EvaluatorServerConfig) -> Result<Self, ServerError> {
        fs::create_dir_all(&config.working_directory).map_err(|source| ServerError::Io {
            path: config.working_directory.clone(),
            source,
        })?;

        let config_path = config.working_directory.join(SERVER_CONFIG_FILE);
        let payload = serde_json::to_string_pretty(config)?;
        fs::write(&config_path, payload).map_err(|source| ServerError::Io {
            path: config_path.clone(),
            source,
        })?;

        info!(
            "Starting estimation server on port {} (working directory {:?})",
            config.port, &config.working_directory
        );
        let child = Command::new(program)
            .arg("--config")
            .arg(&config_path)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| ServerError::Spawn {
                program: program.to_string(),
                source,
            })?;
        debug!("Estimation server running with pid {}", child.id());

        Ok(Self { child, config_path })
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Stops the server and reaps the process.
    pub fn shutdown(mut self) -> Result<(), ServerError> {
        self.stop().map_err(ServerError::Shutdown)
    }

    fn stop(&mut self) -> std::io::Result<()> {
        match self.child.try_wait()? {
            Some(status) => {
                debug!("Estimation server already exited with {status}");
                Ok(())
            }
            None => {
                self.child.kill()?;
                let status = self.child.wait()?;
                info!("Stopped estimation server ({status})");
                Ok(())
            }
        }
    }
}

impl Drop for EvaluatorServer {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Failed to stop the estimation server during teardown: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::backend::{self, SlurmBackendConfig};
    use crate::distributed::resources::{GpuToolkit, QueueWorkerResources};
    use tempfile::tempdir;

    fn config(working_directory: PathBuf) -> EvaluatorServerConfig {
        EvaluatorServerConfig {
            port: 8000,
            working_directory,
            enable_data_caching: true,
            calculation_backend: SlurmBackendConfig {
                minimum_number_of_workers: 1,
                maximum_number_of_workers: 1,
                resources_per_worker: QueueWorkerResources {
                    number_of_threads: 1,
                    number_of_gpus: 1,
                    preferred_gpu_toolkit: GpuToolkit::Cuda,
                    per_worker_memory_gb: 4,
                    wallclock_time_limit: "8:00".to_string(),
                },
                queue_name: "free-gpu".to_string(),
                setup_script_commands: backend::conda_setup_commands("sage-2.1.0-opc"),
                adaptive_interval: backend::DEFAULT_ADAPTIVE_INTERVAL.to_string(),
            },
        }
    }

    #[test]
    fn start_fails_cleanly_for_a_missing_executable() {
        let dir = tempdir().unwrap();
        let config = config(dir.path().join("working-directory"));

        let result = EvaluatorServer::start_program("definitely-not-a-real-server", &config);

        assert!(matches!(result, Err(ServerError::Spawn { .. })));
        // the configuration was still written before the spawn attempt
        assert!(
            config
                .working_directory
                .join(SERVER_CONFIG_FILE)
                .exists()
        );
    }

    #[cfg(unix)]
    #[test]
    fn start_writes_the_full_configuration() {
        let dir = tempdir().unwrap();
        let config = config(dir.path().join("working-directory"));

        // `true` exits immediately but spawns fine, which is all this needs
        let server = EvaluatorServer::start_program("true", &config).unwrap();
        let written = fs::read_to_string(server.config_path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&written).unwrap();

        assert_eq!(json["port"], 8000);
        assert_eq!(json["enable_data_caching"], true);
        assert_eq!(json["calculation_backend"]["queue_name"], "free-gpu");

        server.shutdown().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn shutdown_stops_a_running_server() {
        let child = Command::new("sleep").arg("30").spawn().unwrap();
        let mut server = EvaluatorServer {
            child,
            config_path: PathBuf::new(),
        };

        server.stop().unwrap();
        assert!(server.child.try_wait().unwrap().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn shutdown_tolerates_an_already_exited_server() {
        let child = Command::new("true").spawn().unwrap();
        let mut server = EvaluatorServer {
            child,
            config_path: PathBuf::new(),
        };

        server.child.wait().unwrap();
        server.stop().unwrap();
    }
}
