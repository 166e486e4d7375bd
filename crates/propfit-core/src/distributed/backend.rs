//! Queue-backend configuration for the estimation server.
//!
//! The server owns job submission; this side only states how many workers to
//! keep, what each worker gets, and how a worker environment is prepared.

use super::resources::QueueWorkerResources;
use serde::Serialize;

/// How often the backend re-evaluates its adaptive worker count.
pub const DEFAULT_ADAPTIVE_INTERVAL: &str = "1000ms";

/// Shell commands run at the top of every worker job script.
pub fn conda_setup_commands(conda_env: &str) -> Vec<String> {
    vec![
        "source ~/.bashrc".to_string(),
        format!("conda activate {conda_env}"),
        "conda env export > conda-env.yaml".to_string(),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlurmBackendConfig {
    pub minimum_number_of_workers: usize,
    pub maximum_number_of_workers: usize,
    pub resources_per_worker: QueueWorkerResources,
    pub queue_name: String,
    pub setup_script_commands: Vec<String>,
    pub adaptive_interval: String,
}
