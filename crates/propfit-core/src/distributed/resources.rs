//! Per-worker compute resources requested from the queue.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("Unknown GPU toolkit '{0}'. Expected 'CUDA' or 'OpenCL'.")]
    UnknownGpuToolkit(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GpuToolkit {
    #[serde(rename = "CUDA")]
    Cuda,
    #[serde(rename = "OpenCL")]
    OpenCl,
}

impl fmt::Display for GpuToolkit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuToolkit::Cuda => write!(f, "CUDA"),
            GpuToolkit::OpenCl => write!(f, "OpenCL"),
        }
    }
}

impl FromStr for GpuToolkit {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("cuda") {
            Ok(GpuToolkit::Cuda)
        } else if s.eq_ignore_ascii_case("opencl") {
            Ok(GpuToolkit::OpenCl)
        } else {
            Err(ResourceError::UnknownGpuToolkit(s.to_string()))
        }
    }
}

/// Resources of a single queue worker. The walltime string is passed to the
/// cluster verbatim; some clusters read '8:00' as 8 hours, others as 8
/// minutes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueWorkerResources {
    pub number_of_threads: usize,
    pub number_of_gpus: usize,
    pub preferred_gpu_toolkit: GpuToolkit,
    pub per_worker_memory_gb: u64,
    pub wallclock_time_limit: String,
}
