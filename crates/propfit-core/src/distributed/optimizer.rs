//! Blocking invocation of the external optimizer.

use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, info};

/// Optimizer executable expected on PATH.
pub const OPTIMIZER_EXECUTABLE: &str = "ForceBalance.py";

const CONTINUE_FLAG: &str = "--continue";

#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("Failed to create log file '{path}': {source}", path = path.display())]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
    },
}

/// One optimizer run over an input file, fresh or continued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizerInvocation {
    pub input_file: PathBuf,
    pub continue_run: bool,
}

impl OptimizerInvocation {
    pub fn arguments(&self) -> Vec<OsString> {
        let mut arguments = Vec::new();
        if self.continue_run {
            arguments.push(OsString::from(CONTINUE_FLAG));
        }
        arguments.push(self.input_file.clone().into_os_string());
        arguments
    }
}

/// Runs the optimizer to completion, stdout and stderr piped into `log_file`.
/// A non-zero exit status is an error.
pub fn run(invocation: &OptimizerInvocation, log_file: &Path) -> Result<(), OptimizerError> {
    run_program(OPTIMIZER_EXECUTABLE, invocation, log_file)
}

fn run_program(
    program: &str,
    invocation: &OptimizerInvocation,
    log_file: &Path,
) -> Result<(), OptimizerError> {
    let log_error = |source| OptimizerError::Log {
        path: log_file.to_path_buf(),
        source,
    };
    let log = File::create(log_file).map_err(log_error)?;
    let log_for_stderr = log.try_clone().map_err(log_error)?;

    info!(
        "Running {} with arguments {:?}, logging to {:?}",
        program,
        invocation.arguments(),
        log_file
    );
    let status = Command::new(program)
        .args(invocation.arguments())
        .stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(log_for_stderr))
        .status()
        .map_err(|source| OptimizerError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if !status.success() {
        return Err(OptimizerError::Failed {
            program: program.to_string(),
            status,
        });
    }
    debug!("{} completed successfully", program);
    Ok(())
}
