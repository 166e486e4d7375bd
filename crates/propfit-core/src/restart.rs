//! Restart-state handling for fit run directories.
//!
//! A fit leaves a well-known set of artifacts in its working directory. Fresh
//! runs delete all of them; continuation runs instead scan the per-target
//! iteration tree and delete every iteration from the first incomplete one
//! onwards, so the optimizer recomputes exactly what it has to.

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, info};

/// Artifacts a previous run may have left behind, relative to the run root.
pub const RESTART_ARTIFACTS: [&str; 6] = [
    "optimize.tmp",
    "optimize.bak",
    "optimize.sav",
    "result",
    "worker-logs",
    "working-data",
];

/// Upper bound on the iteration scan when the input file does not set one.
pub const DEFAULT_MAX_STEPS: usize = 100;

/// Fitting target whose iteration tree is scanned on restart.
pub const DEFAULT_TARGET_NAME: &str = "phys-prop";

/// Marker written once an iteration's objective has been evaluated.
pub const OBJECTIVE_MARKER: &str = "objective.p";
/// Parameter-value vector snapshot written at the start of an iteration.
pub const VALUES_MARKER: &str = "mvals.txt";
/// Force-field snapshot written at the start of an iteration.
pub const FORCE_FIELD_MARKER: &str = "force-field.offxml";

static MAX_STEPS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"maxstep\s*(\d+)").expect("valid maxstep pattern"));

#[derive(Debug, Error)]
pub enum RestartError {
    #[error("I/O error for '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> RestartError + '_ {
    move |source| RestartError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Deletes the artifacts of a previous run under `root`, if any.
///
/// Absent entries are skipped. Returns the paths that were removed so the
/// caller can report them.
pub fn remove_previous_files(root: &Path) -> Result<Vec<PathBuf>, RestartError> {
    let mut removed = Vec::new();
    for name in RESTART_ARTIFACTS {
        let path = root.join(name);
        if path.is_dir() {
            fs::remove_dir_all(&path).map_err(io_error(&path))?;
        } else if path.is_file() {
            fs::remove_file(&path).map_err(io_error(&path))?;
        } else {
            continue;
        }
        info!("Removed stale run artifact {:?}", &path);
        removed.push(path);
    }
    Ok(removed)
}

/// Extracts the iteration limit from the optimizer input file contents.
pub fn parse_max_steps(content: &str) -> usize {
    MAX_STEPS_PATTERN
        .captures(content)
        .and_then(|captures| captures.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(DEFAULT_MAX_STEPS)
}

/// Deletes iteration directories that cannot be reused by a continuation run.
///
/// Iterations under `optimize.tmp/<target_name>/iter_NNNN` are scanned in
/// increasing order. An iteration is kept if its objective has been evaluated
/// ([`OBJECTIVE_MARKER`] exists) or if it can be resumed ([`VALUES_MARKER`]
/// and [`FORCE_FIELD_MARKER`] both exist). The first iteration satisfying
/// neither condition, and every iteration after it, is deleted. Returns the
/// deleted paths.
pub fn prepare_restart(
    root: &Path,
    input_file: &Path,
    target_name: &str,
) -> Result<Vec<PathBuf>, RestartError> {
    let content = fs::read_to_string(input_file).map_err(io_error(input_file))?;
    let max_steps = parse_max_steps(&content);
    debug!(
        "Scanning up to {} iterations for target '{}'",
        max_steps, target_name
    );

    let target_root = root.join("optimize.tmp").join(target_name);
    let mut first_incomplete = max_steps;
    for iteration in 0..max_steps {
        let directory = iteration_directory(&target_root, iteration);
        let complete = directory.join(OBJECTIVE_MARKER).exists();
        let resumable = directory.join(VALUES_MARKER).exists()
            && directory.join(FORCE_FIELD_MARKER).exists();
        if !complete && !resumable {
            first_incomplete = iteration;
            break;
        }
    }

    let mut removed = Vec::new();
    for iteration in first_incomplete..max_steps {
        let directory = iteration_directory(&target_root, iteration);
        if directory.is_dir() {
            fs::remove_dir_all(&directory).map_err(io_error(&directory))?;
            info!("Removed incomplete iteration {:?}", &directory);
            removed.push(directory);
        }
    }
    Ok(removed)
}

fn iteration_directory(target_root: &Path, iteration: usize) -> PathBuf {
    target_root.join(format!("iter_{:04}", iteration))
}

/// Moves an existing log file out of the way instead of overwriting it.
///
/// If `log_file` exists it is renamed to the first free `<stem>_<n><ext>`
/// sibling (n = 1, 2, ...) and the new name is returned. An absent file is a
/// no-op.
pub fn rename_log_file(log_file: &Path) -> Result<Option<PathBuf>, RestartError> {
    if !log_file.exists() {
        return Ok(None);
    }

    let stem = log_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = log_file
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let parent = log_file.parent().unwrap_or_else(|| Path::new(""));

    let mut counter = 0usize;
    let renamed = loop {
        counter += 1;
        let candidate = parent.join(format!("{stem}_{counter}{suffix}"));
        if !candidate.exists() {
            break candidate;
        }
    };

    fs::rename(log_file, &renamed).map_err(io_error(log_file))?;
    info!("Renamed existing {:?} to {:?}", log_file, &renamed);
    Ok(Some(renamed))
}
