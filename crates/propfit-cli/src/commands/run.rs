use crate::cli::RunArgs;
use crate::error::Result;
use indicatif::{ProgressBar, ProgressStyle};
use propfit::distributed::backend::{self, SlurmBackendConfig};
use propfit::distributed::optimizer::{self, OptimizerInvocation};
use propfit::distributed::resources::QueueWorkerResources;
use propfit::distributed::server::{EvaluatorServer, EvaluatorServerConfig};
use propfit::restart;
use std::path::Path;
use std::time::Duration;
use tracing::info;

const SPINNER_TICK_MS: u64 = 80;

pub fn run(args: RunArgs) -> Result<()> {
    let root = Path::new(".");

    // Continuation only makes sense when the optimizer left its save file
    let continuing = args.continue_run && root.join("optimize.sav").exists();
    if continuing {
        info!("Continuation requested and optimize.sav found; checking completed iterations.");
        let removed =
            restart::prepare_restart(root, &args.input_file, restart::DEFAULT_TARGET_NAME)?;
        for path in &removed {
            println!("Removing {}.", path.display());
        }
    } else {
        let removed = restart::remove_previous_files(root)?;
        for path in &removed {
            println!("Removing {}.", path.display());
        }
    }

    let worker_resources = QueueWorkerResources {
        number_of_threads: args.n_threads,
        number_of_gpus: args.n_gpus,
        preferred_gpu_toolkit: args.gpu_toolkit.into(),
        per_worker_memory_gb: args.memory_per_worker,
        wallclock_time_limit: args.walltime.clone(),
    };
    let calculation_backend = SlurmBackendConfig {
        minimum_number_of_workers: args.n_min_workers,
        maximum_number_of_workers: args.n_max_workers,
        resources_per_worker: worker_resources,
        queue_name: args.queue_name.clone(),
        setup_script_commands: backend::conda_setup_commands(&args.conda_env),
        adaptive_interval: backend::DEFAULT_ADAPTIVE_INTERVAL.to_string(),
    };

    if let Some(renamed) = restart::rename_log_file(&args.optimizer_log)? {
        println!(
            "Renamed existing {} to {}.",
            args.optimizer_log.display(),
            renamed.display()
        );
    }

    let server_config = EvaluatorServerConfig {
        port: args.port,
        working_directory: args.working_directory.clone(),
        enable_data_caching: args.data_caching.enabled(),
        calculation_backend,
    };
    let server = EvaluatorServer::start(&server_config)?;

    let invocation = OptimizerInvocation {
        input_file: args.input_file.clone(),
        continue_run: continuing,
    };
    println!(
        "Running the optimizer; output goes to {}.",
        args.optimizer_log.display()
    );

    let spinner = optimizer_spinner();
    let outcome = optimizer::run(&invocation, &args.optimizer_log);
    match &outcome {
        Ok(_) => spinner.finish_with_message("✓ Optimization finished."),
        Err(_) => spinner.finish_with_message("✗ Optimization failed."),
    }
    // on the error path the server handle is dropped, which stops the process
    outcome?;

    server.shutdown()?;
    Ok(())
}

fn optimizer_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner().with_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
            .expect("Failed to create spinner style template"),
    );
    spinner.set_draw_target(indicatif::ProgressDrawTarget::stderr());
    spinner.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
    spinner.set_message("Optimizer running...");
    spinner
}
