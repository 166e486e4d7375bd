use clap::{Args, Parser, Subcommand, ValueEnum};
use propfit::distributed::resources::GpuToolkit;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "propfit - Operational front-end for distributed force-field parameter fits: launch fits against an estimation server, preprocess SMIRNOFF forcefields, and generate estimation options.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch a distributed estimation server and run the optimizer against it.
    Run(RunArgs),
    /// Preprocess a forcefield: strip stale parameters, swap the water model, mark tunables.
    Forcefield(ForcefieldArgs),
    /// Generate the estimation options file consumed by the optimizer.
    Options(OptionsArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// The input file for the optimizer.
    #[arg(long = "input", value_name = "PATH", default_value = "optimize.in")]
    pub input_file: PathBuf,

    /// The log file the optimizer's output is piped into.
    #[arg(long = "log", value_name = "PATH", default_value = "force_balance.log")]
    pub optimizer_log: PathBuf,

    // --- Server configuration ---
    /// The port for the estimation server.
    #[arg(long, value_name = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// The working directory for the estimation server.
    #[arg(long, value_name = "PATH", default_value = "working-directory")]
    pub working_directory: PathBuf,

    #[command(flatten)]
    pub data_caching: DataCaching,

    /// Continue a previous run instead of starting fresh.
    #[arg(long)]
    pub continue_run: bool,

    // --- Distributed configuration ---
    /// The minimum number of workers to keep running.
    #[arg(long, value_name = "INT", default_value_t = 1)]
    pub n_min_workers: usize,

    /// The maximum number of workers to start running.
    #[arg(long, value_name = "INT", default_value_t = 1)]
    pub n_max_workers: usize,

    /// The queue name to start the workers on.
    #[arg(long = "queue", value_name = "NAME", default_value = "free-gpu")]
    pub queue_name: String,

    /// The number of threads per worker.
    #[arg(long, value_name = "INT", default_value_t = 1)]
    pub n_threads: usize,

    /// The number of GPUs per worker.
    #[arg(long, value_name = "INT", default_value_t = 1)]
    pub n_gpus: usize,

    /// The memory per worker in GB.
    #[arg(long, value_name = "INT", default_value_t = 4)]
    pub memory_per_worker: u64,

    /// The walltime for the workers, in whatever format the cluster expects.
    /// Note that some clusters will interpret '8:00' as 8 hours, while
    /// others will interpret it as 8 minutes.
    #[arg(long, value_name = "TIME", default_value = "8:00")]
    pub walltime: String,

    /// The GPU toolkit the workers should use.
    #[arg(long, value_name = "TOOLKIT", value_enum, default_value = "CUDA")]
    pub gpu_toolkit: GpuToolkitArg,

    /// The conda environment to activate on each worker.
    #[arg(long, value_name = "NAME", default_value = "sage-2.1.0-opc")]
    pub conda_env: String,
}

/// A group to handle mutually exclusive boolean flags for data caching.
#[derive(Args, Debug, Clone, Copy)]
#[group(required = false, multiple = false)]
pub struct DataCaching {
    /// Cache simulation data between iterations (the default).
    #[arg(long)]
    pub enable_data_caching: bool,
    /// Do not cache simulation data between iterations.
    #[arg(long)]
    pub no_enable_data_caching: bool,
}

impl DataCaching {
    /// Caching defaults to on; only the explicit opt-out disables it.
    pub fn enabled(self) -> bool {
        self.enable_data_caching || !self.no_enable_data_caching
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuToolkitArg {
    #[value(name = "CUDA")]
    Cuda,
    #[value(name = "OpenCL")]
    OpenCl,
}

impl From<GpuToolkitArg> for GpuToolkit {
    fn from(arg: GpuToolkitArg) -> Self {
        match arg {
            GpuToolkitArg::Cuda => GpuToolkit::Cuda,
            GpuToolkitArg::OpenCl => GpuToolkit::OpenCl,
        }
    }
}

/// Arguments for the `forcefield` subcommand.
#[derive(Args, Debug)]
pub struct ForcefieldArgs {
    /// The input forcefield file.
    #[arg(
        long = "input",
        value_name = "PATH",
        default_value = "openff-2.1.0.offxml"
    )]
    pub input_forcefield: PathBuf,

    /// The water forcefield file merged in as the replacement water model.
    #[arg(long = "water", value_name = "PATH", default_value = "opc3.offxml")]
    pub water_forcefield: PathBuf,

    /// The output forcefield file.
    #[arg(
        long = "output",
        value_name = "PATH",
        default_value = "forcefield/force-field.offxml"
    )]
    pub output_forcefield: PathBuf,
}

/// Arguments for the `options` subcommand.
#[derive(Args, Debug)]
pub struct OptionsArgs {
    /// The port the estimation server will listen on.
    #[arg(long, value_name = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// The output file for the options.
    #[arg(
        long,
        value_name = "PATH",
        default_value = "targets/phys-prop/options.json"
    )]
    pub output_file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_defaults_match_the_operational_setup() {
        let cli = Cli::try_parse_from(["propfit", "run"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };

        assert_eq!(args.input_file, PathBuf::from("optimize.in"));
        assert_eq!(args.optimizer_log, PathBuf::from("force_balance.log"));
        assert_eq!(args.port, 8000);
        assert_eq!(args.working_directory, PathBuf::from("working-directory"));
        assert!(args.data_caching.enabled());
        assert!(!args.continue_run);
        assert_eq!(args.n_min_workers, 1);
        assert_eq!(args.n_max_workers, 1);
        assert_eq!(args.queue_name, "free-gpu");
        assert_eq!(args.n_threads, 1);
        assert_eq!(args.n_gpus, 1);
        assert_eq!(args.memory_per_worker, 4);
        assert_eq!(args.walltime, "8:00");
        assert_eq!(args.gpu_toolkit, GpuToolkitArg::Cuda);
        assert_eq!(args.conda_env, "sage-2.1.0-opc");
    }

    #[test]
    fn data_caching_flags_are_mutually_exclusive() {
        let result = Cli::try_parse_from([
            "propfit",
            "run",
            "--enable-data-caching",
            "--no-enable-data-caching",
        ]);
        assert!(result.is_err());

        let cli =
            Cli::try_parse_from(["propfit", "run", "--no-enable-data-caching"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert!(!args.data_caching.enabled());
    }

    #[test]
    fn gpu_toolkit_accepts_the_documented_spellings() {
        let cli =
            Cli::try_parse_from(["propfit", "run", "--gpu-toolkit", "OpenCL"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.gpu_toolkit, GpuToolkitArg::OpenCl);

        let result = Cli::try_parse_from(["propfit", "run", "--gpu-toolkit", "Metal"]);
        assert!(result.is_err());
    }

    #[test]
    fn forcefield_defaults_point_at_the_release_files() {
        let cli = Cli::try_parse_from(["propfit", "forcefield"]).unwrap();
        let Commands::Forcefield(args) = cli.command else {
            panic!("expected forcefield command");
        };

        assert_eq!(args.input_forcefield, PathBuf::from("openff-2.1.0.offxml"));
        assert_eq!(args.water_forcefield, PathBuf::from("opc3.offxml"));
        assert_eq!(
            args.output_forcefield,
            PathBuf::from("forcefield/force-field.offxml")
        );
    }

    #[test]
    fn options_defaults_target_the_training_directory() {
        let cli = Cli::try_parse_from(["propfit", "options"]).unwrap();
        let Commands::Options(args) = cli.command else {
            panic!("expected options command");
        };

        assert_eq!(args.port, 8000);
        assert_eq!(
            args.output_file,
            PathBuf::from("targets/phys-prop/options.json")
        );
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        let result = Cli::try_parse_from(["propfit", "options", "-v", "--quiet"]);
        assert!(result.is_err());
    }
}
