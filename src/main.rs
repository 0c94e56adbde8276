use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use valrun::{
    init_tracing_once, install_os_handler, read_values_file, stop_signal, CommandAction, CommandOptions, ConfigError,
    OutputMode, Runner,
};

#[derive(Parser, Debug)]
#[command(name = "valrun")]
#[command(about = "Run a command once per value, in parallel", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a command in parallel, once for every line of the values file.
    ///
    /// Each invocation sees its value in the VALRUN_VALUE environment variable.
    ///
    /// Example:
    ///   valrun run --values-file hosts.txt -w 4 -- sh -c 'ping -c1 "$VALRUN_VALUE"'
    Run(RunArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Path to newline-separated values to pass to the command.
    #[arg(long)]
    values_file: PathBuf,

    /// Level of parallelism.
    #[arg(short, long, default_value_t = 10)]
    workers: usize,

    /// Output type (one of plain, color, prefix, none).
    #[arg(short, long, default_value_t = OutputMode::Color)]
    output: OutputMode,

    /// Per-value timeout in seconds.
    #[arg(short, long, default_value_t = 60)]
    timeout: u64,

    /// Show a progress bar on stderr.
    #[arg(long)]
    progress: bool,

    /// Command to run, followed by its arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

fn main() -> Result<ExitCode> {
    init_tracing_once();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run(args),
    }
}

fn run(args: RunArgs) -> Result<ExitCode> {
    let Some((program, program_args)) = args.command.split_first() else {
        return Err(ConfigError::MissingCommand.into());
    };
    if args.workers == 0 {
        return Err(ConfigError::ZeroWorkers.into());
    }

    let values = read_values_file(&args.values_file)?;

    let opts = CommandOptions::default()
        .with_output(args.output)
        .with_timeout(Duration::from_secs(args.timeout));
    let action = CommandAction::new(program.clone(), program_args.iter().cloned(), opts)?;
    let runner = Runner::new(args.workers, action)?
        .progress(args.progress)
        .progress_label(program.clone());

    let (trigger, stop) = stop_signal();
    install_os_handler(trigger)?;

    match runner.run(values, &stop) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            tracing::error!("{err}");
            Ok(ExitCode::FAILURE)
        }
    }
}
