use std::{path::PathBuf, process::ExitCode, time::Duration};

use anyhow::Context;
use clap::{Parser, Subcommand};
use color_print::cprintln;
use tracing_subscriber::EnvFilter;

use auto_exec::{Config, Invocation, Outcome, Reachability, platform_name};

#[derive(Parser)]
#[command(name = "auto-exec")]
#[command(about = "Run adb, ping and friends under a deadline", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command under a deadline and classify the result
    Run {
        /// Deadline in seconds (default: from config, else 5)
        #[arg(short, long)]
        timeout: Option<f64>,

        /// Program followed by its arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Check whether a host answers a single ping
    Ping {
        /// Deadline in seconds (default: from config, else 5)
        #[arg(short, long)]
        timeout: Option<f64>,

        host: String,
    },

    /// Print the adb executable that would be used
    AdbPath,

    /// List online adb devices
    Devices,

    /// Print the display name of a raw platform identifier
    Platform { raw: u8 },
}

fn init_tracing_subscriber() -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive("WARN".parse()?)
        .from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn deadline(timeout: Option<f64>, config: &Config) -> anyhow::Result<Duration> {
    match timeout {
        None => Ok(config.deadline),
        Some(secs) => Duration::try_from_secs_f64(secs)
            .ok()
            .filter(|deadline| !deadline.is_zero())
            .with_context(|| {
                format!("invalid timeout {secs}, expected a positive number of seconds")
            }),
    }
}

fn report(outcome: &Outcome) -> ExitCode {
    match outcome {
        Outcome::Success { output } => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Outcome::Failure { error, output } => {
            print!("{output}");
            cprintln!("<red>failed</red> [{}]: {}", error.code(), error);
            ExitCode::FAILURE
        }
        Outcome::Timeout {
            error,
            partial_output,
        } => {
            print!("{partial_output}");
            cprintln!("<yellow>timed out</yellow>: {}", error);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Run { timeout, command } => {
            let deadline = deadline(timeout, &config)?;
            let (program, args) = command
                .split_first()
                .context("missing program to run")?;
            let outcome =
                Invocation::new(program.as_str(), args.iter().cloned()).run_bounded(deadline);
            Ok(report(&outcome))
        }
        Commands::Ping { timeout, host } => {
            let probe = config
                .reachability_probe()
                .with_deadline(deadline(timeout, &config)?);
            match probe.check(&host) {
                Ok(Reachability::Reachable) => {
                    cprintln!("<green>{}</green> is reachable", host);
                    Ok(ExitCode::SUCCESS)
                }
                Ok(Reachability::Unreachable) => {
                    cprintln!("<red>{}</red> is unreachable", host);
                    Ok(ExitCode::FAILURE)
                }
                Err(err) => Ok(report(err.outcome())),
            }
        }
        Commands::AdbPath => {
            println!("{}", config.adb_locator().resolve().display());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Devices => {
            let devices = config.adb().devices()?;
            for device in devices {
                let model = device.model().unwrap_or("-");
                cprintln!("<bold>{}</bold>\t{}", device.serial, model);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Platform { raw } => {
            let name = platform_name(raw);
            if name.is_empty() {
                Ok(ExitCode::FAILURE)
            } else {
                println!("{name}");
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    init_tracing_subscriber()?;
    run(Cli::parse())
}
