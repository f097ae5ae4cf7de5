//! qrest CLI - submit compiled circuits to remote quantum backends.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{backends, result, status, submit, version, wait};

/// qrest - Remote quantum job submission
#[derive(Parser)]
#[command(name = "qrest")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Backend configuration sources shared by every command that talks to a backend.
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// YAML file with backend configuration (flat key: value map)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override a configuration key (repeatable)
    #[arg(short, long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit compiled circuits as one job
    Submit {
        /// Target backend (fermioniq)
        #[arg(short, long)]
        backend: String,

        /// Compiled circuit files; the file stem names the kernel
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        #[command(flatten)]
        config: ConfigArgs,

        /// Where to save the job handle (default: ~/.qrest/jobs/<job-id>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Wait for the job to complete
        #[arg(short, long)]
        wait: bool,
    },

    /// Check a job once without blocking
    Status {
        /// Job handle file or job ID
        handle: String,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Wait for a job to complete
    Wait {
        /// Job handle file or job ID
        handle: String,

        /// Timeout in seconds (waits indefinitely if omitted)
        #[arg(short, long)]
        timeout: Option<u64>,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Print the results of a job
    Result {
        /// Job handle file or job ID
        handle: String,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// List available backends
    Backends,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Submit {
            backend,
            input,
            config,
            output,
            wait: do_wait,
        } => submit::execute(&backend, &input, &config, output.as_deref(), do_wait).await,

        Commands::Status { handle, config } => status::execute(&handle, &config).await,

        Commands::Wait {
            handle,
            timeout,
            config,
        } => wait::execute(&handle, timeout, &config).await,

        Commands::Result {
            handle,
            format,
            config,
        } => result::execute(&handle, &format, &config).await,

        Commands::Backends => {
            backends::execute();
            Ok(())
        }

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
