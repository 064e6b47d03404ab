//! Pumpkin Console - console front end for a Pumpkin server
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;

use clap::Parser;
use pumpkin_console::{run_headless, HeadlessOptions, OutputFormat, ServerTarget};
use pumpkin_console_core::{logging, LogLevel};
use tracing::{error, info};

/// Pumpkin Console - stream, filter and drive a Pumpkin server console
#[derive(Parser, Debug)]
#[command(name = "pumpkin-console")]
#[command(about = "Stream, filter and drive a Pumpkin server console", long_about = None)]
struct Args {
    /// Server shared library exporting the pumpkin_* entry points
    #[arg(long, value_name = "PATH", conflicts_with = "server_cmd")]
    library: Option<PathBuf>,

    /// Server executable to run as a child process
    #[arg(long, value_name = "CMD")]
    server_cmd: Option<PathBuf>,

    /// Arguments for --server-cmd (after `--`)
    #[arg(last = true, value_name = "ARGS", requires = "server_cmd")]
    server_args: Vec<String>,

    /// Server data directory, also holding console.toml [default: current directory]
    #[arg(long, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Show only these levels (repeatable); replaces the configured set
    #[arg(long = "level", value_name = "LEVEL")]
    levels: Vec<LogLevel>,

    /// Only show entries containing this text (case-insensitive)
    #[arg(long, value_name = "TEXT")]
    search: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Ndjson)]
    format: OutputFormat,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    let args = Args::parse();

    // Initialize error handling
    color_eyre::install()?;

    // Initialize logging
    logging::init()?;

    let config_dir = args
        .config_dir
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let target = match (args.library, args.server_cmd) {
        (Some(path), _) => Some(ServerTarget::Library(path)),
        (None, Some(program)) => Some(ServerTarget::Command {
            program,
            args: args.server_args,
        }),
        (None, None) => None,
    };

    let options = HeadlessOptions {
        config_dir,
        target,
        levels: args.levels,
        search: args.search,
        format: args.format,
    };

    let exit_code = match run_headless(options).await {
        Ok(code) => code,
        Err(e) => {
            error!("Application error: {:?}", e);
            return Err(e.into());
        }
    };

    info!("Pumpkin Console exiting");
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}
