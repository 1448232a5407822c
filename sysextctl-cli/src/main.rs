//! sysextctl CLI - Command-line interface
//!
//! Lists published Flatcar system extensions, downloads them into a
//! filesystem root, and renders Butane snippets for first-boot provisioning.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use commands::{download, ignition, list};
use error::CliError;

#[derive(Parser)]
#[command(name = "sysextctl")]
#[command(about = "Discover, download and provision Flatcar system extensions", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Flags accepted by every subcommand.
#[derive(Debug, Clone, clap::Args)]
pub struct GlobalArgs {
    /// Alternative filesystem root (default: /)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Log HTTP requests and placement steps to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    /// Configuration file (default: ~/.config/sysextctl/config.ini)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// HTTP request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Enumerate available extensions and versions
    List(list::ListArgs),

    /// Download extension images into the filesystem root
    Download(download::DownloadArgs),

    /// Emit a Butane snippet that provisions extensions
    Ignition(ignition::IgnitionArgs),
}

fn main() {
    let cli = Cli::parse();
    sysextctl::logging::init_logging(cli.global.debug);

    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let session = commands::common::Session::new(&cli.global)?;

    match cli.command {
        Commands::List(args) => list::run(&session, args),
        Commands::Download(args) => download::run(&session, args),
        Commands::Ignition(args) => ignition::run(&session, args),
    }
}
