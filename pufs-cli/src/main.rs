//! PUFS CLI - Command-line interface
//!
//! Mounts one or more directory trees as a single read-only union, or a
//! single tree as a read/write pass-through.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::mount::MountArgs;
use commands::passthrough::PassthroughArgs;

#[derive(Parser)]
#[command(name = "pufs")]
#[command(version = pufs::VERSION)]
#[command(about = "Parallel union filesystem: join directory trees in one FUSE mount", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mount one or more roots as a single read-only union
    Mount(MountArgs),

    /// Mount a single root read/write, 1:1
    Passthrough(PassthroughArgs),

    /// Inspect the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Mount(args) => commands::mount::run(args),
        Commands::Passthrough(args) => commands::passthrough::run(args),
        Commands::Config(command) => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}
