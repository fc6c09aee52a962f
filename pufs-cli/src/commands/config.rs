//! Configuration inspection CLI commands.
//!
//! Provides `config path` and `config show` for locating and viewing the
//! effective configuration.

use std::path::PathBuf;

use clap::Subcommand;
use pufs::config::{config_file_path, ConfigFile};

use crate::error::CliError;
use crate::runner::load_config;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Show the effective configuration settings
    Show {
        /// Config file to read instead of ~/.pufs/config.ini
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Write a config file with default values if none exists
    Init,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(),
        ConfigCommands::Show { config } => run_show(config),
        ConfigCommands::Init => run_init(),
    }
}

fn run_path() -> Result<(), CliError> {
    let path = config_file_path();
    println!("{}", path.display());
    if !path.exists() {
        println!("(file does not exist, defaults are in use)");
    }
    Ok(())
}

fn run_show(path: Option<PathBuf>) -> Result<(), CliError> {
    let config = load_config(path.as_deref())?;
    print!("{}", render(&config));
    Ok(())
}

fn run_init() -> Result<(), CliError> {
    let path = ConfigFile::ensure_exists()?;
    println!("Config file: {}", path.display());
    Ok(())
}

fn render(config: &ConfigFile) -> String {
    format!(
        "Configuration Settings\n\
         ======================\n\
         \n\
         [mount]\n\
         threads_per_root = {}\n\
         read_only = {}\n\
         allow_other = {}\n\
         \n\
         [logging]\n\
         file = {}\n\
         \n\
         [trace]\n\
         enabled = {}\n\
         delay_ms = {}\n",
        config.mount.threads_per_root,
        config.mount.read_only,
        config.mount.allow_other,
        config.logging.file.display(),
        config.trace.enabled,
        config.trace.delay_ms,
    )
}
