//! Passthrough command - mount a single root read/write.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use pufs::backend::{HostFs, TracedFs};
use pufs::fuse::{Fuse3PassthroughFS, MountConfig};
use tracing::info;

use super::common::{mount_config, require_directory, serve_until_unmounted, CommonArgs};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the passthrough command.
#[derive(Debug, Args)]
pub struct PassthroughArgs {
    /// Directory to expose
    pub root: PathBuf,

    /// Where to mount it
    pub mountpoint: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Run the passthrough command.
pub fn run(args: PassthroughArgs) -> Result<(), CliError> {
    let root = require_directory(&args.root)?;
    let mountpoint = require_directory(&args.mountpoint)?;

    let runner = CliRunner::new(&args.common)?;
    runner.log_startup("passthrough");
    let config = runner.config();

    println!("PUFS Passthrough Mount v{}", pufs::VERSION);
    println!("==========================");
    println!();
    println!("Source:     {}", root.display());
    println!("Mountpoint: {}", mountpoint.display());
    println!();
    println!("Press Ctrl+C to unmount and exit");
    println!();

    let host = HostFs::new(&root);
    let fs = if config.trace.enabled {
        Fuse3PassthroughFS::new(TracedFs::new(
            host,
            Duration::from_millis(config.trace.delay_ms),
        ))
    } else {
        Fuse3PassthroughFS::new(host)
    };
    let mount_options: MountConfig = mount_config(config, false);

    let runtime = runner.runtime()?;
    runtime.block_on(async move {
        let handle = fs.mount(&mountpoint, &mount_options).await?;
        info!(mountpoint = %mountpoint.display(), "Passthrough mounted");
        serve_until_unmounted(handle).await
    })?;

    println!();
    println!("Filesystem unmounted.");
    Ok(())
}
