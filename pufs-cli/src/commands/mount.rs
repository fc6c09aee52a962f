//! Mount command - join several roots in one read-only union.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use pufs::dispatch::Mount;
use pufs::fuse::Fuse3UnionFS;
use pufs::ops::UnionOps;
use tracing::info;

use super::common::{
    backing_for, mount_config, require_directory, serve_until_unmounted, CommonArgs,
};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the mount command.
#[derive(Debug, Args)]
pub struct MountArgs {
    /// Backing roots in priority order, followed by the mountpoint
    #[arg(num_args = 2.., required = true)]
    pub paths: Vec<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl MountArgs {
    /// Split the positional paths into roots and the mountpoint.
    pub fn split_paths(&self) -> Result<(Vec<PathBuf>, PathBuf), CliError> {
        match self.paths.split_last() {
            Some((mountpoint, roots)) if !roots.is_empty() => {
                Ok((roots.to_vec(), mountpoint.clone()))
            }
            _ => Err(CliError::Config(
                "mount needs at least one root and a mountpoint".to_string(),
            )),
        }
    }
}

/// Run the mount command.
pub fn run(args: MountArgs) -> Result<(), CliError> {
    let (roots, mountpoint) = args.split_paths()?;
    let roots = roots
        .iter()
        .map(|root| require_directory(root))
        .collect::<Result<Vec<_>, _>>()?;
    let mountpoint = require_directory(&mountpoint)?;

    let runner = CliRunner::new(&args.common)?;
    runner.log_startup("mount");
    let config = runner.config();

    println!("PUFS Union Mount v{}", pufs::VERSION);
    println!("====================");
    println!();
    for (index, root) in roots.iter().enumerate() {
        println!("Root {}:     {}", index, root.display());
    }
    println!("Mountpoint: {}", mountpoint.display());
    println!("Workers:    {} per root", config.mount.threads_per_root);
    if config.trace.enabled {
        println!("Tracing:    on ({} ms delay)", config.trace.delay_ms);
    }
    println!();
    println!("Press Ctrl+C to unmount and exit");
    println!();

    let backings = roots
        .iter()
        .map(|root| backing_for(root, &config.trace))
        .collect();
    let mount_options = mount_config(config, config.mount.read_only);
    let threads_per_root = config.mount.threads_per_root;

    let runtime = runner.runtime()?;
    runtime.block_on(async move {
        let ops = Arc::new(UnionOps::new(Mount::new(backings, threads_per_root)));
        let handle = Fuse3UnionFS::new(Arc::clone(&ops))
            .mount(&mountpoint, &mount_options)
            .await?;
        info!(mountpoint = %mountpoint.display(), "Union mounted");

        let served = serve_until_unmounted(handle).await;
        ops.shutdown().await;
        served
    })?;

    println!();
    println!("Filesystem unmounted.");
    Ok(())
}
