//! Mount command.

use std::path::PathBuf;
use std::sync::Arc;

use keepfs_config::MountConfig;
use keepfs_core::NoteService;
use keepfs_fuse::KeepFuse;

/// Mount arguments.
pub struct MountArgs {
    /// Mount point path.
    pub mountpoint: PathBuf,
    /// Force read-only mode regardless of config.
    pub read_only: bool,
}

/// Run the mount command. The process serves the mount in the foreground
/// and returns once the filesystem is unmounted.
pub fn run(
    service: Arc<dyn NoteService>,
    mount: MountConfig,
    args: MountArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    if !args.mountpoint.exists() {
        std::fs::create_dir_all(&args.mountpoint)?;
    }

    let read_only = mount.read_only || args.read_only;
    let fs = KeepFuse::from_config(service, mount)?.with_read_only(read_only);

    fs.mount(&args.mountpoint)?;

    Ok(())
}
