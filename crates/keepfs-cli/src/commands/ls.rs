use std::io::Write;
use std::sync::Arc;

use keepfs_core::NoteService;
use keepfs_fuse::{init_runtime, DirectoryLister, NoteStoreAdapter};

pub fn run(service: Arc<dyn NoteService>) -> Result<(), Box<dyn std::error::Error>> {
    init_runtime()?;
    let lister = DirectoryLister::new(NoteStoreAdapter::new(service));

    let mut out = std::io::stdout().lock();
    for note in lister.notes()? {
        writeln!(out, "{}", note.fs_name())?;
    }
    Ok(())
}
