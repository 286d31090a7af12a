use std::sync::Arc;

use keepfs_core::NoteService;
use keepfs_fuse::{init_runtime, NoteStoreAdapter, PathResolver};

pub fn run(service: Arc<dyn NoteService>, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    init_runtime()?;
    let resolver = PathResolver::new(NoteStoreAdapter::new(service));

    let path = format!("/{}", name.trim_start_matches('/'));
    match resolver.resolve(&path)? {
        Some(note) => {
            print!("{}", note.text);
            Ok(())
        }
        None => Err(format!("no such note: {}", name).into()),
    }
}
