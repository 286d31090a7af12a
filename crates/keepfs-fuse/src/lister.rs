//! Root directory enumeration.

use keepfs_core::Note;

use crate::async_bridge::FuseResult;
use crate::store::NoteStoreAdapter;

/// Enumerates live notes as root directory entries.
///
/// Each call recomputes the listing from the store's full note set.
#[derive(Clone)]
pub struct DirectoryLister {
    store: NoteStoreAdapter,
}

impl DirectoryLister {
    pub fn new(store: NoteStoreAdapter) -> Self {
        DirectoryLister { store }
    }

    /// Deleted or trashed notes are left out of listings.
    pub fn is_listed(note: &Note) -> bool {
        !(note.deleted || note.trashed)
    }

    /// Listed notes in store order.
    pub fn notes(&self) -> FuseResult<Vec<Note>> {
        Ok(self
            .store
            .list_all()?
            .into_iter()
            .filter(Self::is_listed)
            .collect())
    }

    /// `.`, `..`, then one name per listed note.
    pub fn list(&self) -> FuseResult<Vec<String>> {
        let notes = self.notes()?;
        let mut names = Vec::with_capacity(notes.len() + 2);
        names.push(".".to_string());
        names.push("..".to_string());
        names.extend(notes.iter().map(|n| n.fs_name().to_string()));
        Ok(names)
    }
}
