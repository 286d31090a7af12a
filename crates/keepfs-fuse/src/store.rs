//! Blocking facade over the async note service.

use std::sync::Arc;

use keepfs_core::{Note, NoteService};
use tracing::{debug, info};

use crate::async_bridge::{block_on, FuseResult};

/// Thin pass-through to the remote note service.
///
/// Owns no filesystem concepts. Every mutation must be followed by
/// [`sync`](Self::sync) to become durable. Failures are surfaced as-is, with
/// no retry.
#[derive(Clone)]
pub struct NoteStoreAdapter {
    service: Arc<dyn NoteService>,
}

impl NoteStoreAdapter {
    pub fn new(service: Arc<dyn NoteService>) -> Self {
        NoteStoreAdapter { service }
    }

    pub fn login(&self, user: &str, password: &str) -> FuseResult<()> {
        Ok(block_on(self.service.login(user, password))??)
    }

    /// Direct lookup by id.
    pub fn get(&self, key: &str) -> FuseResult<Option<Note>> {
        Ok(block_on(self.service.get(key))??)
    }

    /// Candidate notes for a title. Callers must still compare titles exactly.
    pub fn find_by_title(&self, query: &str) -> FuseResult<Vec<Note>> {
        Ok(block_on(self.service.find(query))??)
    }

    pub fn list_all(&self) -> FuseResult<Vec<Note>> {
        Ok(block_on(self.service.list_all())??)
    }

    pub fn create_note(&self, title: &str, text: &str) -> FuseResult<Note> {
        let note = block_on(self.service.create_note(title, text))??;
        info!("created note {} ({:?}, {} bytes)", note.id, title, text.len());
        Ok(note)
    }

    pub fn update_note(&self, note: &Note, title: &str, text: &str) -> FuseResult<()> {
        debug!("updating note {} ({:?}, {} bytes)", note.id, title, text.len());
        Ok(block_on(self.service.update_note(&note.id, title, text))??)
    }

    pub fn trash_note(&self, note: &Note) -> FuseResult<()> {
        info!("trashing note {} ({:?})", note.id, note.title);
        Ok(block_on(self.service.trash_note(&note.id))??)
    }

    pub fn sync(&self) -> FuseResult<()> {
        debug!("sync");
        Ok(block_on(self.service.sync())??)
    }
}
