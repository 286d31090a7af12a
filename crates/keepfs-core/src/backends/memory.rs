use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use indexmap::{IndexMap, IndexSet};

use crate::{Note, NoteService, StoreError};

/// A failure to inject into the next service call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    RemoteUnavailable,
    AuthExpired,
}

impl Fault {
    fn into_error(self, operation: &str) -> StoreError {
        match self {
            Fault::RemoteUnavailable => {
                StoreError::RemoteUnavailable(format!("injected failure in {}", operation))
            }
            Fault::AuthExpired => {
                StoreError::AuthExpired(format!("injected failure in {}", operation))
            }
        }
    }
}

#[derive(Default)]
struct State {
    notes: IndexMap<String, Note>,
    dirty: IndexSet<String>,
}

/// In-memory note service.
///
/// Keeps notes in insertion order. Used directly by tests and as the local
/// mirror of [`HttpNoteService`](super::HttpNoteService).
pub struct MemoryNoteService {
    state: RwLock<State>,
    account: Option<(String, String)>,
    fault: Mutex<Option<Fault>>,
    sync_count: AtomicU64,
}

impl MemoryNoteService {
    /// Create an empty service that accepts any login.
    pub fn new() -> Self {
        MemoryNoteService {
            state: RwLock::new(State::default()),
            account: None,
            fault: Mutex::new(None),
            sync_count: AtomicU64::new(0),
        }
    }

    /// Only accept this user/password pair at login.
    pub fn with_account(mut self, user: &str, password: &str) -> Self {
        self.account = Some((user.to_string(), password.to_string()));
        self
    }

    /// Seed a note as if it had already been synced.
    pub fn insert(&self, note: Note) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.dirty.shift_remove(&note.id);
        state.notes.insert(note.id.clone(), note);
    }

    /// Snapshot of a note by id, including trashed and deleted ones.
    pub fn note(&self, id: &str) -> Option<Note> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.notes.get(id).cloned()
    }

    /// Set the `deleted` flag directly, as a remote purge would.
    pub fn mark_deleted(&self, id: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let note = state
            .notes
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        note.deleted = true;
        Ok(())
    }

    /// Number of completed `sync` calls.
    pub fn sync_count(&self) -> u64 {
        self.sync_count.load(Ordering::SeqCst)
    }

    /// Ids with local changes not yet synced.
    pub fn dirty_ids(&self) -> Vec<String> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.dirty.iter().cloned().collect()
    }

    /// Snapshots of every dirty note.
    pub fn dirty_notes(&self) -> Vec<Note> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state
            .dirty
            .iter()
            .filter_map(|id| state.notes.get(id).cloned())
            .collect()
    }

    /// Forget local changes for the given ids, stamping them as updated.
    pub fn mark_clean(&self, ids: &[String]) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let now = Utc::now();
        for id in ids {
            if state.dirty.shift_remove(id) {
                if let Some(note) = state.notes.get_mut(id) {
                    note.timestamps.updated = now;
                }
            }
        }
    }

    /// Replace the whole set with `notes`, keeping local versions of notes
    /// that still have unsynced changes.
    pub fn replace_all(&self, notes: Vec<Note>) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let mut fresh: IndexMap<String, Note> = IndexMap::with_capacity(notes.len());
        for note in notes {
            fresh.insert(note.id.clone(), note);
        }
        let State { notes: old, dirty } = &mut *state;
        for id in dirty.iter() {
            if let Some(local) = old.get(id) {
                fresh.insert(id.clone(), local.clone());
            }
        }
        *old = fresh;
    }

    /// Make the next service call fail with `fault`.
    pub fn fail_next(&self, fault: Fault) {
        *self.fault.lock().unwrap_or_else(|e| e.into_inner()) = Some(fault);
    }

    fn check_fault(&self, operation: &str) -> Result<(), StoreError> {
        match self.fault.lock().unwrap_or_else(|e| e.into_inner()).take() {
            Some(fault) => Err(fault.into_error(operation)),
            None => Ok(()),
        }
    }
}

impl Default for MemoryNoteService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NoteService for MemoryNoteService {
    async fn login(&self, user: &str, password: &str) -> Result<(), StoreError> {
        self.check_fault("login")?;
        match self.account {
            Some((ref u, ref p)) if u != user || p != password => {
                Err(StoreError::AuthFailed(user.to_string()))
            }
            _ => Ok(()),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<Note>, StoreError> {
        self.check_fault("get")?;
        Ok(self.note(key))
    }

    async fn find(&self, query: &str) -> Result<Vec<Note>, StoreError> {
        self.check_fault("find")?;
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        Ok(state
            .notes
            .values()
            .filter(|n| n.title.contains(query) || n.text.contains(query))
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Note>, StoreError> {
        self.check_fault("list_all")?;
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        Ok(state.notes.values().cloned().collect())
    }

    async fn create_note(&self, title: &str, text: &str) -> Result<Note, StoreError> {
        self.check_fault("create_note")?;
        let note = Note::new(uuid::Uuid::new_v4().simple().to_string(), title, text);
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.dirty.insert(note.id.clone());
        state.notes.insert(note.id.clone(), note.clone());
        Ok(note)
    }

    async fn update_note(&self, id: &str, title: &str, text: &str) -> Result<(), StoreError> {
        self.check_fault("update_note")?;
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let note = state
            .notes
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if note.title != title || note.text != text {
            note.title = title.to_string();
            note.text = text.to_string();
            note.timestamps.edited = Utc::now();
        }
        state.dirty.insert(id.to_string());
        Ok(())
    }

    async fn trash_note(&self, id: &str) -> Result<(), StoreError> {
        self.check_fault("trash_note")?;
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let note = state
            .notes
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        note.trashed = true;
        state.dirty.insert(id.to_string());
        Ok(())
    }

    async fn sync(&self) -> Result<(), StoreError> {
        self.check_fault("sync")?;
        let dirty = self.dirty_ids();
        self.mark_clean(&dirty);
        self.sync_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
