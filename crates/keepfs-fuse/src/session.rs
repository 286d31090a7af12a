//! Write sessions: per-path staging buffers for whole-file rewrites.
//!
//! The note store only supports whole-document replace, so writes are
//! collected in a buffer holding the entire intended file content and
//! flushed as one update on close. Writes must be sequential: each one has to
//! start exactly where the buffer ends.
//!
//! Write opens of a path that already has a live session join it and share
//! its handle. The session counts its openers and is handed back for flushing
//! only when the last of them releases it. Sessions started by `prepare`, a
//! bare write or a truncate have no openers and go to the first release.

use std::collections::HashMap;

use parking_lot::Mutex;

/// Handle returned for opens without write intent. Never owns a session.
pub const READ_ONLY_HANDLE: u64 = 0;

/// A write that did not start at the end of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("non-sequential write at offset {offset}, buffer holds {expected} bytes")]
pub struct NonSequentialWrite {
    pub expected: u64,
    pub offset: u64,
}

/// An in-progress rewrite of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSession {
    pub handle: u64,
    pub path: String,
    pub buffer: Vec<u8>,
    /// Opens not yet released. Zero for sessions started by a bare write or
    /// truncate.
    pub openers: usize,
}

impl WriteSession {
    /// Append `data` if `offset` equals the buffer length.
    fn append(&mut self, data: &[u8], offset: u64) -> Result<usize, NonSequentialWrite> {
        let expected = self.buffer.len() as u64;
        if offset != expected {
            return Err(NonSequentialWrite { expected, offset });
        }
        self.buffer.extend_from_slice(data);
        Ok(data.len())
    }
}

struct Sessions {
    next_handle: u64,
    by_handle: HashMap<u64, WriteSession>,
    by_path: HashMap<String, u64>,
}

impl Sessions {
    fn insert(&mut self, path: &str, buffer: Vec<u8>, openers: usize) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.by_handle.insert(
            handle,
            WriteSession {
                handle,
                path: path.to_string(),
                buffer,
                openers,
            },
        );
        self.by_path.insert(path.to_string(), handle);
        handle
    }

    fn get_mut(&mut self, path: &str) -> Option<&mut WriteSession> {
        let handle = self.by_path.get(path)?;
        self.by_handle.get_mut(handle)
    }
}

/// Session arena indexed by handle, with at most one live session per path.
pub struct SessionTable {
    inner: Mutex<Sessions>,
}

impl SessionTable {
    pub fn new() -> Self {
        SessionTable {
            inner: Mutex::new(Sessions {
                next_handle: READ_ONLY_HANDLE + 1,
                by_handle: HashMap::new(),
                by_path: HashMap::new(),
            }),
        }
    }

    /// Start a session for `path` seeded with `seed` without holding it.
    /// Returns the live session's handle if there is one.
    pub fn prepare(&self, path: &str, seed: Vec<u8>) -> u64 {
        let mut sessions = self.inner.lock();
        match sessions.by_path.get(path) {
            Some(&handle) => handle,
            None => sessions.insert(path, seed, 0),
        }
    }

    /// Start a session for `path` seeded with `seed`. If one is already live
    /// for the path the caller joins it and `seed` is dropped.
    pub fn open(&self, path: &str, seed: Vec<u8>) -> u64 {
        let mut sessions = self.inner.lock();
        match sessions.get_mut(path) {
            Some(session) => {
                session.openers += 1;
                session.handle
            }
            None => sessions.insert(path, seed, 1),
        }
    }

    /// Empty the buffer for `path`, starting a session if none is live.
    pub fn truncate(&self, path: &str) -> u64 {
        let mut sessions = self.inner.lock();
        match sessions.get_mut(path) {
            Some(session) => {
                session.buffer.clear();
                session.handle
            }
            None => sessions.insert(path, Vec::new(), 0),
        }
    }

    /// Append `data` if `offset` equals the current buffer length. A session
    /// with an empty buffer is started if none is live. On error the buffer
    /// is left untouched.
    pub fn write(&self, path: &str, data: &[u8], offset: u64) -> Result<usize, NonSequentialWrite> {
        let mut sessions = self.inner.lock();
        if !sessions.by_path.contains_key(path) {
            sessions.insert(path, Vec::new(), 0);
        }
        let session = sessions
            .get_mut(path)
            .ok_or(NonSequentialWrite { expected: 0, offset })?;
        session.append(data, offset)
    }

    /// Append to the session owning `handle`. `None` when no session has
    /// that handle.
    pub fn write_handle(
        &self,
        handle: u64,
        data: &[u8],
        offset: u64,
    ) -> Option<Result<usize, NonSequentialWrite>> {
        let mut sessions = self.inner.lock();
        let session = sessions.by_handle.get_mut(&handle)?;
        Some(session.append(data, offset))
    }

    /// Drop one opener of the session owning `handle`. Once no openers
    /// remain the session is removed and returned, and its path is freed for
    /// a new session.
    pub fn release(&self, handle: u64) -> Option<WriteSession> {
        let mut sessions = self.inner.lock();
        let session = sessions.by_handle.get_mut(&handle)?;
        if session.openers > 1 {
            session.openers -= 1;
            return None;
        }
        let session = sessions.by_handle.remove(&handle)?;
        if sessions.by_path.get(&session.path) == Some(&handle) {
            sessions.by_path.remove(&session.path);
        }
        Some(session)
    }

    /// Remove and return the live session for `path` if nothing holds it.
    pub fn release_unheld(&self, path: &str) -> Option<WriteSession> {
        let mut sessions = self.inner.lock();
        let handle = *sessions.by_path.get(path)?;
        if sessions.by_handle.get(&handle)?.openers > 0 {
            return None;
        }
        sessions.by_path.remove(path);
        sessions.by_handle.remove(&handle)
    }

    /// Copy of the buffer for `path`.
    pub fn buffer(&self, path: &str) -> Option<Vec<u8>> {
        let mut sessions = self.inner.lock();
        sessions.get_mut(path).map(|s| s.buffer.clone())
    }

    /// Handle of the live session for `path`.
    pub fn handle(&self, path: &str) -> Option<u64> {
        self.inner.lock().by_path.get(path).copied()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.inner.lock().by_handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::new()
    }
}
