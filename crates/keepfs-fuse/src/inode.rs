//! Inode management for the FUSE filesystem.
//!
//! Provides bidirectional mapping between Unix inodes and note paths.
//! FUSE requires stable inode numbers for directory entries and file handles,
//! but notes are addressed by path, so every path that has been looked up or
//! listed gets an inode for the lifetime of the mount.

use std::collections::HashMap;
use std::time::SystemTime;

use keepfs_core::Note;
use parking_lot::RwLock;

/// Reserved inode for the root directory.
pub const ROOT_INO: u64 = 1;

/// Permission bits reported for every note file. Writes still succeed.
pub const NOTE_PERM: u16 = 0o444;

/// Permission bits reported for the root directory.
pub const DIR_PERM: u16 = 0o755;

/// Type of inode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InodeKind {
    File,
    Directory,
}

/// Inode attributes matching FUSE requirements.
#[derive(Debug, Clone)]
pub struct InodeAttr {
    pub ino: u64,
    /// Size in bytes.
    pub size: u64,
    /// Number of 512-byte blocks.
    pub blocks: u64,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
    pub crtime: SystemTime,
    pub kind: InodeKind,
    pub perm: u16,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
}

impl InodeAttr {
    /// Attributes for the root directory.
    pub fn directory(ino: u64) -> Self {
        let now = SystemTime::now();
        InodeAttr {
            ino,
            size: 4096,
            blocks: 8,
            atime: now,
            mtime: now,
            ctime: now,
            crtime: now,
            kind: InodeKind::Directory,
            perm: DIR_PERM,
            nlink: 2,
            uid: unsafe { libc::getuid() },
            gid: unsafe { libc::getgid() },
        }
    }

    /// Attributes for a note file. Times come from the note's timestamps.
    pub fn note(ino: u64, note: &Note) -> Self {
        let size = note.byte_len();
        let edited = SystemTime::from(note.timestamps.edited);
        InodeAttr {
            ino,
            size,
            blocks: size.div_ceil(512),
            atime: edited,
            mtime: edited,
            ctime: SystemTime::from(note.timestamps.updated),
            crtime: SystemTime::from(note.timestamps.created),
            kind: InodeKind::File,
            perm: NOTE_PERM,
            nlink: 1,
            uid: unsafe { libc::getuid() },
            gid: unsafe { libc::getgid() },
        }
    }
}

/// Inode table managing path-to-inode and inode-to-path mappings.
pub struct InodeTable {
    path_to_ino: RwLock<HashMap<String, u64>>,
    ino_to_path: RwLock<HashMap<u64, String>>,
    next_ino: RwLock<u64>,
}

impl InodeTable {
    /// Create a new inode table with the root directory registered.
    pub fn new() -> Self {
        let table = InodeTable {
            path_to_ino: RwLock::new(HashMap::new()),
            ino_to_path: RwLock::new(HashMap::new()),
            next_ino: RwLock::new(ROOT_INO + 1),
        };

        table.path_to_ino.write().insert("/".to_string(), ROOT_INO);
        table.ino_to_path.write().insert(ROOT_INO, "/".to_string());

        table
    }

    /// Get or allocate the inode for a path.
    pub fn get_or_create(&self, path: &str) -> u64 {
        let normalized = Self::normalize_path(path);

        if let Some(&ino) = self.path_to_ino.read().get(&normalized) {
            return ino;
        }

        let mut path_to_ino = self.path_to_ino.write();
        // Another thread may have inserted between the read and write locks.
        if let Some(&ino) = path_to_ino.get(&normalized) {
            return ino;
        }

        let ino = {
            let mut next = self.next_ino.write();
            let ino = *next;
            *next += 1;
            ino
        };

        path_to_ino.insert(normalized.clone(), ino);
        self.ino_to_path.write().insert(ino, normalized);
        ino
    }

    /// Get inode for a path, if one was allocated.
    pub fn get_ino(&self, path: &str) -> Option<u64> {
        let normalized = Self::normalize_path(path);
        self.path_to_ino.read().get(&normalized).copied()
    }

    /// Get path for an inode.
    pub fn get_path(&self, ino: u64) -> Option<String> {
        self.ino_to_path.read().get(&ino).cloned()
    }

    /// Forget a path. The root is never removed.
    pub fn remove_path(&self, path: &str) {
        let normalized = Self::normalize_path(path);
        if normalized == "/" {
            return;
        }
        let mut path_to_ino = self.path_to_ino.write();
        if let Some(ino) = path_to_ino.remove(&normalized) {
            self.ino_to_path.write().remove(&ino);
        }
    }

    /// Move the inode of `old` to `new`, dropping any inode `new` had.
    /// Returns the moved inode, or `None` if `old` had none.
    pub fn rename(&self, old: &str, new: &str) -> Option<u64> {
        let old = Self::normalize_path(old);
        let new = Self::normalize_path(new);

        let mut path_to_ino = self.path_to_ino.write();
        let mut ino_to_path = self.ino_to_path.write();

        let ino = path_to_ino.remove(&old)?;
        if let Some(replaced) = path_to_ino.insert(new.clone(), ino) {
            ino_to_path.remove(&replaced);
        }
        ino_to_path.insert(ino, new);
        Some(ino)
    }

    /// Number of registered inodes, root included.
    pub fn len(&self) -> usize {
        self.ino_to_path.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve a child path from a parent path and entry name.
    pub fn child_path(parent_path: &str, name: &str) -> String {
        if parent_path == "/" {
            format!("/{}", name)
        } else {
            format!("{}/{}", parent_path, name)
        }
    }

    fn normalize_path(path: &str) -> String {
        let mut normalized = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        if normalized.len() > 1 && normalized.ends_with('/') {
            normalized.pop();
        }

        normalized
    }
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_directory_attr() {
        let attr = InodeAttr::directory(ROOT_INO);
        assert_eq!(attr.kind, InodeKind::Directory);
        assert_eq!(attr.perm, 0o755);
        assert_eq!(attr.nlink, 2);
    }

    #[test]
    fn test_note_attr_reports_read_only_file() {
        let note = Note::new("n1", "shopping", "eggs");
        let attr = InodeAttr::note(7, &note);

        assert_eq!(attr.ino, 7);
        assert_eq!(attr.kind, InodeKind::File);
        assert_eq!(attr.perm, 0o444);
        assert_eq!(attr.nlink, 1);
        assert_eq!(attr.size, 4);
        assert_eq!(attr.blocks, 1);
    }

    #[test]
    fn test_note_attr_size_is_utf8_length() {
        let note = Note::new("n1", "café", "crème brûlée");
        let attr = InodeAttr::note(2, &note);
        assert_eq!(attr.size, "crème brûlée".len() as u64);
        assert_eq!(attr.size, 15);
    }

    #[test]
    fn test_note_attr_times() {
        let mut note = Note::new("n1", "t", "");
        note.timestamps.created = Utc.timestamp_opt(1_000, 0).unwrap();
        note.timestamps.edited = Utc.timestamp_opt(2_000, 0).unwrap();
        note.timestamps.updated = Utc.timestamp_opt(3_000, 0).unwrap();

        let attr = InodeAttr::note(2, &note);
        let at = |secs| SystemTime::UNIX_EPOCH + Duration::from_secs(secs);
        assert_eq!(attr.crtime, at(1_000));
        assert_eq!(attr.mtime, at(2_000));
        assert_eq!(attr.atime, at(2_000));
        assert_eq!(attr.ctime, at(3_000));
    }

    #[test]
    fn test_table_has_root() {
        let table = InodeTable::new();
        assert_eq!(table.get_ino("/"), Some(ROOT_INO));
        assert_eq!(table.get_path(ROOT_INO), Some("/".to_string()));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_get_or_create_is_stable() {
        let table = InodeTable::new();
        let a = table.get_or_create("/todo");
        let b = table.get_or_create("/todo");
        let c = table.get_or_create("todo/");

        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_ne!(a, ROOT_INO);
        assert_eq!(table.get_path(a), Some("/todo".to_string()));
    }

    #[test]
    fn test_remove_path() {
        let table = InodeTable::new();
        let ino = table.get_or_create("/todo");
        table.remove_path("/todo");

        assert_eq!(table.get_ino("/todo"), None);
        assert_eq!(table.get_path(ino), None);
    }

    #[test]
    fn test_root_cannot_be_removed() {
        let table = InodeTable::new();
        table.remove_path("/");
        assert_eq!(table.get_ino("/"), Some(ROOT_INO));
    }

    #[test]
    fn test_rename_keeps_inode() {
        let table = InodeTable::new();
        let ino = table.get_or_create("/todo");

        assert_eq!(table.rename("/todo", "/done"), Some(ino));
        assert_eq!(table.get_ino("/todo"), None);
        assert_eq!(table.get_ino("/done"), Some(ino));
        assert_eq!(table.get_path(ino), Some("/done".to_string()));
    }

    #[test]
    fn test_rename_over_existing_drops_target_inode() {
        let table = InodeTable::new();
        let src = table.get_or_create("/a");
        let dst = table.get_or_create("/b");

        table.rename("/a", "/b");
        assert_eq!(table.get_ino("/b"), Some(src));
        assert_eq!(table.get_path(dst), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_rename_unknown_path() {
        let table = InodeTable::new();
        assert_eq!(table.rename("/nope", "/other"), None);
        assert_eq!(table.get_ino("/other"), None);
    }

    #[test]
    fn test_child_path() {
        assert_eq!(InodeTable::child_path("/", "todo"), "/todo");
        assert_eq!(InodeTable::child_path("/a", "b"), "/a/b");
    }

    #[test]
    fn test_concurrent_allocation() {
        let table = Arc::new(InodeTable::new());
        let mut handles = vec![];

        for _ in 0..8 {
            let table = table.clone();
            handles.push(thread::spawn(move || {
                (0..50)
                    .map(|i| table.get_or_create(&format!("/note{}", i)))
                    .collect::<Vec<_>>()
            }));
        }

        let results: Vec<Vec<u64>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for r in &results[1..] {
            assert_eq!(r, &results[0]);
        }
        assert_eq!(table.len(), 51);
    }
}
