//! Filesystem adapter core.
//!
//! `KeepFsCore` implements the path-level filesystem contract (stat, list,
//! create, open, read, write, truncate, close, rename, unlink) by composing
//! the resolver, lister, session table and store adapter. The `do_*` methods
//! translate the inode-based calls `fuser` delivers into those path
//! operations.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use keepfs_config::MountConfig;
use keepfs_core::{Note, NoteService};
use tracing::{debug, error, info, warn};

use crate::async_bridge::{init_runtime, FuseError};
use crate::inode::{InodeAttr, InodeKind, InodeTable, ROOT_INO};
use crate::lister::DirectoryLister;
use crate::resolver::{key_from_path, PathResolver};
use crate::session::{NonSequentialWrite, SessionTable, WriteSession, READ_ONLY_HANDLE};
use crate::store::NoteStoreAdapter;

/// Errors returned by filesystem operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FsOpError {
    /// Path does not resolve to a visible note.
    #[error("not found")]
    NotFound,
    /// Mutation attempted on a read-only mount.
    #[error("permission denied")]
    PermissionDenied,
    /// Non-sequential write offset or unusable name.
    #[error("invalid argument")]
    InvalidArg,
    /// Write through a handle that owns no session.
    #[error("bad file handle")]
    BadHandle,
    /// The note service failed.
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<FuseError> for FsOpError {
    fn from(e: FuseError) -> Self {
        match &e {
            FuseError::Store(store) if store.is_transient() => warn!("note service unavailable: {}", e),
            _ => error!("note service call failed: {}", e),
        }
        FsOpError::Io(e.to_string())
    }
}

impl From<NonSequentialWrite> for FsOpError {
    fn from(e: NonSequentialWrite) -> Self {
        debug!("{}", e);
        FsOpError::InvalidArg
    }
}

/// True when `flags` ask for write or read-write access.
pub fn has_write_intent(flags: i32) -> bool {
    flags & libc::O_ACCMODE != libc::O_RDONLY
}

fn has_truncate(flags: i32) -> bool {
    flags & libc::O_TRUNC != 0
}

/// Core FUSE filesystem logic for a flat directory of notes.
pub struct KeepFsCore {
    /// Pass-through to the note service.
    pub store: NoteStoreAdapter,
    pub resolver: PathResolver,
    pub lister: DirectoryLister,
    /// Live write sessions.
    pub sessions: Arc<SessionTable>,
    /// Inode management.
    pub inodes: Arc<InodeTable>,
    /// Mount settings, including read-only mode.
    pub mount: MountConfig,
}

impl KeepFsCore {
    /// Create a core with default mount settings.
    pub fn new(service: Arc<dyn NoteService>) -> Result<Self, FuseError> {
        Self::from_config(service, MountConfig::default())
    }

    /// Create a core over `service` using `mount` settings.
    pub fn from_config(service: Arc<dyn NoteService>, mount: MountConfig) -> Result<Self, FuseError> {
        init_runtime()?;

        let store = NoteStoreAdapter::new(service);
        Ok(KeepFsCore {
            resolver: PathResolver::new(store.clone()),
            lister: DirectoryLister::new(store.clone()),
            store,
            sessions: Arc::new(SessionTable::new()),
            inodes: Arc::new(InodeTable::new()),
            mount,
        })
    }

    /// Reject every mutating operation with `PermissionDenied`.
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.mount.read_only = read_only;
        self
    }

    pub fn is_read_only(&self) -> bool {
        self.mount.read_only
    }

    /// Lifetime of attributes and entries in the kernel cache.
    pub fn attr_ttl(&self) -> Duration {
        Duration::from_secs(self.mount.attr_ttl_secs)
    }

    fn ensure_writable(&self) -> Result<(), FsOpError> {
        if self.mount.read_only {
            Err(FsOpError::PermissionDenied)
        } else {
            Ok(())
        }
    }

    /// Resolve `path` to a visible note.
    pub fn resolve(&self, path: &str) -> Result<Note, FsOpError> {
        self.resolver.resolve(path)?.ok_or(FsOpError::NotFound)
    }

    // ---- path operations ----

    /// Attributes for the root or a note.
    pub fn stat(&self, path: &str) -> Result<InodeAttr, FsOpError> {
        if path == "/" {
            return Ok(InodeAttr::directory(ROOT_INO));
        }
        let note = self.resolve(path)?;
        let ino = self.inodes.get_or_create(path);
        Ok(InodeAttr::note(ino, &note))
    }

    /// Entry names of the root directory. Only the root can be listed.
    pub fn list(&self, path: &str) -> Result<Vec<String>, FsOpError> {
        if path != "/" {
            return Err(FsOpError::NotFound);
        }
        Ok(self.lister.list()?)
    }

    /// Create the note for `path` if it does not resolve and prepare its
    /// write session. An existing note is left untouched. The session is not
    /// held: a following `open` holds it, otherwise the first close flushes
    /// it.
    pub fn create(&self, path: &str, flags: i32, mode: u32) -> Result<u64, FsOpError> {
        self.create_session(path, flags, mode, false)
    }

    fn create_session(&self, path: &str, flags: i32, mode: u32, hold: bool) -> Result<u64, FsOpError> {
        self.ensure_writable()?;
        let name = key_from_path(path);
        if name.is_empty() {
            return Err(FsOpError::InvalidArg);
        }
        debug!("create {} flags={:#o} mode={:#o}", path, flags, mode);

        let seed = match self.resolver.resolve(path)? {
            Some(note) => note.text.into_bytes(),
            None => {
                self.store.create_note(name, "")?;
                self.store.sync()?;
                Vec::new()
            }
        };

        let handle = if hold {
            self.sessions.open(path, seed)
        } else {
            self.sessions.prepare(path, seed)
        };
        if has_truncate(flags) {
            self.sessions.truncate(path);
        }
        Ok(handle)
    }

    /// Open an existing note. Write intent starts or joins a session seeded
    /// with the note's text. Read-only opens get [`READ_ONLY_HANDLE`].
    pub fn open(&self, path: &str, flags: i32) -> Result<u64, FsOpError> {
        let note = self.resolve(path)?;
        if !has_write_intent(flags) {
            return Ok(READ_ONLY_HANDLE);
        }
        self.ensure_writable()?;
        Ok(self.open_session(path, flags, note.text.into_bytes()))
    }

    fn open_session(&self, path: &str, flags: i32, seed: Vec<u8>) -> u64 {
        if has_truncate(flags) {
            let handle = self.sessions.open(path, Vec::new());
            self.sessions.truncate(path);
            handle
        } else {
            self.sessions.open(path, seed)
        }
    }

    /// Bytes `[offset, offset + size)` of the note's last synced text.
    pub fn read(&self, path: &str, size: u32, offset: u64) -> Result<Vec<u8>, FsOpError> {
        let note = self.resolve(path)?;
        let bytes = note.text.as_bytes();

        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        if start >= bytes.len() {
            return Ok(Vec::new());
        }
        let end = start.saturating_add(size as usize).min(bytes.len());
        Ok(bytes[start..end].to_vec())
    }

    /// Append to the path's session. `offset` must equal the buffer length.
    pub fn write(&self, path: &str, data: &[u8], offset: u64) -> Result<u32, FsOpError> {
        self.ensure_writable()?;
        let written = self.sessions.write(path, data, offset)?;
        Ok(written as u32)
    }

    /// Append to the session owned by `fh`.
    pub fn write_handle(&self, fh: u64, data: &[u8], offset: u64) -> Result<u32, FsOpError> {
        self.ensure_writable()?;
        match self.sessions.write_handle(fh, data, offset) {
            Some(written) => Ok(written? as u32),
            None => Err(FsOpError::BadHandle),
        }
    }

    /// Empty the path's session buffer. The requested size is ignored.
    pub fn truncate(&self, path: &str, size: u64) -> Result<(), FsOpError> {
        self.ensure_writable()?;
        if size != 0 {
            debug!("truncate {} to {} ignored, buffer emptied", path, size);
        }
        self.sessions.truncate(path);
        Ok(())
    }

    /// Release `fh`. When it was the session's last opener the buffer is
    /// flushed as one create or update, then synced. Read-only handles and
    /// handles without a session are a no-op.
    ///
    /// If `fh` no longer owns a session, a session on `path` that nothing
    /// holds is flushed instead, so bytes written after the last holder went
    /// away still reach the note.
    pub fn close(&self, path: &str, fh: u64) -> Result<(), FsOpError> {
        if fh == READ_ONLY_HANDLE {
            return Ok(());
        }
        match self.sessions.release(fh).or_else(|| self.sessions.release_unheld(path)) {
            Some(session) => self.flush(session),
            None => Ok(()),
        }
    }

    /// Release `fh` without knowing its path. The session records the path
    /// it was opened under and the flush goes there.
    pub fn release_handle(&self, fh: u64) -> Result<(), FsOpError> {
        if fh == READ_ONLY_HANDLE {
            return Ok(());
        }
        match self.sessions.release(fh) {
            Some(session) => self.flush(session),
            None => Ok(()),
        }
    }

    fn flush(&self, session: WriteSession) -> Result<(), FsOpError> {
        debug!("flush {} ({} bytes)", session.path, session.buffer.len());

        let text = match String::from_utf8(session.buffer) {
            Ok(text) => text,
            Err(e) => {
                warn!("{}: buffer is not valid UTF-8, replacing invalid sequences", session.path);
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };

        let name = key_from_path(&session.path);
        match self.resolver.resolve(&session.path)? {
            Some(note) => self.store.update_note(&note, name, &text)?,
            None => {
                self.store.create_note(name, &text)?;
            }
        }
        self.store.sync()?;
        Ok(())
    }

    /// Retitle the note at `old` to the name of `new`.
    pub fn rename(&self, old: &str, new: &str) -> Result<(), FsOpError> {
        self.ensure_writable()?;
        let new_name = key_from_path(new);
        if new_name.is_empty() {
            return Err(FsOpError::InvalidArg);
        }

        let note = self.resolve(old)?;
        self.store.update_note(&note, new_name, &note.text)?;
        self.store.sync()?;
        self.inodes.rename(old, new);
        Ok(())
    }

    /// Move the note at `path` to the trash.
    pub fn unlink(&self, path: &str) -> Result<(), FsOpError> {
        self.ensure_writable()?;
        let note = self.resolve(path)?;
        self.store.trash_note(&note)?;
        self.store.sync()?;
        self.inodes.remove_path(path);
        Ok(())
    }

    // ---- inode operations ----

    /// Get the path for an inode.
    pub fn get_path(&self, ino: u64) -> Option<String> {
        self.inodes.get_path(ino)
    }

    fn path_of(&self, ino: u64) -> Result<String, FsOpError> {
        self.get_path(ino).ok_or(FsOpError::NotFound)
    }

    /// Notes live only in the root, so every child path is `/<name>`.
    fn root_child(parent: u64, name: &str) -> Result<String, FsOpError> {
        if parent != ROOT_INO {
            return Err(FsOpError::NotFound);
        }
        Ok(InodeTable::child_path("/", name))
    }

    /// Perform a lookup operation.
    pub fn do_lookup(&self, parent: u64, name: &str) -> Result<InodeAttr, FsOpError> {
        let path = Self::root_child(parent, name)?;
        self.stat(&path)
    }

    /// Perform a getattr operation.
    pub fn do_getattr(&self, ino: u64) -> Result<InodeAttr, FsOpError> {
        let path = self.path_of(ino)?;
        self.stat(&path)
    }

    /// List a directory.
    pub fn do_readdir(&self, ino: u64) -> Result<ReadDirResult, FsOpError> {
        let path = self.path_of(ino)?;
        let names = self.list(&path)?;

        let entries = names
            .into_iter()
            .map(|name| {
                if name == "." || name == ".." {
                    DirEntry {
                        ino: ROOT_INO,
                        name,
                        kind: InodeKind::Directory,
                    }
                } else {
                    let entry_ino = self.inodes.get_or_create(&InodeTable::child_path("/", &name));
                    DirEntry {
                        ino: entry_ino,
                        name,
                        kind: InodeKind::File,
                    }
                }
            })
            .collect();

        Ok(ReadDirResult { ino, entries })
    }

    /// Open a file, returning the file handle.
    pub fn do_open(&self, ino: u64, flags: i32) -> Result<u64, FsOpError> {
        let path = self.path_of(ino)?;
        self.open(&path, flags)
    }

    /// Create and open a file, returning its attributes and file handle.
    pub fn do_create(
        &self,
        parent: u64,
        name: &str,
        flags: i32,
        mode: u32,
    ) -> Result<(InodeAttr, u64), FsOpError> {
        let path = Self::root_child(parent, name)?;
        // The kernel releases the handle from create, so it holds the session.
        let fh = self.create_session(&path, flags, mode, true)?;
        let attr = self.stat(&path)?;
        Ok((attr, fh))
    }

    /// Perform a read operation.
    pub fn do_read(&self, ino: u64, offset: i64, size: u32) -> Result<Vec<u8>, FsOpError> {
        let path = self.path_of(ino)?;
        let offset = u64::try_from(offset).map_err(|_| FsOpError::InvalidArg)?;
        self.read(&path, size, offset)
    }

    /// Perform a write operation. The data goes to the session owned by
    /// `fh`, which stays valid after the file is renamed or unlinked.
    pub fn do_write(&self, ino: u64, fh: u64, offset: i64, data: &[u8]) -> Result<u32, FsOpError> {
        let offset = u64::try_from(offset).map_err(|_| FsOpError::InvalidArg)?;
        debug!("write ino={} fh={} offset={}", ino, fh, offset);
        self.write_handle(fh, data, offset)
    }

    /// Handle setattr. Only a size change does anything, and it truncates.
    pub fn do_setattr(&self, ino: u64, size: Option<u64>) -> Result<InodeAttr, FsOpError> {
        let path = self.path_of(ino)?;
        if let Some(size) = size {
            if ino == ROOT_INO {
                return Err(FsOpError::InvalidArg);
            }
            self.truncate(&path, size)?;
        }
        self.stat(&path)
    }

    /// Release a file handle, flushing its session. The inode may already
    /// be gone when the file was unlinked while open.
    pub fn do_release(&self, ino: u64, fh: u64) -> Result<(), FsOpError> {
        match self.get_path(ino) {
            Some(path) => self.close(&path, fh),
            None => self.release_handle(fh),
        }
    }

    /// Handle rename.
    pub fn do_rename(
        &self,
        parent: u64,
        name: &str,
        newparent: u64,
        newname: &str,
    ) -> Result<(), FsOpError> {
        let src = Self::root_child(parent, name)?;
        let dst = Self::root_child(newparent, newname)?;
        self.rename(&src, &dst)
    }

    /// Delete a file.
    pub fn do_unlink(&self, parent: u64, name: &str) -> Result<(), FsOpError> {
        let path = Self::root_child(parent, name)?;
        self.unlink(&path)
    }

    /// Mount options derived from the mount settings.
    pub fn mount_options(&self) -> Vec<fuser::MountOption> {
        use fuser::MountOption;

        let mut options = vec![MountOption::FSName(self.mount.fs_name.clone())];
        if self.mount.auto_unmount {
            options.push(MountOption::AutoUnmount);
        }
        if self.mount.allow_other {
            options.push(MountOption::AllowOther);
        }
        if self.mount.read_only {
            options.push(MountOption::RO);
        }
        options
    }

    /// Mount the filesystem and serve it on the calling thread until it is
    /// unmounted. There is no daemon mode.
    pub fn mount(self, mountpoint: &Path) -> Result<(), Box<dyn std::error::Error>> {
        use crate::unix_fuse::UnixFuse;

        let options = self.mount_options();
        info!(
            "Mounting keepfs at {:?}{}",
            mountpoint,
            if self.mount.read_only { " (read-only)" } else { "" }
        );
        fuser::mount2(UnixFuse(self), mountpoint, &options)?;
        info!("keepfs unmounted");

        Ok(())
    }
}

/// Result from a readdir operation.
pub struct ReadDirResult {
    /// Inode of the directory being listed.
    pub ino: u64,
    /// Entries in listing order, `.` and `..` first.
    pub entries: Vec<DirEntry>,
}

/// A single directory entry.
pub struct DirEntry {
    pub ino: u64,
    pub name: String,
    pub kind: InodeKind,
}

/// Convert an `InodeAttr` to a `fuser::FileAttr`.
pub fn inode_attr_to_file_attr(attr: &InodeAttr) -> fuser::FileAttr {
    use fuser::{FileAttr, FileType};

    let kind = match attr.kind {
        InodeKind::File => FileType::RegularFile,
        InodeKind::Directory => FileType::Directory,
    };

    FileAttr {
        ino: attr.ino,
        size: attr.size,
        blocks: attr.blocks,
        atime: attr.atime,
        mtime: attr.mtime,
        ctime: attr.ctime,
        crtime: attr.crtime,
        kind,
        perm: attr.perm,
        nlink: attr.nlink,
        uid: attr.uid,
        gid: attr.gid,
        rdev: 0,
        blksize: 4096,
        flags: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keepfs_core::{Fault, MemoryNoteService};

    fn core_with(notes: Vec<Note>) -> (Arc<MemoryNoteService>, KeepFsCore) {
        let service = Arc::new(MemoryNoteService::new());
        for note in notes {
            service.insert(note);
        }
        let core = KeepFsCore::new(service.clone()).unwrap();
        (service, core)
    }

    #[test]
    fn test_write_intent() {
        assert!(!has_write_intent(libc::O_RDONLY));
        assert!(has_write_intent(libc::O_WRONLY));
        assert!(has_write_intent(libc::O_RDWR));
        assert!(has_write_intent(libc::O_WRONLY | libc::O_TRUNC));
        assert!(!has_write_intent(libc::O_RDONLY | libc::O_NONBLOCK));
    }

    #[test]
    fn test_core_has_root_inode() {
        let (_, core) = core_with(vec![]);
        assert_eq!(core.get_path(ROOT_INO), Some("/".to_string()));
        assert_eq!(core.attr_ttl(), Duration::from_secs(1));
    }

    #[test]
    fn test_stat_root() {
        let (_, core) = core_with(vec![]);
        let attr = core.stat("/").unwrap();
        assert_eq!(attr.kind, InodeKind::Directory);
        assert_eq!(attr.ino, ROOT_INO);
    }

    #[test]
    fn test_stat_missing() {
        let (_, core) = core_with(vec![]);
        assert_eq!(core.stat("/nothing").unwrap_err(), FsOpError::NotFound);
    }

    #[test]
    fn test_list_non_root_is_not_found() {
        let (_, core) = core_with(vec![Note::new("n1", "todo", "")]);
        assert_eq!(core.list("/todo").unwrap_err(), FsOpError::NotFound);
    }

    #[test]
    fn test_read_only_open_returns_zero_handle() {
        let (_, core) = core_with(vec![Note::new("n1", "todo", "x")]);
        assert_eq!(core.open("/todo", libc::O_RDONLY).unwrap(), READ_ONLY_HANDLE);
        assert!(core.sessions.is_empty());
    }

    #[test]
    fn test_open_missing_is_not_found() {
        let (_, core) = core_with(vec![]);
        assert_eq!(core.open("/x", libc::O_WRONLY).unwrap_err(), FsOpError::NotFound);
        assert!(core.sessions.is_empty());
    }

    #[test]
    fn test_open_for_write_seeds_session() {
        let (_, core) = core_with(vec![Note::new("n1", "shopping", "eggs")]);
        let fh = core.open("/shopping", libc::O_RDWR).unwrap();
        assert_ne!(fh, READ_ONLY_HANDLE);
        assert_eq!(core.sessions.buffer("/shopping").unwrap(), b"eggs");
    }

    #[test]
    fn test_open_with_trunc_starts_empty() {
        let (_, core) = core_with(vec![Note::new("n1", "shopping", "eggs")]);
        core.open("/shopping", libc::O_WRONLY | libc::O_TRUNC).unwrap();
        assert_eq!(core.sessions.buffer("/shopping").unwrap(), b"");
    }

    #[test]
    fn test_create_existing_leaves_note_untouched() {
        let (service, core) = core_with(vec![Note::new("n1", "shopping", "eggs")]);
        core.create("/shopping", libc::O_WRONLY, 0o644).unwrap();

        assert_eq!(core.lister.notes().unwrap().len(), 1);
        assert!(service.dirty_ids().is_empty());
        assert_eq!(service.sync_count(), 0);
        assert_eq!(service.note("n1").unwrap().text, "eggs");
        assert_eq!(core.sessions.buffer("/shopping").unwrap(), b"eggs");
    }

    #[test]
    fn test_create_root_name_rejected() {
        let (_, core) = core_with(vec![]);
        assert_eq!(core.create("/", libc::O_WRONLY, 0o644).unwrap_err(), FsOpError::InvalidArg);
    }

    #[test]
    fn test_close_read_only_handle_is_noop() {
        let (service, core) = core_with(vec![Note::new("n1", "todo", "x")]);
        core.close("/todo", READ_ONLY_HANDLE).unwrap();
        assert_eq!(service.sync_count(), 0);
    }

    #[test]
    fn test_close_unknown_handle_is_noop() {
        let (service, core) = core_with(vec![]);
        core.close("/todo", 42).unwrap();
        assert_eq!(service.sync_count(), 0);
    }

    #[test]
    fn test_close_invalid_utf8_is_lossy() {
        let (service, core) = core_with(vec![]);
        let fh = core.create("/bin", libc::O_WRONLY, 0o644).unwrap();
        core.write("/bin", &[b'o', b'k', 0xff], 0).unwrap();
        core.close("/bin", fh).unwrap();

        let note = core.resolve("/bin").unwrap();
        assert_eq!(note.text, "ok\u{fffd}");
        assert_eq!(service.sync_count(), 2);
    }

    #[test]
    fn test_close_recreates_note_missing_at_flush() {
        let (service, core) = core_with(vec![]);
        core.truncate("/ghost", 0).unwrap();
        let fh = core.sessions.handle("/ghost").unwrap();
        core.write("/ghost", b"boo", 0).unwrap();
        core.close("/ghost", fh).unwrap();

        let note = core.resolve("/ghost").unwrap();
        assert_eq!(note.text, "boo");
        assert_eq!(service.sync_count(), 1);
    }

    #[test]
    fn test_joined_writer_flushes_on_last_release() {
        let (service, core) = core_with(vec![]);
        let ino = core.do_create(ROOT_INO, "todo", libc::O_WRONLY, 0o644).unwrap().0.ino;
        let (first, second) = (
            core.sessions.handle("/todo").unwrap(),
            core.do_open(ino, libc::O_WRONLY).unwrap(),
        );
        assert_eq!(first, second);
        core.do_write(ino, first, 0, b"one").unwrap();

        core.do_release(ino, first).unwrap();
        assert_eq!(core.sessions.len(), 1);
        assert_eq!(core.resolve("/todo").unwrap().text, "");

        assert_eq!(core.do_write(ino, second, 0, b"two").unwrap_err(), FsOpError::InvalidArg);
        core.do_write(ino, second, 3, b"two").unwrap();
        core.do_release(ino, second).unwrap();

        assert!(core.sessions.is_empty());
        assert_eq!(core.resolve("/todo").unwrap().text, "onetwo");
        assert_eq!(service.sync_count(), 2);
    }

    #[test]
    fn test_write_after_last_close_flushed_by_next_close() {
        let (_, core) = core_with(vec![]);
        let created = core.create("/todo", libc::O_WRONLY, 0o644).unwrap();
        let opened = core.open("/todo", libc::O_WRONLY).unwrap();
        core.write("/todo", b"one", 0).unwrap();
        core.close("/todo", created).unwrap();
        assert_eq!(core.resolve("/todo").unwrap().text, "one");

        assert_eq!(core.write("/todo", b"two", 0).unwrap(), 3);
        core.close("/todo", opened).unwrap();

        assert!(core.sessions.is_empty());
        assert_eq!(core.resolve("/todo").unwrap().text, "two");
    }

    #[test]
    fn test_write_through_released_handle_is_bad_handle() {
        let (_, core) = core_with(vec![Note::new("n1", "todo", "")]);
        let ino = core.do_lookup(ROOT_INO, "todo").unwrap().ino;
        let fh = core.do_open(ino, libc::O_WRONLY).unwrap();
        core.do_release(ino, fh).unwrap();

        assert_eq!(core.do_write(ino, fh, 0, b"late").unwrap_err(), FsOpError::BadHandle);
        assert!(core.sessions.is_empty());
    }

    #[test]
    fn test_release_after_unlink_frees_session() {
        let (service, core) = core_with(vec![Note::new("n1", "todo", "buy milk")]);
        let ino = core.do_lookup(ROOT_INO, "todo").unwrap().ino;
        let fh = core.do_open(ino, libc::O_WRONLY | libc::O_TRUNC).unwrap();
        core.do_write(ino, fh, 0, b"stale").unwrap();

        core.do_unlink(ROOT_INO, "todo").unwrap();
        assert_eq!(core.get_path(ino), None);
        core.do_release(ino, fh).unwrap();

        assert!(core.sessions.is_empty());
        let trashed = service.note("n1").unwrap();
        assert!(trashed.trashed);
        assert_eq!(trashed.text, "stale");

        let (_, new_fh) = core.do_create(ROOT_INO, "todo", libc::O_WRONLY | libc::O_TRUNC, 0o644).unwrap();
        assert_ne!(new_fh, fh);
        assert_eq!(core.write("/todo", b"fresh", 0).unwrap(), 5);
        assert_eq!(core.sessions.buffer("/todo").unwrap(), b"fresh");
    }

    #[test]
    fn test_trunc_open_joins_and_empties_live_session() {
        let (_, core) = core_with(vec![Note::new("n1", "f", "hello")]);
        let first = core.open("/f", libc::O_RDWR).unwrap();
        let second = core.open("/f", libc::O_WRONLY | libc::O_TRUNC).unwrap();

        assert_eq!(first, second);
        assert_eq!(core.sessions.buffer("/f").unwrap(), b"");
        core.close("/f", first).unwrap();
        assert_eq!(core.sessions.len(), 1);
        core.close("/f", second).unwrap();
        assert!(core.sessions.is_empty());
    }

    #[test]
    fn test_truncate_ignores_size() {
        let (_, core) = core_with(vec![Note::new("n1", "f", "hello")]);
        core.open("/f", libc::O_RDWR).unwrap();
        core.truncate("/f", 3).unwrap();
        assert_eq!(core.sessions.buffer("/f").unwrap(), b"");
    }

    #[test]
    fn test_remote_failure_is_io() {
        let (service, core) = core_with(vec![]);
        service.fail_next(Fault::RemoteUnavailable);
        assert!(matches!(core.stat("/todo"), Err(FsOpError::Io(_))));
    }

    #[test]
    fn test_read_only_mode_rejects_mutations() {
        let (service, core) = core_with(vec![Note::new("n1", "todo", "x")]);
        let core = core.with_read_only(true);

        assert_eq!(core.open("/todo", libc::O_RDONLY).unwrap(), READ_ONLY_HANDLE);
        assert_eq!(core.open("/todo", libc::O_WRONLY).unwrap_err(), FsOpError::PermissionDenied);
        assert_eq!(core.create("/new", libc::O_WRONLY, 0o644).unwrap_err(), FsOpError::PermissionDenied);
        assert_eq!(core.write("/todo", b"y", 0).unwrap_err(), FsOpError::PermissionDenied);
        assert_eq!(core.truncate("/todo", 0).unwrap_err(), FsOpError::PermissionDenied);
        assert_eq!(core.rename("/todo", "/done").unwrap_err(), FsOpError::PermissionDenied);
        assert_eq!(core.unlink("/todo").unwrap_err(), FsOpError::PermissionDenied);

        assert!(core.sessions.is_empty());
        assert_eq!(service.sync_count(), 0);
        assert_eq!(core.read("/todo", 10, 0).unwrap(), b"x");
    }

    #[test]
    fn test_lookup_outside_root_is_not_found() {
        let (_, core) = core_with(vec![Note::new("n1", "todo", "")]);
        assert_eq!(core.do_lookup(999, "todo").unwrap_err(), FsOpError::NotFound);
    }

    #[test]
    fn test_lookup_then_getattr_share_inode() {
        let (_, core) = core_with(vec![Note::new("n1", "todo", "abc")]);
        let looked_up = core.do_lookup(ROOT_INO, "todo").unwrap();
        let attr = core.do_getattr(looked_up.ino).unwrap();
        assert_eq!(attr.ino, looked_up.ino);
        assert_eq!(attr.size, 3);
    }

    #[test]
    fn test_readdir_assigns_inodes() {
        let (_, core) = core_with(vec![Note::new("n1", "a", ""), Note::new("n2", "", "b")]);
        let result = core.do_readdir(ROOT_INO).unwrap();
        let names: Vec<_> = result.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec![".", "..", "a", "n2"]);

        let a = &result.entries[2];
        assert_eq!(a.kind, InodeKind::File);
        assert_eq!(core.inodes.get_ino("/a"), Some(a.ino));
    }

    #[test]
    fn test_negative_offset_rejected() {
        let (_, core) = core_with(vec![Note::new("n1", "todo", "abc")]);
        let ino = core.do_lookup(ROOT_INO, "todo").unwrap().ino;
        assert_eq!(core.do_read(ino, -1, 10).unwrap_err(), FsOpError::InvalidArg);
        let fh = core.do_open(ino, libc::O_WRONLY | libc::O_TRUNC).unwrap();
        assert_eq!(core.do_write(ino, fh, -1, b"x").unwrap_err(), FsOpError::InvalidArg);
    }

    #[test]
    fn test_mount_options() {
        let (_, core) = core_with(vec![]);
        let options = core.mount_options();
        assert!(options.contains(&fuser::MountOption::FSName("keepfs".to_string())));
        assert!(options.contains(&fuser::MountOption::AutoUnmount));
        assert!(!options.contains(&fuser::MountOption::AllowOther));
        assert!(!options.contains(&fuser::MountOption::DefaultPermissions));

        let core = core.with_read_only(true);
        assert!(core.mount_options().contains(&fuser::MountOption::RO));
    }

    #[test]
    fn test_mount_options_allow_other_from_config() {
        let service = Arc::new(MemoryNoteService::new());
        let mount = MountConfig {
            allow_other: true,
            auto_unmount: false,
            ..MountConfig::default()
        };
        let core = KeepFsCore::from_config(service, mount).unwrap();

        let options = core.mount_options();
        assert!(options.contains(&fuser::MountOption::AllowOther));
        assert!(!options.contains(&fuser::MountOption::AutoUnmount));
    }

    #[test]
    fn test_file_attr_conversion() {
        let attr = InodeAttr::note(42, &Note::new("n", "t", "hello"));
        let file_attr = inode_attr_to_file_attr(&attr);

        assert_eq!(file_attr.ino, 42);
        assert_eq!(file_attr.size, 5);
        assert_eq!(file_attr.kind, fuser::FileType::RegularFile);
        assert_eq!(file_attr.perm, 0o444);
        assert_eq!(file_attr.mtime, attr.mtime);
        assert_eq!(file_attr.blksize, 4096);
    }

    #[test]
    fn test_dir_attr_conversion() {
        let file_attr = inode_attr_to_file_attr(&InodeAttr::directory(ROOT_INO));
        assert_eq!(file_attr.kind, fuser::FileType::Directory);
        assert_eq!(file_attr.nlink, 2);
    }
}
