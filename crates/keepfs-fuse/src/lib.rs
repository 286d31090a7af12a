//! FUSE filesystem exposing remote notes as files.
//!
//! Every visible note appears as one regular file in the mount root, named by
//! its title (or its id when the title is empty). File content is the note's
//! text. Listing, reading, creating, writing, renaming and deleting files turn
//! into calls against a [`NoteService`](keepfs_core::NoteService).
//!
//! # Architecture
//!
//! - `store`: `NoteStoreAdapter`, blocking pass-through to the note service
//! - `resolver`: `PathResolver`, path to note lookup
//! - `lister`: `DirectoryLister`, root directory enumeration
//! - `session`: `SessionTable`, write buffers flushed on close
//! - `common`: `KeepFsCore`, the dispatcher composing the above
//! - `unix_fuse`: `fuser::Filesystem` impl for macOS/Linux
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use keepfs_core::MemoryNoteService;
//! use keepfs_fuse::KeepFuse;
//!
//! let fs = KeepFuse::new(Arc::new(MemoryNoteService::new()))?;
//! fs.mount("/mnt/keep".as_ref())?;
//! ```

mod async_bridge;
#[cfg(unix)]
pub(crate) mod common;
#[cfg(unix)]
mod inode;
mod lister;
mod resolver;
mod session;
mod store;
#[cfg(unix)]
pub(crate) mod unix_fuse;

pub use async_bridge::{block_on, init_runtime, FuseError, FuseResult};
#[cfg(unix)]
pub use common::{has_write_intent, DirEntry, FsOpError, KeepFsCore, ReadDirResult};
#[cfg(unix)]
pub use inode::{InodeAttr, InodeKind, InodeTable, DIR_PERM, NOTE_PERM, ROOT_INO};
pub use lister::DirectoryLister;
pub use resolver::{key_from_path, PathResolver};
pub use session::{NonSequentialWrite, SessionTable, WriteSession, READ_ONLY_HANDLE};
pub use store::NoteStoreAdapter;

/// The main FUSE filesystem type.
///
/// `mount()` serves it on the calling thread until unmounted.
#[cfg(unix)]
pub type KeepFuse = KeepFsCore;
