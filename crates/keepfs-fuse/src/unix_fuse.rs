//! Unix FUSE implementation using the `fuser` crate.

use std::ffi::OsStr;
use std::time::SystemTime;

use fuser::{
    FileType, Filesystem, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyWrite, Request, TimeOrNow,
};
use tracing::{debug, error};

use crate::common::{inode_attr_to_file_attr, FsOpError, KeepFsCore};
use crate::inode::{InodeKind, ROOT_INO};

/// Unix FUSE filesystem wrapper around `KeepFsCore`.
pub struct UnixFuse(pub KeepFsCore);

impl UnixFuse {
    pub(crate) fn error_to_errno(e: &FsOpError) -> i32 {
        match e {
            FsOpError::NotFound => libc::ENOENT,
            FsOpError::PermissionDenied => libc::EACCES,
            FsOpError::InvalidArg => libc::EINVAL,
            FsOpError::BadHandle => libc::EBADF,
            FsOpError::Io(_) => libc::EIO,
        }
    }
}

/// Names that are not valid UTF-8 cannot be note titles.
fn name_str(name: &OsStr) -> Option<&str> {
    name.to_str()
}

impl Filesystem for UnixFuse {
    fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(name) = name_str(name) else {
            reply.error(libc::EINVAL);
            return;
        };

        debug!("lookup: parent={}, name={}", parent, name);

        match self.0.do_lookup(parent, name) {
            Ok(attr) => reply.entry(&self.0.attr_ttl(), &inode_attr_to_file_attr(&attr), 0),
            Err(e) => {
                debug!("lookup failed: {}", e);
                reply.error(Self::error_to_errno(&e));
            }
        }
    }

    fn getattr(&mut self, _req: &Request, ino: u64, reply: ReplyAttr) {
        debug!("getattr: ino={}", ino);

        match self.0.do_getattr(ino) {
            Ok(attr) => reply.attr(&self.0.attr_ttl(), &inode_attr_to_file_attr(&attr)),
            Err(e) => reply.error(Self::error_to_errno(&e)),
        }
    }

    fn read(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        debug!("read: ino={}, offset={}, size={}", ino, offset, size);

        match self.0.do_read(ino, offset, size) {
            Ok(data) => reply.data(&data),
            Err(e) => {
                error!("read failed: {}", e);
                reply.error(Self::error_to_errno(&e));
            }
        }
    }

    fn write(
        &mut self,
        _req: &Request,
        ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        debug!("write: ino={}, fh={}, offset={}, size={}", ino, fh, offset, data.len());

        match self.0.do_write(ino, fh, offset, data) {
            Ok(written) => reply.written(written),
            Err(e) => {
                error!("write failed: {}", e);
                reply.error(Self::error_to_errno(&e));
            }
        }
    }

    fn readdir(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        debug!("readdir: ino={}, offset={}", ino, offset);

        match self.0.do_readdir(ino) {
            Ok(result) => {
                let skip = usize::try_from(offset).unwrap_or(0);
                for (i, entry) in result.entries.into_iter().enumerate().skip(skip) {
                    let kind = match entry.kind {
                        InodeKind::File => FileType::RegularFile,
                        InodeKind::Directory => FileType::Directory,
                    };
                    if reply.add(entry.ino, (i + 1) as i64, kind, &entry.name) {
                        break;
                    }
                }
                reply.ok();
            }
            Err(e) => {
                error!("readdir failed: {}", e);
                reply.error(Self::error_to_errno(&e));
            }
        }
    }

    fn create(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        flags: i32,
        reply: ReplyCreate,
    ) {
        let Some(name) = name_str(name) else {
            reply.error(libc::EINVAL);
            return;
        };

        debug!("create: parent={}, name={}", parent, name);

        match self.0.do_create(parent, name, flags, mode) {
            Ok((attr, fh)) => {
                reply.created(&self.0.attr_ttl(), &inode_attr_to_file_attr(&attr), 0, fh, 0);
            }
            Err(e) => {
                error!("create failed: {}", e);
                reply.error(Self::error_to_errno(&e));
            }
        }
    }

    fn unlink(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let Some(name) = name_str(name) else {
            reply.error(libc::EINVAL);
            return;
        };

        debug!("unlink: parent={}, name={}", parent, name);

        match self.0.do_unlink(parent, name) {
            Ok(()) => reply.ok(),
            Err(e) => {
                error!("unlink failed: {}", e);
                reply.error(Self::error_to_errno(&e));
            }
        }
    }

    fn open(&mut self, _req: &Request, ino: u64, flags: i32, reply: ReplyOpen) {
        debug!("open: ino={}, flags={:#o}", ino, flags);

        match self.0.do_open(ino, flags) {
            Ok(fh) => reply.opened(fh, 0),
            Err(e) => reply.error(Self::error_to_errno(&e)),
        }
    }

    fn release(
        &mut self,
        _req: &Request,
        ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        debug!("release: ino={}, fh={}", ino, fh);

        match self.0.do_release(ino, fh) {
            Ok(()) => reply.ok(),
            Err(e) => {
                error!("release failed: {}", e);
                reply.error(Self::error_to_errno(&e));
            }
        }
    }

    fn opendir(&mut self, _req: &Request, ino: u64, _flags: i32, reply: ReplyOpen) {
        debug!("opendir: ino={}", ino);

        if ino == ROOT_INO {
            reply.opened(0, 0);
        } else {
            reply.error(libc::ENOTDIR);
        }
    }

    fn setattr(
        &mut self,
        _req: &Request,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        debug!("setattr: ino={}, size={:?}", ino, size);

        match self.0.do_setattr(ino, size) {
            Ok(attr) => reply.attr(&self.0.attr_ttl(), &inode_attr_to_file_attr(&attr)),
            Err(e) => reply.error(Self::error_to_errno(&e)),
        }
    }

    fn rename(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let (Some(name), Some(newname)) = (name_str(name), name_str(newname)) else {
            reply.error(libc::EINVAL);
            return;
        };

        debug!(
            "rename: parent={}, name={}, newparent={}, newname={}",
            parent, name, newparent, newname
        );

        match self.0.do_rename(parent, name, newparent, newname) {
            Ok(()) => reply.ok(),
            Err(e) => {
                error!("rename failed: {}", e);
                reply.error(Self::error_to_errno(&e));
            }
        }
    }

    fn statfs(&mut self, _req: &Request, _ino: u64, reply: fuser::ReplyStatfs) {
        reply.statfs(
            1_000_000, 500_000, 500_000, 1_000_000, 500_000, 4096, 255, 4096,
        );
    }
}
