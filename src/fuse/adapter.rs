// FUSE adapter - bridges sync FUSE callbacks to async FilesystemInterface
//
// This adapter implements the fuser::Filesystem trait and delegates all operations
// to the async FilesystemInterface implementation. It handles:
// - Dispatching each request onto a dedicated tokio runtime
// - FUSE types to FilesystemInterface types conversion
// - Error code translation
//
// IMPORTANT: Callbacks arrive on the single session thread. Each one spawns its
// operation and returns, replying from the task, so a slow request (an rmdir
// waiting out its delete delay, a remote fetch) never holds up the others.

use super::interface::{FileAttr, FilesystemInterface, FsError};
use fuser::{
    FileType as FuseFileType, Filesystem, ReplyAttr, ReplyDirectory, ReplyEmpty, ReplyEntry,
    ReplyStatfs, Request,
};
use std::ffi::OsStr;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

/// How long the kernel may cache lookups and attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTimeouts {
    pub entry: Duration,
    pub attr: Duration,
}

impl Default for CacheTimeouts {
    fn default() -> Self {
        Self { entry: Duration::from_secs(1), attr: Duration::from_secs(1) }
    }
}

/// FUSE adapter that bridges sync FUSE callbacks to async FilesystemInterface
pub struct FuseAdapter {
    /// The underlying filesystem implementation
    backend: Arc<dyn FilesystemInterface>,

    /// Dedicated tokio runtime for async operations
    runtime: Arc<Runtime>,

    /// Cancelled when the mount shuts down; pending deletes watch it.
    shutdown: CancellationToken,

    timeouts: CacheTimeouts,
}

impl FuseAdapter {
    /// Create a new FUSE adapter with a dedicated runtime
    pub fn new(
        backend: Arc<dyn FilesystemInterface>,
        shutdown: CancellationToken,
        timeouts: CacheTimeouts,
    ) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .thread_name("dmfs-fuse")
            .enable_all()
            .build()?;

        Ok(Self::with_runtime(backend, Arc::new(runtime), shutdown, timeouts))
    }

    /// Create a new FUSE adapter with a provided runtime
    pub fn with_runtime(
        backend: Arc<dyn FilesystemInterface>,
        runtime: Arc<Runtime>,
        shutdown: CancellationToken,
        timeouts: CacheTimeouts,
    ) -> Self {
        Self { backend, runtime, shutdown, timeouts }
    }

    /// Run one request on the runtime without waiting for it
    fn dispatch<F>(&self, operation: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.runtime.spawn(operation);
    }

    /// Convert FsError to errno
    fn error_to_errno(error: FsError) -> libc::c_int {
        tracing::debug!(error = %error, "filesystem operation failed");
        error.to_errno()
    }

    /// Convert our FileAttr to fuser FileAttr
    fn to_fuse_attr(attr: &FileAttr) -> fuser::FileAttr {
        fuser::FileAttr {
            ino: attr.inode,
            size: 0,
            blocks: 0,
            atime: datetime_to_systemtime(attr.atime),
            mtime: datetime_to_systemtime(attr.mtime),
            ctime: datetime_to_systemtime(attr.ctime),
            crtime: UNIX_EPOCH,
            kind: FuseFileType::Directory,
            perm: attr.mode as u16,
            nlink: attr.nlinks,
            uid: attr.uid,
            gid: attr.gid,
            rdev: 0,
            blksize: 4096,
            flags: 0,
        }
    }
}

/// Names on the tree are always UTF-8
fn utf8_name(name: &OsStr) -> Result<String, libc::c_int> {
    name.to_str().map(str::to_string).ok_or(libc::EINVAL)
}

/// Convert chrono DateTime to SystemTime
fn datetime_to_systemtime(dt: chrono::DateTime<chrono::Utc>) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(dt.timestamp().max(0) as u64)
}

impl Filesystem for FuseAdapter {
    /// Initialize filesystem
    fn init(
        &mut self,
        _req: &Request,
        _config: &mut fuser::KernelConfig,
    ) -> Result<(), libc::c_int> {
        tracing::info!("FUSE filesystem initialized");
        Ok(())
    }

    /// Cleanup filesystem
    fn destroy(&mut self) {
        self.shutdown.cancel();
        tracing::info!("FUSE filesystem destroyed");
    }

    /// Look up a directory entry by name
    fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let name = match utf8_name(name) {
            Ok(n) => n,
            Err(e) => {
                reply.error(e);
                return;
            }
        };

        let backend = Arc::clone(&self.backend);
        let ttl = self.timeouts.entry;
        self.dispatch(async move {
            match backend.lookup(parent, &name).await {
                Ok(attr) => reply.entry(&ttl, &Self::to_fuse_attr(&attr), 0),
                Err(e) => reply.error(Self::error_to_errno(e)),
            }
        });
    }

    /// Get file attributes
    fn getattr(&mut self, _req: &Request, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        let backend = Arc::clone(&self.backend);
        let ttl = self.timeouts.attr;
        self.dispatch(async move {
            match backend.get_attr(ino).await {
                Ok(attr) => reply.attr(&ttl, &Self::to_fuse_attr(&attr)),
                Err(e) => reply.error(Self::error_to_errno(e)),
            }
        });
    }

    /// Create a directory
    fn mkdir(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let name = match utf8_name(name) {
            Ok(n) => n,
            Err(e) => {
                reply.error(e);
                return;
            }
        };

        let backend = Arc::clone(&self.backend);
        let ttl = self.timeouts.entry;
        self.dispatch(async move {
            match backend.create_dir(parent, &name, mode).await {
                Ok(attr) => reply.entry(&ttl, &Self::to_fuse_attr(&attr), 0),
                Err(e) => reply.error(Self::error_to_errno(e)),
            }
        });
    }

    /// Remove a directory
    fn rmdir(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let name = match utf8_name(name) {
            Ok(n) => n,
            Err(e) => {
                reply.error(e);
                return;
            }
        };

        let backend = Arc::clone(&self.backend);
        let cancel = self.shutdown.child_token();
        self.dispatch(async move {
            match backend.remove_dir(parent, &name, &cancel).await {
                Ok(()) => reply.ok(),
                Err(e) => reply.error(Self::error_to_errno(e)),
            }
        });
    }

    /// Rename a directory
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
        let (name, newname) = match (utf8_name(name), utf8_name(newname)) {
            (Ok(n), Ok(nn)) => (n, nn),
            (Err(e), _) | (_, Err(e)) => {
                reply.error(e);
                return;
            }
        };

        let backend = Arc::clone(&self.backend);
        self.dispatch(async move {
            match backend.rename(parent, &name, newparent, &newname).await {
                Ok(()) => reply.ok(),
                Err(e) => reply.error(Self::error_to_errno(e)),
            }
        });
    }

    /// Read directory entries
    fn readdir(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let backend = Arc::clone(&self.backend);
        self.dispatch(async move {
            match backend.read_dir(ino).await {
                Ok(entries) => {
                    // Reply with entries starting from offset
                    for (i, entry) in entries.iter().enumerate().skip(offset as usize) {
                        let buffer_full = reply.add(
                            entry.inode,
                            (i + 1) as i64,
                            FuseFileType::Directory,
                            &entry.name,
                        );
                        if buffer_full {
                            break;
                        }
                    }

                    reply.ok();
                }
                Err(e) => reply.error(Self::error_to_errno(e)),
            }
        });
    }

    /// Get filesystem statistics
    fn statfs(&mut self, _req: &Request, _ino: u64, reply: ReplyStatfs) {
        let backend = Arc::clone(&self.backend);
        self.dispatch(async move {
            match backend.statfs().await {
                Ok(stats) => reply.statfs(
                    stats.blocks,
                    stats.bfree,
                    stats.bavail,
                    stats.files,
                    stats.ffree,
                    stats.bsize,
                    stats.namelen,
                    0, // frsize
                ),
                Err(e) => reply.error(Self::error_to_errno(e)),
            }
        });
    }
}
