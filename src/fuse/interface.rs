// Filesystem interface abstraction
//
// Defines the inode-level operations the FUSE adapter forwards to. The adapter
// only deals with fuser types and errno values; everything about namespaces
// lives behind this trait.

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

/// Result type for filesystem operations
pub type FsResult<T> = Result<T, FsError>;

/// Filesystem error types
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Filename too long: {0} bytes (max 255)")]
    NameTooLong(usize),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl FsError {
    /// Convert to POSIX errno
    pub fn to_errno(&self) -> i32 {
        match self {
            FsError::PathNotFound(_) => libc::ENOENT,
            FsError::InvalidName(_) => libc::EINVAL,
            FsError::NameTooLong(_) => libc::ENAMETOOLONG,
            FsError::PermissionDenied(_) => libc::EACCES,
            FsError::NotSupported(_) => libc::ENOSYS,
            FsError::Cancelled(_) => libc::ECANCELED,
            FsError::IoError(_) => libc::EIO,
        }
    }
}

/// Attributes of one directory in the tree
#[derive(Debug, Clone)]
pub struct FileAttr {
    pub inode: u64,
    pub atime: DateTime<Utc>,
    pub mtime: DateTime<Utc>,
    pub ctime: DateTime<Utc>,
    pub mode: u32, // Permission bits
    pub uid: u32,
    pub gid: u32,
    pub nlinks: u32,
}

/// Directory entry structure; every entry in the tree is a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub inode: u64,
    pub name: String,
}

/// Operations the mounted tree answers.
///
/// Listings include the `.` and `..` entries.
#[async_trait::async_trait]
pub trait FilesystemInterface: Send + Sync {
    async fn lookup(&self, parent: u64, name: &str) -> FsResult<FileAttr>;
    async fn get_attr(&self, ino: u64) -> FsResult<FileAttr>;
    async fn read_dir(&self, ino: u64) -> FsResult<Vec<DirEntry>>;

    async fn rename(&self, parent: u64, name: &str, new_parent: u64, new_name: &str)
    -> FsResult<()>;

    /// Remove a directory. `cancel` aborts the operation while it is still revocable.
    async fn remove_dir(&self, parent: u64, name: &str, cancel: &CancellationToken)
    -> FsResult<()>;

    async fn create_dir(&self, parent: u64, name: &str, _mode: u32) -> FsResult<FileAttr> {
        Err(FsError::NotSupported(format!("mkdir {name} in inode {parent}")))
    }

    async fn statfs(&self) -> FsResult<StatFs>;
}

/// Filesystem statistics
#[derive(Debug, Clone)]
pub struct StatFs {
    pub blocks: u64,  // Total blocks
    pub bfree: u64,   // Free blocks
    pub bavail: u64,  // Available blocks for unprivileged users
    pub files: u64,   // Total inodes
    pub ffree: u64,   // Free inodes
    pub bsize: u32,   // Block size
    pub namelen: u32, // Maximum filename length
}
