// FUSE interface implementation
//
// This module provides FUSE (Filesystem in Userspace) support,
// presenting the remote namespaces as a mounted directory tree.

pub mod adapter;
pub mod backend;
pub mod interface;
pub mod mount;

pub use adapter::{CacheTimeouts, FuseAdapter};
pub use backend::DmfsBackend;
pub use interface::{DirEntry, FileAttr, FilesystemInterface, FsError, FsResult, StatFs};
pub use mount::{
    MountError, MountOptions, MountOutcome, MountSupervisor, RetryPolicy, Unmounter,
    create_mountpoint, shutdown_signal, supervise, unmount_with_retry,
};
