//! dmfs: mount a DataManager account as a directory tree.
//!
//! The root lists one directory per namespace, and each namespace lists its groups.
//! Renaming or removing a namespace directory renames or deletes the namespace remotely.

pub mod config;
pub mod context;
pub mod fs;
pub mod fuse;
pub mod remote;
